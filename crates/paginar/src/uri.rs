//! Verbatim URI-reference component splitting.
//!
//! `url::Url` only accepts absolute URLs and normalizes while parsing;
//! both template sources and page-relative locations need their
//! components back exactly as written, so matching works on a plain
//! five-way split instead.

/// Components of a URI reference, borrowed from the input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UriParts<'a> {
    pub scheme: Option<&'a str>,
    pub authority: Option<&'a str>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl<'a> UriParts<'a> {
    /// Split a URI reference into its five top-level components.
    ///
    /// Never fails: anything that is not recognizably scheme, authority,
    /// query, or fragment is left in the path.
    pub(crate) fn split(input: &'a str) -> Self {
        let (rest, fragment) = match input.find('#') {
            Some(i) => (&input[..i], Some(&input[i + 1..])),
            None => (input, None),
        };
        let (rest, query) = match rest.find('?') {
            Some(i) => (&rest[..i], Some(&rest[i + 1..])),
            None => (rest, None),
        };
        // A colon marks a scheme only when it appears before the first slash.
        let (scheme, rest) = match rest.find(':') {
            Some(i) if i > 0 && !rest[..i].contains('/') => (Some(&rest[..i]), &rest[i + 1..]),
            _ => (None, rest),
        };
        let (authority, path) = if let Some(after) = rest.strip_prefix("//") {
            match after.find('/') {
                Some(i) => (Some(&after[..i]), &after[i..]),
                None => (Some(after), ""),
            }
        } else {
            (None, rest)
        };
        Self {
            scheme,
            authority,
            path,
            query,
            fragment,
        }
    }
}

/// Split an authority into `(userinfo, host, port)`.
///
/// The port split is taken at the last colon outside an IPv6 literal, so
/// `[::1]:8080` keeps its bracketed host intact.
pub(crate) fn split_authority(auth: &str) -> (Option<&str>, &str, Option<&str>) {
    let (userinfo, rest) = match auth.rfind('@') {
        Some(i) => (Some(&auth[..i]), &auth[i + 1..]),
        None => (None, auth),
    };
    match rest.rfind(':') {
        Some(i) if !rest[i..].contains(']') => (userinfo, &rest[..i], Some(&rest[i + 1..])),
        _ => (userinfo, rest, None),
    }
}
