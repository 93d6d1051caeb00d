//! URI templates: expansion and extraction.
//!
//! Templates use the RFC 6570 expression syntax (`{var}`, `{/id}`,
//! `{?query*}`) and work in both directions: expand a template plus a
//! binding map into a concrete URL, or parse a matching URL back into the
//! bound variable values.
//!
//! Extraction works per URL component. The template is split into
//! sub-patterns for scheme, userinfo, host, port, path, query, and
//! fragment; components the template leaves empty are unconstrained, so
//! `{scheme}:///foos{/id}` matches any host and port.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::result::{PaginarError, PaginarResult};
use crate::uri::{self, UriParts};

// =============================================================================
// PARAMETER VALUES
// =============================================================================

/// A value bound to a template variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Single scalar value
    Str(String),
    /// Ordered list of values
    List(Vec<String>),
    /// Ordered key/value pairs, exploded to `key=value` by named operators
    Assoc(Vec<(String, String)>),
}

impl ParamValue {
    /// Whether the value counts as defined for expansion.
    ///
    /// Empty strings are defined (they expand to an empty segment); empty
    /// lists and pair sets are not and expand to nothing.
    #[must_use]
    pub fn is_defined(&self) -> bool {
        match self {
            Self::Str(_) => true,
            Self::List(items) => !items.is_empty(),
            Self::Assoc(pairs) => !pairs.is_empty(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::List(items) => f.write_str(&items.join(",")),
            Self::Assoc(pairs) => {
                let joined = pairs
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(",");
                f.write_str(&joined)
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<(String, String)>> for ParamValue {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::Assoc(pairs)
    }
}

/// Variable bindings, used for expansion and for expected-value filtering.
pub type Expansion = HashMap<String, ParamValue>;

// =============================================================================
// TEMPLATE GRAMMAR
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParam,
    Query,
    QueryCont,
}

impl Operator {
    /// String prepended to the whole expansion when any variable is defined.
    const fn first(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved => "",
            Self::Fragment => "#",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query => "?",
            Self::QueryCont => "&",
        }
    }

    /// Separator between expanded variables.
    const fn separator(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved | Self::Fragment => ",",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query | Self::QueryCont => "&",
        }
    }

    /// Whether expansions carry a `name=` prefix.
    const fn named(self) -> bool {
        matches!(self, Self::PathParam | Self::Query | Self::QueryCont)
    }

    /// Suffix after the name when the bound value is an empty string.
    const fn empty_suffix(self) -> &'static str {
        match self {
            Self::Query | Self::QueryCont => "=",
            _ => "",
        }
    }

    /// Whether reserved URI characters pass through unencoded.
    const fn allows_reserved(self) -> bool {
        matches!(self, Self::Reserved | Self::Fragment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VarSpec {
    name: String,
    explode: bool,
    prefix: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Expression { op: Operator, vars: Vec<VarSpec> },
}

fn template_error(offset: usize, message: &str) -> PaginarError {
    PaginarError::Template {
        message: format!("{message} at offset {offset}"),
    }
}

fn parse_parts(input: &str) -> PaginarResult<Vec<Part>> {
    let mut parts = Vec::new();
    let mut rest = input;
    let mut offset = 0usize;
    while let Some(open) = rest.find('{') {
        if open > 0 {
            parts.push(Part::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            return Err(template_error(offset + open, "unterminated expression"));
        };
        parts.push(parse_expression(&after[..close], offset + open)?);
        rest = &after[close + 1..];
        offset += open + close + 2;
    }
    if !rest.is_empty() {
        parts.push(Part::Literal(rest.to_string()));
    }
    Ok(parts)
}

fn parse_expression(body: &str, offset: usize) -> PaginarResult<Part> {
    let Some(first) = body.chars().next() else {
        return Err(template_error(offset, "empty expression"));
    };
    let (op, spec_src) = match first {
        '+' => (Operator::Reserved, &body[1..]),
        '#' => (Operator::Fragment, &body[1..]),
        '.' => (Operator::Label, &body[1..]),
        '/' => (Operator::Path, &body[1..]),
        ';' => (Operator::PathParam, &body[1..]),
        '?' => (Operator::Query, &body[1..]),
        '&' => (Operator::QueryCont, &body[1..]),
        '=' | ',' | '!' | '@' | '|' => {
            return Err(template_error(
                offset,
                &format!("operator '{first}' is reserved"),
            ));
        }
        _ => (Operator::Simple, body),
    };
    if spec_src.is_empty() {
        return Err(template_error(offset, "expression names no variables"));
    }
    let mut vars = Vec::new();
    for spec in spec_src.split(',') {
        vars.push(parse_varspec(spec, offset)?);
    }
    Ok(Part::Expression { op, vars })
}

fn parse_varspec(spec: &str, offset: usize) -> PaginarResult<VarSpec> {
    let (name, explode, prefix) = if let Some(stripped) = spec.strip_suffix('*') {
        (stripped, true, None)
    } else if let Some(colon) = spec.find(':') {
        let digits = &spec[colon + 1..];
        let length = digits
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=9999).contains(n))
            .ok_or_else(|| template_error(offset, &format!("invalid prefix length '{digits}'")))?;
        (&spec[..colon], false, Some(length))
    } else {
        (spec, false, None)
    };
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '%'));
    if !valid {
        return Err(template_error(
            offset,
            &format!("invalid variable name '{name}'"),
        ));
    }
    Ok(VarSpec {
        name: name.to_string(),
        explode,
        prefix,
    })
}

// =============================================================================
// EXPANSION
// =============================================================================

/// Characters percent-encoded in ordinary expansion values: everything
/// outside the RFC 3986 unreserved set.
const UNRESERVED_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Encode set for `+` and `#` operators, which pass reserved characters
/// and existing percent triplets through.
const RESERVED_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b'%');

fn encode(value: &str, set: &'static AsciiSet) -> String {
    utf8_percent_encode(value, set).to_string()
}

fn expand_expression(out: &mut String, op: Operator, vars: &[VarSpec], bindings: &Expansion) {
    let mut rendered = Vec::new();
    for spec in vars {
        let Some(value) = bindings.get(&spec.name) else {
            continue;
        };
        if !value.is_defined() {
            continue;
        }
        rendered.push(render_var(op, spec, value));
    }
    if rendered.is_empty() {
        return;
    }
    out.push_str(op.first());
    out.push_str(&rendered.join(op.separator()));
}

fn render_var(op: Operator, spec: &VarSpec, value: &ParamValue) -> String {
    let set = if op.allows_reserved() {
        RESERVED_SAFE
    } else {
        UNRESERVED_SAFE
    };
    match value {
        ParamValue::Str(s) => {
            let truncated = match spec.prefix {
                Some(n) => s.chars().take(n).collect::<String>(),
                None => s.clone(),
            };
            if op.named() {
                if truncated.is_empty() {
                    format!("{}{}", spec.name, op.empty_suffix())
                } else {
                    format!("{}={}", spec.name, encode(&truncated, set))
                }
            } else {
                encode(&truncated, set)
            }
        }
        ParamValue::List(items) => {
            if spec.explode {
                items
                    .iter()
                    .map(|item| {
                        if op.named() {
                            format!("{}={}", spec.name, encode(item, set))
                        } else {
                            encode(item, set)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(op.separator())
            } else {
                let joined = items
                    .iter()
                    .map(|item| encode(item, set))
                    .collect::<Vec<_>>()
                    .join(",");
                if op.named() {
                    format!("{}={joined}", spec.name)
                } else {
                    joined
                }
            }
        }
        ParamValue::Assoc(pairs) => {
            if spec.explode {
                pairs
                    .iter()
                    .map(|(k, v)| format!("{}={}", encode(k, set), encode(v, set)))
                    .collect::<Vec<_>>()
                    .join(op.separator())
            } else {
                let joined = pairs
                    .iter()
                    .flat_map(|(k, v)| [encode(k, set), encode(v, set)])
                    .collect::<Vec<_>>()
                    .join(",");
                if op.named() {
                    format!("{}={joined}", spec.name)
                } else {
                    joined
                }
            }
        }
    }
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// Sentinel substituted for expressions so the template itself can be
/// split into URI components before each component is compiled.
fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"~~~(\d+)~~~").expect("valid literal pattern"))
}

#[derive(Debug, Clone)]
struct ComponentPattern {
    regex: Regex,
    /// Variable names in capture-group order.
    names: Vec<String>,
}

#[derive(Debug, Clone)]
struct ResourcePattern {
    pattern: ComponentPattern,
    /// Query-operator expressions sit in the path region of the split
    /// template; when present the actual query is matched along with the
    /// path.
    includes_query: bool,
    includes_fragment: bool,
}

#[derive(Debug, Clone, Default)]
struct Extractor {
    scheme: Option<ComponentPattern>,
    userinfo: Option<ComponentPattern>,
    host: Option<ComponentPattern>,
    port: Option<ComponentPattern>,
    resource: Option<ResourcePattern>,
    query: Option<ComponentPattern>,
    fragment: Option<ComponentPattern>,
}

impl Extractor {
    fn compile(parts: &[Part]) -> PaginarResult<Self> {
        let mut substituted = String::new();
        let mut exprs: Vec<(Operator, Vec<VarSpec>)> = Vec::new();
        for part in parts {
            match part {
                Part::Literal(lit) => substituted.push_str(lit),
                Part::Expression { op, vars } => {
                    substituted.push_str(&format!("~~~{}~~~", exprs.len()));
                    exprs.push((*op, vars.clone()));
                }
            }
        }
        let split = UriParts::split(&substituted);
        let (userinfo, host, port) = match split.authority {
            Some(auth) if !auth.is_empty() => {
                let (userinfo, host, port) = uri::split_authority(auth);
                (
                    compile_component(userinfo.unwrap_or(""), &exprs)?,
                    compile_component(host, &exprs)?,
                    compile_component(port.unwrap_or(""), &exprs)?,
                )
            }
            _ => (None, None, None),
        };
        Ok(Self {
            scheme: compile_component(split.scheme.unwrap_or(""), &exprs)?,
            userinfo,
            host,
            port,
            resource: compile_resource(split.path, &exprs)?,
            query: compile_component(split.query.unwrap_or(""), &exprs)?,
            fragment: compile_component(split.fragment.unwrap_or(""), &exprs)?,
        })
    }

    fn extract(&self, url: &str) -> Option<HashMap<String, String>> {
        let parts = UriParts::split(url);
        let mut out = HashMap::new();
        if let Some(pattern) = &self.scheme {
            capture_component(pattern, parts.scheme.unwrap_or(""), &mut out)?;
        }
        if self.userinfo.is_some() || self.host.is_some() || self.port.is_some() {
            let (userinfo, host, port) = parts
                .authority
                .map_or((None, "", None), uri::split_authority);
            if let Some(pattern) = &self.userinfo {
                capture_component(pattern, userinfo.unwrap_or(""), &mut out)?;
            }
            if let Some(pattern) = &self.host {
                capture_component(pattern, host, &mut out)?;
            }
            if let Some(pattern) = &self.port {
                capture_component(pattern, port.unwrap_or(""), &mut out)?;
            }
        }
        if let Some(resource) = &self.resource {
            let mut candidate = parts.path.to_string();
            if resource.includes_query {
                if let Some(query) = parts.query {
                    candidate.push('?');
                    candidate.push_str(query);
                }
            }
            if resource.includes_fragment {
                if let Some(fragment) = parts.fragment {
                    candidate.push('#');
                    candidate.push_str(fragment);
                }
            }
            capture_component(&resource.pattern, &candidate, &mut out)?;
        }
        if let Some(pattern) = &self.query {
            capture_component(pattern, parts.query.unwrap_or(""), &mut out)?;
        }
        if let Some(pattern) = &self.fragment {
            capture_component(pattern, parts.fragment.unwrap_or(""), &mut out)?;
        }
        Some(out)
    }
}

fn capture_component(
    pattern: &ComponentPattern,
    actual: &str,
    out: &mut HashMap<String, String>,
) -> Option<()> {
    let caps = pattern.regex.captures(actual)?;
    for (i, name) in pattern.names.iter().enumerate() {
        if let Some(group) = caps.get(i + 1) {
            let decoded = percent_decode_str(group.as_str())
                .decode_utf8_lossy()
                .into_owned();
            out.insert(name.clone(), decoded);
        }
    }
    Some(())
}

fn compile_component(
    src: &str,
    exprs: &[(Operator, Vec<VarSpec>)],
) -> PaginarResult<Option<ComponentPattern>> {
    if src.is_empty() {
        return Ok(None);
    }
    let mut pattern = String::from("^");
    let mut names = Vec::new();
    let mut last = 0usize;
    for caps in token_regex().captures_iter(src) {
        let (Some(whole), Some(index)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        pattern.push_str(&regex::escape(&src[last..whole.start()]));
        if let Some((op, vars)) = index
            .as_str()
            .parse::<usize>()
            .ok()
            .and_then(|idx| exprs.get(idx))
        {
            pattern.push_str(&expression_pattern(*op, vars, &mut names));
        }
        last = whole.end();
    }
    pattern.push_str(&regex::escape(&src[last..]));
    pattern.push('$');
    let regex = Regex::new(&pattern).map_err(|err| PaginarError::Template {
        message: format!("failed to compile extraction pattern: {err}"),
    })?;
    Ok(Some(ComponentPattern { regex, names }))
}

fn compile_resource(
    src: &str,
    exprs: &[(Operator, Vec<VarSpec>)],
) -> PaginarResult<Option<ResourcePattern>> {
    let Some(pattern) = compile_component(src, exprs)? else {
        return Ok(None);
    };
    let mut includes_query = false;
    let mut includes_fragment = false;
    for caps in token_regex().captures_iter(src) {
        let Some(index) = caps.get(1) else { continue };
        let expr = index
            .as_str()
            .parse::<usize>()
            .ok()
            .and_then(|idx| exprs.get(idx));
        match expr {
            Some((Operator::Query | Operator::QueryCont, _)) => includes_query = true,
            Some((Operator::Fragment, _)) => includes_fragment = true,
            _ => {}
        }
    }
    Ok(Some(ResourcePattern {
        pattern,
        includes_query,
        includes_fragment,
    }))
}

fn expression_pattern(op: Operator, vars: &[VarSpec], names: &mut Vec<String>) -> String {
    match op {
        Operator::Simple | Operator::Reserved | Operator::Fragment => {
            let mut inner = String::new();
            for (i, spec) in vars.iter().enumerate() {
                names.push(spec.name.clone());
                let value = match (op, spec.explode) {
                    (Operator::Simple, false) => "[^/?#&,:@]+",
                    (Operator::Simple, true) => "[^/?#&:@]+",
                    _ => ".+",
                };
                if i == 0 {
                    inner.push_str(&format!("({value})"));
                } else {
                    inner.push_str(&format!("(?:,({value}))?"));
                }
            }
            let lead = if op == Operator::Fragment { "\\#" } else { "" };
            format!("(?:{lead}{inner})?")
        }
        Operator::Label => vars
            .iter()
            .map(|spec| {
                names.push(spec.name.clone());
                if spec.explode {
                    r"(?:\.((?:[^./?#]+)(?:\.[^./?#]+)*))?".to_string()
                } else {
                    r"(?:\.([^./?#]+))?".to_string()
                }
            })
            .collect(),
        Operator::Path => vars
            .iter()
            .map(|spec| {
                names.push(spec.name.clone());
                if spec.explode {
                    "(?:/((?:[^/?#]+)(?:/[^/?#]+)*))?".to_string()
                } else {
                    "(?:/([^/?#]+))?".to_string()
                }
            })
            .collect(),
        Operator::PathParam => vars
            .iter()
            .map(|spec| {
                names.push(spec.name.clone());
                if spec.explode {
                    "(?:;([^/?#]+))?".to_string()
                } else {
                    format!("(?:;{}(?:=([^;/?#]*))?)?", regex::escape(&spec.name))
                }
            })
            .collect(),
        Operator::Query | Operator::QueryCont => vars
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                names.push(spec.name.clone());
                let lead = if i == 0 && op == Operator::Query {
                    r"\?"
                } else {
                    "&"
                };
                if spec.explode {
                    format!("(?:{lead}([^#]*))?")
                } else {
                    format!("(?:{lead}{}=([^&#]*))?", regex::escape(&spec.name))
                }
            })
            .collect(),
    }
}

// =============================================================================
// URI TEMPLATE
// =============================================================================

/// A parsed URI template, usable for expansion and extraction.
///
/// # Example
///
/// ```
/// use paginar::{Expansion, UriTemplate};
///
/// let template = UriTemplate::parse("/users{/username}{?query*}").unwrap();
/// let mut bindings = Expansion::new();
/// bindings.insert("username".to_string(), "foobar".into());
/// assert_eq!(template.expand(&bindings), "/users/foobar");
/// ```
#[derive(Debug, Clone)]
pub struct UriTemplate {
    raw: String,
    parts: Vec<Part>,
    extractor: Extractor,
}

impl UriTemplate {
    /// Parse a template string.
    ///
    /// # Errors
    ///
    /// Returns `PaginarError::Template` for malformed expression syntax:
    /// unterminated braces, reserved operators, or invalid variable names.
    pub fn parse(input: &str) -> PaginarResult<Self> {
        let parts = parse_parts(input)?;
        let extractor = Extractor::compile(&parts)?;
        Ok(Self {
            raw: input.to_string(),
            parts,
            extractor,
        })
    }

    /// The template source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Variable names in template order.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Expression { vars, .. } => Some(vars.iter().map(|v| v.name.as_str())),
                Part::Literal(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Expand the template with the given bindings. Unbound variables
    /// expand to nothing, per their operator's absent-value rule.
    #[must_use]
    pub fn expand(&self, bindings: &Expansion) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(lit) => out.push_str(lit),
                Part::Expression { op, vars } => expand_expression(&mut out, *op, vars, bindings),
            }
        }
        out
    }

    /// Expand with declared defaults as the fallback binding set.
    ///
    /// Defaults are all-or-nothing: any explicit binding disables every
    /// default for the call, including defaults for variables the caller
    /// left unbound. Only a call with no bindings at all uses defaults.
    #[must_use]
    pub fn expand_or_defaults(&self, bindings: &Expansion, defaults: &Expansion) -> String {
        if bindings.is_empty() {
            self.expand(defaults)
        } else {
            self.expand(bindings)
        }
    }

    /// Parse a URL against the template, extracting bound variables.
    ///
    /// Returns `None` when the URL does not match. Extracted values are
    /// always strings; exploded query expansions yield the raw matched
    /// query text.
    #[must_use]
    pub fn extract(&self, url: &str) -> Option<HashMap<String, String>> {
        let result = self.extractor.extract(url);
        if result.is_none() {
            trace!(template = %self.raw, %url, "url did not match template");
        }
        result
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for UriTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for UriTemplate {}

impl FromStr for UriTemplate {
    type Err = PaginarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// TESTS
// =============================================================================
