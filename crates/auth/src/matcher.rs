//! Route matching over request paths
//!
//! Patterns use a small path-templating syntax compiled once into
//! case-insensitive regular expressions:
//!
//! - `/static` segments are copied verbatim, so they may carry raw regex
//!   fragments such as `/sign-in(.*)`
//! - `:name` captures one segment, `:name?` makes it optional and
//!   `:name.ext` requires a suffix
//! - `*` captures the rest of the path, `*?` makes that optional
//!
//! A trailing slash on the request path is always tolerated.

use axum::http::{Request, Uri};
use regex::{Regex, RegexBuilder};

/// Error raised when a route pattern cannot be compiled
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("Route pattern must not be empty")]
    Empty,

    #[error("Invalid route pattern `{pattern}`: {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A single compiled path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    keys: Vec<String>,
    regex: Regex,
}

impl PathPattern {
    /// Compile a pattern, failing on empty input or an invalid expression
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.trim().is_empty() {
            return Err(PatternError::Empty);
        }

        let (expression, keys) = translate(pattern);
        let regex = RegexBuilder::new(&expression)
            .case_insensitive(true)
            .build()
            .map_err(|source| PatternError::Invalid {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            source: pattern.to_string(),
            keys,
            regex,
        })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the parameters captured by this pattern, in order.
    /// Wildcards are reported as `*`.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Extract named parameters from a matching path.
    ///
    /// Optional parameters that did not participate in the match are omitted.
    pub fn params(&self, path: &str) -> Option<Vec<(String, String)>> {
        let captures = self.regex.captures(path)?;
        let params = self
            .keys
            .iter()
            .enumerate()
            .filter_map(|(i, key)| {
                captures
                    .name(&group_name(i))
                    .map(|m| (key.clone(), m.as_str().to_string()))
            })
            .collect();
        Some(params)
    }
}

/// Parameters are emitted as named groups so raw groups inside static
/// segments cannot shift their positions.
fn group_name(index: usize) -> String {
    format!("p{}", index)
}

/// Translate a path pattern into a regular expression and its parameter keys
fn translate(pattern: &str) -> (String, Vec<String>) {
    let mut expression = String::from("^");
    let mut keys = Vec::new();

    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        if let Some(rest) = segment.strip_prefix('*') {
            let group = group_name(keys.len());
            keys.push("*".to_string());
            if rest.starts_with('?') {
                expression.push_str(&format!("(?:/(?P<{}>.*))?", group));
            } else {
                expression.push_str(&format!("/(?P<{}>.*)", group));
            }
        } else if let Some(rest) = segment.strip_prefix(':') {
            let optional = rest.find('?');
            let extension = rest.find('.');
            let name_end = optional.or(extension).unwrap_or(rest.len());
            let group = group_name(keys.len());
            keys.push(rest[..name_end].to_string());

            if optional.is_some() && extension.is_none() {
                expression.push_str(&format!("(?:/(?P<{}>[^/]+?))?", group));
            } else {
                expression.push_str(&format!("/(?P<{}>[^/]+?)", group));
            }

            if let Some(ext) = extension {
                if optional.is_some() {
                    expression.push('?');
                }
                expression.push('\\');
                expression.push_str(&rest[ext..]);
            }
        } else {
            expression.push('/');
            expression.push_str(segment);
        }
    }

    expression.push_str("/?$");
    (expression, keys)
}

/// Ordered set of compiled patterns; a path matches if any pattern does
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    patterns: Vec<PathPattern>,
}

impl RouteMatcher {
    /// Compile every pattern up front. The first malformed pattern aborts
    /// construction.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| PathPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            patterns = ?patterns.iter().map(PathPattern::as_str).collect::<Vec<_>>(),
            "Compiled route matcher"
        );

        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    /// Test a bare path such as `/sign-in/reset`
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(path))
    }

    pub fn matches_uri(&self, uri: &Uri) -> bool {
        self.matches(uri.path())
    }

    pub fn matches_request<B>(&self, request: &Request<B>) -> bool {
        self.matches_uri(request.uri())
    }
}
