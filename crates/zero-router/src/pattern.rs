//! Route pattern parsing and parameter extraction.

use crate::error::RouteError;
use crate::params::Params;

/// A single parsed pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches the identical path segment (case-sensitive).
    Static(String),
    /// `:name` - matches exactly one path segment.
    Param(String),
    /// `*name` - matches all remaining segments, including none.
    /// A bare `*` matches without binding.
    Wildcard(Option<String>),
}

impl Segment {
    fn parse(pattern: &str, raw: &str) -> Result<Self, RouteError> {
        if let Some(name) = raw.strip_prefix(':') {
            if name.is_empty() {
                return Err(RouteError::invalid(pattern, "parameter segment has no name"));
            }
            Ok(Segment::Param(name.to_string()))
        } else if let Some(name) = raw.strip_prefix('*') {
            Ok(Segment::Wildcard(
                (!name.is_empty()).then(|| name.to_string()),
            ))
        } else {
            Ok(Segment::Static(raw.to_string()))
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Segment::Wildcard(_))
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Static(s) => f.write_str(s),
            Segment::Param(name) => write!(f, ":{name}"),
            Segment::Wildcard(name) => write!(f, "*{}", name.as_deref().unwrap_or_default()),
        }
    }
}

/// A registered route pattern such as `/users/:id` or `/assets/*filepath`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    /// Segments re-joined with single slashes: `//api/` becomes `/api`.
    canonical: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a pattern.
    ///
    /// Empty segments are skipped, so `/a//b/` is the same route as `/a/b`.
    /// A wildcard must be the final segment.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let mut segments = Vec::new();
        for part in split_path(raw) {
            if segments.last().is_some_and(Segment::is_wildcard) {
                return Err(RouteError::invalid(
                    raw,
                    "wildcard must be the last segment",
                ));
            }
            segments.push(Segment::parse(raw, part)?);
        }

        let canonical = format!(
            "/{}",
            segments
                .iter()
                .map(Segment::to_string)
                .collect::<Vec<_>>()
                .join("/")
        );
        Ok(Self {
            raw: raw.to_string(),
            canonical,
            segments,
        })
    }

    /// The pattern exactly as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The normalized form; patterns with equal canonical forms are the
    /// same route.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names bound by this pattern, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Wildcard(name) => name.as_deref(),
            Segment::Static(_) => None,
        })
    }

    /// Bind this pattern's parameters against the segments of a path it
    /// matched. Values are the raw, undecoded segments.
    pub fn extract(&self, path_segments: &[&str]) -> Params {
        let mut params = Params::new();
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(_) => {}
                Segment::Param(name) => {
                    if let Some(value) = path_segments.get(index) {
                        params.insert(name.as_str(), *value);
                    }
                }
                Segment::Wildcard(name) => {
                    if let Some(name) = name {
                        let rest = path_segments.get(index..).unwrap_or_default();
                        params.insert(name.as_str(), rest.join("/"));
                    }
                    break;
                }
            }
        }
        params
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a path into its non-empty `/`-separated segments.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
