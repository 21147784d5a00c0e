//! URI grammar.
//!
//! ```text
//! uri  = verb ":" rest | provider ":" type ":" id
//! verb = "search" | "bestmatch"
//! ```
//!
//! Parsing canonicalizes: type synonyms collapse to their class
//! (`tidal:artist:1` becomes `tidal:creator:1`) and search queries are
//! normalized, so every spelling of the same entity maps to one cache entry.

use crate::model::ObjectKind;

/// A parsed, canonical URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaUri {
    /// Fan a query out to every active provider
    Search { query: String },
    /// Collapse a search into its single most relevant result
    BestMatch { query: String },
    /// One entity from one provider
    Entity {
        provider: String,
        kind: ObjectKind,
        id: String,
    },
}

/// Why a URI could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    #[error("empty uri")]
    Empty,

    #[error("{0}: need query")]
    MissingQuery(&'static str),

    #[error("malformed uri {0}: expected provider:type:id")]
    Malformed(String),

    #[error("unknown object type {kind} in {uri}")]
    UnknownType { uri: String, kind: String },
}

/// Normalize a search query: `+` and `%20` become spaces, then lower-case.
pub fn normalize_query(raw: &str) -> String {
    raw.replace('+', " ").replace("%20", " ").to_lowercase()
}

impl MediaUri {
    pub fn parse(raw: &str) -> Result<Self, UriError> {
        if raw.is_empty() {
            return Err(UriError::Empty);
        }
        let Some((head, rest)) = raw.split_once(':') else {
            return Err(UriError::Malformed(raw.to_string()));
        };

        match head {
            "search" => {
                let query = normalize_query(rest);
                if query.trim().is_empty() {
                    return Err(UriError::MissingQuery("search"));
                }
                Ok(MediaUri::Search { query })
            }
            "bestmatch" => {
                let query = normalize_query(rest);
                if query.trim().is_empty() {
                    return Err(UriError::MissingQuery("bestmatch"));
                }
                Ok(MediaUri::BestMatch { query })
            }
            provider => {
                let Some((kind, id)) = rest.split_once(':') else {
                    return Err(UriError::Malformed(raw.to_string()));
                };
                if provider.is_empty() || id.is_empty() {
                    return Err(UriError::Malformed(raw.to_string()));
                }
                let kind = ObjectKind::from_type_segment(kind).ok_or_else(|| UriError::UnknownType {
                    uri: raw.to_string(),
                    kind: kind.to_string(),
                })?;
                Ok(MediaUri::Entity {
                    provider: provider.to_string(),
                    kind,
                    id: id.to_string(),
                })
            }
        }
    }

    /// The cache key for this URI.
    pub fn canonical(&self) -> String {
        match self {
            MediaUri::Search { query } => format!("search:{query}"),
            MediaUri::BestMatch { query } => format!("bestmatch:{query}"),
            MediaUri::Entity { provider, kind, id } => format!("{provider}:{kind}:{id}"),
        }
    }

    /// Whether resolved objects for this URI may be served from the cache.
    ///
    /// `bestmatch` is a pointer to another object, so it is never cached itself.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, MediaUri::BestMatch { .. })
    }
}

impl std::fmt::Display for MediaUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl std::str::FromStr for MediaUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaUri::parse(s)
    }
}
