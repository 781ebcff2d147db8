//! Observation query options
//!
//! Top-N reads only: a clamped limit and a sort direction, no cursor.

use beeline_common::config::QueryConfig;
use serde::Deserialize;

use crate::error::ApiError;

/// Sort by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "newest" | "" => Some(SortOrder::Newest),
            "oldest" => Some(SortOrder::Oldest),
            _ => None,
        }
    }
}

/// Raw query string of `GET /api/observations`
///
/// Kept as strings so bad values produce our own 400 body.
#[derive(Debug, Default, Deserialize)]
pub struct ObservationQueryParams {
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub q: Option<String>,
}

/// Validated filter passed to the database layer
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationFilter {
    pub limit: i64,
    pub sort: SortOrder,
    pub q: Option<String>,
}

impl ObservationFilter {
    /// Validate raw parameters against the configured limits
    ///
    /// A limit above `max_limit` is capped, one below 1 is raised to 1.
    pub fn from_params(params: ObservationQueryParams, config: &QueryConfig) -> Result<Self, ApiError> {
        let limit = match params.limit.as_deref().map(str::trim) {
            None | Some("") => config.default_limit,
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("limit must be an integer: {}", raw)))?,
        };
        let limit = clamp_limit(limit, config.max_limit);

        let sort = match params.sort.as_deref() {
            None => SortOrder::default(),
            Some(raw) => SortOrder::parse(raw).ok_or_else(|| {
                ApiError::BadRequest(format!("sort must be 'newest' or 'oldest': {}", raw))
            })?,
        };

        let q = params
            .q
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());

        Ok(Self { limit, sort, q })
    }

    /// LIKE pattern for `q`, wildcards escaped
    ///
    /// Folds ASCII case only, matching SQLite's `LOWER()` on the column side.
    pub fn like_pattern(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(|q| format!("%{}%", escape_like(&q.to_ascii_lowercase())))
    }
}

/// Clamp a requested limit into `[1, max_limit]`
pub fn clamp_limit(requested: i64, max_limit: i64) -> i64 {
    requested.max(1).min(max_limit.max(1))
}

/// Escape `%`, `_` and the escape character itself for `LIKE ... ESCAPE '\'`
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
