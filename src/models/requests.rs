//! Request parameter models
//!
//! Inbound query strings are normalized once here: percent-decoded, `+`
//! treated as a space, trimmed, with the first occurrence of a name winning.
//! Cache keys and upstream calls both read from the normalized form, so two
//! requests naming the same resource see the same values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Decodes one URL component, tolerating malformed escapes.
pub fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.trim().to_string(),
        Err(_) => spaced.trim().to_string(),
    }
}

/// Normalizes a path segment the router has already percent-decoded.
///
/// Only trims: `+` is literal in a path, and decoding again would turn an
/// escaped `%` into a different resource.
pub fn normalize_path_segment(segment: &str) -> String {
    segment.trim().to_string()
}

// == Request Params ==
/// Normalized query parameters of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    values: BTreeMap<String, String>,
}

impl RequestParams {
    /// Parses a raw query string (without the leading `?`).
    pub fn from_query(raw: Option<&str>) -> Self {
        let mut values = BTreeMap::new();

        for pair in raw.unwrap_or_default().split('&') {
            if pair.is_empty() {
                continue;
            }
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = decode_component(name);
            if name.is_empty() {
                continue;
            }
            values.entry(name).or_insert_with(|| decode_component(value));
        }

        Self { values }
    }

    /// Returns the value of `name` when present and non-empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Returns a required parameter or an `InvalidRequest` error.
    pub fn require(&self, name: &str) -> Result<&str, GatewayError> {
        self.get(name).ok_or_else(|| {
            GatewayError::InvalidRequest(format!("`{}` query param is required", name))
        })
    }

    /// Pagination parameter; defaults to 1 when absent, non-numeric or zero.
    pub fn page(&self) -> u32 {
        self.get("page")
            .and_then(|p| p.parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

// == Ranking Kind ==
/// Ranking window accepted by the rankings route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingKind {
    #[default]
    Total,
    Month,
    Week,
    Day,
}

impl RankingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingKind::Total => "total",
            RankingKind::Month => "month",
            RankingKind::Week => "week",
            RankingKind::Day => "day",
        }
    }

    /// Reads `type` from the request, defaulting to `total`.
    pub fn from_params(params: &RequestParams) -> Result<Self, GatewayError> {
        params.get("type").map_or(Ok(Self::default()), str::parse)
    }
}

impl FromStr for RankingKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "total" => Ok(RankingKind::Total),
            "month" => Ok(RankingKind::Month),
            "week" => Ok(RankingKind::Week),
            "day" => Ok(RankingKind::Day),
            _ => Err(GatewayError::InvalidRequest(
                "`type` must be one of: total, month, week, day".to_string(),
            )),
        }
    }
}

impl fmt::Display for RankingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
