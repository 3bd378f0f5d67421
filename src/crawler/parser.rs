//! Search response parser
//!
//! This module turns one JSON page from the dictionary search API into the
//! total hit count plus a list of raw results. It handles:
//! - `sense` given as a single object or as an array
//! - counts sent as numbers or as numeric strings
//! - error objects embedded in an otherwise successful response
//! - responses that omit the total hit count

use crate::hangul::RawResult;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// One parsed page of search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// Total hits for the query across all pages, when the API reports it
    ///
    /// Without it the end of a key is only signalled by a short page.
    pub total: Option<u64>,

    /// Results on this page, in response order
    pub results: Vec<RawResult>,
}

/// Why a response body could not be used
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResponseError {
    /// The body is not the expected JSON shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The API reported an error in the body
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    channel: Option<Channel>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    total: Option<Scalar>,
    #[serde(default)]
    item: OneOrMany<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    word: String,
    #[serde(default)]
    sense: OneOrMany<Sense>,
}

#[derive(Debug, Deserialize)]
struct Sense {
    #[serde(default)]
    definition: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_code: Option<Scalar>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(u64),
    Text(String),
}

impl Scalar {
    fn as_count(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Parses a search API response body
///
/// # Example
///
/// ```
/// use hangul_harvest::crawler::parse_search_response;
///
/// let body = r#"{"channel": {"total": 1, "item": [
///     {"word": "가정", "sense": {"definition": "한 가족이 사는 집."}}
/// ]}}"#;
/// let page = parse_search_response(body).unwrap();
/// assert_eq!(page.total, Some(1));
/// assert_eq!(page.results[0].definitions, vec!["한 가족이 사는 집.".to_string()]);
/// ```
pub fn parse_search_response(body: &str) -> Result<ParsedPage, ResponseError> {
    let envelope: SearchEnvelope =
        serde_json::from_str(body).map_err(|e| ResponseError::Malformed(e.to_string()))?;

    if let Some(error) = envelope.error {
        return Err(ResponseError::Api {
            code: error
                .error_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            message: error.message.unwrap_or_default(),
        });
    }

    let channel = envelope
        .channel
        .ok_or_else(|| ResponseError::Malformed("missing channel".to_string()))?;

    let total = channel
        .total
        .map(|total| {
            total
                .as_count()
                .ok_or_else(|| ResponseError::Malformed(format!("invalid total '{}'", total)))
        })
        .transpose()?;

    let results = channel
        .item
        .into_vec()
        .into_iter()
        .map(|item| {
            let definitions = item
                .sense
                .into_vec()
                .into_iter()
                .filter_map(|s| s.definition)
                .collect();
            RawResult::new(item.word, definitions)
        })
        .collect();

    Ok(ParsedPage { total, results })
}
