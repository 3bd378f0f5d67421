//! Paged search fetcher
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - Walking the result pages of one search key
//! - Quota accounting and pacing for every physical request
//! - Retry logic for transient failures
//! - Error classification

use crate::clock::Clock;
use crate::config::ApiConfig;
use crate::crawler::parser::{parse_search_response, ParsedPage, ResponseError};
use crate::crawler::quota::QuotaGate;
use crate::hangul::{RawResult, SearchKey};
use crate::retry::RetryPolicy;
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that end the fetch of a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeout, refused connection, reset, or a broken body
    #[error("network error for '{key}' page {page}: {source}")]
    Network {
        key: char,
        page: u32,
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("HTTP {status} for '{key}' page {page}")]
    Status { key: char, page: u32, status: u16 },

    /// The body could not be parsed
    #[error("malformed response for '{key}' page {page}: {message}")]
    MalformedResponse {
        key: char,
        page: u32,
        message: String,
    },

    /// The API answered with an error object
    #[error("API error {code} for '{key}' page {page}: {message}")]
    Api {
        key: char,
        page: u32,
        code: String,
        message: String,
    },

    /// A transient failure outlived the retry budget
    #[error("giving up on '{key}' page {page} after {attempts} attempts: {last}")]
    RetriesExhausted {
        key: char,
        page: u32,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Returns true for failures worth retrying
    ///
    /// Server errors and 429 are retried; every other status, a malformed
    /// body, and an API error object are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { source, .. } => {
                source.is_timeout()
                    || source.is_connect()
                    || source.is_request()
                    || source.is_body()
            }
            Self::Status { status, .. } => {
                *status >= 500 || *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }
            Self::MalformedResponse { .. } | Self::Api { .. } | Self::RetriesExhausted { .. } => {
                false
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use hangul_harvest::config::ApiConfig;
/// use hangul_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&ApiConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent())
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// One fetched page of a key
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub key: SearchKey,

    /// Page number (1-based)
    pub number: u32,

    /// Results not already seen on an earlier page of this key
    pub results: Vec<RawResult>,

    /// Results dropped because an earlier page had the same word
    pub repeated: usize,

    /// Total hits reported by the API, if it sent one
    pub total_count: Option<u64>,

    /// No further page of this key should be requested
    pub is_last: bool,
}

/// Page cursor over one search key
///
/// Owns no connection; pass it to `PagedFetcher::next_page`.
#[derive(Debug, Clone)]
pub struct KeyCursor {
    key: SearchKey,
    next_page: u32,
    total_pages: Option<u32>,
    finished: bool,
    seen: HashSet<String>,
}

impl KeyCursor {
    pub fn key(&self) -> &SearchKey {
        &self.key
    }

    /// Page the next call will request
    pub fn next_page_number(&self) -> u32 {
        self.next_page
    }

    /// Known once a page carrying a total has been fetched
    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Number of pages needed for `total` hits
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    u32::try_from(total.div_ceil(page_size)).unwrap_or(u32::MAX)
}

/// Fetches search results page by page
pub struct PagedFetcher<C: Clock> {
    client: Client,
    endpoint: Url,
    api_key: String,
    page_size: u32,
    retry: RetryPolicy,
    gate: QuotaGate<C>,
    clock: C,
}

impl<C: Clock + Clone> PagedFetcher<C> {
    pub fn new(
        client: Client,
        endpoint: Url,
        api_key: String,
        page_size: u32,
        retry: RetryPolicy,
        gate: QuotaGate<C>,
        clock: C,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            page_size,
            retry,
            gate,
            clock,
        }
    }

    /// Builds a fetcher from the API and quota configuration
    pub fn from_config(
        config: &ApiConfig,
        api_key: String,
        daily_limit: u32,
        clock: C,
    ) -> crate::Result<Self> {
        let client = build_http_client(config)?;
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| crate::ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;
        let gate = QuotaGate::new(clock.clone(), daily_limit, config.request_delay());

        Ok(Self::new(
            client,
            endpoint,
            api_key,
            config.page_size,
            config.retry_policy(),
            gate,
            clock,
        ))
    }

    pub fn gate(&self) -> &QuotaGate<C> {
        &self.gate
    }

    /// Starts a page cursor for `key`
    pub fn pages(&self, key: SearchKey, start_page: u32) -> KeyCursor {
        KeyCursor {
            key,
            next_page: start_page.max(1),
            total_pages: None,
            finished: false,
            seen: HashSet::new(),
        }
    }

    /// Fetches the next page of a cursor
    ///
    /// Returns `None` once the key is finished. A key with no hits yields a
    /// single empty page marked last, so the caller can advance past it.
    ///
    /// A short page always ends the key. When the response carries a total,
    /// reaching its last page does too; without one, only a short or empty
    /// page does.
    pub async fn next_page(
        &self,
        cursor: &mut KeyCursor,
    ) -> Result<Option<FetchedPage>, FetchError> {
        if cursor.finished {
            return Ok(None);
        }

        let number = cursor.next_page;
        let parsed = self.request_page(&cursor.key, number).await?;

        let received = parsed.results.len();
        let short = received < self.page_size as usize;

        let is_last = match parsed.total {
            Some(total) => {
                let pages = total_pages(total, self.page_size);
                cursor.total_pages = Some(pages);

                if short && number < pages {
                    tracing::debug!(
                        key = %cursor.key.syllable,
                        page = number,
                        received,
                        total,
                        "Short page before the reported last page, ending key"
                    );
                }
                total == 0 || short || number >= pages
            }
            None => short,
        };

        let mut results = Vec::with_capacity(received);
        let mut repeated = 0;
        for result in parsed.results {
            if cursor.seen.insert(result.word.clone()) {
                results.push(result);
            } else {
                repeated += 1;
            }
        }

        cursor.next_page = number + 1;
        cursor.finished = is_last;

        Ok(Some(FetchedPage {
            key: cursor.key,
            number,
            results,
            repeated,
            total_count: parsed.total,
            is_last,
        }))
    }

    /// Fetches every result for `key`, starting at page 1
    pub async fn fetch_all(&self, key: SearchKey) -> Result<Vec<RawResult>, FetchError> {
        let mut cursor = self.pages(key, 1);
        let mut results = Vec::new();
        while let Some(page) = self.next_page(&mut cursor).await? {
            results.extend(page.results);
        }
        Ok(results)
    }

    /// Requests one page, retrying transient failures
    async fn request_page(&self, key: &SearchKey, page: u32) -> Result<ParsedPage, FetchError> {
        let what = format!("search '{}' page {}", key.syllable, page);

        self.retry
            .run(
                &self.clock,
                &what,
                move |_| self.attempt(key, page),
                FetchError::is_transient,
            )
            .await
            .map_err(|failure| {
                if failure.attempts > 1 && failure.error.is_transient() {
                    FetchError::RetriesExhausted {
                        key: key.syllable,
                        page,
                        attempts: failure.attempts,
                        last: Box::new(failure.error),
                    }
                } else {
                    failure.error
                }
            })
    }

    /// One physical request: take a permit, send, pace
    async fn attempt(&self, key: &SearchKey, page: u32) -> Result<ParsedPage, FetchError> {
        let permit = self.gate.acquire().await;
        tracing::debug!(
            key = %key.syllable,
            page,
            request = permit.number,
            "Requesting search page"
        );

        let result = self.send(key, page).await;
        self.gate.pace().await;
        result
    }

    async fn send(&self, key: &SearchKey, page: u32) -> Result<ParsedPage, FetchError> {
        let syllable = key.syllable;
        let query = [
            ("key", self.api_key.clone()),
            ("q", key.query()),
            ("req_type", "json".to_string()),
            ("start", page.to_string()),
            ("num", self.page_size.to_string()),
            ("part", "word".to_string()),
            ("method", "start".to_string()),
            ("advanced", "y".to_string()),
            ("target", "1".to_string()),
            ("type1", "word".to_string()),
            ("type2", "native".to_string()),
            ("pos", "1".to_string()),
        ];

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&query)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                key: syllable,
                page,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                key: syllable,
                page,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Network {
            key: syllable,
            page,
            source,
        })?;

        parse_search_response(&body).map_err(|e| match e {
            ResponseError::Malformed(message) => FetchError::MalformedResponse {
                key: syllable,
                page,
                message,
            },
            ResponseError::Api { code, message } => FetchError::Api {
                key: syllable,
                page,
                code,
                message,
            },
        })
    }
}
