//! Provider abstraction for remote candle sources.
//!
//! This module defines the [`CandleSource`] trait, the single capability the
//! windowed fetcher needs from a market data vendor: answer one bounded
//! historical query. Anything exposing it can be injected, including an
//! in-memory fake in tests.
//!
//! The trait is async and object safe, so callers hold a
//! `&dyn CandleSource` chosen at runtime.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use candle_importer::models::request_params::CandleQuery;
//! use candle_importer::providers::{CandleSource, ProviderError};
//!
//! struct EmptySource;
//!
//! #[async_trait]
//! impl CandleSource for EmptySource {
//!     async fn retrieve(&self, _query: &CandleQuery) -> Result<serde_json::Value, ProviderError> {
//!         Ok(serde_json::Value::Array(vec![]))
//!     }
//! }
//! ```

pub mod coinbase_rest;

use std::num::NonZeroU32;

use async_trait::async_trait;
use serde_json::Value;
use shared_utils::env::InvalidEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::{granularity::Granularity, request_params::CandleQuery};

/// A remote source of historical candles.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Runs one query and hands back the vendor's raw payload.
    ///
    /// A well-formed payload is an array of
    /// `[time, low, high, open, close, volume]` rows. The caller decides
    /// what to do with anything else; implementations should not try to
    /// repair a response.
    async fn retrieve(&self, query: &CandleQuery) -> Result<Value, ProviderError>;

    /// Rejects settings no query could ever satisfy, before the first one
    /// is sent. Accepts everything by default.
    fn check_request(
        &self,
        _granularity: Granularity,
        _request_size: NonZeroU32,
    ) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Lists the products a vendor can be queried for.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn list_products(&self) -> Result<Vec<String>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// An override variable is set to something unreadable.
    #[snafu(display("{source}"))]
    EnvVar {
        source: InvalidEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The configured endpoint is not a usable base URL.
    #[snafu(display("Invalid base URL '{url}': {message}"))]
    InvalidBaseUrl {
        url: String,
        message: String,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a [`CandleSource`] implementation.
///
/// The fetcher treats every variant the same way: the attempt failed and
/// may be retried.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API returned an error status or message.
    #[snafu(display("API error: {message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// An internal error occurred while processing data within the provider.
    #[snafu(display("Internal provider error: {message}"))]
    Internal {
        message: String,
        backtrace: Backtrace,
    },
}
