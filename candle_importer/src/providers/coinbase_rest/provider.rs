use std::num::NonZeroU32;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Deserialize;
use serde_json::Value;
use shared_utils::env::env_override;
use snafu::{ResultExt, ensure};
use tracing::debug;

use crate::{
    models::{granularity::Granularity, request_params::CandleQuery},
    providers::{
        ApiSnafu, CandleSource, ClientBuildSnafu, EnvVarSnafu, InternalSnafu, InvalidBaseUrlSnafu, ProductCatalog,
        ProviderError, ProviderInitError, ReqwestSnafu,
        coinbase_rest::params::{construct_params, validate_granularity, validate_request_size},
    },
};

pub const DEFAULT_BASE_URL: &str = "https://api.exchange.coinbase.com";

/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "CANDLE_IMPORTER_BASE_URL";

#[derive(Deserialize, Debug)]
struct ProductEntry {
    id: String,
}

/// Public (unauthenticated) Coinbase Exchange market data.
pub struct CoinbaseProvider {
    client: Client,
    base_url: String,
}

impl CoinbaseProvider {
    /// Creates a provider against [`DEFAULT_BASE_URL`], or the URL in
    /// `CANDLE_IMPORTER_BASE_URL` when set.
    pub fn new() -> Result<Self, ProviderInitError> {
        let base_url = env_override(BASE_URL_ENV)
            .context(EnvVarSnafu)?
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(&base_url)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ProviderInitError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            InvalidBaseUrlSnafu {
                url: base_url.clone(),
                message: "expected an http(s) URL",
            }
        );

        // The exchange rejects requests without a user agent.
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(concat!("candle_importer/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value, ProviderError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let error_msg = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu {
                message: format!("{status}: {error_msg}"),
            }
            .fail();
        }

        response.json::<Value>().await.context(ReqwestSnafu)
    }
}

#[async_trait]
impl CandleSource for CoinbaseProvider {
    async fn retrieve(&self, query: &CandleQuery) -> Result<Value, ProviderError> {
        validate_granularity(&query.granularity)?;

        let url = format!("{}/products/{}/candles", self.base_url, query.product_id);
        debug!(%url, start = %query.start_iso(), end = %query.end_iso(), "requesting candles");
        self.get_json(&url, &construct_params(query)).await
    }

    fn check_request(
        &self,
        granularity: Granularity,
        request_size: NonZeroU32,
    ) -> Result<(), ProviderError> {
        validate_granularity(&granularity)?;
        validate_request_size(request_size)
    }
}

#[async_trait]
impl ProductCatalog for CoinbaseProvider {
    async fn list_products(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/products", self.base_url);
        let payload = self.get_json(&url, &[]).await?;
        let entries: Vec<ProductEntry> =
            serde_json::from_value(payload).map_err(|e| {
                InternalSnafu {
                    message: format!("unexpected products payload: {e}"),
                }
                .build()
            })?;

        let mut ids: Vec<String> = entries.into_iter().map(|p| p.id).collect();
        ids.sort();
        Ok(ids)
    }
}
