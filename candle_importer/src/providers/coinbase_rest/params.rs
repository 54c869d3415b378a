use std::num::NonZeroU32;

use snafu::ensure;

use crate::{
    models::{granularity::Granularity, request_params::CandleQuery},
    providers::{ProviderError, ValidationSnafu},
};

/// Granularities the candles endpoint accepts.
pub const SUPPORTED_GRANULARITIES: [Granularity; 6] = Granularity::PRESETS;

/// Most candles returned by a single request.
pub const MAX_CANDLES_PER_REQUEST: u32 = 300;

/// Validates the granularity against the endpoint's fixed set.
pub fn validate_granularity(granularity: &Granularity) -> Result<(), ProviderError> {
    ensure!(
        SUPPORTED_GRANULARITIES.contains(granularity),
        ValidationSnafu {
            message: format!(
                "granularity {granularity} is not one of 60, 300, 900, 3600, 21600, 86400 seconds"
            ),
        }
    );
    Ok(())
}

/// Rejects windows wider than one response can hold.
pub fn validate_request_size(request_size: NonZeroU32) -> Result<(), ProviderError> {
    ensure!(
        request_size.get() <= MAX_CANDLES_PER_REQUEST,
        ValidationSnafu {
            message: format!(
                "request size {request_size} exceeds the {MAX_CANDLES_PER_REQUEST} candles one request returns"
            ),
        }
    );
    Ok(())
}

/// Builds the query string for `GET /products/{id}/candles`.
pub fn construct_params(query: &CandleQuery) -> Vec<(String, String)> {
    vec![
        ("start".to_string(), query.start_iso()),
        ("end".to_string(), query.end_iso()),
        ("granularity".to_string(), query.granularity.secs().to_string()),
    ]
}
