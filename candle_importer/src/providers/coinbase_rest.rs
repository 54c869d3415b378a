//! Coinbase Exchange public REST market data.

pub mod params;
pub mod provider;

pub use provider::CoinbaseProvider;
