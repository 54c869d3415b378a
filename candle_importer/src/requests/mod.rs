//! Windowed retrieval of historical candles.

pub mod fetcher;
pub mod windows;

pub use fetcher::{FetchOutput, FetchPolicy, FetchReport, ProgressObserver, WindowedFetcher};
pub use windows::plan_windows;
