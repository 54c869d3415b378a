#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod importer;
pub mod interpolate;
pub mod io;
pub mod models;
pub mod providers;
pub mod reconcile;
pub mod requests;
pub mod timeline;

pub use config::ImportConfig;
pub use errors::ImportError;
pub use importer::{ImportSummary, Importer};
