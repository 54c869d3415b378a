use std::env::{self, VarError};

use thiserror::Error;

/// An environment variable is set but cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Environment variable {name} is not valid unicode")]
pub struct InvalidEnvVarError {
    pub name: String,
}

/// Reads an optional override from the environment.
///
/// Unset and blank values both yield `Ok(None)`, so an exported-but-empty
/// variable does not clobber a built-in default.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn env_override(name: &str) -> Result<Option<String>, InvalidEnvVarError> {
    match env::var(name) {
        Ok(value) => {
            let value = value.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(InvalidEnvVarError {
            name: name.to_string(),
        }),
    }
}
