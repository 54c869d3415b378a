//! How missing buckets are filled, if at all.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Numeric method used to estimate missing candle values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    Linear,
    Spline,
    Polynomial,
}

impl InterpolationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Spline => "spline",
            Self::Polynomial => "polynomial",
        }
    }

    /// Whether the method takes an `order`.
    pub fn needs_order(self) -> bool {
        !matches!(self, Self::Linear)
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterpolationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "spline" => Ok(Self::Spline),
            "polynomial" | "poly" => Ok(Self::Polynomial),
            other => Err(format!("unknown interpolation method '{other}'")),
        }
    }
}

/// Gap-filling settings for one import.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterpolationSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub method: Option<InterpolationMethod>,
    /// Required for spline and polynomial, ignored for linear.
    #[serde(default)]
    pub order: Option<u32>,
}

impl InterpolationSpec {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn linear() -> Self {
        Self {
            enabled: true,
            method: Some(InterpolationMethod::Linear),
            order: None,
        }
    }

    pub fn spline(order: u32) -> Self {
        Self {
            enabled: true,
            method: Some(InterpolationMethod::Spline),
            order: Some(order),
        }
    }

    pub fn polynomial(order: u32) -> Self {
        Self {
            enabled: true,
            method: Some(InterpolationMethod::Polynomial),
            order: Some(order),
        }
    }

    /// Method in effect; an enabled spec without one means linear.
    pub fn effective_method(&self) -> Option<InterpolationMethod> {
        self.enabled
            .then(|| self.method.unwrap_or(InterpolationMethod::Linear))
    }
}
