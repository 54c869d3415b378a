//! Import configuration, read from TOML and validated once before a run.
//!
//! ```toml
//! product_id = "BTC-USD"
//! granularity = "1h"
//! start = "2018-01-01T00:00:00Z"
//! end = "01/31/18 23:00"
//! dedup = "timestamp"
//! output_dir = "exports"
//! format = "csv"
//!
//! [interpolation]
//! enabled = true
//! method = "spline"
//! order = 3
//!
//! [fetch]
//! request_size = 200
//! pacing = 1.0
//! backoff = 1.3
//! max_attempts = 3
//! ```

use std::{fs, path::{Path, PathBuf}};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt, ensure};
use tracing::debug;

use crate::{
    errors::{ConfigParseSnafu, ConfigReadSnafu, ConfigSnafu, ImportError},
    interpolate::validate_order,
    io::OutputFormat,
    models::{granularity::Granularity, interpolation::InterpolationSpec},
    reconcile::DedupMode,
    requests::FetchPolicy,
    timeline::TimeRange,
};

/// Naive layouts accepted for time bounds, all read as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%m/%d/%y %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// A range bound as written by the user: epoch seconds or a datetime string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeBound {
    Epoch(i64),
    Text(String),
}

impl TimeBound {
    pub fn epoch_secs(&self) -> Result<i64, ImportError> {
        match self {
            Self::Epoch(secs) => Ok(*secs),
            Self::Text(text) => parse_datetime(text).map(|dt| dt.timestamp()),
        }
    }
}

impl From<DateTime<Utc>> for TimeBound {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Epoch(dt.timestamp())
    }
}

/// Parses RFC 3339, a bare date, or one of the naive layouts as UTC.
pub fn parse_datetime(text: &str) -> Result<DateTime<Utc>, ImportError> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .context(ConfigSnafu {
            message: format!(
                "cannot read '{text}' as a UTC time (try 2018-01-01T00:00:00Z or 01/01/18 00:00)"
            ),
        })
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Everything one import needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Exchange product, e.g. `BTC-USD`.
    pub product_id: String,
    pub granularity: Granularity,
    pub start: TimeBound,
    /// Defaults to the current time.
    #[serde(default)]
    pub end: Option<TimeBound>,
    #[serde(default)]
    pub interpolation: InterpolationSpec,
    #[serde(default)]
    pub fetch: FetchPolicy,
    #[serde(default)]
    pub dedup: DedupMode,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
}

impl ImportConfig {
    /// A config with every optional knob at its default.
    pub fn new(product_id: impl Into<String>, granularity: Granularity, start: TimeBound) -> Self {
        Self {
            product_id: product_id.into(),
            granularity,
            start,
            end: None,
            interpolation: InterpolationSpec::default(),
            fetch: FetchPolicy::default(),
            dedup: DedupMode::default(),
            output_dir: default_output_dir(),
            format: OutputFormat::default(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).context(ConfigReadSnafu { path })?;
        let config: Self = toml::from_str(&text).context(ConfigParseSnafu { path })?;
        debug!(path = %path.display(), product = %config.product_id, "config loaded");
        Ok(config)
    }

    /// Checks the config and returns the bucket-aligned range, with a
    /// missing `end` read as now.
    pub fn validate(&self) -> Result<TimeRange, ImportError> {
        self.validate_at(Utc::now())
    }

    /// [`validate`](Self::validate) with an explicit notion of now.
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<TimeRange, ImportError> {
        ensure!(
            !self.product_id.trim().is_empty(),
            ConfigSnafu {
                message: "product_id must not be empty",
            }
        );
        if let Some(method) = self.interpolation.effective_method() {
            validate_order(method, self.interpolation.order, None)?;
        }

        let start = self.start.epoch_secs()?;
        let end = match &self.end {
            Some(bound) => bound.epoch_secs()?,
            None => now.timestamp(),
        };
        TimeRange::aligned(start, end, self.granularity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interpolation::InterpolationMethod;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_accepted_datetime_layouts() {
        let expected = 1_514_847_600; // 2018-01-01 23:00 UTC
        for text in [
            "2018-01-01T23:00:00Z",
            "2018-01-02T00:00:00+01:00",
            "01/01/18 23:00",
            "2018-01-01 23:00",
            "2018-01-01 23:00:00",
            "2018-01-01T23:00:00",
        ] {
            assert_eq!(parse_datetime(text).unwrap().timestamp(), expected, "{text}");
        }
        assert_eq!(parse_datetime("2018-01-02").unwrap().timestamp(), 1_514_851_200);
        assert!(matches!(
            parse_datetime("yesterday"),
            Err(ImportError::Config { .. })
        ));
    }

    #[test]
    fn loads_a_full_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
product_id = "ETH-USD"
granularity = "15m"
start = "01/01/18 00:07"
end = 1514851200
dedup = "exact"
format = "feather"

[interpolation]
enabled = true
method = "polynomial"
order = 2

[fetch]
request_size = 100
pacing = 0
"#
        )
        .unwrap();

        let config = ImportConfig::load(file.path()).unwrap();
        assert_eq!(config.product_id, "ETH-USD");
        assert_eq!(config.granularity, Granularity::FIFTEEN_MINUTES);
        assert_eq!(config.dedup, DedupMode::Exact);
        assert_eq!(config.format, OutputFormat::Feather);
        assert_eq!(
            config.interpolation.effective_method(),
            Some(InterpolationMethod::Polynomial)
        );
        assert_eq!(config.fetch.request_size.get(), 100);
        assert_eq!(config.fetch.max_attempts.get(), 3);
        assert_eq!(config.output_dir, PathBuf::from("."));

        let range = config.validate().unwrap();
        assert_eq!(range.start, 1_514_764_800);
        assert_eq!(range.end, 1_514_851_200 + 900);
    }

    #[test]
    fn missing_end_means_now() {
        let config = ImportConfig::new("BTC-USD", Granularity::ONE_HOUR, TimeBound::Epoch(0));
        let now = DateTime::from_timestamp(7_200 + 59, 0).unwrap();
        let range = config.validate_at(now).unwrap();
        assert_eq!((range.start, range.end), (0, 10_800));
    }

    #[test]
    fn rejects_bad_configs() {
        let mut config =
            ImportConfig::new("BTC-USD", Granularity::ONE_MINUTE, TimeBound::Epoch(600));
        config.end = Some(TimeBound::Epoch(600));
        assert!(matches!(config.validate(), Err(ImportError::InvalidRange { .. })));

        config.end = Some(TimeBound::Epoch(1_200));
        config.interpolation = InterpolationSpec::spline(0);
        assert!(matches!(config.validate(), Err(ImportError::InvalidOrder { .. })));

        config.interpolation = InterpolationSpec::linear();
        config.product_id = "  ".into();
        assert!(matches!(config.validate(), Err(ImportError::Config { .. })));
    }

    #[test]
    fn unreadable_and_invalid_files_are_reported() {
        assert!(matches!(
            ImportConfig::load("/definitely/not/here.toml"),
            Err(ImportError::ConfigRead { .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "product_id = 5").unwrap();
        assert!(matches!(
            ImportConfig::load(file.path()),
            Err(ImportError::ConfigParse { .. })
        ));
    }
}
