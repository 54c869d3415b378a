use std::{fmt, num::NonZeroU32, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GranularityError {
    #[error("Bucket size must be a positive number of seconds, got {0}")]
    NotPositive(i64),

    #[error("Invalid granularity: {message}")]
    InvalidInput { message: String },
}

/// Width of one candle bucket, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Granularity(NonZeroU32);

impl Granularity {
    pub const ONE_MINUTE: Self = Self::from_const(60);
    pub const FIVE_MINUTES: Self = Self::from_const(300);
    pub const FIFTEEN_MINUTES: Self = Self::from_const(900);
    pub const ONE_HOUR: Self = Self::from_const(3_600);
    pub const SIX_HOURS: Self = Self::from_const(21_600);
    pub const ONE_DAY: Self = Self::from_const(86_400);

    /// Presets offered by the importer, smallest first.
    pub const PRESETS: [Self; 6] = [
        Self::ONE_MINUTE,
        Self::FIVE_MINUTES,
        Self::FIFTEEN_MINUTES,
        Self::ONE_HOUR,
        Self::SIX_HOURS,
        Self::ONE_DAY,
    ];

    const fn from_const(secs: u32) -> Self {
        match NonZeroU32::new(secs) {
            Some(nz) => Self(nz),
            None => panic!("granularity must be non-zero"),
        }
    }

    pub fn from_secs(secs: i64) -> Result<Self, GranularityError> {
        u32::try_from(secs)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(GranularityError::NotPositive(secs))
    }

    pub fn secs(self) -> i64 {
        i64::from(self.0.get())
    }

    /// Human label used in export names, e.g. `"1 Hour"` or `"90 Second"`.
    pub fn label(self) -> String {
        let secs = self.0.get();
        match secs {
            s if s % 86_400 == 0 => format!("{} Day", s / 86_400),
            s if s % 3_600 == 0 => format!("{} Hour", s / 3_600),
            s if s % 60 == 0 => format!("{} Minute", s / 60),
            s => format!("{s} Second"),
        }
    }

    /// Floors an epoch timestamp to the start of its bucket.
    pub fn floor(self, epoch_secs: i64) -> i64 {
        epoch_secs - epoch_secs.rem_euclid(self.secs())
    }

    /// The boundary strictly after the bucket containing `epoch_secs`.
    pub fn next_boundary(self, epoch_secs: i64) -> i64 {
        self.floor(epoch_secs) + self.secs()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl FromStr for Granularity {
    type Err = GranularityError;

    /// Accepts raw seconds (`"3600"`) or an amount with a unit suffix
    /// (`"15m"`, `"6h"`, `"1d"`, `"30s"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(secs) = s.parse::<i64>() {
            return Self::from_secs(secs);
        }

        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| GranularityError::InvalidInput {
                message: format!("'{s}'"),
            })?;
        let (amount, unit) = s.split_at(split);
        let amount: i64 = amount.parse().map_err(|_| GranularityError::InvalidInput {
            message: format!("missing amount in '{s}'"),
        })?;
        let unit_secs = match unit.trim().to_lowercase().as_str() {
            "s" | "sec" | "second" => 1,
            "m" | "min" | "minute" => 60,
            "h" | "hr" | "hour" => 3_600,
            "d" | "day" => 86_400,
            other => {
                return Err(GranularityError::InvalidInput {
                    message: format!("unknown unit '{other}'"),
                });
            }
        };
        let secs = amount
            .checked_mul(unit_secs)
            .ok_or_else(|| GranularityError::InvalidInput {
                message: format!("'{s}' is too large"),
            })?;
        Self::from_secs(secs)
    }
}

impl Serialize for Granularity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0.get())
    }
}

impl<'de> Deserialize<'de> for Granularity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Secs(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Granularity::from_secs(secs).map_err(de::Error::custom),
            Raw::Text(text) => text.parse().map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_amounts_are_errors() {
        assert!(matches!(
            "200000000000000d".parse::<Granularity>(),
            Err(GranularityError::InvalidInput { .. })
        ));
        assert_eq!(
            "5000000000s".parse::<Granularity>(),
            Err(GranularityError::NotPositive(5_000_000_000))
        );
    }

    #[test]
    fn parses_presets_and_raw_seconds() {
        assert_eq!("1m".parse::<Granularity>().unwrap(), Granularity::ONE_MINUTE);
        assert_eq!("15min".parse::<Granularity>().unwrap(), Granularity::FIFTEEN_MINUTES);
        assert_eq!("6h".parse::<Granularity>().unwrap(), Granularity::SIX_HOURS);
        assert_eq!("1d".parse::<Granularity>().unwrap(), Granularity::ONE_DAY);
        assert_eq!("3600".parse::<Granularity>().unwrap(), Granularity::ONE_HOUR);
    }

    #[test]
    fn rejects_zero_negative_and_garbage() {
        assert_eq!(Granularity::from_secs(0), Err(GranularityError::NotPositive(0)));
        assert_eq!(Granularity::from_secs(-60), Err(GranularityError::NotPositive(-60)));
        assert!("0m".parse::<Granularity>().is_err());
        assert!("5 fortnights".parse::<Granularity>().is_err());
        assert!("h".parse::<Granularity>().is_err());
    }

    #[test]
    fn labels() {
        assert_eq!(Granularity::ONE_DAY.label(), "1 Day");
        assert_eq!(Granularity::SIX_HOURS.label(), "6 Hour");
        assert_eq!(Granularity::FIFTEEN_MINUTES.label(), "15 Minute");
        assert_eq!(Granularity::from_secs(90).unwrap().label(), "90 Second");
    }

    #[test]
    fn alignment() {
        let g = Granularity::ONE_HOUR;
        assert_eq!(g.floor(7_199), 3_600);
        assert_eq!(g.floor(7_200), 7_200);
        assert_eq!(g.next_boundary(7_200), 10_800);
        assert_eq!(g.next_boundary(7_201), 10_800);
        assert_eq!(g.floor(-1), -3_600);
    }

    #[test]
    fn deserializes_from_number_or_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            g: Granularity,
        }
        let w: Wrapper = toml::from_str("g = 300").unwrap();
        assert_eq!(w.g, Granularity::FIVE_MINUTES);
        let w: Wrapper = toml::from_str("g = \"1h\"").unwrap();
        assert_eq!(w.g, Granularity::ONE_HOUR);
        assert!(toml::from_str::<Wrapper>("g = 0").is_err());
    }
}
