use std::{path::Path, time::Duration};

use snafu::OptionExt;

use crate::{
    config::{ImportConfig, TimeBound},
    errors::{ConfigSnafu, ImportError},
    models::interpolation::InterpolationSpec,
};

use super::commands::ImportArgs;

/// Loads the optional config file and applies command line overrides.
///
/// Without a file, `--product`, `--granularity` and `--start` are required.
pub fn build_config(path: Option<&Path>, args: &ImportArgs) -> Result<ImportConfig, ImportError> {
    let mut config = match path {
        Some(path) => ImportConfig::load(path)?,
        None => {
            let product = args.product.clone().context(ConfigSnafu {
                message: "--product is required without a config file",
            })?;
            let granularity = args.granularity.context(ConfigSnafu {
                message: "--granularity is required without a config file",
            })?;
            let start = args.start.clone().context(ConfigSnafu {
                message: "--start is required without a config file",
            })?;
            ImportConfig::new(product, granularity, TimeBound::Text(start))
        }
    };
    apply_overrides(&mut config, args)?;
    Ok(config)
}

pub fn apply_overrides(config: &mut ImportConfig, args: &ImportArgs) -> Result<(), ImportError> {
    if let Some(product) = &args.product {
        config.product_id = product.clone();
    }
    if let Some(granularity) = args.granularity {
        config.granularity = granularity;
    }
    if let Some(start) = &args.start {
        config.start = TimeBound::Text(start.clone());
    }
    if let Some(end) = &args.end {
        config.end = Some(TimeBound::Text(end.clone()));
    }

    if args.no_interpolate {
        config.interpolation = InterpolationSpec::disabled();
    }
    if let Some(method) = args.interpolate {
        config.interpolation.enabled = true;
        config.interpolation.method = Some(method);
    }
    if let Some(order) = args.order {
        config.interpolation.order = Some(order);
    }

    if let Some(dedup) = args.dedup {
        config.dedup = dedup;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(format) = args.format {
        config.format = format;
    }

    if let Some(size) = args.request_size {
        config.fetch.request_size = size;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.fetch.max_attempts = max_attempts;
    }
    if let Some(pacing) = args.pacing {
        config.fetch.pacing = seconds("pacing", pacing)?;
    }
    if let Some(backoff) = args.backoff {
        config.fetch.backoff = seconds("backoff", backoff)?;
    }
    Ok(())
}

fn seconds(flag: &str, secs: f64) -> Result<Duration, ImportError> {
    Duration::try_from_secs_f64(secs).ok().context(ConfigSnafu {
            message: format!("--{flag} must be a non-negative number of seconds, got {secs}"),
        })
}
