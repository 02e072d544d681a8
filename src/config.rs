// Configuration - region and cadence resolution
//
// The collector reads everything it needs from flags and the
// environment: the AWS region (flag, then AWS_REGION, then a fixed
// default) and the collection interval. Credential resolution stays with
// the AWS shared-config loader.

use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

/// Region used when neither the flag nor AWS_REGION is set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Production cadence: one cycle per minute.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Errors that can occur while resolving the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid interval '{0}': expected a positive number of seconds")]
    InvalidInterval(String),
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// AWS region the clients are built for
    pub region: String,

    /// Time between cycle starts
    pub interval: Duration,

    /// Run a single cycle and exit instead of scheduling forever
    pub run_once: bool,
}

impl CollectorConfig {
    /// Resolves the configuration from parsed flags plus the process
    /// environment.
    pub fn resolve(
        region_flag: Option<String>,
        interval_flag: Option<String>,
        run_once: bool,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with(region_flag, env::var("AWS_REGION").ok(), interval_flag, run_once)
    }

    /// Resolution with the environment passed in, so tests control it.
    fn resolve_with(
        region_flag: Option<String>,
        env_region: Option<String>,
        interval_flag: Option<String>,
        run_once: bool,
    ) -> Result<Self, ConfigError> {
        let region = region_flag.or(env_region).unwrap_or_else(|| {
            info!(
                "no region configured via --region or AWS_REGION, using default: {}",
                DEFAULT_REGION
            );
            DEFAULT_REGION.to_string()
        });

        let interval = match interval_flag {
            None => Duration::from_secs(DEFAULT_INTERVAL_SECS),
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidInterval(raw.clone()))?;
                if secs == 0 {
                    return Err(ConfigError::InvalidInterval(raw));
                }
                Duration::from_secs(secs)
            }
        };

        Ok(CollectorConfig {
            region,
            interval,
            run_once,
        })
    }
}
