//! Worker settings loaded from the environment.

use chrono::{DateTime, NaiveDateTime, Utc};
use core_config::kafka::KafkaConfig;
use core_config::search::SearchConfig;
use core_config::{env_optional, env_required, parse_value, ConfigError, FromEnv};
use std::time::Duration;

/// Layout of `OFFSET_TIME`, e.g. `2023-01-01:00:00:00`.
pub const OFFSET_TIME_FORMAT: &str = "%Y-%m-%d:%H:%M:%S";

/// Process configuration
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub worker_name: String,
    pub instance_id: String,
    /// Attempts per message before dead-lettering (>= 1)
    pub max_retry_attempt: u32,
    pub invoking_method: String,
    pub invoking_url: String,
    /// Per-call timeout; `None` waits for the downstream indefinitely
    pub invoke_timeout: Option<Duration>,
    /// Start position in standalone mode
    pub offset_time: DateTime<Utc>,
    pub kafka: KafkaConfig,
    /// Reserved, not used by the worker
    pub search: SearchConfig,
    /// Serve health and metrics on this port when set
    pub health_port: Option<u16>,
}

impl WorkerSettings {
    /// Load settings, taking the default offset time from `now`.
    pub fn from_env_with_clock(now: impl Fn() -> DateTime<Utc>) -> Result<Self, ConfigError> {
        let worker_name = env_required("WORKER_NAME")?;
        let instance_id = env_required("INSTANCE_ID")?;

        let max_retry_attempt = parse_value::<u32>(
            "MAX_RETRY_ATTEMPT",
            &env_required("MAX_RETRY_ATTEMPT")?,
            "must be a positive integer",
        )?;
        if max_retry_attempt == 0 {
            return Err(ConfigError::parse(
                "MAX_RETRY_ATTEMPT",
                "must be a positive integer",
            ));
        }

        let kafka = KafkaConfig::from_env()?;
        let invoking_method = env_required("INVOKING_METHOD")?;
        let invoking_url = env_required("INVOKING_URL")?;

        let offset_time = match env_optional("OFFSET_TIME") {
            Some(raw) => parse_offset_time(&raw)?,
            None => now(),
        };

        let invoke_timeout = env_optional("INVOKE_TIMEOUT_SECS")
            .map(|raw| {
                parse_value::<u64>("INVOKE_TIMEOUT_SECS", &raw, "must be a number of seconds")
            })
            .transpose()?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let health_port = env_optional("HEALTH_PORT")
            .map(|raw| parse_value::<u16>("HEALTH_PORT", &raw, "must be an integer"))
            .transpose()?;

        Ok(Self {
            worker_name,
            instance_id,
            max_retry_attempt,
            invoking_method,
            invoking_url,
            invoke_timeout,
            offset_time,
            kafka,
            search: SearchConfig::from_env()?,
            health_port,
        })
    }

    /// Kafka `client.id`
    pub fn client_id(&self) -> String {
        format!("{}-{}", self.worker_name, self.instance_id)
    }
}

impl FromEnv for WorkerSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_clock(Utc::now)
    }
}

/// Parse `OFFSET_TIME` as a UTC instant.
pub fn parse_offset_time(raw: &str) -> Result<DateTime<Utc>, ConfigError> {
    NaiveDateTime::parse_from_str(raw.trim(), OFFSET_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            ConfigError::parse("OFFSET_TIME", "must be in format YYYY-MM-DD:HH:MM:SS")
        })
}
