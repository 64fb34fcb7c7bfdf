use crate::{env_optional, env_required, parse_value, ConfigError, FromEnv};

/// Kafka broker and topic configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KafkaConfig {
    pub broker_host: String,
    pub broker_port: u16,
    /// Topic the worker consumes from
    pub topic: String,
    /// Topic exhausted messages are published to
    pub dead_letter_topic: String,
    /// Consumer group; `None` runs the consumer standalone
    pub group_id: Option<String>,
}

impl KafkaConfig {
    pub fn new(
        broker_host: impl Into<String>,
        broker_port: u16,
        topic: impl Into<String>,
        dead_letter_topic: impl Into<String>,
    ) -> Self {
        Self {
            broker_host: broker_host.into(),
            broker_port,
            topic: topic.into(),
            dead_letter_topic: dead_letter_topic.into(),
            group_id: None,
        }
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Bootstrap servers as "host:port"
    pub fn brokers(&self) -> String {
        format!("{}:{}", self.broker_host, self.broker_port)
    }
}

impl FromEnv for KafkaConfig {
    /// Requires TOPIC_NAME, DLQ_TOPIC_NAME, BROKER_HOST and BROKER_PORT.
    /// GROUP_ID is optional.
    fn from_env() -> Result<Self, ConfigError> {
        let topic = env_required("TOPIC_NAME")?;
        let dead_letter_topic = env_required("DLQ_TOPIC_NAME")?;
        let broker_host = env_required("BROKER_HOST")?;
        let broker_port = parse_value(
            "BROKER_PORT",
            &env_required("BROKER_PORT")?,
            "must be an integer",
        )?;

        Ok(Self {
            broker_host,
            broker_port,
            topic,
            dead_letter_topic,
            group_id: env_optional("GROUP_ID"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(port: &str, group: Option<&'static str>) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("TOPIC_NAME", Some("orders".to_string())),
            ("DLQ_TOPIC_NAME", Some("orders-dlq".to_string())),
            ("BROKER_HOST", Some("localhost".to_string())),
            ("BROKER_PORT", Some(port.to_string())),
            ("GROUP_ID", group.map(str::to_string)),
        ]
    }

    #[test]
    fn test_kafka_config_from_env_success() {
        temp_env::with_vars(vars("9092", Some("http-workers")), || {
            let config = KafkaConfig::from_env().unwrap();
            assert_eq!(config.topic, "orders");
            assert_eq!(config.dead_letter_topic, "orders-dlq");
            assert_eq!(config.brokers(), "localhost:9092");
            assert_eq!(config.group_id.as_deref(), Some("http-workers"));
        });
    }

    #[test]
    fn test_kafka_config_without_group_is_standalone() {
        temp_env::with_vars(vars("9092", None), || {
            let config = KafkaConfig::from_env().unwrap();
            assert_eq!(config.group_id, None);
        });

        temp_env::with_vars(vars("9092", Some("")), || {
            let config = KafkaConfig::from_env().unwrap();
            assert_eq!(config.group_id, None);
        });
    }

    #[test]
    fn test_kafka_config_invalid_port() {
        temp_env::with_vars(vars("invalid", None), || {
            let err = KafkaConfig::from_env().unwrap_err();
            assert_eq!(
                err.to_string(),
                "Failed to parse environment variable 'BROKER_PORT': must be an integer"
            );
        });
    }

    #[test]
    fn test_kafka_config_missing_topic() {
        let mut env = vars("9092", None);
        env[0].1 = None;
        temp_env::with_vars(env, || {
            let err = KafkaConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("TOPIC_NAME"));
        });
    }

    #[test]
    fn test_kafka_config_builder() {
        let config = KafkaConfig::new("broker", 19092, "in", "in-dlq").with_group_id("g");
        assert_eq!(config.brokers(), "broker:19092");
        assert_eq!(config.group_id.as_deref(), Some("g"));
    }
}
