use crate::{env_optional, ConfigError, FromEnv};

/// Search-index connection settings.
///
/// Accepted and carried for deployments that already set them; nothing
/// consumes them yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SearchConfig {
    pub fn is_configured(&self) -> bool {
        self.host.is_some()
    }
}

impl FromEnv for SearchConfig {
    /// Reads ELASTIC_HOST, ELASTIC_USERNAME and ELASTIC_PASSWORD, all optional
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_optional("ELASTIC_HOST"),
            username: env_optional("ELASTIC_USERNAME"),
            password: env_optional("ELASTIC_PASSWORD"),
        })
    }
}
