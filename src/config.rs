use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub llm: LlmConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Shared password gating every session. Supplied via `APP__AUTH__PASSWORD`.
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Gemini API key. Supplied via `APP__LLM__API_KEY`.
    pub api_key: String,
    pub model: String,
    pub embedding_model: String,
    /// Additional attempts after a failed completion call.
    pub max_retries: u32,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Sessions idle for longer than this are discarded.
    pub idle_minutes: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());
        Self::load_from(&environment)
    }

    fn load_from(environment: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_loads() {
        let config = AppConfig::load_from("development");
        assert!(config.is_ok(), "Default config should load: {config:?}");

        let config = config.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.llm.embedding_model, "text-embedding-004");
        assert_eq!(config.llm.max_retries, 2);
        assert_eq!(config.llm.top_k, 4);
        assert_eq!(config.session.idle_minutes, 60);
    }

    #[test]
    fn test_secrets_default_empty() {
        let config = AppConfig::load_from("development").unwrap();
        assert!(config.auth.password.is_empty());
        assert!(config.llm.api_key.is_empty());
    }

    #[test]
    fn test_env_override() {
        let mut vars = HashMap::new();
        vars.insert("APP__SERVER__PORT".to_string(), "8080".to_string());
        vars.insert("APP__AUTH__PASSWORD".to_string(), "hunter2".to_string());

        let config: AppConfig = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .source(Some(vars)),
            )
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.password, "hunter2");
    }
}
