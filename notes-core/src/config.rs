use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Environment variable holding the chat completions API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotesConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the SQLite file. `~` and `$VARS` are expanded.
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./notes.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// The single origin allowed to call the API cross-origin.
    pub allowed_origin: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origin: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            timeout_seconds: 30,
        }
    }
}

// Hand-written so the key never reaches a log line.
impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl NotesConfig {
    /// Load configuration: built-in defaults, then the TOML file at `path`
    /// if it exists, then `NOTES__SECTION__KEY` environment overrides, then
    /// `OPENAI_API_KEY`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("NOTES").separator("__"))
            .set_override_option("openai.api_key", std::env::var(API_KEY_ENV).ok())?
            .build()?;
        s.try_deserialize()
    }

    /// Load from an explicit TOML string. Used by tests and tooling; no
    /// environment sources are consulted.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_local_dev_setup() {
        let config = NotesConfig::default();
        assert_eq!(config.http_addr(), "127.0.0.1:8000");
        assert_eq!(config.http.allowed_origin, "http://localhost:3000");
        assert_eq!(config.database.path, "./notes.db");
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.openai.max_tokens, 150);
        assert!((config.openai.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.openai.api_key.is_empty());
    }

    #[test]
    fn test_from_toml_partial_sections_fall_back_to_defaults() {
        let config = NotesConfig::from_toml(
            r#"
            [http]
            host = "0.0.0.0"
            port = 9100
            allowed_origin = "http://localhost:5173"

            [database]
            path = "/tmp/notes-test.db"
            max_connections = 2
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.http_addr(), "0.0.0.0:9100");
        assert_eq!(config.http.allowed_origin, "http://localhost:5173");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = OpenAiConfig {
            api_key: "sk-secret-value".to_string(),
            ..OpenAiConfig::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-secret-value"));
        assert!(printed.contains("<redacted>"));
    }
}
