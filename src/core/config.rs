use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://api.upbit.com/v1";
pub const DEFAULT_WS_URL: &str = "wss://api.upbit.com/websocket/v1";
pub const DEFAULT_PRIVATE_WS_URL: &str = "wss://api.upbit.com/websocket/v1/private";

#[derive(Debug, Clone)]
pub struct UpbitConfig {
    pub access_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub base_url: Option<String>,
    pub ws_url: Option<String>,
    pub private_ws_url: Option<String>,
    pub timeout_seconds: u64,
}

// Never expose secrets in serialization
impl Serialize for UpbitConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("UpbitConfig", 6)?;
        state.serialize_field("access_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("ws_url", &self.ws_url)?;
        state.serialize_field("private_ws_url", &self.private_ws_url)?;
        state.serialize_field("timeout_seconds", &self.timeout_seconds)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for UpbitConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct UpbitConfigHelper {
            #[serde(default)]
            access_key: String,
            #[serde(default)]
            secret_key: String,
            base_url: Option<String>,
            ws_url: Option<String>,
            private_ws_url: Option<String>,
            timeout_seconds: Option<u64>,
        }

        let helper = UpbitConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            access_key: Secret::new(helper.access_key),
            secret_key: Secret::new(helper.secret_key),
            base_url: helper.base_url,
            ws_url: helper.ws_url,
            private_ws_url: helper.private_ws_url,
            timeout_seconds: helper.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        })
    }
}

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

impl UpbitConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(access_key: String, secret_key: String) -> Self {
        Self {
            access_key: Secret::new(access_key),
            secret_key: Secret::new(secret_key),
            base_url: None,
            ws_url: None,
            private_ws_url: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_ACCESS_KEY` (e.g., `UPBIT_ACCESS_KEY`)
    /// - `{PREFIX}_SECRET_KEY`
    /// - `{PREFIX}_BASE_URL`, `{PREFIX}_WS_URL`, `{PREFIX}_PRIVATE_WS_URL` (optional)
    /// - `{PREFIX}_TIMEOUT_SECONDS` (optional)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let var = |suffix: &str| format!("{}_{}", prefix, suffix);

        let access_key_var = var("ACCESS_KEY");
        let secret_key_var = var("SECRET_KEY");

        let access_key = env::var(&access_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(access_key_var))?;
        let secret_key = env::var(&secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;

        let timeout_var = var("TIMEOUT_SECONDS");
        let timeout_seconds = match env::var(&timeout_var) {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidConfiguration(format!("{} is not a number: {}", timeout_var, raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECONDS,
        };

        Ok(Self {
            access_key: Secret::new(access_key),
            secret_key: Secret::new(secret_key),
            base_url: env::var(var("BASE_URL")).ok(),
            ws_url: env::var(var("WS_URL")).ok(),
            private_ws_url: env::var(var("PRIVATE_WS_URL")).ok(),
            timeout_seconds,
        })
    }

    /// Create configuration from .env file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    ///
    /// A missing file is not an error; system environment variables still apply.
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Configuration for quotation endpoints and public streams only
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new())
    }

    /// Check if this configuration has credentials for authenticated operations
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.access_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    #[must_use]
    pub fn ws_url(mut self, ws_url: String) -> Self {
        self.ws_url = Some(ws_url);
        self
    }

    #[must_use]
    pub fn private_ws_url(mut self, private_ws_url: String) -> Self {
        self.private_ws_url = Some(private_ws_url);
        self
    }

    #[must_use]
    pub const fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn rest_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn public_ws_url(&self) -> &str {
        self.ws_url.as_deref().unwrap_or(DEFAULT_WS_URL)
    }

    pub fn private_stream_url(&self) -> &str {
        self.private_ws_url
            .as_deref()
            .unwrap_or(DEFAULT_PRIVATE_WS_URL)
    }

    /// Get access key (use carefully - exposes secret)
    pub fn access_key(&self) -> &str {
        self.access_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
