use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_CONFIG_PATH: &str = "herald.toml";
/// Placeholder shown until the first webhook arrives ("waiting for message").
pub const DEFAULT_INITIAL_MESSAGE: &str = "メッセージ待機中";
pub const DEFAULT_QUEUE_CAPACITY: usize = 10; // per-subscriber; full queue = dead consumer
pub const DEFAULT_KEEPALIVE_SECS: u64 = 30;
pub const MAX_WEBHOOK_BYTES: usize = 128 * 1024; // hard cap on POST /webhook bodies

/// Top-level config (herald.toml + HERALD_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeraldConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Value held by the shared state before any update.
    #[serde(default = "default_initial_message")]
    pub initial_message: String,
    /// Pending messages a subscriber may hold before it is pruned.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Interval between keep-alive comments on idle streams.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            initial_message: default_initial_message(),
            queue_capacity: default_queue_capacity(),
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

/// What the webhook endpoint does with a missing or empty `message` field.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyMessagePolicy {
    /// Acknowledge with 200 but leave the current message untouched.
    #[default]
    Ignore,
    /// Respond 400 and leave the current message untouched.
    Reject,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub empty_policy: EmptyMessagePolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// External page template; the embedded one is used when unset or unreadable.
    pub template_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// `["*"]` allows any origin.
    #[serde(default = "default_allow_origin")]
    pub allow_origin: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: default_allow_origin(),
        }
    }
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allow_origin.is_empty() || self.allow_origin.iter().any(|o| o == "*")
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_initial_message() -> String {
    DEFAULT_INITIAL_MESSAGE.to_string()
}
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_keepalive_secs() -> u64 {
    DEFAULT_KEEPALIVE_SECS
}
fn default_allow_origin() -> Vec<String> {
    vec!["*".to_string()]
}

impl HeraldConfig {
    /// Load config from defaults, a TOML file and the environment.
    ///
    /// Precedence, lowest first:
    ///   1. Built-in defaults
    ///   2. TOML file (explicit path, else ./herald.toml; missing is fine)
    ///   3. HERALD_* env vars, nested with `__` (HERALD_SERVER__PORT=8080)
    ///   4. PORT env var
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);

        let config: HeraldConfig = Self::figment(path)
            .extract()
            .map_err(|e| crate::error::HeraldError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(HeraldConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("HERALD_").split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.broadcast.queue_capacity == 0 {
            return Err(crate::error::HeraldError::Config(
                "broadcast.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.broadcast.keepalive_secs == 0 {
            return Err(crate::error::HeraldError::Config(
                "broadcast.keepalive_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
