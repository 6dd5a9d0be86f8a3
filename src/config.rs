use std::env;

/// Off-token the Uniti firmware expects on `PUT /power?system=`.
pub const DEFAULT_OFF_TOKEN: &str = "lona";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub off_token: String,
    /// Log a warning when a read-modify-write command is skipped because
    /// the current value could not be read.
    pub warn_on_skip: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            off_token: DEFAULT_OFF_TOKEN.to_string(),
            warn_on_skip: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
    pub client_id: String,
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_required<F>(lookup: &F, key: &str) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| format!("{key} environment variable is required"))
}

fn env_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.is_empty())
}

fn env_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

impl DeviceSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            off_token: env_optional(&lookup, "NAIM_POWER_OFF_TOKEN")
                .unwrap_or(defaults.off_token),
            warn_on_skip: env_flag(&lookup, "NAIM_WARN_ON_SKIP", defaults.warn_on_skip),
        }
    }
}

impl MqttConfig {
    pub fn from_env(default_client_id: &str) -> Result<Self, String> {
        Self::from_lookup(env_lookup, default_client_id)
    }

    pub fn from_lookup<F>(lookup: F, default_client_id: &str) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            broker_host: env_required(&lookup, "MQTT_BROKER_HOST")?,
            broker_port: env_or_default(&lookup, "MQTT_BROKER_PORT", 1883),
            username: env_optional(&lookup, "MQTT_USERNAME"),
            password: env_optional(&lookup, "MQTT_PASSWORD"),
            topic_prefix: env_or_default(&lookup, "MQTT_TOPIC_PREFIX", "naim".to_string()),
            client_id: env_or_default(&lookup, "MQTT_CLIENT_ID", default_client_id.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.broker_host.is_empty() {
            return Err("MQTT_BROKER_HOST must not be empty".into());
        }
        if self.topic_prefix.trim_matches('/').is_empty() {
            return Err("MQTT_TOPIC_PREFIX must not be empty".into());
        }
        Ok(())
    }

    fn prefix(&self) -> &str {
        self.topic_prefix.trim_end_matches('/')
    }

    pub fn command_topic(&self) -> String {
        format!("{}/command", self.prefix())
    }

    pub fn result_topic(&self) -> String {
        format!("{}/result", self.prefix())
    }

    pub fn worker_status_topic(&self) -> String {
        format!("{}/worker_status", self.prefix())
    }
}
