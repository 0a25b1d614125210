mod parsing;
mod secret;
mod settings;
mod types;

pub(crate) use types::{
    AdaptiveSettings, ApiSettings, AttemptSettings, ConfigError, CorsSettings, DatabaseSettings,
    Environment, RuntimeSettings, SecuritySettings, Settings, TelemetrySettings,
};
