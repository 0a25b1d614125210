use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_f64,
    parse_i64, parse_u16, parse_u32, parse_u64, parse_usize,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdaptiveSettings, ApiSettings, AttemptSettings, ConfigError, CorsSettings, DatabaseSettings,
    RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings, Settings,
    TelemetrySettings,
};

const MIN_DIFFICULTY: f64 = 1.0;
const MAX_DIFFICULTY: f64 = 10.0;
const MAX_SUBMIT_GRACE_SECONDS: i64 = 86_400;

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("QUIZFORGE_HOST", "0.0.0.0");
        let port = env_or_default("QUIZFORGE_PORT", "8000");

        let environment = parse_environment(
            env_optional("QUIZFORGE_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("QUIZFORGE_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "QuizForge API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "quizforge");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "quizforge_db");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DB_MAX_CONNECTIONS", env_or_default("DB_MAX_CONNECTIONS", "30"))?;

        let baseline_difficulty = parse_f64(
            "ADAPTIVE_BASELINE_DIFFICULTY",
            env_or_default("ADAPTIVE_BASELINE_DIFFICULTY", "5"),
        )?;
        let recent_window =
            parse_usize("ADAPTIVE_RECENT_WINDOW", env_or_default("ADAPTIVE_RECENT_WINDOW", "5"))?;
        let accuracy_threshold = parse_f64(
            "ADAPTIVE_ACCURACY_THRESHOLD",
            env_or_default("ADAPTIVE_ACCURACY_THRESHOLD", "0.7"),
        )?;
        let struggle_margin = parse_f64(
            "ADAPTIVE_STRUGGLE_MARGIN",
            env_or_default("ADAPTIVE_STRUGGLE_MARGIN", "0.2"),
        )?;
        let max_difficulty_step = parse_f64(
            "ADAPTIVE_MAX_DIFFICULTY_STEP",
            env_or_default("ADAPTIVE_MAX_DIFFICULTY_STEP", "2"),
        )?;
        let max_questions =
            parse_usize("ADAPTIVE_MAX_QUESTIONS", env_or_default("ADAPTIVE_MAX_QUESTIONS", "20"))?;

        let submit_grace_seconds = parse_i64(
            "ATTEMPT_SUBMIT_GRACE_SECONDS",
            env_or_default("ATTEMPT_SUBMIT_GRACE_SECONDS", "30"),
        )?;
        let sweep_interval_seconds = parse_u64(
            "ATTEMPT_SWEEP_INTERVAL_SECONDS",
            env_or_default("ATTEMPT_SWEEP_INTERVAL_SECONDS", "60"),
        )?;
        let max_concurrent_attempts = parse_u64(
            "MAX_CONCURRENT_ATTEMPTS",
            env_or_default("MAX_CONCURRENT_ATTEMPTS", "500"),
        )?;

        let log_level = env_or_default("QUIZFORGE_LOG_LEVEL", "info");
        let json = env_optional("QUIZFORGE_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            adaptive: AdaptiveSettings {
                baseline_difficulty,
                recent_window,
                accuracy_threshold,
                struggle_margin,
                max_difficulty_step,
                max_questions,
            },
            attempts: AttemptSettings {
                submit_grace_seconds,
                sweep_interval_seconds,
                max_concurrent_attempts,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn adaptive(&self) -> &AdaptiveSettings {
        &self.adaptive
    }

    pub(crate) fn attempts(&self) -> &AttemptSettings {
        &self.attempts
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.adaptive.validate()?;

        if !(0..=MAX_SUBMIT_GRACE_SECONDS).contains(&self.attempts.submit_grace_seconds) {
            return Err(ConfigError::InvalidValue {
                field: "ATTEMPT_SUBMIT_GRACE_SECONDS",
                value: self.attempts.submit_grace_seconds.to_string(),
            });
        }
        if self.attempts.sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ATTEMPT_SWEEP_INTERVAL_SECONDS",
                value: String::from("0"),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        Ok(())
    }
}

impl AdaptiveSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.baseline_difficulty) {
            return Err(ConfigError::InvalidValue {
                field: "ADAPTIVE_BASELINE_DIFFICULTY",
                value: self.baseline_difficulty.to_string(),
            });
        }
        if self.recent_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ADAPTIVE_RECENT_WINDOW",
                value: String::from("0"),
            });
        }
        if !(0.0..=1.0).contains(&self.accuracy_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "ADAPTIVE_ACCURACY_THRESHOLD",
                value: self.accuracy_threshold.to_string(),
            });
        }
        if !(0.0..=self.accuracy_threshold).contains(&self.struggle_margin) {
            return Err(ConfigError::InvalidValue {
                field: "ADAPTIVE_STRUGGLE_MARGIN",
                value: self.struggle_margin.to_string(),
            });
        }
        if self.max_difficulty_step <= 0.0 || self.max_difficulty_step > MAX_DIFFICULTY {
            return Err(ConfigError::InvalidValue {
                field: "ADAPTIVE_MAX_DIFFICULTY_STEP",
                value: self.max_difficulty_step.to_string(),
            });
        }
        if self.max_questions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ADAPTIVE_MAX_QUESTIONS",
                value: String::from("0"),
            });
        }

        Ok(())
    }
}
