use chrono::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub sweep_interval: std::time::Duration,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;

        let jwt_secret = env_required("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 bytes".to_string());
        }

        let access_token_ttl_secs: i64 = env_or("SENSORGATE_ACCESS_TOKEN_TTL_SECS", "900")
            .parse()
            .map_err(|e| format!("Invalid SENSORGATE_ACCESS_TOKEN_TTL_SECS: {e}"))?;

        let reset_token_ttl_secs: i64 = env_or("SENSORGATE_RESET_TOKEN_TTL_SECS", "900")
            .parse()
            .map_err(|e| format!("Invalid SENSORGATE_RESET_TOKEN_TTL_SECS: {e}"))?;

        // Default: once a day, matching the off-peak nightly cleanup cadence.
        let sweep_interval_secs: u64 = env_or("SENSORGATE_SWEEP_INTERVAL_SECS", "86400")
            .parse()
            .map_err(|e| format!("Invalid SENSORGATE_SWEEP_INTERVAL_SECS: {e}"))?;

        let log_level = env_or("SENSORGATE_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("SENSORGATE_SMTP_HOST").ok(),
            std::env::var("SENSORGATE_SMTP_PORT").ok(),
            std::env::var("SENSORGATE_SMTP_USER").ok(),
            std::env::var("SENSORGATE_SMTP_PASS").ok(),
            std::env::var("SENSORGATE_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid SENSORGATE_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
            reset_token_ttl: Duration::seconds(reset_token_ttl_secs),
            sweep_interval: std::time::Duration::from_secs(sweep_interval_secs),
            log_level,
            smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
