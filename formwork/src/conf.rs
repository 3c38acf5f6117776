use crate::auth::AuthConf;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LogConf {
    /// Directory for the rolling `combined.log` and `error.log`. `None`
    /// logs to the console only.
    pub dir: Option<String>,

    /// Fallback filter when `RUST_LOG` is unset.
    pub filter: String,

    pub ansi: bool,
}

impl Default for LogConf {
    fn default() -> Self {
        Self {
            dir: Some("logs".to_string()),
            filter: "info".to_string(),
            ansi: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SiteConf {
    pub host: String,

    pub port: u16,

    pub database: String,

    pub secret_key: String,

    pub log: LogConf,

    pub auth: AuthConf,
}

impl Default for SiteConf {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            database: "postgres:///formwork".to_string(),
            secret_key: "default_secret_key".to_string(),
            log: LogConf::default(),
            auth: AuthConf::default(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl SiteConf {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        #[cfg(test)]
        {
            dotenvy::from_filename_override(".env.test").ok();
        }

        #[cfg(all(debug_assertions, not(test)))]
        {
            dotenvy::from_filename_override(".env.dev").ok();
        }

        #[cfg(not(any(debug_assertions, test)))]
        {
            dotenvy::from_filename_override(".env.prod").ok();
        }

        let defaults = Self::default();

        let database = env_var("DATABASE_URL").unwrap_or(defaults.database);
        let secret_key = env_var("JWT_SECRET")
            .or_else(|| env_var("SECRET_KEY"))
            .unwrap_or(defaults.secret_key);
        let host = env_var("HOST").unwrap_or(defaults.host);
        let port = env_var("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let mut auth = defaults.auth;
        if let Some(ttl) = env_var("TOKEN_TTL").and_then(|t| t.parse().ok()) {
            auth.access_ttl = ttl;
        }

        let log = LogConf {
            // An explicitly empty LOG_DIR turns file logging off.
            dir: match std::env::var("LOG_DIR") {
                Ok(dir) if dir.trim().is_empty() => None,
                Ok(dir) => Some(dir),
                Err(_) => defaults.log.dir,
            },
            ..defaults.log
        };

        Self {
            host,
            port,
            database,
            secret_key,
            log,
            auth,
        }
    }
}
