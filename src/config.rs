use chrono::Duration;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Secrets and lifetimes for the two token kinds
#[derive(Clone, Debug)]
pub struct TokenSettings {
    pub access_secret: String,
    pub access_ttl: Duration,
    pub refresh_secret: String,
    pub refresh_ttl: Duration,
}

impl TokenSettings {
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            access_ttl: Duration::days(1),
            refresh_secret: refresh_secret.into(),
            refresh_ttl: Duration::days(10),
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }
}

/// Where multipart uploads are staged and where the local media host keeps files
#[derive(Clone, Debug)]
pub struct MediaSettings {
    pub upload_temp_dir: PathBuf,
    pub media_root: PathBuf,
    pub public_base_url: String,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            upload_temp_dir: PathBuf::from("./public/temp"),
            media_root: PathBuf::from("./public/media"),
            public_base_url: "http://localhost:8000/media".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CookieSettings {
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self { secure: true }
    }
}

/// Full process configuration. Only `main` builds this from the environment;
/// everything below it receives the pieces it needs explicitly.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub tokens: TokenSettings,
    pub media: MediaSettings,
    pub cookies: CookieSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let duration_or = |name: &'static str, default: Duration| match lookup(name) {
            Some(value) => parse_duration(&value).ok_or(ConfigError::Invalid { name, value }),
            None => Ok(default),
        };

        let tokens = TokenSettings {
            access_secret: required("ACCESS_TOKEN_SECRET")?,
            access_ttl: duration_or("ACCESS_TOKEN_EXPIRY", Duration::days(1))?,
            refresh_secret: required("REFRESH_TOKEN_SECRET")?,
            refresh_ttl: duration_or("REFRESH_TOKEN_EXPIRY", Duration::days(10))?,
        };

        let defaults = MediaSettings::default();
        let media = MediaSettings {
            upload_temp_dir: lookup("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_temp_dir),
            media_root: lookup("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            public_base_url: lookup("MEDIA_PUBLIC_URL").unwrap_or(defaults.public_base_url),
        };

        let cookies = match lookup("COOKIE_SECURE") {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => CookieSettings { secure: true },
                "0" | "false" | "no" => CookieSettings { secure: false },
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "COOKIE_SECURE",
                        value,
                    })
                }
            },
            None => CookieSettings::default(),
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            tokens,
            media,
            cookies,
        })
    }
}

/// Parses expiry strings such as `900`, `15m`, `12h` or `10d`.
/// A bare number is read as seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&value[..idx], c.to_ascii_lowercase()),
        _ => (value, 's'),
    };
    let amount: i64 = digits.parse().ok()?;
    if amount <= 0 {
        return None;
    }

    match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => None,
    }
}
