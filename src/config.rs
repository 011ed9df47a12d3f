use std::env;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MongoDb,
    Memory,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub frontend_origin: String,
    pub storage: StorageBackend,
    pub mongo_uri: Option<String>,
    pub database_name: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub bcrypt_cost: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("frontend_origin", &self.frontend_origin)
            .field("storage", &self.storage)
            .field("database_name", &self.database_name)
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

fn parse<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let storage = match lookup("STORAGE").as_deref().map(str::trim) {
            None | Some("mongodb") => StorageBackend::MongoDb,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE",
                    value: other.to_string(),
                })
            }
        };

        let mongo_uri = lookup("MONGO_URI");
        if storage == StorageBackend::MongoDb && mongo_uri.is_none() {
            return Err(ConfigError::Missing("MONGO_URI"));
        }

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiry_hours = parse("JWT_EXPIRE_HOURS", lookup("JWT_EXPIRE_HOURS"), 48)?;
        if jwt_expiry_hours <= 0 {
            return Err(ConfigError::Invalid {
                name: "JWT_EXPIRE_HOURS",
                value: jwt_expiry_hours.to_string(),
            });
        }

        let bcrypt_cost = parse("BCRYPT_COST", lookup("BCRYPT_COST"), bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        Ok(Self {
            port: parse("PORT", lookup("PORT"), 5000)?,
            frontend_origin: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            storage,
            mongo_uri,
            database_name: lookup("DATABASE_NAME").unwrap_or_else(|| "taskboard".to_string()),
            jwt_secret,
            jwt_expiry_hours,
            bcrypt_cost,
        })
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.jwt_expiry_hours)
    }
}
