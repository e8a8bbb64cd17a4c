//! Runtime configuration from environment variables.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::backend::r#trait::check_function_name;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Which backend serves catalog, discount, quote and flag calls.
#[derive(Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Memory,
    Rest {
        url: String,
        anon_key: String,
        service_token: Option<String>,
    },
    Postgres {
        database_url: String,
    },
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Memory => "memory",
            BackendConfig::Rest { .. } => "rest",
            BackendConfig::Postgres { .. } => "postgres",
        }
    }
}

// Keys and connection strings stay out of logs.
impl core::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BackendConfig::Memory => f.write_str("Memory"),
            BackendConfig::Rest { url, .. } => f.debug_struct("Rest").field("url", url).finish_non_exhaustive(),
            BackendConfig::Postgres { .. } => f.debug_struct("Postgres").finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub backend: BackendConfig,
    pub http_timeout: Duration,
    /// Names callable through `/rpc/{name}` and `/functions/{name}`. Empty
    /// means neither route forwards anything.
    pub remote_functions: BTreeSet<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let bind_raw = get("HEARTH_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "HEARTH_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let http_timeout = match get("HEARTH_HTTP_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "HEARTH_HTTP_TIMEOUT_SECS",
                        value: raw,
                    });
                }
            },
        };

        let mut remote_functions = BTreeSet::new();
        for name in get("HEARTH_REMOTE_FUNCTIONS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            check_function_name(name).map_err(|_| ConfigError::Invalid {
                key: "HEARTH_REMOTE_FUNCTIONS",
                value: name.to_string(),
            })?;
            remote_functions.insert(name.to_string());
        }

        let backend = match get("HEARTH_BACKEND").as_deref().unwrap_or("memory") {
            "memory" => BackendConfig::Memory,
            "rest" => BackendConfig::Rest {
                url: require("SUPABASE_URL")?,
                anon_key: require("SUPABASE_ANON_KEY")?,
                service_token: get("SUPABASE_SERVICE_TOKEN"),
            },
            "postgres" => BackendConfig::Postgres {
                database_url: require("DATABASE_URL")?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "HEARTH_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            bind_addr,
            backend,
            http_timeout,
            remote_functions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_to_in_memory_backend() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.backend, BackendConfig::Memory);
        assert_eq!(cfg.http_timeout, Duration::from_secs(10));
        assert!(cfg.remote_functions.is_empty());
    }

    #[test]
    fn remote_functions_are_a_comma_separated_allow_list() {
        let cfg = config(&[("HEARTH_REMOTE_FUNCTIONS", " tenant_stats, generate-script,,tenant_stats ")])
            .unwrap();
        assert_eq!(
            cfg.remote_functions.into_iter().collect::<Vec<_>>(),
            vec!["generate-script".to_string(), "tenant_stats".to_string()]
        );

        assert_eq!(
            config(&[("HEARTH_REMOTE_FUNCTIONS", "tenant_stats,drop table")]),
            Err(ConfigError::Invalid {
                key: "HEARTH_REMOTE_FUNCTIONS",
                value: "drop table".to_string(),
            })
        );
    }

    #[test]
    fn rest_backend_requires_url_and_key() {
        assert_eq!(
            config(&[("HEARTH_BACKEND", "rest"), ("SUPABASE_ANON_KEY", "k")]),
            Err(ConfigError::Missing("SUPABASE_URL"))
        );
        assert_eq!(
            config(&[("HEARTH_BACKEND", "rest"), ("SUPABASE_URL", "https://x.supabase.co"), ("SUPABASE_ANON_KEY", " ")]),
            Err(ConfigError::Missing("SUPABASE_ANON_KEY"))
        );

        let cfg = config(&[
            ("HEARTH_BACKEND", "rest"),
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("HEARTH_HTTP_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(cfg.backend.name(), "rest");
        assert_eq!(cfg.http_timeout, Duration::from_secs(3));
        assert!(!format!("{:?}", cfg.backend).contains("anon"));
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        assert_eq!(
            config(&[("HEARTH_BACKEND", "postgres")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config(&[("HEARTH_BACKEND", "redis")]),
            Err(ConfigError::Invalid { key: "HEARTH_BACKEND", .. })
        ));
        assert!(matches!(
            config(&[("HEARTH_BIND_ADDR", "localhost")]),
            Err(ConfigError::Invalid { key: "HEARTH_BIND_ADDR", .. })
        ));
        assert!(matches!(
            config(&[("HEARTH_HTTP_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Invalid { key: "HEARTH_HTTP_TIMEOUT_SECS", .. })
        ));
    }
}
