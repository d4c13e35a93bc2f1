//! Runtime configuration, read from the environment (a `.env` file is honoured).
//!
//! | Variable               | Meaning                                  | Default  |
//! |------------------------|------------------------------------------|----------|
//! | `ADMIN_IDS`            | comma-separated admin sender ids         | none     |
//! | `SHOP_SESSION_BACKEND` | `memory` or `store`                      | `memory` |
//! | `SHOP_CHANNEL_BUFFER`  | mpsc buffer size for actors and workers  | `32`     |
//! | `SHOP_WORKER_IDLE_SECS`| seconds before an idle conversation's worker stops | `300` |

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_CHANNEL_BUFFER: usize = 32;
pub const DEFAULT_WORKER_IDLE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionBackend {
    /// Sessions live in process memory and vanish on restart.
    #[default]
    Memory,
    /// Sessions are serialized into the key-value store.
    Store,
}

/// Static admin allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminList(Arc<BTreeSet<String>>);

impl AdminList {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Arc::new(ids.into_iter().map(Into::into).collect()))
    }

    pub fn contains(&self, sender_id: &str) -> bool {
        self.0.contains(sender_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub admin_ids: AdminList,
    pub session_backend: SessionBackend,
    pub channel_buffer: usize,
    /// How long a conversation worker waits for its next event before it stops.
    pub worker_idle: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_ids: AdminList::default(),
            session_backend: SessionBackend::Memory,
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
            worker_idle: DEFAULT_WORKER_IDLE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let admin_ids = lookup("ADMIN_IDS")
            .map(|raw| {
                AdminList::new(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string),
                )
            })
            .unwrap_or_default();

        let session_backend = match lookup("SHOP_SESSION_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("memory") => SessionBackend::Memory,
            Some("store") => SessionBackend::Store,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "SHOP_SESSION_BACKEND",
                    reason: format!("expected `memory` or `store`, got `{other}`"),
                })
            }
        };

        let channel_buffer = match lookup("SHOP_CHANNEL_BUFFER") {
            None => DEFAULT_CHANNEL_BUFFER,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "SHOP_CHANNEL_BUFFER",
                        reason: format!("expected a positive integer, got `{raw}`"),
                    })
                }
            },
        };

        let worker_idle = match lookup("SHOP_WORKER_IDLE_SECS") {
            None => DEFAULT_WORKER_IDLE,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "SHOP_WORKER_IDLE_SECS",
                        reason: format!("expected a positive number of seconds, got `{raw}`"),
                    })
                }
            },
        };

        Ok(Self {
            admin_ids,
            session_backend,
            channel_buffer,
            worker_idle,
        })
    }
}
