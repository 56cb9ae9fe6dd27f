//! Saved Steam/Epic identifiers per chat user.
//!
//! Stored as `{"<user id>": {"steam": "...", "epic": "..."}}` and rewritten
//! atomically on every change. Unlike the API cache, failed writes are
//! reported: losing user-entered data silently is worse than an error reply.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::StatBotError;
use crate::persist;

/// A platform a user can save an identifier for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Steam,
    Epic,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Steam => "steam",
            Self::Epic => "epic",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = StatBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "steam" => Ok(Self::Steam),
            "epic" => Ok(Self::Epic),
            other => Err(StatBotError::InvalidInput(format!(
                "unknown platform '{}' (expected steam or epic)",
                other
            ))),
        }
    }
}

/// What `clear` should remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    Platform(Platform),
    All,
}

impl FromStr for ClearTarget {
    type Err = StatBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            other => other.parse().map(Self::Platform).map_err(|_| {
                StatBotError::InvalidInput(format!(
                    "unknown clear option '{}' (expected steam, epic or all)",
                    other
                ))
            }),
        }
    }
}

/// The identifiers saved for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steam: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic: Option<String>,
}

impl IdSet {
    pub fn get(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Steam => self.steam.as_deref(),
            Platform::Epic => self.epic.as_deref(),
        }
    }

    fn slot(&mut self, platform: Platform) -> &mut Option<String> {
        match platform {
            Platform::Steam => &mut self.steam,
            Platform::Epic => &mut self.epic,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steam.is_none() && self.epic.is_none()
    }

    /// Lenient parse of one persisted user record: anything that is not an
    /// object is an empty set, and non-string fields are ignored.
    fn from_json(record: &Value) -> Self {
        let field = |name: &str| {
            record
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            steam: field("steam"),
            epic: field("epic"),
        }
    }
}

type Users = BTreeMap<String, IdSet>;

/// Durable per-user identifier store.
pub struct UserIdStore {
    path: PathBuf,
    /// `None` until the file has been loaded.
    users: Mutex<Option<Users>>,
}

impl UserIdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            users: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identifiers saved for `user_id`; empty if none.
    pub async fn get(&self, user_id: u64) -> IdSet {
        let mut guard = self.users.lock().await;
        let users = guard.get_or_insert_with(|| load(&self.path));
        users.get(&user_id.to_string()).cloned().unwrap_or_default()
    }

    /// Saves `value` as the user's identifier on `platform`.
    pub async fn set(
        &self,
        user_id: u64,
        platform: Platform,
        value: &str,
    ) -> Result<(), StatBotError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(StatBotError::InvalidInput(format!(
                "an identifier is required for {}",
                platform
            )));
        }

        let mut guard = self.users.lock().await;
        let users = guard.get_or_insert_with(|| load(&self.path));
        *users.entry(user_id.to_string()).or_default().slot(platform) = Some(value.to_string());
        persist::write_json_atomic(&self.path, &*users)?;
        tracing::debug!("Saved {} identifier for user {}", platform, user_id);
        Ok(())
    }

    /// Removes saved identifiers. Users left with nothing are dropped entirely.
    pub async fn clear(&self, user_id: u64, target: ClearTarget) -> Result<(), StatBotError> {
        let mut guard = self.users.lock().await;
        let users = guard.get_or_insert_with(|| load(&self.path));
        let uid = user_id.to_string();
        let Some(ids) = users.get_mut(&uid) else {
            return Ok(());
        };
        match target {
            ClearTarget::All => {
                users.remove(&uid);
            }
            ClearTarget::Platform(platform) => {
                *ids.slot(platform) = None;
                if ids.is_empty() {
                    users.remove(&uid);
                }
            }
        }
        persist::write_json_atomic(&self.path, &*users)?;
        Ok(())
    }
}

fn load(path: &Path) -> Users {
    match persist::read_json(path) {
        Some(Value::Object(records)) => records
            .iter()
            .map(|(uid, record)| (uid.clone(), IdSet::from_json(record)))
            .collect(),
        Some(_) => {
            tracing::warn!("Ignoring {}: top level is not an object", path.display());
            Users::new()
        }
        None => Users::new(),
    }
}
