//! Durable guild flags
//!
//! The only fact persisted is "guild X has real players". Stores are async so
//! the tracker can hand writes to a background task instead of blocking the
//! game loop.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Default location of the YAML guild store
pub const GUILD_FLAGS_FILE: &str = "data/guild_flags.yaml";

/// Errors raised by a guild store
#[derive(Debug, Error)]
pub enum GuildStoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage format error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type GuildStoreResult<T> = Result<T, GuildStoreError>;

/// A persisted guild row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildFlag {
    pub guild_id: u32,
    pub has_real_players: bool,
    pub flagged_at: DateTime<Utc>,
}

/// Durable storage for guild flags
#[async_trait::async_trait]
pub trait GuildFlagStore: Send + Sync {
    /// Every guild currently flagged as having real players
    async fn load_flagged_guilds(&self) -> GuildStoreResult<HashSet<u32>>;

    /// Record that a guild has real players
    async fn flag_guild(&self, guild_id: u32) -> GuildStoreResult<()>;
}

/// Guild flags kept in memory
#[derive(Clone, Default)]
pub struct MemoryGuildStore {
    rows: Arc<DashMap<u32, GuildFlag>>,
}

impl MemoryGuildStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, e.g. one recorded as `has_real_players: false`
    pub fn insert(&self, row: GuildFlag) {
        self.rows.insert(row.guild_id, row);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait::async_trait]
impl GuildFlagStore for MemoryGuildStore {
    async fn load_flagged_guilds(&self) -> GuildStoreResult<HashSet<u32>> {
        Ok(self
            .rows
            .iter()
            .filter(|row| row.has_real_players)
            .map(|row| row.guild_id)
            .collect())
    }

    async fn flag_guild(&self, guild_id: u32) -> GuildStoreResult<()> {
        self.rows.insert(
            guild_id,
            GuildFlag {
                guild_id,
                has_real_players: true,
                flagged_at: Utc::now(),
            },
        );
        Ok(())
    }
}

/// Guild flags kept in a YAML file
pub struct YamlGuildStore {
    path: PathBuf,
    /// Serialises read-modify-write cycles on the file
    write_lock: Mutex<()>,
}

impl YamlGuildStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row. A missing file is an empty store.
    async fn read_rows(&self) -> GuildStoreResult<Vec<GuildFlag>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_yaml::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_rows(&self, rows: &[GuildFlag]) -> GuildStoreResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        let yaml = serde_yaml::to_string(rows)?;
        tokio::fs::write(&self.path, yaml).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl GuildFlagStore for YamlGuildStore {
    async fn load_flagged_guilds(&self) -> GuildStoreResult<HashSet<u32>> {
        Ok(self
            .read_rows()
            .await?
            .into_iter()
            .filter(|row| row.has_real_players)
            .map(|row| row.guild_id)
            .collect())
    }

    async fn flag_guild(&self, guild_id: u32) -> GuildStoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut rows = self.read_rows().await?;
        match rows.iter_mut().find(|row| row.guild_id == guild_id) {
            Some(row) if row.has_real_players => return Ok(()),
            Some(row) => {
                row.has_real_players = true;
                row.flagged_at = Utc::now();
            }
            None => rows.push(GuildFlag {
                guild_id,
                has_real_players: true,
                flagged_at: Utc::now(),
            }),
        }

        self.write_rows(&rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_only_loads_flagged() {
        let store = MemoryGuildStore::new();
        store.insert(GuildFlag {
            guild_id: 1,
            has_real_players: false,
            flagged_at: Utc::now(),
        });
        store.flag_guild(2).await.unwrap();

        let flagged = store.load_flagged_guilds().await.unwrap();
        assert_eq!(flagged, [2].into_iter().collect());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_yaml_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("guild_flags.yaml");
        let store = YamlGuildStore::new(&path);

        assert!(store.load_flagged_guilds().await.unwrap().is_empty());

        store.flag_guild(10).await.unwrap();
        store.flag_guild(20).await.unwrap();
        store.flag_guild(10).await.unwrap();

        let reopened = YamlGuildStore::new(&path);
        let flagged = reopened.load_flagged_guilds().await.unwrap();
        assert_eq!(flagged, [10, 20].into_iter().collect());

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.matches("guild_id:").count(), 2);
    }

    #[tokio::test]
    async fn test_yaml_store_reflags_unflagged_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guild_flags.yaml");
        let rows = vec![GuildFlag {
            guild_id: 3,
            has_real_players: false,
            flagged_at: Utc::now(),
        }];
        tokio::fs::write(&path, serde_yaml::to_string(&rows).unwrap())
            .await
            .unwrap();

        let store = YamlGuildStore::new(&path);
        assert!(store.load_flagged_guilds().await.unwrap().is_empty());

        store.flag_guild(3).await.unwrap();
        assert_eq!(
            store.load_flagged_guilds().await.unwrap(),
            [3].into_iter().collect()
        );
    }

    #[tokio::test]
    async fn test_yaml_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guild_flags.yaml");
        tokio::fs::write(&path, "guild_id: [not, a, list").await.unwrap();

        let store = YamlGuildStore::new(&path);
        assert!(matches!(
            store.load_flagged_guilds().await,
            Err(GuildStoreError::Yaml(_))
        ));
    }
}
