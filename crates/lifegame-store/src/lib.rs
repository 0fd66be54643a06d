//! File-per-player JSON persistence for the Lifegame chat economy.
//!
//! Each player lives in `{players_dir}/{id}.json` as a pretty-printed
//! [`PlayerRecord`]. There is no locking and no journal: the last completed
//! write wins. Writes go to a temporary sibling first and are renamed into
//! place, so a reader never observes a half-written file.
//!
//! # Failure policy
//!
//! - A missing, corrupt, or unreadable record on [`PlayerStore::load`] is
//!   logged and replaced by a fresh default record (data loss accepted).
//! - A failed [`PlayerStore::save`] is logged and swallowed. Callers
//!   proceed as if the write happened; there is no retry and no rollback.

pub mod error;

pub use error::StoreError;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use lifegame_types::{PlayerId, PlayerRecord};
use tracing::{debug, info, warn};

/// Extension of player files.
const RECORD_EXTENSION: &str = "json";

/// Persistent store of player records, one JSON file per player.
#[derive(Debug)]
pub struct PlayerStore {
    dir: PathBuf,
    /// Distinguishes temporary files of concurrent writes.
    write_seq: AtomicU64,
}

impl PlayerStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;
        info!(players_dir = %dir.display(), "player store opened");
        Ok(Self {
            dir,
            write_seq: AtomicU64::new(0),
        })
    }

    /// The directory holding the player files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: PlayerId) -> PathBuf {
        self.dir.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    /// Load a player, creating and persisting a default record if none exists.
    ///
    /// The hints are only used when a new record is created; an existing
    /// record keeps whatever names it was registered with.
    pub async fn load(
        &self,
        id: PlayerId,
        display_name_hint: Option<&str>,
        handle_hint: Option<&str>,
    ) -> PlayerRecord {
        match self.try_read(id).await {
            Ok(Some(record)) => return record,
            Ok(None) => debug!(player_id = %id, "no record on disk, creating player"),
            Err(e) => warn!(
                player_id = %id,
                error = %e,
                "unreadable player record, creating a fresh one"
            ),
        }

        let record = PlayerRecord::new(
            id,
            display_name_hint.unwrap_or_default(),
            handle_hint.unwrap_or_default(),
            Utc::now(),
        );
        self.save(&record).await;
        info!(player_id = %id, "new player registered");
        record
    }

    /// Load a player without creating one.
    ///
    /// Returns `None` when the file is missing or unreadable.
    pub async fn find(&self, id: PlayerId) -> Option<PlayerRecord> {
        match self.try_read(id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(player_id = %id, error = %e, "unreadable player record");
                None
            }
        }
    }

    /// Read a player file. `Ok(None)` means the file does not exist.
    pub async fn try_read(&self, id: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        let path = self.path_for(id);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Persist a record, logging and swallowing any failure.
    pub async fn save(&self, record: &PlayerRecord) {
        if let Err(e) = self.try_save(record).await {
            warn!(player_id = %record.id, error = %e, "failed to save player record");
        }
    }

    /// Persist a record, overwriting the previous version.
    pub async fn try_save(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        let path = self.path_for(record.id);
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self.dir.join(format!("{}.{seq}.tmp", record.id));

        let contents = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&tmp_path, contents)
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            tokio::fs::remove_file(&tmp_path).await.ok();
            return Err(StoreError::io(&path, e));
        }

        debug!(player_id = %record.id, balance = record.balance, "player record saved");
        Ok(())
    }

    /// Every readable player record in the store, in no particular order.
    ///
    /// Files that fail to parse are skipped with a warning.
    pub async fn list(&self) -> Result<Vec<PlayerRecord>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let parsed = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => serde_json::from_str::<PlayerRecord>(&contents)
                    .map_err(StoreError::from),
                Err(e) => Err(StoreError::io(&path, e)),
            };
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping player file"),
            }
        }
        Ok(records)
    }

    /// The `limit` richest players, highest balance first.
    ///
    /// Ties are broken by player id so the order is stable.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<PlayerRecord>, StoreError> {
        let mut records = self.list().await?;
        records.sort_by(|a, b| b.balance.cmp(&a.balance).then(a.id.cmp(&b.id)));
        records.truncate(limit);
        Ok(records)
    }
}
