//! Tile records and their loading state machine.
//!
//! A [`TileRecord`] is created the first time a tile is requested and moves
//! through [`TileStatus`]:
//!
//! ```text
//! Pending ──► Loading ──┬──► Loaded
//!                ▲      └──► Failed(reason)
//!                └─────────────┘ (explicit re-request)
//! ```

mod error;

pub use error::TileError;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::coord::TileKey;

/// Loading state of a tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileStatus {
    Pending,
    Loading,
    Loaded,
    Failed(TileError),
}

impl TileStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, TileStatus::Loaded)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, TileStatus::Loading)
    }

    /// Whether a new load may start from this state.
    pub fn can_start_loading(&self) -> bool {
        matches!(self, TileStatus::Pending | TileStatus::Failed(_))
    }
}

/// A tile and everything known about it.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRecord {
    pub key: TileKey,
    /// URL the bytes were (or will be) fetched from. Empty until generated.
    pub url: String,
    pub status: TileStatus,
    /// Encoded image bytes; present only when `Loaded`.
    pub image_data: Option<Bytes>,
    pub last_accessed: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TileRecord {
    /// Creates a `Pending` record with no URL or data.
    pub fn new(key: TileKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            url: String::new(),
            status: TileStatus::Pending,
            image_data: None,
            last_accessed: now,
            created_at: now,
        }
    }

    /// `Pending`/`Failed` → `Loading`. Returns false if the record is already
    /// loading or loaded.
    pub fn begin_loading(&mut self) -> bool {
        if !self.status.can_start_loading() {
            return false;
        }
        self.status = TileStatus::Loading;
        self.image_data = None;
        true
    }

    /// `Loading` → `Loaded` with the given bytes.
    pub fn mark_loaded(&mut self, data: Bytes) {
        self.status = TileStatus::Loaded;
        self.image_data = Some(data);
        self.touch();
    }

    /// `Loading` → `Failed`, dropping any bytes.
    pub fn mark_failed(&mut self, reason: TileError) {
        self.status = TileStatus::Failed(reason);
        self.image_data = None;
    }

    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }

    pub fn is_loaded(&self) -> bool {
        self.status.is_loaded()
    }

    /// Size of the image payload in bytes.
    pub fn data_len(&self) -> usize {
        self.image_data.as_ref().map_or(0, Bytes::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_pending() {
        let record = TileRecord::new(TileKey::new(1, 2, 3));
        assert_eq!(record.status, TileStatus::Pending);
        assert!(record.url.is_empty());
        assert!(record.image_data.is_none());
        assert_eq!(record.created_at, record.last_accessed);
    }

    #[test]
    fn test_state_machine_success_path() {
        let mut record = TileRecord::new(TileKey::new(1, 2, 3));
        assert!(record.begin_loading());
        assert!(record.status.is_loading());
        assert!(!record.begin_loading(), "cannot re-enter loading");

        record.mark_loaded(Bytes::from_static(b"img"));
        assert!(record.is_loaded());
        assert_eq!(record.data_len(), 3);
        assert!(!record.begin_loading(), "loaded records stay loaded");
    }

    #[test]
    fn test_failed_can_be_retried() {
        let mut record = TileRecord::new(TileKey::new(1, 2, 3));
        record.begin_loading();
        record.mark_failed(TileError::Timeout);
        assert_eq!(record.status, TileStatus::Failed(TileError::Timeout));
        assert!(record.image_data.is_none());

        assert!(record.begin_loading());
        assert_eq!(record.status, TileStatus::Loading);
    }
}
