//! Durable pin/photo storage with a two-surface commit protocol.
//!
//! One SQLite database backs two logical write surfaces:
//!
//! - the **background surface** receives bulk mutations from the sync
//!   engine: placeholder batches are inserted unpublished and downloaded
//!   bytes land in a staging column;
//! - the **foreground surface** is what interactive readers (and direct
//!   user deletes) see: only published rows and only committed image bytes.
//!
//! A background write becomes foreground-visible through an explicit
//! propagation call ([`Store::publish_photo`] / [`Store::publish_pin_photos`]).
//! Each propagation is an independent per-row merge serialized by the
//! connection mutex, so concurrent workers may propagate in any order
//! without corrupting the foreground view. Every foreground-visible commit
//! broadcasts a [`StoreEvent`] for live views to re-query.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::broadcast;

use super::error::StoreError;
use super::schema;
use super::types::{Coordinate, NewPhoto, PhotoKey, PhotoRecord, PinKey, PinRecord, StoreEvent};

/// Capacity of the commit-event channel. Slow subscribers observe a lag
/// error and re-query, so overflow never loses data.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// SQLite-backed pin/photo store.
pub struct Store {
    /// Wrapped in Mutex because rusqlite::Connection is not Sync. Guards are
    /// never held across an await point.
    conn: Mutex<Connection>,
    events: broadcast::Sender<StoreEvent>,
    /// Path to the database file (for error messages).
    path: PathBuf,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open or create a database at the given path.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let path = path.to_path_buf();
        let path_clone = path.clone();

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path_clone).map_err(|e| StoreError::Open {
                path: path_clone.clone(),
                source: e,
            })?;
            configure(&conn)?;
            schema::migrate(&conn)?;
            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Query(e.to_string()))??;

        Ok(Self::from_connection(conn, path))
    }

    /// Open an in-memory database (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::migrate(&conn)?;
        Ok(Self::from_connection(conn, PathBuf::from(":memory:")))
    }

    fn from_connection(conn: Connection, path: PathBuf) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            conn: Mutex::new(conn),
            events,
            path,
        }
    }

    /// Subscribe to commit events affecting foreground-visible photo sets.
    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| StoreError::Query(e.to_string()))
    }

    fn emit(&self, pin: PinKey) {
        // No subscribers is fine; views come and go.
        let _ = self.events.send(StoreEvent { pin });
    }

    // ── Pins ──

    /// Create a pin at a validated coordinate. Coordinates are immutable
    /// after creation; there is no update path.
    pub async fn create_pin(&self, coordinate: Coordinate) -> Result<PinRecord, StoreError> {
        let created_at = Utc::now();
        let key = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO pins (latitude, longitude, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    coordinate.latitude(),
                    coordinate.longitude(),
                    created_at.timestamp_millis(),
                ],
            )
            .map_err(StoreError::query)?;
            PinKey(conn.last_insert_rowid())
        };

        tracing::debug!(pin = %key, lat = coordinate.latitude(), lon = coordinate.longitude(), "created pin");
        Ok(PinRecord {
            key,
            coordinate,
            created_at,
        })
    }

    /// Look up one pin.
    pub async fn pin(&self, key: PinKey) -> Result<PinRecord, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, latitude, longitude, created_at FROM pins WHERE id = ?1",
            [key.0],
            row_to_pin,
        )
        .optional()
        .map_err(StoreError::query)?
        .ok_or_else(|| StoreError::pin_not_found(key.0))
    }

    /// All saved pins, oldest first — what a map screen re-adds on launch.
    pub async fn pins(&self) -> Result<Vec<PinRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, latitude, longitude, created_at FROM pins ORDER BY created_at, id")
            .map_err(StoreError::query)?;
        let pins = stmt
            .query_map([], row_to_pin)
            .map_err(StoreError::query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::query)?;
        Ok(pins)
    }

    /// Delete a pin; its photos cascade away with it.
    pub async fn delete_pin(&self, key: PinKey) -> Result<(), StoreError> {
        {
            let conn = self.lock()?;
            let rows = conn
                .execute("DELETE FROM pins WHERE id = ?1", [key.0])
                .map_err(StoreError::query)?;
            if rows == 0 {
                return Err(StoreError::pin_not_found(key.0));
            }
        }
        tracing::debug!(pin = %key, "deleted pin and its album");
        self.emit(key);
        Ok(())
    }

    // ── Photos: background surface ──

    /// Insert one placeholder record per descriptor in a single transaction
    /// on the background surface: either all of them exist afterwards or
    /// none do. The rows are unpublished — foreground readers see nothing
    /// until [`Store::publish_pin_photos`] runs.
    pub async fn create_photos(
        &self,
        pin: PinKey,
        photos: &[NewPhoto],
        placeholder: &[u8],
    ) -> Result<Vec<PhotoRecord>, StoreError> {
        if placeholder.is_empty() {
            return Err(StoreError::EmptyImage);
        }
        let created_at = Utc::now();
        let ts = created_at.timestamp_millis();

        let conn = self.lock()?;

        let pin_exists: Option<i64> = conn
            .query_row("SELECT id FROM pins WHERE id = ?1", [pin.0], |row| {
                row.get(0)
            })
            .optional()
            .map_err(StoreError::query)?;
        if pin_exists.is_none() {
            return Err(StoreError::pin_not_found(pin.0));
        }

        conn.execute("BEGIN TRANSACTION", [])
            .map_err(StoreError::query)?;

        let result = (|| {
            let mut stmt = conn
                .prepare_cached(
                    "INSERT INTO photos (pin_id, title, remote_url, image, published, created_at)
                     VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                )
                .map_err(StoreError::query)?;

            let mut records = Vec::with_capacity(photos.len());
            for photo in photos {
                stmt.execute(rusqlite::params![
                    pin.0,
                    photo.title,
                    photo.remote_url,
                    placeholder,
                    ts,
                ])
                .map_err(StoreError::query)?;
                records.push(PhotoRecord {
                    key: PhotoKey(conn.last_insert_rowid()),
                    pin,
                    title: photo.title.clone(),
                    remote_url: Some(photo.remote_url.clone()),
                    image: placeholder.to_vec(),
                    created_at,
                });
            }
            Ok::<_, StoreError>(records)
        })();

        match result {
            Ok(records) => {
                conn.execute("COMMIT", []).map_err(StoreError::query)?;
                Ok(records)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Stage downloaded bytes for one photo on the background surface. The
    /// write is atomic: foreground readers keep seeing the previous image
    /// until the staged bytes are propagated.
    pub async fn update_photo_image(&self, key: PhotoKey, bytes: &[u8]) -> Result<(), StoreError> {
        if bytes.is_empty() {
            return Err(StoreError::EmptyImage);
        }
        let conn = self.lock()?;
        let rows = conn
            .execute(
                "UPDATE photos SET staged_image = ?1 WHERE id = ?2",
                rusqlite::params![bytes, key.0],
            )
            .map_err(StoreError::query)?;
        if rows == 0 {
            return Err(StoreError::photo_not_found(key.0));
        }
        Ok(())
    }

    /// Background-surface read: staged bytes when present, committed bytes
    /// otherwise. This is what the sync engine sees mid-batch.
    pub async fn photo(&self, key: PhotoKey) -> Result<PhotoRecord, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, pin_id, title, remote_url, COALESCE(staged_image, image), created_at
             FROM photos WHERE id = ?1",
            [key.0],
            row_to_photo,
        )
        .optional()
        .map_err(StoreError::query)?
        .ok_or_else(|| StoreError::photo_not_found(key.0))
    }

    /// Count of all photo rows owned by a pin, published or not. Drives the
    /// engine's fetch-or-not decision.
    pub async fn photo_count(&self, pin: PinKey) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM photos WHERE pin_id = ?1",
                [pin.0],
                |row| row.get(0),
            )
            .map_err(StoreError::query)?;
        Ok(count as u64)
    }

    // ── Propagation: background → foreground ──

    /// Propagate one photo's staged state to the foreground surface. The
    /// merge touches only this row, so sibling workers may call it
    /// concurrently in any order.
    pub async fn publish_photo(&self, key: PhotoKey) -> Result<(), StoreError> {
        let pin = {
            let conn = self.lock()?;
            let pin: Option<i64> = conn
                .query_row(
                    "SELECT pin_id FROM photos WHERE id = ?1",
                    [key.0],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StoreError::query)?;
            let pin = pin.ok_or_else(|| StoreError::photo_not_found(key.0))?;

            conn.execute(
                "UPDATE photos
                 SET image = COALESCE(staged_image, image), staged_image = NULL, published = 1
                 WHERE id = ?1",
                [key.0],
            )
            .map_err(StoreError::query)?;
            PinKey(pin)
        };
        self.emit(pin);
        Ok(())
    }

    /// Propagate every photo a pin owns in one commit — used right after
    /// placeholder creation so foreground readers see the whole batch at
    /// once. Returns the number of rows published.
    pub async fn publish_pin_photos(&self, pin: PinKey) -> Result<usize, StoreError> {
        let rows = {
            let conn = self.lock()?;
            let pin_exists: Option<i64> = conn
                .query_row("SELECT id FROM pins WHERE id = ?1", [pin.0], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(StoreError::query)?;
            if pin_exists.is_none() {
                return Err(StoreError::pin_not_found(pin.0));
            }

            conn.execute(
                "UPDATE photos
                 SET image = COALESCE(staged_image, image), staged_image = NULL, published = 1
                 WHERE pin_id = ?1",
                [pin.0],
            )
            .map_err(StoreError::query)?
        };
        self.emit(pin);
        Ok(rows)
    }

    // ── Photos: foreground surface ──

    /// Foreground read: a pin's published photos, ordered by creation time
    /// (key as tiebreak within a batch). Every image blob is non-empty.
    pub async fn visible_photos(&self, pin: PinKey) -> Result<Vec<PhotoRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, pin_id, title, remote_url, image, created_at
                 FROM photos WHERE pin_id = ?1 AND published = 1
                 ORDER BY created_at, id",
            )
            .map_err(StoreError::query)?;
        let photos = stmt
            .query_map([pin.0], row_to_photo)
            .map_err(StoreError::query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::query)?;
        Ok(photos)
    }

    /// Foreground delete of a single photo. Independent of any in-flight
    /// batch for sibling photos.
    pub async fn delete_photo(&self, key: PhotoKey) -> Result<(), StoreError> {
        let pin = {
            let conn = self.lock()?;
            let pin: Option<i64> = conn
                .query_row(
                    "SELECT pin_id FROM photos WHERE id = ?1",
                    [key.0],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StoreError::query)?;
            let pin = pin.ok_or_else(|| StoreError::photo_not_found(key.0))?;
            conn.execute("DELETE FROM photos WHERE id = ?1", [key.0])
                .map_err(StoreError::query)?;
            PinKey(pin)
        };
        tracing::debug!(photo = %key, pin = %pin, "deleted photo");
        self.emit(pin);
        Ok(())
    }

    /// Remove every photo a pin owns, on both surfaces, in one commit.
    /// Returns the number of rows removed.
    pub async fn delete_photos_for_pin(&self, pin: PinKey) -> Result<usize, StoreError> {
        let rows = {
            let conn = self.lock()?;
            let pin_exists: Option<i64> = conn
                .query_row("SELECT id FROM pins WHERE id = ?1", [pin.0], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(StoreError::query)?;
            if pin_exists.is_none() {
                return Err(StoreError::pin_not_found(pin.0));
            }
            conn.execute("DELETE FROM photos WHERE pin_id = ?1", [pin.0])
                .map_err(StoreError::query)?
        };
        tracing::debug!(pin = %pin, removed = rows, "cleared album");
        self.emit(pin);
        Ok(rows)
    }
}

fn configure(conn: &Connection) -> Result<(), StoreError> {
    // WAL keeps interactive reads from blocking behind bulk writes.
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(StoreError::Migration)?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(StoreError::Migration)?;
    // Required for ON DELETE CASCADE from pins to photos.
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(StoreError::Migration)?;
    Ok(())
}

fn timestamp_from_millis(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn row_to_pin(row: &rusqlite::Row<'_>) -> rusqlite::Result<PinRecord> {
    Ok(PinRecord {
        key: PinKey(row.get(0)?),
        coordinate: Coordinate::from_stored(row.get(1)?, row.get(2)?),
        created_at: timestamp_from_millis(row.get(3)?),
    })
}

fn row_to_photo(row: &rusqlite::Row<'_>) -> rusqlite::Result<PhotoRecord> {
    Ok(PhotoRecord {
        key: PhotoKey(row.get(0)?),
        pin: PinKey(row.get(1)?),
        title: row.get(2)?,
        remote_url: row.get(3)?,
        image: row.get(4)?,
        created_at: timestamp_from_millis(row.get(5)?),
    })
}
