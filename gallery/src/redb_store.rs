//! Redb-backed persistent identity store.
//!
//! Layout:
//!
//! ```text
//! identities: i64  -> msgpack(StoredIdentity)
//! names:      &str -> i64        unique name index
//! meta:       &str -> i64        "next_id" sequence
//! ```
//!
//! Ids are never reused, so ascending key order in `identities` is the
//! enrollment order of the gallery.

use std::fmt;
use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};

use crate::GalleryError;
use crate::store::{Store, StoredIdentity};

const IDENTITIES: TableDefinition<i64, &[u8]> = TableDefinition::new("identities");
const NAMES: TableDefinition<&str, i64> = TableDefinition::new("names");
const META: TableDefinition<&str, i64> = TableDefinition::new("meta");

const NEXT_ID_KEY: &str = "next_id";

fn unavailable(e: impl fmt::Display) -> GalleryError {
    GalleryError::StoreUnavailable(e.to_string())
}

fn encode(row: &StoredIdentity) -> Result<Vec<u8>, GalleryError> {
    rmp_serde::to_vec_named(row).map_err(|e| unavailable(format!("encode '{}': {e}", row.name)))
}

fn decode(data: &[u8]) -> Result<StoredIdentity, rmp_serde::decode::Error> {
    rmp_serde::from_slice(data)
}

/// A persistent [`Store`] backed by redb.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GalleryError> {
        let db = Database::create(path).map_err(unavailable)?;

        // Create the tables if they don't exist.
        let tx = db.begin_write().map_err(unavailable)?;
        {
            tx.open_table(IDENTITIES).map_err(unavailable)?;
            tx.open_table(NAMES).map_err(unavailable)?;
            tx.open_table(META).map_err(unavailable)?;
        }
        tx.commit().map_err(unavailable)?;

        Ok(Self { db })
    }
}

#[async_trait::async_trait]
impl Store for RedbStore {
    async fn load_all(&self) -> Result<Vec<StoredIdentity>, GalleryError> {
        let tx = self.db.begin_read().map_err(unavailable)?;
        let table = tx.open_table(IDENTITIES).map_err(unavailable)?;

        let mut rows = Vec::new();
        for item in table.iter().map_err(unavailable)? {
            let (key, value) = item.map_err(unavailable)?;
            match decode(value.value()) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    tracing::warn!(id = key.value(), error = %e, "store: skipping undecodable identity");
                }
            }
        }
        Ok(rows)
    }

    async fn upsert(&self, name: &str, embedding: &[f32]) -> Result<i64, GalleryError> {
        let tx = self.db.begin_write().map_err(unavailable)?;
        let id = {
            let mut names = tx.open_table(NAMES).map_err(unavailable)?;
            let mut rows = tx.open_table(IDENTITIES).map_err(unavailable)?;
            let mut meta = tx.open_table(META).map_err(unavailable)?;
            let now = Utc::now();

            let existing = names.get(name).map_err(unavailable)?.map(|g| g.value());
            let previous = match existing {
                Some(id) => rows
                    .get(id)
                    .map_err(unavailable)?
                    .and_then(|g| decode(g.value()).ok()),
                None => None,
            };

            let row = match (existing, previous) {
                (Some(_), Some(mut row)) => {
                    row.embedding = Some(embedding.to_vec());
                    row.updated_at = now;
                    row
                }
                // Name index points at a missing or corrupt row: rewrite it.
                (Some(id), None) => StoredIdentity {
                    id,
                    name: name.to_string(),
                    embedding: Some(embedding.to_vec()),
                    created_at: now,
                    updated_at: now,
                },
                (None, _) => {
                    let next = meta.get(NEXT_ID_KEY).map_err(unavailable)?.map(|g| g.value());
                    let id = next.unwrap_or(0) + 1;
                    meta.insert(NEXT_ID_KEY, id).map_err(unavailable)?;
                    names.insert(name, id).map_err(unavailable)?;
                    StoredIdentity {
                        id,
                        name: name.to_string(),
                        embedding: Some(embedding.to_vec()),
                        created_at: now,
                        updated_at: now,
                    }
                }
            };

            let data = encode(&row)?;
            rows.insert(row.id, data.as_slice()).map_err(unavailable)?;
            row.id
        };
        tx.commit().map_err(unavailable)?;
        Ok(id)
    }

    async fn find_id_by_name(&self, name: &str) -> Result<Option<i64>, GalleryError> {
        let tx = self.db.begin_read().map_err(unavailable)?;
        let names = tx.open_table(NAMES).map_err(unavailable)?;
        Ok(names.get(name).map_err(unavailable)?.map(|g| g.value()))
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, GalleryError> {
        let tx = self.db.begin_write().map_err(unavailable)?;
        let removed = {
            let mut rows = tx.open_table(IDENTITIES).map_err(unavailable)?;
            let mut names = tx.open_table(NAMES).map_err(unavailable)?;

            let removed = rows
                .remove(id)
                .map_err(unavailable)?
                .map(|g| decode(g.value()).map(|row| row.name));

            match removed {
                Some(Ok(name)) => {
                    names.remove(name.as_str()).map_err(unavailable)?;
                    true
                }
                Some(Err(_)) => {
                    // Corrupt row: drop whichever name still points at it.
                    let mut stale = Vec::new();
                    for item in names.iter().map_err(unavailable)? {
                        let (k, v) = item.map_err(unavailable)?;
                        if v.value() == id {
                            stale.push(k.value().to_string());
                        }
                    }
                    for name in stale {
                        names.remove(name.as_str()).map_err(unavailable)?;
                    }
                    true
                }
                None => false,
            }
        };
        tx.commit().map_err(unavailable)?;
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), GalleryError> {
        let tx = self.db.begin_read().map_err(unavailable)?;
        tx.open_table(IDENTITIES).map_err(unavailable)?;
        Ok(())
    }
}
