//! Shared, swappable access to the current store snapshot.
//!
//! A build never modifies a store in place; it renames a finished file over
//! the old one. [`StoreInterface`] notices that (by comparing a cheap
//! [`StoreStamp`] of the path) and re-points itself to a freshly opened
//! [`Snapshot`]. Requests hold an `Arc<Snapshot>` for their whole duration,
//! so a swap never pulls a connection out from under them: they finish on
//! the file they started on.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::construct::{ObjId, ObjectKey, RegionLevel};
use crate::error::Result;
use crate::persist::open_snapshot;
use crate::query::{Listing, QueryEngine};
use crate::view::{AiGroupView, ObjectView, RegionView};

/// Identifies one version of the store file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStamp {
    modified: Option<SystemTime>,
    len: u64,
    inode: u64,
}

impl StoreStamp {
    pub fn of(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path)?;
        #[cfg(unix)]
        let inode = std::os::unix::fs::MetadataExt::ino(&meta);
        #[cfg(not(unix))]
        let inode = 0;
        Ok(Self { modified: meta.modified().ok(), len: meta.len(), inode })
    }
}

/// One opened, immutable store.
pub struct Snapshot {
    conn: Mutex<Connection>,
    generation: u64,
    stamp: StoreStamp,
    built_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn generation(&self) -> u64 { self.generation }
}

/// Registry handing out the current snapshot to request handlers.
pub struct StoreInterface {
    path: PathBuf,
    current: RwLock<Arc<Snapshot>>,
    generations: AtomicU64,
    accesses: AtomicU64,
}

impl StoreInterface {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = Self::load(&path, 1)?;
        info!(store = %path.display(), built_at = %snapshot.built_at, "store opened");
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(snapshot)),
            generations: AtomicU64::new(1),
            accesses: AtomicU64::new(0),
        })
    }

    fn load(path: &Path, generation: u64) -> Result<Snapshot> {
        // stamp first: if the file is swapped in between, the next check reloads again
        let stamp = StoreStamp::of(path)?;
        let (conn, built_at) = open_snapshot(path)?;
        Ok(Snapshot { conn: Mutex::new(conn), generation, stamp, built_at })
    }

    /// The current snapshot, re-pointing first if the store file was swapped.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        let current = Arc::clone(&*self.current.read()?);
        match StoreStamp::of(&self.path) {
            Ok(stamp) if stamp == current.stamp => Ok(current),
            Ok(_) => match self.reload() {
                Ok(fresh) => Ok(fresh),
                Err(e) => {
                    warn!(error = %e, "keeping previous snapshot");
                    Ok(current)
                }
            },
            Err(e) => {
                warn!(error = %e, "store file not readable, keeping previous snapshot");
                Ok(current)
            }
        }
    }

    /// Opens the store file again and makes it the current snapshot.
    pub fn reload(&self) -> Result<Arc<Snapshot>> {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let fresh = Arc::new(Self::load(&self.path, generation)?);
        *self.current.write()? = Arc::clone(&fresh);
        info!(generation, built_at = %fresh.built_at, "store snapshot swapped");
        Ok(fresh)
    }

    /// Number of queries that reached a store so far.
    pub fn store_accesses(&self) -> u64 {
        self.accesses.load(Ordering::Relaxed)
    }

    /// Runs `f` against the current snapshot.
    pub fn run<T>(&self, f: impl FnOnce(&QueryEngine<'_>) -> Result<T>) -> Result<T> {
        let snapshot = self.snapshot()?;
        Self::run_on(&snapshot, &self.accesses, f)
    }

    /// Runs `f` against a specific snapshot, even one that is no longer current.
    pub fn run_pinned<T>(&self, snapshot: &Snapshot, f: impl FnOnce(&QueryEngine<'_>) -> Result<T>) -> Result<T> {
        Self::run_on(snapshot, &self.accesses, f)
    }

    fn run_on<T>(snapshot: &Snapshot, accesses: &AtomicU64, f: impl FnOnce(&QueryEngine<'_>) -> Result<T>) -> Result<T> {
        let conn = snapshot.conn.lock()?;
        accesses.fetch_add(1, Ordering::Relaxed);
        f(&QueryEngine::new(&conn))
    }

    // Convenience wrappers for the fixed request shapes.
    pub fn object_by_id(&self, objid: ObjId) -> Result<Option<ObjectView>> {
        self.run(|q| q.object_by_id(objid))
    }
    pub fn object_by_key(&self, key: &ObjectKey) -> Result<Option<ObjectView>> {
        self.run(|q| q.object_by_key(key))
    }
    pub fn object_by_hash(&self, hash_id: i64) -> Result<Option<ObjectView>> {
        self.run(|q| q.object_by_hash(hash_id))
    }
    pub fn gen_group(&self, key: &ObjectKey) -> Result<Vec<ObjectView>> {
        self.run(|q| q.gen_group(key))
    }
    pub fn ai_groups(&self, key: &ObjectKey) -> Result<Vec<AiGroupView>> {
        self.run(|q| q.ai_groups(key))
    }
    pub fn list(&self, listing: &Listing) -> Result<Vec<ObjectView>> {
        self.run(|q| q.list(listing))
    }
    pub fn list_ids(&self, listing: &Listing) -> Result<Vec<ObjId>> {
        self.run(|q| q.list_ids(listing))
    }
    pub fn actor_of(&self, objid: ObjId) -> Result<Option<String>> {
        self.run(|q| q.actor_of(objid))
    }
    /// Region rows for a granularity token. The token is checked against the
    /// allow-list before any store is touched.
    pub fn region_rows(&self, token: &str, map_name: &str) -> Result<Vec<RegionView>> {
        let level: RegionLevel = token.parse()?;
        self.run(|q| q.region_rows(level, map_name))
    }
}
