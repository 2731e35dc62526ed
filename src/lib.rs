//! Placedb – an indexed, read-only store of game-world map placements.
//!
//! Raw map dumps describe every placed entity as a positional array. Placedb
//! flattens those into a single SQLite file and answers a fixed set of
//! lookups against it:
//! * A [`construct::PlacementObject`] is one placed entity, identified by a
//!   global `objid` and, within its map, by a content-stable `hash_id`.
//! * A [`construct::RegionRow`] is spatial metadata at one of a fixed set of
//!   granularities ([`construct::RegionLevel`]).
//! * An [`construct::AiGroup`] is a behavior node that objects reference
//!   through [`construct::AiGroupReference`] edges.
//!
//! ## Modules
//! * [`construct`] – Identities, keys and the rows a build inserts.
//! * [`decode`] – Positional record decoding of raw map files.
//! * [`persist`] – Schema, one-transaction bulk load and the atomic store swap.
//! * [`query`] – Query planning and execution for the fixed request shapes.
//! * [`view`] – Reconstruction of stored rows into client-facing shapes.
//! * [`interface`] – Swappable snapshot handle shared by request handlers.
//! * [`server`] – HTTP routes over the interface.
//! * [`settings`] – Layered configuration.
//!
//! ## Building and Reading
//! A build writes `<store>.tmp` inside one transaction and renames it over
//! the store only after committing, so a reader either sees the previous
//! store or the new one. Readers open the file read-only and notice a swap
//! by its stamp.
//!
//! ## Quick Start
//! ```no_run
//! use std::path::Path;
//! use placedb::{persist::build_store, interface::StoreInterface};
//! build_store(Path::new("content/map"), Path::new("map.db")).unwrap();
//! let store = StoreInterface::open("map.db").unwrap();
//! let first = store.object_by_id(1).unwrap();
//! println!("{first:?}");
//! ```

pub mod construct;
pub mod decode;
pub mod error;
pub mod interface;
pub mod persist;
pub mod query;
pub mod server;
pub mod settings;
pub mod view;

pub use error::{PlacedbError, Result};
