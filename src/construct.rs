// Fundamental identities and rows shared by ingestion and querying.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlacedbError;

// ------------- Identity -------------
pub type ObjId = i64;

pub const GENESIS: ObjId = 0;

/// Hands out strictly increasing identities, starting right after [`GENESIS`].
///
/// A build owns one generator per identity space (objects, AI groups), so
/// the assigned ids depend only on the order in which rows are offered.
#[derive(Debug)]
pub struct IdGenerator {
    lower_bound: ObjId,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { lower_bound: GENESIS }
    }
    pub fn generate(&mut self) -> ObjId {
        self.lower_bound += 1;
        self.lower_bound
    }
    /// The most recently handed out id, or [`GENESIS`] if none was.
    pub fn current(&self) -> ObjId {
        self.lower_bound
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Location -------------
/// The `(map_type, map_name)` pair every placement belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId {
    pub map_type: String,
    pub map_name: String,
}

impl MapId {
    pub fn new(map_type: impl Into<String>, map_name: impl Into<String>) -> Self {
        Self { map_type: map_type.into(), map_name: map_name.into() }
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.map_type, self.map_name)
    }
}

/// Composite key of an object: its map plus the map-scoped hash id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub map: MapId,
    pub hash_id: i64,
}

impl ObjectKey {
    pub fn new(map_type: impl Into<String>, map_name: impl Into<String>, hash_id: i64) -> Self {
        Self { map: MapId::new(map_type, map_name), hash_id }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.map, self.hash_id)
    }
}

// ------------- Region granularity -------------
/// The only region tables that exist. Table names are taken from here and
/// nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionLevel {
    Region07,
    Region12,
    Region16,
    Region18,
}

impl RegionLevel {
    pub const ALL: [RegionLevel; 4] = [
        RegionLevel::Region07,
        RegionLevel::Region12,
        RegionLevel::Region16,
        RegionLevel::Region18,
    ];
    pub fn table(&self) -> &'static str {
        match self {
            RegionLevel::Region07 => "region07",
            RegionLevel::Region12 => "region12",
            RegionLevel::Region16 => "region16",
            RegionLevel::Region18 => "region18",
        }
    }
}

impl FromStr for RegionLevel {
    type Err = PlacedbError;
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        RegionLevel::ALL
            .into_iter()
            .find(|level| level.table() == token)
            .ok_or_else(|| PlacedbError::InvalidInput(format!("unknown region granularity '{token}'")))
    }
}

impl fmt::Display for RegionLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.table())
    }
}

// ------------- Rows -------------
/// One decoded placement, ready to insert. Structured fields are already
/// canonical JSON text.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementObject {
    pub objid: ObjId,
    pub map: MapId,
    pub actor: String,
    pub name: String,
    pub translate: Option<String>,
    pub scale: Option<String>,
    pub params: String,
    pub conditions: String,
    pub drops: Option<String>,
    pub equip: Option<String>,
    pub ui_drops: Option<String>,
    pub ui_equip: Option<String>,
    pub hash_id: i64,
    pub hash: String,
    pub data: String,
    pub group07_id: Option<i64>,
    pub group10_id: Option<i64>,
    pub region12: Option<String>,
    pub gen_group: Option<i64>,
}

/// Text form of a hash id, as shown to users and indexed for search.
pub fn hash_text(hash_id: i64) -> String {
    format!("0x{:016X}", hash_id as u64)
}

/// Hash ids are unsigned 64-bit values stored as their `i64` bit pattern.
pub fn parse_hash(text: &str) -> Option<i64> {
    text.parse::<u64>().ok().map(|h| h as i64)
}

pub fn serialize_hash<S: serde::Serializer>(hash_id: &i64, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(*hash_id as u64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionRow {
    pub level: RegionLevel,
    pub id: i64,
    pub map_name: String,
    pub name: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiGroup {
    pub id: ObjId,
    pub map: MapId,
    pub hash_id: i64,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub data: String,
}

/// Directed edge from a placement to an AI group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiGroupReference {
    pub object_id: ObjId,
    pub ai_group_id: ObjId,
}
