//! Reconstruction of stored rows into the shapes handed to clients.
//!
//! Objects are stored flat, with every structured field as JSON text. A view
//! decodes those columns again, adds the computed fields clients rely on
//! (`pos`, `Location`, `ui_location`) and trims itself to the requested
//! [`Shape`].
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::construct::{serialize_hash, ObjId};
use crate::error::{PlacedbError, Result};

/// How much of an object a response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Everything, for single object lookups.
    Full,
    /// Listing form: no `data`, and `map_name` only when asked for.
    Minimal { with_map_names: bool },
}

/// Column list matching [`ObjectRow::from_row`].
pub const OBJECT_COLUMNS: &str = "objid, map_type, map_name, actor, name, translate, scale, \
    params, conditions, drops, equip, ui_drops, ui_equip, hash_id, hash, data, \
    group07_id, group10_id, region12, gen_group";

/// An `objs` row exactly as stored.
#[derive(Debug, Clone)]
pub struct ObjectRow {
    pub objid: ObjId,
    pub map_type: String,
    pub map_name: String,
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

impl ObjectRow {
    pub fn from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            objid: r.get(0)?,
            map_type: r.get(1)?,
            map_name: r.get(2)?,
            actor: r.get(3)?,
            name: r.get(4)?,
            translate: r.get(5)?,
            scale: r.get(6)?,
            params: r.get(7)?,
            conditions: r.get(8)?,
            drops: r.get(9)?,
            equip: r.get(10)?,
            ui_drops: r.get(11)?,
            ui_equip: r.get(12)?,
            hash_id: r.get(13)?,
            hash: r.get(14)?,
            data: r.get(15)?,
            group07_id: r.get(16)?,
            group10_id: r.get(17)?,
            region12: r.get(18)?,
            gen_group: r.get(19)?,
        })
    }

    pub fn reconstruct(self, shape: Shape) -> Result<ObjectView> {
        let map = format!("{}/{}", self.map_type, self.map_name);
        let decode = |column: &str, text: &str| -> Result<Value> {
            serde_json::from_str(text).map_err(|e| {
                PlacedbError::corruption(map.clone(), format!("object {} column {column}: {e}", self.objid))
            })
        };
        let decode_opt = |column: &str, text: &Option<String>| -> Result<Option<Value>> {
            text.as_deref().map(|t| decode(column, t)).transpose()
        };

        let translate = decode_opt("translate", &self.translate)?;
        let data = decode("data", &self.data)?;
        let dynamic = data.get("Dynamic");
        let location = dynamic.and_then(|d| d.get("Location")).cloned();
        let ui_location = dynamic.and_then(|d| d.get("UILocation")).cloned();

        let (map_name, data) = match shape {
            Shape::Full => (Some(self.map_name.clone()), Some(data)),
            Shape::Minimal { with_map_names } => (with_map_names.then(|| self.map_name.clone()), None),
        };

        Ok(ObjectView {
            objid: self.objid,
            map_type: self.map_type.clone(),
            map_name,
            actor: self.actor.clone(),
            name: self.name.clone(),
            hash_id: self.hash_id,
            hash: self.hash.clone(),
            pos: position(translate.as_ref()),
            translate,
            scale: decode_opt("scale", &self.scale)?,
            params: decode("params", &self.params)?,
            conditions: decode("conditions", &self.conditions)?,
            drops: decode_opt("drops", &self.drops)?,
            equip: decode_opt("equip", &self.equip)?,
            ui_drops: decode_opt("ui_drops", &self.ui_drops)?,
            ui_equip: decode_opt("ui_equip", &self.ui_equip)?,
            group07_id: self.group07_id,
            group10_id: self.group10_id,
            region12: decode_opt("region12", &self.region12)?,
            gen_group: self.gen_group,
            location,
            ui_location,
            data,
        })
    }
}

/// The externally visible form of a placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectView {
    pub objid: ObjId,
    pub map_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_name: Option<String>,
    pub actor: String,
    pub name: String,
    #[serde(serialize_with = "serialize_hash")]
    pub hash_id: i64,
    pub hash: String,
    pub pos: [f64; 3],
    pub translate: Option<Value>,
    pub scale: Option<Value>,
    pub params: Value,
    pub conditions: Value,
    pub drops: Option<Value>,
    pub equip: Option<Value>,
    pub ui_drops: Option<Value>,
    pub ui_equip: Option<Value>,
    pub group07_id: Option<i64>,
    pub group10_id: Option<i64>,
    pub region12: Option<Value>,
    pub gen_group: Option<i64>,
    #[serde(rename = "Location")]
    pub location: Option<Value>,
    pub ui_location: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// `translate` rounded to two decimals, or the origin when there is none.
pub fn position(translate: Option<&Value>) -> [f64; 3] {
    let mut pos = [0.0; 3];
    if let Some(Value::Array(items)) = translate {
        for (slot, item) in pos.iter_mut().zip(items) {
            *slot = round2(item.as_f64().unwrap_or(0.0));
        }
    }
    pos
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ------------- Regions -------------
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionView {
    pub objid: i64,
    pub id: i64,
    pub map_name: String,
    pub name: String,
    pub data: Value,
}

impl RegionView {
    /// Region payloads are decoded leniently: a payload that does not parse
    /// becomes an empty object instead of failing the request.
    pub fn from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let objid: i64 = r.get(0)?;
        let text: String = r.get(4)?;
        let data = serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(objid, error = %e, "unreadable region payload");
            Value::Object(Map::new())
        });
        Ok(Self { objid, id: r.get(1)?, map_name: r.get(2)?, name: r.get(3)?, data })
    }
}

// ------------- AI groups -------------
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiGroupView {
    pub id: i64,
    pub map_type: String,
    pub map_name: String,
    #[serde(serialize_with = "serialize_hash")]
    pub hash_id: i64,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub data: Value,
}

impl AiGroupView {
    pub const COLUMNS: &'static str = "g.id, g.map_type, g.map_name, g.hash_id, g.name, g.kind, g.data";

    pub fn from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<(Self, String)> {
        let view = Self {
            id: r.get(0)?,
            map_type: r.get(1)?,
            map_name: r.get(2)?,
            hash_id: r.get(3)?,
            name: r.get(4)?,
            kind: r.get(5)?,
            data: Value::Null,
        };
        Ok((view, r.get(6)?))
    }

    /// Attaches the decoded payload; unlike regions, a bad payload is an error.
    pub fn with_data(mut self, text: &str) -> Result<Self> {
        self.data = serde_json::from_str(text).map_err(|e| {
            PlacedbError::corruption(
                format!("{}/{}", self.map_type, self.map_name),
                format!("AI group {} data: {e}", self.id),
            )
        })?;
        Ok(self)
    }
}

// ------------- Icons -------------
/// Icon location relative to the icon directory, addressed by the actor
/// name's digest: `<first two hex digits>/<hex digest>.png`.
pub fn icon_file(actor: &str) -> String {
    let digest = blake3::hash(actor.as_bytes()).to_hex();
    let hex = digest.as_str();
    format!("{}/{}.png", &hex[..2], hex)
}
