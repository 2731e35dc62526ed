//! Decoding of raw per-map placement dumps.
//!
//! A raw map file carries its actors as fixed-layout arrays rather than named
//! structures. [`ActorRecord::decode`] is the only place that knows the
//! offsets; everything downstream works with named fields. Anything the
//! decoder does not understand is carried verbatim inside the `data` payload.
//!
//! Decoding is strict: a short record, a wrongly typed field or an embedded
//! JSON string that does not parse is reported as
//! [`PlacedbError::Corruption`] and aborts the build that asked for it.
use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::{json, Value};

use crate::construct::{
    hash_text, AiGroup, AiGroupReference, IdGenerator, MapId, ObjId, PlacementObject, RegionLevel,
    RegionRow,
};
use crate::error::{PlacedbError, Result};

// ------------- Layout -------------
const NAME: usize = 0;
const TRANSLATE: usize = 1;
const ROTATE: usize = 2;
const SCALE: usize = 3;
const GEN_GROUP: usize = 4;
const GROUP07: usize = 5;
const GROUP10: usize = 6;
const REGION12: usize = 7;
const DROPS: usize = 8;
const EQUIP: usize = 9;
const UI_DROPS: usize = 10;
const UI_EQUIP: usize = 11;
const CONDITIONS: usize = 12;
const PARAMS: usize = 13;
const HASH: usize = 14;
const DYNAMIC: usize = 15;
const LINKS: usize = 16;
const FLAGS: usize = 17;
const ACTOR: usize = 18;

/// Number of positional fields every actor record must carry. Trailing
/// fields beyond this are kept as `Extra`.
pub const ACTOR_ARITY: usize = 19;

/// One actor record with every positional field given a name.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorRecord {
    pub name: Option<String>,
    pub translate: Option<Value>,
    pub rotate: Value,
    pub scale: Option<Value>,
    pub gen_group: Option<i64>,
    pub group07_id: Option<i64>,
    pub group10_id: Option<i64>,
    pub region12: Option<Value>,
    pub drops: Option<Value>,
    pub equip: Option<Value>,
    pub ui_drops: Option<Value>,
    pub ui_equip: Option<Value>,
    pub conditions: Value,
    pub params: Value,
    pub hash_id: i64,
    pub dynamic: Option<Value>,
    pub links: Value,
    pub flags: Value,
    pub actor: String,
    pub extra: Vec<Value>,
}

impl ActorRecord {
    /// Decodes one positional record. Errors are plain messages; the caller
    /// knows which map and record they belong to.
    pub fn decode(raw: Value) -> std::result::Result<Self, String> {
        let mut fields = match raw {
            Value::Array(fields) => fields,
            other => return Err(format!("expected an array, found {}", kind_of(&other))),
        };
        if fields.len() < ACTOR_ARITY {
            return Err(format!(
                "expected at least {ACTOR_ARITY} fields, found {}",
                fields.len()
            ));
        }
        let extra = fields.split_off(ACTOR_ARITY);
        let mut take = |offset: usize| std::mem::take(&mut fields[offset]);

        Ok(Self {
            name: optional_string(take(NAME), "name")?,
            translate: vector(take(TRANSLATE), "translate", false)?,
            rotate: take(ROTATE),
            scale: vector(take(SCALE), "scale", true)?,
            gen_group: optional_integer(take(GEN_GROUP), "gen_group")?,
            group07_id: optional_integer(take(GROUP07), "group07_id")?,
            group10_id: optional_integer(take(GROUP10), "group10_id")?,
            region12: optional(take(REGION12)),
            drops: optional(take(DROPS)),
            equip: optional(take(EQUIP)),
            ui_drops: optional(take(UI_DROPS)),
            ui_equip: optional(take(UI_EQUIP)),
            conditions: take(CONDITIONS),
            params: params(take(PARAMS))?,
            hash_id: hash_value(take(HASH))?
                .ok_or_else(|| "hash is missing".to_string())?,
            dynamic: match take(DYNAMIC) {
                Value::Null => None,
                Value::Object(map) => Some(Value::Object(map)),
                other => return Err(format!("dynamic: expected an object, found {}", kind_of(&other))),
            },
            links: take(LINKS),
            flags: take(FLAGS),
            actor: optional_string(take(ACTOR), "actor")?
                .ok_or_else(|| "actor is missing".to_string())?,
            extra,
        })
    }

    /// The whole record as a named object. This is what the `data` column
    /// holds.
    pub fn data(&self) -> Value {
        json!({
            "Name": self.name,
            "Translate": self.translate,
            "Rotate": self.rotate,
            "Scale": self.scale,
            "GenGroup": self.gen_group,
            "Group07": self.group07_id,
            "Group10": self.group10_id,
            "Region12": self.region12,
            "Drops": self.drops,
            "Equip": self.equip,
            "UiDrops": self.ui_drops,
            "UiEquip": self.ui_equip,
            "Conditions": self.conditions,
            "Params": self.params,
            "HashId": self.hash_id as u64,
            "Dynamic": self.dynamic,
            "Links": self.links,
            "Flags": self.flags,
            "Actor": self.actor,
            "Extra": self.extra,
        })
    }

    pub fn into_object(self, objid: ObjId, map: &MapId) -> PlacementObject {
        let data = canonical(&self.data());
        PlacementObject {
            objid,
            map: map.clone(),
            name: self.name.unwrap_or_else(|| self.actor.clone()),
            actor: self.actor,
            translate: self.translate.as_ref().map(canonical),
            scale: self.scale.as_ref().map(canonical),
            params: canonical(&self.params),
            conditions: canonical(&self.conditions),
            drops: self.drops.as_ref().map(canonical),
            equip: self.equip.as_ref().map(canonical),
            ui_drops: self.ui_drops.as_ref().map(canonical),
            ui_equip: self.ui_equip.as_ref().map(canonical),
            hash_id: self.hash_id,
            hash: hash_text(self.hash_id),
            data,
            group07_id: self.group07_id,
            group10_id: self.group10_id,
            region12: self.region12.as_ref().map(canonical),
            gen_group: self.gen_group,
        }
    }
}

/// Storage form of a structured field. Decoding it with `serde_json` gives
/// back the identical value.
pub fn canonical(value: &Value) -> String {
    value.to_string()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn optional(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}

fn optional_string(value: Value, field: &str) -> std::result::Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(format!("{field}: expected a string, found {}", kind_of(&other))),
    }
}

fn optional_integer(value: Value, field: &str) -> std::result::Result<Option<i64>, String> {
    match &value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{field}: {n} is not a 64-bit integer")),
        other => Err(format!("{field}: expected an integer, found {}", kind_of(other))),
    }
}

// Hashes are unsigned 64-bit; negative values are accepted as already-stored bit patterns.
fn hash_value(value: Value) -> std::result::Result<Option<i64>, String> {
    match &value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(|h| h as i64)
            .or_else(|| n.as_i64())
            .map(Some)
            .ok_or_else(|| format!("hash: {n} is not a 64-bit integer")),
        other => Err(format!("hash: expected an integer, found {}", kind_of(other))),
    }
}

// Translations are 3-vectors; scales may also be a single uniform factor.
fn vector(value: Value, field: &str, allow_scalar: bool) -> std::result::Result<Option<Value>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) if allow_scalar => Ok(Some(Value::Number(n))),
        Value::Array(items) => {
            if let Some(bad) = items.iter().find(|item| !item.is_number()) {
                return Err(format!("{field}: expected numbers, found {}", kind_of(bad)));
            }
            Ok(Some(Value::Array(items)))
        }
        other => Err(format!("{field}: expected a vector, found {}", kind_of(&other))),
    }
}

// Parameters show up either inline or as JSON text embedded in a string.
fn params(value: Value) -> std::result::Result<Value, String> {
    match value {
        Value::String(text) => {
            serde_json::from_str(&text).map_err(|e| format!("params: embedded JSON does not parse: {e}"))
        }
        Value::Null => Ok(Value::Null),
        v @ (Value::Object(_) | Value::Array(_)) => Ok(v),
        other => Err(format!("params: expected an object, found {}", kind_of(&other))),
    }
}

// ------------- Map files -------------
#[derive(Debug, Deserialize)]
pub struct RawAiGroup {
    pub hash: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub references: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RawRegion {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub data: Value,
}

/// The contents of one `<map_type>/<map_name>.json` file.
#[derive(Debug, Deserialize)]
pub struct MapFile {
    pub actors: Vec<Value>,
    #[serde(default)]
    pub ai_groups: Vec<RawAiGroup>,
    #[serde(default)]
    pub regions: BTreeMap<String, Vec<RawRegion>>,
}

impl MapFile {
    pub fn parse(map: &MapId, text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| PlacedbError::corruption(map.to_string(), format!("map file does not parse: {e}")))
    }
}

/// Everything one map contributes to a store.
#[derive(Debug, Default)]
pub struct DecodedMap {
    pub objects: Vec<PlacementObject>,
    pub ai_groups: Vec<AiGroup>,
    pub references: Vec<AiGroupReference>,
    pub regions: Vec<RegionRow>,
}

/// Decodes a whole map. Object ids are drawn from `objids` in actor order and
/// AI group ids from `group_ids` in group order.
pub fn decode_map(
    map: &MapId,
    file: MapFile,
    objids: &mut IdGenerator,
    group_ids: &mut IdGenerator,
) -> Result<DecodedMap> {
    let corrupt = |message: String| PlacedbError::corruption(map.to_string(), message);
    let mut decoded = DecodedMap::default();
    let mut by_hash: HashMap<i64, ObjId> = HashMap::new();

    for (index, raw) in file.actors.into_iter().enumerate() {
        let record = ActorRecord::decode(raw).map_err(|m| corrupt(format!("actor {index}: {m}")))?;
        if by_hash.contains_key(&record.hash_id) {
            return Err(corrupt(format!("actor {index}: duplicate hash {}", hash_text(record.hash_id))));
        }
        let objid = objids.generate();
        by_hash.insert(record.hash_id, objid);
        decoded.objects.push(record.into_object(objid, map));
    }

    for raw in file.ai_groups {
        let id = group_ids.generate();
        let mut targets = Vec::with_capacity(raw.references.len());
        for hash in &raw.references {
            let objid = by_hash
                .get(&(*hash as i64))
                .ok_or_else(|| corrupt(format!("AI group {} references unknown actor {hash}", raw.hash)))?;
            targets.push(*objid);
        }
        targets.sort_unstable();
        targets.dedup();
        decoded.references.extend(
            targets
                .into_iter()
                .map(|object_id| AiGroupReference { object_id, ai_group_id: id }),
        );
        decoded.ai_groups.push(AiGroup {
            id,
            map: map.clone(),
            hash_id: raw.hash as i64,
            name: raw.name,
            kind: raw.kind,
            data: canonical(&raw.data),
        });
    }

    for (token, rows) in file.regions {
        let level: RegionLevel = token.parse().map_err(|e: PlacedbError| corrupt(e.to_string()))?;
        decoded.regions.extend(rows.into_iter().map(|row| RegionRow {
            level,
            id: row.id,
            map_name: map.map_name.clone(),
            name: row.name,
            data: canonical(&row.data),
        }));
    }

    Ok(decoded)
}
