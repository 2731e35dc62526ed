#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

use placedb::persist::build_store;

/// A positional actor record with every field at a plain default.
pub fn actor(name: &str, actor: &str, hash: i64, gen_group: Option<i64>) -> Vec<Value> {
    vec![
        json!(name),
        json!([1.0, 2.0, 3.0]),
        json!([0.0, 0.0, 0.0]),
        json!([1.0, 1.0, 1.0]),
        json!(gen_group),
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        json!({}),
        json!({}),
        json!(hash),
        json!({ "Location": "Plateau", "UILocation": "Great Plateau" }),
        json!([]),
        json!(0),
        json!(actor),
    ]
}

/// A scratch content directory laid out as `<map_type>/<map_name>.json`.
pub struct Content {
    dir: TempDir,
}

impl Content {
    pub fn new() -> Self {
        Self { dir: TempDir::new().expect("temp dir") }
    }
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
    pub fn write_map(&self, map_type: &str, map_name: &str, body: Value) {
        let dir = self.dir.path().join(map_type);
        fs::create_dir_all(&dir).expect("map type dir");
        fs::write(dir.join(format!("{map_name}.json")), body.to_string()).expect("map file");
    }
    pub fn write_actors(&self, map_type: &str, map_name: &str, actors: Vec<Vec<Value>>) {
        self.write_map(map_type, map_name, json!({ "actors": actors }));
    }
    pub fn write_raw(&self, map_type: &str, map_name: &str, text: &str) {
        let dir = self.dir.path().join(map_type);
        fs::create_dir_all(&dir).expect("map type dir");
        fs::write(dir.join(format!("{map_name}.json")), text).expect("map file");
    }
}

/// A directory to hold built stores, and the store path inside it.
pub fn store_dir() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("map.db");
    (dir, path)
}

pub fn build(content: &Content) -> (TempDir, PathBuf) {
    let (dir, path) = store_dir();
    build_store(content.path(), &path).expect("build");
    (dir, path)
}

/// Map `MainField/Field` with three actors sharing
/// generation group 5, plus one loner.
pub fn field_content() -> Content {
    let content = Content::new();
    content.write_actors(
        "MainField",
        "Field",
        vec![
            actor("Moblin Camp Guard", "Enemy_Moblin", 10, Some(5)),
            actor("Moblin Camp Archer", "Enemy_Moblin_Bow", 20, Some(5)),
            actor("Camp Fire", "Obj_Fire", 30, Some(5)),
            actor("Lone Tree", "Obj_Tree", 40, None),
        ],
    );
    content
}
