mod common;

use rusqlite::Connection;
use serde_json::json;

use placedb::construct::RegionLevel;
use placedb::interface::StoreInterface;
use placedb::persist::build_store;
use placedb::query::plan_region;
use placedb::PlacedbError;

use common::{actor, build, store_dir, Content};

fn region_content() -> Content {
    let content = Content::new();
    content.write_map(
        "MainField",
        "Field",
        json!({
            "actors": [actor("Guard", "Enemy_Moblin", 1, None)],
            "regions": {
                "region12": [
                    { "id": 1, "name": "Hyrule Field", "data": { "Climate": "Temperate" } },
                    { "id": 2, "name": "Plateau", "data": { "Climate": "Cold" } }
                ],
                "region18": [ { "id": 7, "name": "Central", "data": {} } ]
            }
        }),
    );
    content
}

#[test]
fn unknown_tokens_never_reach_the_store() {
    let content = region_content();
    let (_dir, path) = build(&content);
    let store = StoreInterface::open(&path).unwrap();

    for token in ["region99", "objs", "region12; drop table objs", "Region12", ""] {
        let before = store.store_accesses();
        let err = store.region_rows(token, "Field").unwrap_err();
        assert!(matches!(err, PlacedbError::InvalidInput(_)), "{token}: {err}");
        assert_eq!(store.store_accesses(), before, "{token} touched the store");
    }
}

#[test]
fn allowed_tokens_select_their_own_table() {
    let content = region_content();
    let (_dir, path) = build(&content);
    let store = StoreInterface::open(&path).unwrap();

    let rows = store.region_rows("region12", "Field").unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Hyrule Field", "Plateau"]);
    assert_eq!(rows[0].data, json!({ "Climate": "Temperate" }));

    assert_eq!(store.region_rows("region18", "Field").unwrap().len(), 1);
    assert!(store.region_rows("region07", "Field").unwrap().is_empty());
    assert!(store.region_rows("region12", "Elsewhere").unwrap().is_empty());

    for level in RegionLevel::ALL {
        assert!(plan_region(level, "Field").sql.contains(&format!("from {} ", level.table())));
        assert_eq!(level.table().parse::<RegionLevel>().unwrap(), level);
    }
}

#[test]
fn unreadable_payload_degrades_to_empty_object() {
    let content = region_content();
    let (_dir, path) = build(&content);
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute("update region12 set data = '{\"Climate\":' where id = 2", []).unwrap();
    }
    let store = StoreInterface::open(&path).unwrap();
    let rows = store.region_rows("region12", "Field").unwrap();
    assert_eq!(rows[1].data, json!({}));
    assert_eq!(rows[0].data, json!({ "Climate": "Temperate" }));
}

#[test]
fn unknown_region_keys_fail_the_build() {
    let content = Content::new();
    content.write_map(
        "MainField",
        "Field",
        json!({
            "actors": [actor("Guard", "Enemy_Moblin", 1, None)],
            "regions": { "region99": [ { "id": 1, "name": "Nowhere" } ] }
        }),
    );
    let (_dir, path) = store_dir();
    let err = build_store(content.path(), &path).unwrap_err();
    assert!(matches!(err, PlacedbError::Corruption { .. }));
    assert!(!path.exists());
}
