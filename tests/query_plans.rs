use rusqlite::types::Value as SqlValue;
use serde_json::json;

use placedb::construct::{hash_text, IdGenerator, ObjectKey, RegionLevel};
use placedb::query::{plan_by_key, plan_gen_group, plan_listing, Listing, Projection, TextFilter};
use placedb::view::{icon_file, position};

fn listing(query: &str, limit: Option<u32>) -> Listing {
    Listing {
        map_type: "MainField".to_string(),
        map_name: None,
        query: query.to_string(),
        limit,
        with_map_names: false,
    }
}

#[test]
fn text_filters() {
    assert_eq!(TextFilter::parse("*"), TextFilter::All);
    assert_eq!(TextFilter::parse(" * "), TextFilter::All);
    assert_eq!(TextFilter::parse("Moblin camp"), TextFilter::Match("\"Moblin\"* \"camp\"*".to_string()));
    assert_eq!(TextFilter::parse("Enemy_Moblin"), TextFilter::Match("\"Enemy_Moblin\"*".to_string()));
    assert_eq!(TextFilter::parse("\"') OR *"), TextFilter::Match("\"OR\"*".to_string()));
    assert_eq!(TextFilter::parse("--"), TextFilter::Nothing);
    assert_eq!(TextFilter::parse(""), TextFilter::Nothing);
}

#[test]
fn request_values_are_bound_not_spliced() {
    let key = ObjectKey::new("Main'Field", "Field\"; drop table objs", 7);
    let plan = plan_by_key(&key);
    assert!(!plan.sql.contains("Main'Field"));
    assert!(!plan.sql.contains("drop table"));
    assert_eq!(plan.params[0], SqlValue::Text("Main'Field".to_string()));
    assert_eq!(plan.params[2], SqlValue::Integer(7));

    let plan = plan_gen_group(&key);
    assert_eq!(plan.params.len(), 5);
}

#[test]
fn listing_plans() {
    let all = plan_listing(&listing("*", None), Projection::Objects).unwrap();
    assert!(!all.sql.contains("objs_fts"));
    assert!(!all.sql.contains("limit"));

    let searched = plan_listing(&listing("tree", Some(10)), Projection::Ids).unwrap();
    assert!(searched.sql.starts_with("select objid from objs"));
    assert!(searched.sql.contains("objs_fts match ?"));
    assert_eq!(searched.params.last(), Some(&SqlValue::Integer(10)));

    assert!(plan_listing(&listing("!!!", None), Projection::Objects).is_none());
}

#[test]
fn region_tokens() {
    assert_eq!("region16".parse::<RegionLevel>().unwrap(), RegionLevel::Region16);
    assert!("region7".parse::<RegionLevel>().is_err());
    assert!("region99".parse::<RegionLevel>().is_err());
}

#[test]
fn ids_increase_from_one() {
    let mut ids = IdGenerator::new();
    assert_eq!(ids.current(), 0);
    assert_eq!((ids.generate(), ids.generate(), ids.generate()), (1, 2, 3));
    assert_eq!(ids.current(), 3);
}

#[test]
fn computed_fields() {
    assert_eq!(position(Some(&json!([1.005, -2.499, 3.0]))), [1.0, -2.5, 3.0]);
    assert_eq!(position(Some(&json!([10.126, 0.0]))), [10.13, 0.0, 0.0]);
    assert_eq!(position(None), [0.0, 0.0, 0.0]);
    assert_eq!(hash_text(255), "0x00000000000000FF");
    assert_eq!(hash_text(-1), "0xFFFFFFFFFFFFFFFF");

    let icon = icon_file("Obj_Tree");
    assert_eq!(icon, icon_file("Obj_Tree"));
    assert_ne!(icon, icon_file("Obj_Rock"));
    let (dir, file) = icon.split_once('/').unwrap();
    assert_eq!(dir.len(), 2);
    assert!(file.starts_with(dir) && file.ends_with(".png"));
    assert_eq!(file.len(), 64 + ".png".len());
}
