mod common;

use std::collections::BTreeSet;

use placedb::construct::ObjectKey;
use placedb::interface::StoreInterface;

use common::{actor, build, field_content, Content};

#[test]
fn siblings_share_the_group() {
    let content = field_content();
    let (_dir, path) = build(&content);
    let store = StoreInterface::open(&path).unwrap();

    let archer = store.object_by_id(2).unwrap().expect("objid 2 exists");
    assert_eq!(archer.hash_id, 20);

    let group = store.gen_group(&ObjectKey::new("MainField", "Field", 20)).unwrap();
    assert_eq!(group.len(), 3);
    let hashes: BTreeSet<i64> = group.iter().map(|o| o.hash_id).collect();
    assert_eq!(hashes, BTreeSet::from([10, 20, 30]));
    assert!(group.iter().all(|o| o.gen_group == Some(5)));
}

#[test]
fn every_object_is_in_its_own_group() {
    let content = field_content();
    let (_dir, path) = build(&content);
    let store = StoreInterface::open(&path).unwrap();
    for hash in [10, 20, 30] {
        let group = store.gen_group(&ObjectKey::new("MainField", "Field", hash)).unwrap();
        assert!(group.iter().any(|o| o.hash_id == hash), "{hash} missing from its own group");
    }
}

#[test]
fn missing_group_is_empty_not_an_error() {
    let content = field_content();
    let (_dir, path) = build(&content);
    let store = StoreInterface::open(&path).unwrap();
    assert!(store.gen_group(&ObjectKey::new("MainField", "Field", 40)).unwrap().is_empty());
    assert!(store.gen_group(&ObjectKey::new("MainField", "Field", 12345)).unwrap().is_empty());
}

#[test]
fn groups_do_not_leak_across_maps() {
    let content = Content::new();
    content.write_actors("MainField", "Field", vec![actor("A", "Obj_A", 1, Some(9)), actor("B", "Obj_B", 2, Some(9))]);
    content.write_actors("SmallDungeon", "Dungeon001", vec![actor("C", "Obj_C", 1, Some(9))]);
    let (_dir, path) = build(&content);
    let store = StoreInterface::open(&path).unwrap();

    let field = store.gen_group(&ObjectKey::new("MainField", "Field", 1)).unwrap();
    assert_eq!(field.len(), 2);
    let dungeon = store.gen_group(&ObjectKey::new("SmallDungeon", "Dungeon001", 1)).unwrap();
    assert_eq!(dungeon.len(), 1);
    assert_eq!(dungeon[0].map_name.as_deref(), Some("Dungeon001"));
}
