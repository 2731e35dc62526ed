mod common;

use placedb::interface::StoreInterface;
use placedb::query::Listing;

use common::{actor, build, field_content, Content};

fn listing(map_type: &str, map_name: Option<&str>, query: &str) -> Listing {
    Listing {
        map_type: map_type.to_string(),
        map_name: map_name.map(str::to_string),
        query: query.to_string(),
        limit: None,
        with_map_names: false,
    }
}

#[test]
fn wildcard_lists_everything_without_data() {
    let content = Content::new();
    let actors = (0..500).map(|i| actor(&format!("Rock {i}"), "Obj_Rock", i, None)).collect();
    content.write_actors("MainField", "Field", actors);
    let (_dir, path) = build(&content);
    let store = StoreInterface::open(&path).unwrap();

    let all = store.list(&listing("MainField", Some("Field"), "*")).unwrap();
    assert_eq!(all.len(), 500);
    assert!(all.iter().all(|o| o.data.is_none() && o.map_name.is_none()));

    let json = serde_json::to_value(&all[0]).unwrap();
    assert!(json.get("data").is_none());
    assert!(json.get("map_name").is_none());
    assert!(json.get("pos").is_some());
}

#[test]
fn map_names_only_when_asked() {
    let content = field_content();
    let (_dir, path) = build(&content);
    let store = StoreInterface::open(&path).unwrap();
    let mut request = listing("MainField", None, "*");
    request.with_map_names = true;
    let all = store.list(&request).unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|o| o.map_name.as_deref() == Some("Field")));
}

#[test]
fn text_search_goes_through_the_index() {
    let content = field_content();
    let (_dir, path) = build(&content);
    let store = StoreInterface::open(&path).unwrap();

    let moblins = store.list(&listing("MainField", Some("Field"), "moblin")).unwrap();
    let names: Vec<&str> = moblins.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["Moblin Camp Guard", "Moblin Camp Archer"]);

    // prefix of a word in the actor name
    let bows = store.list(&listing("MainField", Some("Field"), "Bo")).unwrap();
    assert_eq!(bows.len(), 1);
    assert_eq!(bows[0].actor, "Enemy_Moblin_Bow");

    // every word has to match
    let archers = store.list(&listing("MainField", None, "camp archer")).unwrap();
    assert_eq!(archers.len(), 1);

    assert!(store.list(&listing("MainField", None, "lynel")).unwrap().is_empty());
    assert!(store.list(&listing("OtherField", None, "moblin")).unwrap().is_empty());
}

#[test]
fn query_syntax_never_reaches_the_index() {
    let content = field_content();
    let (_dir, path) = build(&content);
    let store = StoreInterface::open(&path).unwrap();
    assert!(store.list(&listing("MainField", None, "\"(*")).unwrap().is_empty());
    let quoted = store.list(&listing("MainField", None, "\"moblin\" OR")).unwrap();
    assert!(quoted.is_empty(), "OR is an ordinary word here and matches nothing");
}

#[test]
fn limit_caps_results_and_ids_follow_the_same_filters() {
    let content = field_content();
    let (_dir, path) = build(&content);
    let store = StoreInterface::open(&path).unwrap();

    let mut request = listing("MainField", Some("Field"), "*");
    request.limit = Some(2);
    assert_eq!(store.list(&request).unwrap().len(), 2);
    assert_eq!(store.list_ids(&request).unwrap(), vec![1, 2]);

    let ids = store.list_ids(&listing("MainField", Some("Field"), "camp")).unwrap();
    assert_eq!(ids, vec![1, 2, 3]);
}
