use anise_model::{Element, Entity, EntityKind, EntityRecord};
use pretty_assertions::assert_eq;
use serde_json::json;

fn make_entity(record: serde_json::Value) -> Entity {
    let record: EntityRecord = serde_json::from_value(record).unwrap();
    Entity::from_record(EntityKind::Character, "cn", "101", record)
}

// ── Record decoding ──────────────────────────────────────────────

#[test]
fn record_accepts_extraction_id_alias() {
    let e = make_entity(json!({"extraction_id": "flame_knight", "names": ["Flame Knight"]}));
    assert_eq!(e.extraction_key, "flame_knight");
    assert_eq!(e.names, vec!["Flame Knight".to_string()]);
    assert_eq!(e.id.to_string(), "u101");
    assert_eq!(e.source_id, "cn");
}

#[test]
fn record_accepts_name_alias() {
    let e = make_entity(json!({"resource_id": "k", "name": ["A", "B"]}));
    assert_eq!(e.names, vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn record_without_key_is_rejected() {
    let r = serde_json::from_value::<EntityRecord>(json!({"names": ["x"]}));
    assert!(r.is_err());
}

#[test]
fn record_defaults_rarity_and_element() {
    let e = make_entity(json!({"extraction_key": "k"}));
    assert_eq!(e.rarity, 0);
    assert_eq!(e.element, Element::None);
    assert!(e.names.is_empty());
}

#[test]
fn extra_fields_land_in_attributes() {
    let e = make_entity(json!({
        "extraction_key": "k",
        "cv": "Someone",
        "stats": {"hp": 1200, "atk": 350.5}
    }));
    assert_eq!(e.get_str("/cv"), Some("Someone"));
    assert_eq!(e.get_number("/stats/hp"), Some(1200.0));
    assert_eq!(e.get_number("/stats/atk"), Some(350.5));
    assert_eq!(e.get_str("/missing"), None);
    assert!(e.attributes.get("extraction_key").is_none());
}

// ── Elements ─────────────────────────────────────────────────────

#[test]
fn element_from_numeric_id() {
    let e = make_entity(json!({"extraction_key": "k", "element": 3}));
    assert_eq!(e.element, Element::Wind);
}

#[test]
fn element_from_name() {
    let e = make_entity(json!({"extraction_key": "k", "element": "Dark"}));
    assert_eq!(e.element, Element::Dark);
}

#[test]
fn unknown_element_maps_to_none() {
    let e = make_entity(json!({"extraction_key": "k", "element": 42}));
    assert_eq!(e.element, Element::None);
    let e = make_entity(json!({"extraction_key": "k", "element": "plasma"}));
    assert_eq!(e.element, Element::None);
}

#[test]
fn element_ids_cover_range() {
    for id in -1..=5 {
        assert_eq!(Element::from_id(id).id(), id);
    }
}

// ── Display name ─────────────────────────────────────────────────

#[test]
fn display_name_is_first_name() {
    let e = make_entity(json!({"extraction_key": "k", "names": ["", "Second"]}));
    assert_eq!(e.display_name(), "Second");
}

#[test]
fn display_name_falls_back_to_id() {
    let e = make_entity(json!({"extraction_key": "k"}));
    assert_eq!(e.display_name(), "u101");
}

#[test]
fn entity_serializes_element_as_id() {
    let e = make_entity(json!({"extraction_key": "k", "element": "fire"}));
    let v = serde_json::to_value(&e).unwrap();
    assert_eq!(v["element"], 0);
    assert_eq!(v["id"], "u101");
}
