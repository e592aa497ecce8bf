use std::{net::Ipv4Addr, sync::Arc};

use dynbind::{BindErrorKind, Binder, Dyn, Map, Value};
use facet::Facet;
use serde_json::json;

#[derive(Facet, Clone, Debug, Default, PartialEq)]
struct Config {
    host: String,
    port: u16,
}

// ============================================================================
// Value slots
// ============================================================================

#[test]
fn value_member_takes_source_as_is() {
    #[derive(Facet, Debug, Default)]
    struct Event {
        kind: String,
        payload: Value,
    }

    let event: Event =
        dynbind::from_value(&json!({ "kind": "click", "payload": { "x": 1, "y": 2 } }).into())
            .unwrap();

    let payload = event.payload.as_map().unwrap();
    assert_eq!(payload.get("x"), Some(&Value::Int(1)));
    assert_eq!(payload.get("y"), Some(&Value::Int(2)));
}

/// Test that a value slot collapses sequences unless the binder is strict.
#[test]
fn value_member_and_sequences() {
    let src: Value = json!([1, 2]).into();

    let mut collapsed = Value::Null;
    dynbind::bind(&mut collapsed, &src).unwrap();
    assert_eq!(collapsed, Value::Int(1));

    let mut whole = Value::Null;
    Binder::strict().bind(&mut whole, &src).unwrap();
    assert_eq!(whole, src);
}

// ============================================================================
// Empty Dyn slots
// ============================================================================

#[test]
fn empty_dyn_stores_value() {
    let mut slot = Dyn::empty();
    dynbind::bind(&mut slot, &json!({ "a": true }).into()).unwrap();

    let mut expected = Map::new();
    expected.insert("a", true);
    assert_eq!(slot.downcast_ref::<Value>(), Some(&Value::Map(expected)));
}

#[test]
fn empty_dyn_stays_empty_for_null() {
    let mut slot = Dyn::empty();
    dynbind::bind(&mut slot, &Value::Null).unwrap();
    assert!(slot.is_empty());
}

/// Test that a typed native is stored under its own type.
#[test]
fn empty_dyn_stores_typed_native() {
    let mut slot = Dyn::empty();
    dynbind::bind(&mut slot, &Value::typed_native(8080u16)).unwrap();
    assert_eq!(slot.downcast_ref::<u16>(), Some(&8080));

    // The stored value now receives coercions as a `u16`.
    dynbind::bind(&mut slot, &Value::from("443")).unwrap();
    assert_eq!(slot.downcast_ref::<u16>(), Some(&443));
}

#[test]
fn empty_dyn_rejects_plain_native() {
    let mut slot = Dyn::empty();
    let err = dynbind::bind(&mut slot, &Value::native(Ipv4Addr::LOCALHOST)).unwrap_err();
    match err.kind() {
        BindErrorKind::Incompatible { src, .. } => assert!(src.ends_with("Ipv4Addr"), "{src}"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(slot.is_empty());
}

// ============================================================================
// Occupied Dyn slots
// ============================================================================

/// Test that a held value keeps its concrete type and receives coercions.
#[test]
fn occupied_dyn_coerces_into_held_type() {
    let mut slot = Dyn::new(0u32);
    dynbind::bind(&mut slot, &Value::from("7")).unwrap();
    assert_eq!(slot.downcast_ref::<u32>(), Some(&7));

    let err = dynbind::bind(&mut slot, &Value::Int(-1)).unwrap_err();
    assert!(matches!(err.kind(), BindErrorKind::Cast(_)));
    assert_eq!(slot.downcast_ref::<u32>(), Some(&7));
}

#[test]
fn occupied_dyn_binds_record_in_place() {
    #[derive(Facet, Debug, Default)]
    struct Plugin {
        name: String,
        options: Dyn,
    }

    let mut plugin = Plugin {
        name: String::new(),
        options: Dyn::new(Config {
            host: "localhost".to_string(),
            port: 80,
        }),
    };
    dynbind::bind(
        &mut plugin,
        &json!({ "name": "proxy", "options": { "port": "8080" } }).into(),
    )
    .unwrap();

    assert_eq!(plugin.name, "proxy");
    assert_eq!(
        plugin.options.downcast_ref::<Config>(),
        Some(&Config {
            host: "localhost".to_string(),
            port: 8080,
        })
    );
}

/// Test that a shared `Arc` held in a slot is replaced by a modified copy.
#[test]
fn occupied_dyn_copies_shared_arc() {
    let original = Arc::new(Config::default());
    let mut slot = Dyn::new(Arc::clone(&original));

    dynbind::bind(&mut slot, &json!({ "host": "b" }).into()).unwrap();

    let held = slot.downcast_ref::<Arc<Config>>().unwrap();
    assert_eq!(held.host, "b");
    assert_eq!(original.host, "");
    assert!(!Arc::ptr_eq(held, &original));
}

/// Test that a held list takes a whole sequence instead of its first element.
#[test]
fn occupied_dyn_keeps_whole_sequence() {
    let mut slot = Dyn::new(Vec::<i32>::new());
    dynbind::bind(&mut slot, &json!([1, "2", 3]).into()).unwrap();
    assert_eq!(slot.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));
}

/// Test that an empty slot still collapses a sequence when the binder does.
#[test]
fn empty_dyn_member_collapses_sequence() {
    #[derive(Facet, Debug, Default)]
    struct Envelope {
        body: Dyn,
    }

    let envelope: Envelope = dynbind::from_value(&json!({ "body": [5, 6] }).into()).unwrap();
    assert_eq!(envelope.body.downcast_ref::<Value>(), Some(&Value::Int(5)));
}
