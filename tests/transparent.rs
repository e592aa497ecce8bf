use dynbind::{Kind, Value};
use facet::Facet;
use serde_json::json;

// ============================================================================
// Newtypes bind as their inner value
// ============================================================================

#[derive(Facet, Clone, Debug, Default, PartialEq)]
#[facet(transparent)]
struct UserId(u64);

#[derive(Facet, Clone, Debug, Default, PartialEq)]
#[facet(transparent)]
struct Email(String);

#[test]
fn transparent_scalars() {
    #[derive(Facet, Debug, Default, PartialEq)]
    struct Account {
        id: UserId,
        email: Email,
        aliases: Vec<Email>,
    }

    let account: Account = dynbind::from_value(
        &json!({ "id": "42", "email": "a@example.com", "aliases": ["b@example.com"] }).into(),
    )
    .unwrap();
    assert_eq!(
        account,
        Account {
            id: UserId(42),
            email: Email("a@example.com".to_string()),
            aliases: vec![Email("b@example.com".to_string())],
        }
    );
}

/// Test that a newtype is classified as transparent under its own type name.
#[test]
fn transparent_shape() {
    assert_eq!(Kind::of(UserId::SHAPE), Kind::Transparent);
    assert!(dynbind::shape::is_type::<UserId>(UserId::SHAPE));
    assert!(!dynbind::shape::is_type::<u64>(UserId::SHAPE));
    assert_eq!(UserId::SHAPE.type_identifier, "UserId");
}

/// Test that a native newtype is assigned directly, not coerced.
#[test]
fn transparent_native_assignment() {
    let mut id = UserId(1);
    dynbind::bind(&mut id, &Value::typed_native(UserId(5))).unwrap();
    assert_eq!(id, UserId(5));
}

#[test]
fn transparent_record() {
    #[derive(Facet, Debug, Default, PartialEq)]
    struct Inner {
        name: String,
    }

    #[derive(Facet, Debug, Default, PartialEq)]
    #[facet(transparent)]
    struct Wrapper(Inner);

    let wrapper: Wrapper = dynbind::from_value(&json!({ "name": "x" }).into()).unwrap();
    assert_eq!(wrapper.0.name, "x");
    assert_eq!(Kind::of(Inner::SHAPE), Kind::Record);
}

#[test]
fn transparent_generic() {
    #[derive(Facet, Debug, Default, PartialEq)]
    #[facet(transparent)]
    struct Labeled<T>(T);

    let labeled: Labeled<Vec<u8>> = dynbind::from_value(&json!([1, "2"]).into()).unwrap();
    assert_eq!(labeled, Labeled(vec![1, 2]));
}

// ============================================================================
// Tuple structs with several members
// ============================================================================

#[test]
fn tuple_struct_binds_by_position_name() {
    #[derive(Facet, Debug, Default, PartialEq)]
    struct Point(i32, i32);

    let point: Point = dynbind::from_value(&json!({ "0": 3, "1": "-4" }).into()).unwrap();
    assert_eq!(point, Point(3, -4));
    assert_eq!(Kind::of(Point::SHAPE), Kind::Record);
}
