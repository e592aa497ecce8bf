use dynbind::{BindErrorKind, Binder, Value};

/// Test that the process-wide binder can be replaced once, before first use,
/// and that the free functions then follow its policies.
#[test]
fn replace_default_binder() {
    assert!(dynbind::set_default_binder(Binder::strict()).is_ok());
    assert!(dynbind::set_default_binder(Binder::new()).is_err());

    let mut numbers: Vec<i32> = Vec::new();
    let err = dynbind::bind(&mut numbers, &Value::Int(1)).unwrap_err();
    assert!(matches!(
        err.kind(),
        BindErrorKind::NotSequence { found: "int", .. }
    ));

    let n: i32 = dynbind::from_value(&Value::Seq(vec![Value::Int(2)])).unwrap_or(-1);
    assert_eq!(n, -1);
}
