// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use staged::{
    CommitOp, Descriptor, Key, Object, PropertyError, PropertyState, StageError, Staged,
    StagedValue, Value, object,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn nested(view: &Staged, key: &str) -> Staged {
    view.get(key)
        .unwrap()
        .and_then(StagedValue::into_staged)
        .expect("object-valued property")
}

#[test]
fn partial_commit_keeps_applied_changes() {
    init_tracing();
    let principal = object! { "a" => 1, "locked" => { "k" => 1 }, "b" => 1 };
    let root = Staged::new(&principal).unwrap();

    root.set("a", 2).unwrap();
    let locked = nested(&root, "locked");
    locked.set("k", 2).unwrap();
    root.set("b", 2).unwrap();

    let locked_principal = principal.get("locked").unwrap().as_object().unwrap().clone();
    locked_principal.freeze();

    let err = root.commit().unwrap_err();
    assert_eq!(
        err,
        StageError::Commit {
            key: Key::from("k"),
            op: CommitOp::Set,
            source: PropertyError::NotWritable(Key::from("k")),
        }
    );
    assert_eq!(
        err.to_string(),
        "failed to commit set of property 'k': cannot assign to read only property 'k'"
    );

    // `a` was processed before the failure, `b` after it
    assert_eq!(principal.get("a"), Some(Value::from(2)));
    assert_eq!(principal.get("b"), Some(Value::from(1)));
    assert_eq!(root.property_state("a").unwrap(), Some(PropertyState::Retained));
    assert_eq!(root.property_state("b").unwrap(), Some(PropertyState::Dirty));
    assert!(root.changed().unwrap());
}

#[test]
fn non_extensible_principal_rejects_new_keys() {
    init_tracing();
    let principal = object! { "a" => 1 };
    principal.prevent_extensions();
    let root = Staged::new(&principal).unwrap();
    root.set("a", 2).unwrap();
    root.set("b", 2).unwrap();

    assert!(matches!(
        root.commit(),
        Err(StageError::Commit {
            op: CommitOp::Set,
            source: PropertyError::NotExtensible(_),
            ..
        })
    ));
    assert_eq!(principal.get("a"), Some(Value::from(2)));
    assert!(!principal.has_own("b"));
    assert_eq!(root.property_state("b").unwrap(), Some(PropertyState::New));
    assert_eq!(root.keys().unwrap(), vec![Key::from("a"), Key::from("b")]);
}

#[test]
fn retry_after_obstruction_is_lifted() {
    init_tracing();
    let principal = Object::new();
    principal.define("ro", 1, Descriptor::new(true, true, false));
    principal.insert("rw", 1);
    let root = Staged::new(&principal).unwrap();
    root.set("ro", 2).unwrap();
    root.set("rw", 2).unwrap();

    assert!(root.commit().is_err());
    assert_eq!(principal.get("rw"), Some(Value::from(1)));

    principal.define("ro", 1, Descriptor::DATA);
    root.commit().unwrap();
    assert_eq!(principal.get("ro"), Some(Value::from(2)));
    assert_eq!(principal.get("rw"), Some(Value::from(2)));
    assert!(!root.changed().unwrap());
}

#[test]
fn deleting_immutable_properties() {
    init_tracing();
    let principal = object! { "a" => 1 };
    principal.freeze();
    let root = Staged::new(&principal).unwrap();

    assert_eq!(
        root.delete("a"),
        Err(StageError::ImmutableProperty { key: Key::from("a") })
    );
    assert!(root.has("a").unwrap());
    assert!(!root.changed().unwrap());
}

#[test]
fn deletion_rejected_at_commit() {
    init_tracing();
    let principal = object! { "a" => 1 };
    let root = Staged::new(&principal).unwrap();
    assert!(root.delete("a").unwrap());

    // locked down after the deletion was staged
    principal.freeze();
    assert_eq!(
        root.commit(),
        Err(StageError::Commit {
            key: Key::from("a"),
            op: CommitOp::Delete,
            source: PropertyError::NotConfigurable(Key::from("a")),
        })
    );
    assert!(principal.has_own("a"));
    assert_eq!(root.property_state("a").unwrap(), Some(PropertyState::Deleted));
}

#[test]
fn committing_a_subtree_only() {
    init_tracing();
    let principal = object! { "a" => 1, "o" => { "n" => 1 } };
    let root = Staged::new(&principal).unwrap();
    root.set("a", 2).unwrap();
    let o = nested(&root, "o");
    o.set("n", 2).unwrap();

    o.commit().unwrap();
    let live_o = principal.get("o").unwrap();
    assert_eq!(live_o.as_object().unwrap().get("n"), Some(Value::from(2)));
    assert_eq!(principal.get("a"), Some(Value::from(1)));
    assert!(!o.changed().unwrap());
    assert!(root.changed().unwrap());

    root.commit().unwrap();
    assert_eq!(principal.get("a"), Some(Value::from(2)));
}

#[test]
fn detached_views_fail_loudly() {
    init_tracing();
    let principal = object! { "o" => { "n" => 1 } };
    let root = Staged::new(&principal).unwrap();
    let o = nested(&root, "o");
    root.delete("o").unwrap();
    root.commit().unwrap();

    assert_eq!(o.get("n").unwrap_err(), StageError::Attachment);
    assert_eq!(o.changed().unwrap_err(), StageError::Attachment);
    assert!(!principal.has_own("o"));
}
