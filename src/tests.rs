// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Property-based tests for the staging layer.
//!
//! Documents and operation sequences are generated over a small key universe so that
//! operations frequently hit the same properties.
use crate::{Key, Object, PropertyState, Staged, Value};
use quickcheck::{Arbitrary, Gen};

const KEYS: [&str; 4] = ["a", "b", "c", "d"];

fn key(index: u8) -> &'static str {
    KEYS[index as usize % KEYS.len()]
}

#[derive(Clone, Debug)]
enum DocValue {
    Number(u8),
    Nested(Doc),
}

#[derive(Clone, Debug)]
struct Doc(Vec<(u8, DocValue)>);

impl Doc {
    fn generate(g: &mut Gen, depth: usize) -> Self {
        let len = usize::arbitrary(g) % (KEYS.len() + 1);
        let entries = (0..len)
            .map(|_| {
                let value = if depth > 0 && bool::arbitrary(g) {
                    DocValue::Nested(Doc::generate(g, depth - 1))
                } else {
                    DocValue::Number(u8::arbitrary(g))
                };
                (u8::arbitrary(g), value)
            })
            .collect();
        Doc(entries)
    }

    fn build(&self) -> Object {
        let object = Object::new();
        for (k, value) in &self.0 {
            let value = match value {
                DocValue::Number(n) => Value::from(u32::from(*n)),
                DocValue::Nested(doc) => Value::Object(doc.build()),
            };
            object.insert(key(*k), value);
        }
        object
    }
}

impl Arbitrary for Doc {
    fn arbitrary(g: &mut Gen) -> Self {
        Doc::generate(g, 2)
    }
}

#[derive(Clone, Debug)]
enum Leaf {
    Number(u8),
    Text(bool),
    EmptyObject,
}

impl Leaf {
    fn to_value(&self) -> Value {
        match self {
            Leaf::Number(n) => Value::from(u32::from(*n)),
            Leaf::Text(t) => Value::from(if *t { "yes" } else { "no" }),
            Leaf::EmptyObject => Value::Object(Object::new()),
        }
    }
}

#[derive(Clone, Debug)]
enum Op {
    Set { path: Vec<u8>, key: u8, leaf: Leaf },
    Delete { path: Vec<u8>, key: u8 },
}

impl Arbitrary for Op {
    fn arbitrary(g: &mut Gen) -> Self {
        let depth = *g.choose(&[0usize, 0, 1, 1, 2]).expect("non-empty");
        let path = (0..depth).map(|_| u8::arbitrary(g)).collect();
        let key = u8::arbitrary(g);
        if bool::arbitrary(g) {
            let leaf = match u8::arbitrary(g) % 3 {
                0 => Leaf::Number(u8::arbitrary(g)),
                1 => Leaf::Text(bool::arbitrary(g)),
                _ => Leaf::EmptyObject,
            };
            Op::Set { path, key, leaf }
        } else {
            Op::Delete { path, key }
        }
    }
}

impl Op {
    fn path(&self) -> &[u8] {
        match self {
            Op::Set { path, .. } | Op::Delete { path, .. } => path,
        }
    }

    fn apply_staged(&self, root: &Staged) {
        let mut target = root.clone();
        for k in self.path() {
            match target.get(key(*k)).unwrap().and_then(|v| v.into_staged()) {
                Some(next) => target = next,
                None => return,
            }
        }
        match self {
            Op::Set { key: k, leaf, .. } => target.set(key(*k), leaf.to_value()).unwrap(),
            Op::Delete { key: k, .. } => {
                target.delete(key(*k)).unwrap();
            }
        }
    }

    fn apply_direct(&self, root: &Object) {
        let mut target = root.clone();
        for k in self.path() {
            match target.get(key(*k)).as_ref().and_then(Value::as_object) {
                Some(next) => target = next.clone(),
                None => return,
            }
        }
        match self {
            Op::Set { key: k, leaf, .. } => target.set(key(*k), leaf.to_value()).unwrap(),
            Op::Delete { key: k, .. } => target.delete(key(*k)).unwrap(),
        }
    }
}

fn render(object: &Object) -> String {
    object.to_json().unwrap().to_string()
}

/// Walks every enumerable property of `view`, asserting it is fully committed.
fn assert_settled(view: &Staged) {
    assert!(!view.changed().unwrap());
    for key in view.keys().unwrap() {
        assert_eq!(
            view.property_state(&key).unwrap(),
            Some(PropertyState::Retained),
            "property {key:?}"
        );
        if let Some(nested) = view.get(&key).unwrap().and_then(|v| v.into_staged()) {
            assert_settled(&nested);
        }
    }
}

#[quickcheck]
fn qc_reads_round_trip(doc: Doc, paths: Vec<Vec<u8>>) {
    let principal = doc.build();
    let root = Staged::new(&principal).unwrap();

    for path in paths {
        let mut target = root.clone();
        for k in path {
            let _ = target.has(key(k)).unwrap();
            match target.get(key(k)).unwrap().and_then(|v| v.into_staged()) {
                Some(next) => target = next,
                None => break,
            }
        }
        assert!(!root.changed().unwrap());
    }

    assert_eq!(root.to_json().unwrap().to_string(), render(&principal));
    assert!(!root.changed().unwrap());
}

#[quickcheck]
fn qc_staging_isolates_principal(doc: Doc, ops: Vec<Op>) {
    let principal = doc.build();
    let before = render(&principal);
    let root = Staged::new(&principal).unwrap();

    for op in &ops {
        op.apply_staged(&root);
        assert_eq!(render(&principal), before);
    }
}

#[quickcheck]
fn qc_staging_matches_direct_mutation(doc: Doc, ops: Vec<Op>) {
    let root = Staged::new(doc.build()).unwrap();
    let clone = doc.build();

    for op in &ops {
        op.apply_staged(&root);
        op.apply_direct(&clone);
    }

    // key order may differ: a deleted and re-added key keeps its staged position
    assert_eq!(root.to_json().unwrap(), clone.to_json().unwrap());
}

#[quickcheck]
fn qc_commit_converges(doc: Doc, ops: Vec<Op>) {
    let principal = doc.build();
    let root = Staged::new(&principal).unwrap();
    for op in &ops {
        op.apply_staged(&root);
    }
    let staged = root.to_json().unwrap().to_string();

    root.commit().unwrap();
    assert_eq!(render(&principal), staged);
    assert_eq!(root.to_json().unwrap().to_string(), staged);
    assert_settled(&root);

    // a second commit has nothing left to do
    root.commit().unwrap();
    assert_eq!(render(&principal), staged);
    assert_settled(&root);
}

#[quickcheck]
fn qc_deleted_keys_are_absent(doc: Doc, k: u8) {
    let principal = doc.build();
    let root = Staged::new(&principal).unwrap();
    let existed = principal.has_own(key(k));

    assert_eq!(root.delete(key(k)).unwrap(), existed);
    assert!(!root.has(key(k)).unwrap());
    assert!(root.get(key(k)).unwrap().is_none());
    assert!(!root.keys().unwrap().contains(&Key::from(key(k))));
    assert_eq!(principal.has_own(key(k)), existed);
}
