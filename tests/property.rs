use proptest::prelude::*;

use toml_codec::{parse, to_toml, Table, Value};

/// Generated trees avoid two things on purpose: non-finite floats (nan
/// breaks structural equality) and tables as direct array elements (mixed
/// arrays don't round-trip, see the encoder's mixed array handling).
fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Value::Int),
        prop::num::f64::NORMAL.prop_map(Value::Float),
        any::<bool>().prop_map(Value::Bool),
        "[ -~]{0,16}".prop_map(Value::String),
    ];

    leaf.prop_recursive(3, 24, 6, |inner| {
        let array_elem = inner
            .clone()
            .prop_filter("arrays avoid direct table elements", |v| {
                !matches!(v, Value::Table(_))
            });
        prop_oneof![
            prop::collection::vec(array_elem, 0..5).prop_map(Value::Array),
            prop::collection::hash_map("[a-z_]{1,6}", inner, 0..5)
                .prop_map(|m| Value::Table(m.into_iter().collect())),
        ]
    })
}

fn arb_table() -> impl Strategy<Value = Table> {
    prop::collection::hash_map("[a-zA-Z0-9 _.-]{1,8}", arb_value(), 0..6)
        .prop_map(|m| m.into_iter().collect())
}

proptest! {
    /// decode ∘ encode is the identity on value trees
    #[test]
    fn roundtrip(tree in arb_table()) {
        let written = to_toml(&Value::Table(tree.clone())).unwrap();
        let reparsed = parse(&written)
            .unwrap_or_else(|e| panic!("{written:?} didn't reparse: {e}"));
        prop_assert_eq!(tree, reparsed);
    }

    /// encoding a re-decoded document changes nothing
    #[test]
    fn idempotent_write(tree in arb_table()) {
        let first = to_toml(&Value::Table(tree)).unwrap();
        let reparsed = parse(&first).unwrap();
        let second = to_toml(&Value::Table(reparsed)).unwrap();
        prop_assert_eq!(first, second);
    }

    /// encoding is deterministic for equal trees
    #[test]
    fn deterministic_write(tree in arb_table()) {
        let a = to_toml(&Value::Table(tree.clone())).unwrap();
        let b = to_toml(&Value::Table(tree)).unwrap();
        prop_assert_eq!(a, b);
    }

    /// every decoded document rejects a second definition of an existing
    /// top level key
    #[test]
    fn duplicate_keys_rejected(key in "[a-z]{1,6}", a in any::<i64>(), b in any::<i64>()) {
        let doc = format!("{key} = {a}\n{key} = {b}\n");
        prop_assert!(parse(&doc).is_err());
    }

    /// inline tables stay sealed no matter the key appended
    #[test]
    fn sealed_inline_tables(key in "[a-z]{1,6}", sub in "[a-z]{1,6}") {
        let doc = format!("{key} = {{ x = 1 }}\n{key}.{sub} = 2\n");
        let error = parse(&doc).unwrap_err();
        prop_assert_eq!(toml_codec::ErrorKind::ExtendSealed, error.kind());
    }
}
