//! Property tests for the streamed envelope.

use event_json::{JsonEventEncoder, Record};
use proptest::prelude::*;
use serde_json::Value;

fn field_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[ -~\u{e9}\u{4e2d}]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            proptest::collection::btree_map("[a-z_]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn record() -> impl Strategy<Value = Record> {
    proptest::collection::btree_map("[a-z][a-z_]{0,7}", field_value(), 0..6)
        .prop_map(|fields| fields.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: N written records always give valid JSON with keys event_0..event_{N-1}.
    #[test]
    fn property_stream_is_valid_json_with_sequential_keys(
        records in proptest::collection::vec(record(), 0..24)
    ) {
        let mut encoder = JsonEventEncoder::new(String::new());
        encoder.open().unwrap();
        for record in &records {
            encoder.write_record(record).unwrap();
        }
        encoder.close().unwrap();
        let out = encoder.into_sink();

        let parsed: Value = serde_json::from_str(&out).unwrap();
        let members = parsed.as_object().unwrap();
        prop_assert_eq!(members.len(), records.len());

        for (i, record) in records.iter().enumerate() {
            let member = &members[&format!("event_{i}")];
            let expected_inode = match record.get("inode") {
                None | Some(Value::Null) => Value::from(0),
                Some(value) => value.clone(),
            };
            prop_assert_eq!(&member["inode"], &expected_inode);
        }
        prop_assert!(out.is_ascii());
    }

    /// PROPERTY: before close, written bytes plus `}` always form valid JSON.
    #[test]
    fn property_every_prefix_closes_to_valid_json(
        records in proptest::collection::vec(record(), 0..8)
    ) {
        let mut encoder = JsonEventEncoder::new(String::new());
        encoder.open().unwrap();
        for (written, record) in records.iter().enumerate() {
            let candidate = format!("{}}}", encoder.sink());
            let parsed: Value = serde_json::from_str(&candidate).unwrap();
            prop_assert_eq!(parsed.as_object().unwrap().len(), written);
            encoder.write_record(record).unwrap();
        }
    }
}
