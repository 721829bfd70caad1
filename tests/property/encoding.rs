//! Properties of the string table and the flush gate

use proptest::prelude::*;
use treeglass::ops::strings::{decode_string, encode_string};
use treeglass::ops::{decode_operations, Operation, OperationEncoder};
use treeglass::types::StableId;

/// Code points survive the integer encoding unchanged.
#[test]
fn test_string_code_points_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<String>(), |value| {
            let encoded = encode_string(&value);
            assert_eq!(encoded.len(), value.chars().count());
            assert_eq!(decode_string(&encoded).unwrap(), value);
            Ok(())
        })
        .unwrap();
}

proptest! {
    /// Interning dedupes, ids follow first use, and the decoded table
    /// resolves every id back to its string.
    #[test]
    fn interned_names_resolve_after_decode(names in prop::collection::vec(
        prop::option::of("[a-zA-Z\u{e9}\u{1F600}]{0,6}"),
        0..20,
    )) {
        let mut encoder = OperationEncoder::new();
        let ids: Vec<u32> = names.iter().map(|name| encoder.intern(name.as_deref())).collect();
        encoder.push_op(Operation::AddRoot { id: StableId::new(1), flags: 0 });
        let payload = encoder.flush(1, StableId::new(1)).unwrap();
        let message = decode_operations(&payload).unwrap();

        for (name, id) in names.iter().zip(&ids) {
            prop_assert_eq!(message.string(*id).unwrap(), name.as_deref());
        }
        let mut unique: Vec<&str> = Vec::new();
        for name in names.iter().flatten() {
            if !unique.contains(&name.as_str()) {
                unique.push(name);
            }
        }
        prop_assert_eq!(message.strings, unique);
    }

    /// Strings alone never make a message.
    #[test]
    fn strings_without_ops_do_not_flush(names in prop::collection::vec("[a-z]{1,5}", 0..10)) {
        let mut encoder = OperationEncoder::new();
        for name in &names {
            encoder.intern(Some(name));
        }
        prop_assert!(!encoder.should_flush());
        prop_assert!(encoder.flush(1, StableId::new(1)).is_none());
    }
}
