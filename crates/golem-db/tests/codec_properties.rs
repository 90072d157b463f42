//! Property-based tests for column codecs.
//!
//! Every codec must satisfy `decode(encode(v)) == v` over its whole domain,
//! and reject malformed stored values instead of guessing.

use golem_db::{
    BigIntegerCodec, Codec, CodecError, EnumCodec, JsonCodec, OrdinalEnum, PaymentStatus,
    RawBytesCodec,
};
use num_bigint::BigUint;
use proptest::prelude::*;
use serde_json::Value;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

/// Integers from zero up to 2^320
fn big_uint_strategy() -> impl Strategy<Value = BigUint> {
    prop::collection::vec(any::<u32>(), 0..=10).prop_map(BigUint::new)
}

fn status_strategy() -> impl Strategy<Value = PaymentStatus> {
    prop::sample::select(PaymentStatus::VARIANTS.to_vec())
}

fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<f64>().prop_filter("finite", |f| f.is_finite()).prop_map(Value::from),
        "[a-zA-Z0-9 _\\-]{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z0-9]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

// =============================================================================
// ROUND TRIPS
// =============================================================================

proptest! {
    #[test]
    fn big_integer_round_trips(value in big_uint_strategy()) {
        let encoded = BigIntegerCodec.encode(&value).unwrap();
        prop_assert!(encoded.bytes().all(|b| b.is_ascii_hexdigit()));
        prop_assert_eq!(BigIntegerCodec.decode(encoded).unwrap(), value);
    }

    #[test]
    fn raw_bytes_round_trip(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let encoded = RawBytesCodec.encode(&bytes).unwrap();
        prop_assert_eq!(encoded.len(), bytes.len() * 2);
        prop_assert_eq!(encoded.to_lowercase(), encoded.clone());
        prop_assert_eq!(RawBytesCodec.decode(encoded).unwrap(), bytes);
    }

    #[test]
    fn enum_round_trips(status in status_strategy()) {
        let codec = EnumCodec::<PaymentStatus>::new();
        let encoded = codec.encode(&status).unwrap();
        prop_assert_eq!(codec.decode(encoded).unwrap(), status);
    }

    #[test]
    fn json_round_trips(value in json_strategy()) {
        let codec = JsonCodec::<Value>::new();
        let encoded = codec.encode(&value).unwrap();
        prop_assert_eq!(codec.decode(encoded).unwrap(), value);
    }

    #[test]
    fn json_floats_are_exact(f in any::<f64>().prop_filter("finite", |f| f.is_finite())) {
        let codec = JsonCodec::<Value>::new();
        let value = serde_json::json!({"ratio": f});
        let decoded = codec.decode(codec.encode(&value).unwrap()).unwrap();
        prop_assert_eq!(decoded["ratio"].as_f64(), Some(f));
    }

    // =========================================================================
    // REJECTIONS
    // =========================================================================

    #[test]
    fn odd_length_hex_is_rejected(s in "[0-9a-f]{0,31}") {
        let odd = if s.len() % 2 == 0 { format!("{}0", s) } else { s };
        let err = RawBytesCodec.decode(odd).unwrap_err();
        let is_format = matches!(err, CodecError::Format { .. });
        prop_assert!(is_format);
    }

    #[test]
    fn non_hex_digit_is_rejected(prefix in "[0-9a-f]{0,8}", bad in "[g-z]") {
        let s = format!("{}{}{}", prefix, bad, bad);
        let is_format = matches!(RawBytesCodec.decode(s.clone()), Err(CodecError::Format { .. }));
        prop_assert!(is_format);
        let is_format = matches!(BigIntegerCodec.decode(s), Err(CodecError::Format { .. }));
        prop_assert!(is_format);
    }

    #[test]
    fn unknown_ordinals_are_rejected(ordinal in any::<i64>()) {
        prop_assume!(!(1..=3).contains(&ordinal));
        let codec = EnumCodec::<PaymentStatus>::new();
        let is_unknown = matches!(codec.decode(ordinal), Err(CodecError::UnknownOrdinal { .. }));
        prop_assert!(is_unknown);
    }
}

#[test]
fn big_integer_beyond_256_bits() {
    let value = (BigUint::from(1u32) << 256) + BigUint::from(12345u32);
    let encoded = BigIntegerCodec.encode(&value).unwrap();
    assert_eq!(encoded.len(), 65);
    assert_eq!(BigIntegerCodec.decode(encoded).unwrap(), value);
}
