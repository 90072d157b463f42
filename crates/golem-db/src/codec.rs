//! Column codecs
//!
//! SQLite columns natively hold text, integers, reals and timestamps. The
//! codecs in this module map richer domain values onto those primitives:
//!
//! - [`RawBytesCodec`]: byte strings stored as lowercase hex text
//! - [`BigIntegerCodec`]: unbounded non-negative integers stored as hex text
//! - [`EnumCodec`]: closed enumerations stored as integer ordinals
//! - [`JsonCodec`]: nested values stored as JSON text
//!
//! Every codec is stateless and pure, and `decode(encode(v)) == v` holds for
//! every value in its domain. Enum ordinals are part of the on-disk format
//! and must never be renumbered between releases.

use std::marker::PhantomData;

use num_bigint::BigUint;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Number of wei in one ether
const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// Longest stored value echoed back in a format error
const PREVIEW_LEN: usize = 64;

/// Errors raised while encoding or decoding a column value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The value handed to an encoder is outside the codec's domain
    #[error("Type error in {codec} codec: {details}")]
    Type { codec: &'static str, details: String },

    /// The stored primitive does not match the codec's wire format
    #[error("Malformed {codec} value {value:?}: {details}")]
    Format {
        codec: &'static str,
        value: String,
        details: String,
    },

    /// The stored ordinal has no matching enum variant
    #[error("Unknown {enum_name} ordinal {ordinal}")]
    UnknownOrdinal { enum_name: &'static str, ordinal: i64 },
}

impl CodecError {
    fn type_error(codec: &'static str, details: impl Into<String>) -> Self {
        CodecError::Type {
            codec,
            details: details.into(),
        }
    }

    fn format_error(codec: &'static str, value: &str, details: impl ToString) -> Self {
        let value = if value.chars().count() > PREVIEW_LEN {
            let head: String = value.chars().take(PREVIEW_LEN).collect();
            format!("{}...", head)
        } else {
            value.to_string()
        };
        CodecError::Format {
            codec,
            value,
            details: details.to_string(),
        }
    }
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// A bidirectional mapping between a domain value and a storage primitive
pub trait Codec {
    /// The domain type seen by callers
    type Value;
    /// The primitive written to the column
    type Stored;

    /// Codec name used in error messages
    const NAME: &'static str;

    /// Convert a domain value into its stored form
    fn encode(&self, value: &Self::Value) -> CodecResult<Self::Stored>;

    /// Convert a stored primitive back into the domain value
    fn decode(&self, stored: Self::Stored) -> CodecResult<Self::Value>;
}

// ==================== RawBytes ====================

/// Stores byte strings (addresses, hashes) as lowercase hex text
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytesCodec;

impl Codec for RawBytesCodec {
    type Value = Vec<u8>;
    type Stored = String;

    const NAME: &'static str = "raw bytes";

    fn encode(&self, value: &Vec<u8>) -> CodecResult<String> {
        Ok(hex::encode(value))
    }

    fn decode(&self, stored: String) -> CodecResult<Vec<u8>> {
        hex::decode(&stored).map_err(|e| CodecError::format_error(Self::NAME, &stored, e))
    }
}

// ==================== BigInteger ====================

/// Stores arbitrary-precision non-negative integers as hex text
///
/// SQLite integers stop at 2^63 - 1, which is not enough for wei amounts.
/// Hex text has no upper bound and no floating-point rounding.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigIntegerCodec;

impl BigIntegerCodec {
    /// Decode a nullable column; NULL and empty text mean "no value"
    pub fn decode_optional(&self, stored: Option<String>) -> CodecResult<Option<BigUint>> {
        match stored {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => self.decode(s).map(Some),
        }
    }

    /// Encode a nullable value
    pub fn encode_optional(&self, value: Option<&BigUint>) -> CodecResult<Option<String>> {
        value.map(|v| self.encode(v)).transpose()
    }

    /// Accept an integer arriving through a dynamically typed JSON payload
    ///
    /// Anything other than a non-negative JSON integer is a type error.
    pub fn coerce(&self, value: &serde_json::Value) -> CodecResult<BigUint> {
        match value.as_u64() {
            Some(n) => Ok(BigUint::from(n)),
            None => Err(CodecError::type_error(
                Self::NAME,
                format!("value {} is not a non-negative integer", value),
            )),
        }
    }

    /// Parse an operator-supplied decimal amount
    pub fn parse_decimal(&self, input: &str) -> CodecResult<BigUint> {
        let input = input.trim();
        if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::type_error(
                Self::NAME,
                format!("{:?} is not a non-negative integer", input),
            ));
        }
        BigUint::parse_bytes(input.as_bytes(), 10).ok_or_else(|| {
            CodecError::type_error(Self::NAME, format!("{:?} is not an integer", input))
        })
    }
}

impl Codec for BigIntegerCodec {
    type Value = BigUint;
    type Stored = String;

    const NAME: &'static str = "big integer";

    fn encode(&self, value: &BigUint) -> CodecResult<String> {
        Ok(value.to_str_radix(16))
    }

    fn decode(&self, stored: String) -> CodecResult<BigUint> {
        // from_str_radix tolerates '_' separators, the stored format does not
        if stored.is_empty() || !stored.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CodecError::format_error(
                Self::NAME,
                &stored,
                "expected a non-empty hex string",
            ));
        }
        BigUint::parse_bytes(stored.as_bytes(), 16)
            .ok_or_else(|| CodecError::format_error(Self::NAME, &stored, "invalid hex integer"))
    }
}

/// Render a wei amount in ether with three decimals
pub fn format_ether(wei: &BigUint) -> String {
    let milli = wei / BigUint::from(WEI_PER_ETHER / 1000);
    let whole = &milli / 1000u32;
    let frac = (&milli % 1000u32).to_string();
    format!("{}.{:0>3}", whole, frac)
}

// ==================== Enum ====================

/// A closed enumeration with fixed integer ordinals
pub trait OrdinalEnum: Copy + Sized + 'static {
    /// Enum name used in error messages
    const NAME: &'static str;

    /// Every variant, in declaration order
    const VARIANTS: &'static [Self];

    /// The stored ordinal of this variant
    fn ordinal(self) -> i64;

    /// The symbolic name of this variant
    fn symbol(self) -> &'static str;

    /// Look up a variant by ordinal
    fn from_ordinal(ordinal: i64) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|v| v.ordinal() == ordinal)
    }

    /// Look up a variant by symbolic name
    fn from_symbol(symbol: &str) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|v| v.symbol().eq_ignore_ascii_case(symbol))
    }
}

/// Stores an [`OrdinalEnum`] as its integer ordinal
#[derive(Debug, Clone, Copy)]
pub struct EnumCodec<E>(PhantomData<E>);

impl<E: OrdinalEnum> EnumCodec<E> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }

    /// Encode a variant given by name, failing if it is not a member
    pub fn encode_symbol(&self, symbol: &str) -> CodecResult<i64> {
        E::from_symbol(symbol)
            .map(E::ordinal)
            .ok_or_else(|| {
                CodecError::type_error(
                    Self::NAME,
                    format!("{:?} is not a member of {}", symbol, E::NAME),
                )
            })
    }
}

impl<E: OrdinalEnum> Default for EnumCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: OrdinalEnum> Codec for EnumCodec<E> {
    type Value = E;
    type Stored = i64;

    const NAME: &'static str = "enum";

    fn encode(&self, value: &E) -> CodecResult<i64> {
        Ok(value.ordinal())
    }

    fn decode(&self, stored: i64) -> CodecResult<E> {
        E::from_ordinal(stored).ok_or(CodecError::UnknownOrdinal {
            enum_name: E::NAME,
            ordinal: stored,
        })
    }
}

// ==================== Json ====================

/// Stores any serde value as JSON text
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec<T>(PhantomData<T>);

impl<T> JsonCodec<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned + Default> JsonCodec<T> {
    /// Decode a nullable column; NULL and empty text yield `T::default()`
    pub fn decode_or_default(&self, stored: Option<String>) -> CodecResult<T> {
        match stored {
            Some(s) if !s.trim().is_empty() => self.decode(s),
            _ => Ok(T::default()),
        }
    }
}

impl<T: Serialize + DeserializeOwned> Codec for JsonCodec<T> {
    type Value = T;
    type Stored = String;

    const NAME: &'static str = "json";

    fn encode(&self, value: &T) -> CodecResult<String> {
        serde_json::to_string(value).map_err(|e| CodecError::type_error(Self::NAME, e.to_string()))
    }

    fn decode(&self, stored: String) -> CodecResult<T> {
        serde_json::from_str(&stored).map_err(|e| CodecError::format_error(Self::NAME, &stored, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Color {
        Red,
        Green,
    }

    impl OrdinalEnum for Color {
        const NAME: &'static str = "Color";
        const VARIANTS: &'static [Self] = &[Color::Red, Color::Green];

        fn ordinal(self) -> i64 {
            match self {
                Color::Red => 1,
                Color::Green => 2,
            }
        }

        fn symbol(self) -> &'static str {
            match self {
                Color::Red => "red",
                Color::Green => "green",
            }
        }
    }

    #[test]
    fn test_raw_bytes_lowercase_hex() {
        let encoded = RawBytesCodec.encode(&vec![0xde, 0xad, 0xBE, 0xef]).unwrap();
        assert_eq!(encoded, "deadbeef");
        assert_eq!(
            RawBytesCodec.decode(encoded).unwrap(),
            vec![0xde, 0xad, 0xbe, 0xef]
        );
    }

    #[test]
    fn test_raw_bytes_empty() {
        assert_eq!(RawBytesCodec.encode(&Vec::new()).unwrap(), "");
        assert!(RawBytesCodec.decode(String::new()).unwrap().is_empty());
    }

    #[test]
    fn test_raw_bytes_rejects_odd_length() {
        let err = RawBytesCodec.decode("abc".to_string()).unwrap_err();
        assert!(matches!(err, CodecError::Format { .. }));
    }

    #[test]
    fn test_raw_bytes_rejects_non_hex() {
        let err = RawBytesCodec.decode("zz".to_string()).unwrap_err();
        assert!(matches!(err, CodecError::Format { .. }));

        let err = RawBytesCodec.decode("0x12".to_string()).unwrap_err();
        assert!(matches!(err, CodecError::Format { .. }));
    }

    #[test]
    fn test_big_integer_format() {
        assert_eq!(BigIntegerCodec.encode(&BigUint::from(0u32)).unwrap(), "0");
        assert_eq!(BigIntegerCodec.encode(&BigUint::from(255u32)).unwrap(), "ff");

        let big = BigUint::from(1u32) << 70;
        let encoded = BigIntegerCodec.encode(&big).unwrap();
        assert_eq!(encoded, "400000000000000000");
        assert_eq!(BigIntegerCodec.decode(encoded).unwrap(), big);
    }

    #[test]
    fn test_big_integer_accepts_uppercase() {
        assert_eq!(
            BigIntegerCodec.decode("FF".to_string()).unwrap(),
            BigUint::from(255u32)
        );
    }

    #[test]
    fn test_big_integer_rejects_malformed() {
        for bad in ["", "0x10", "12_34", "-1", "g"] {
            let err = BigIntegerCodec.decode(bad.to_string()).unwrap_err();
            assert!(matches!(err, CodecError::Format { .. }), "{:?}", bad);
        }
    }

    #[test]
    fn test_big_integer_optional() {
        assert_eq!(BigIntegerCodec.decode_optional(None).unwrap(), None);
        assert_eq!(
            BigIntegerCodec.decode_optional(Some(String::new())).unwrap(),
            None
        );
        assert_eq!(
            BigIntegerCodec
                .decode_optional(Some("10".to_string()))
                .unwrap(),
            Some(BigUint::from(16u32))
        );
        assert_eq!(BigIntegerCodec.encode_optional(None).unwrap(), None);
    }

    #[test]
    fn test_big_integer_coerce_rejects_non_integers() {
        assert_eq!(
            BigIntegerCodec.coerce(&json!(42)).unwrap(),
            BigUint::from(42u32)
        );

        for bad in [json!(1.5), json!(-3), json!("10"), json!(null), json!({})] {
            let err = BigIntegerCodec.coerce(&bad).unwrap_err();
            assert!(matches!(err, CodecError::Type { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_big_integer_parse_decimal() {
        let value = BigIntegerCodec
            .parse_decimal("1180591620717411303424")
            .unwrap();
        assert_eq!(value, BigUint::from(1u32) << 70);

        assert!(matches!(
            BigIntegerCodec.parse_decimal("12.5"),
            Err(CodecError::Type { .. })
        ));
        assert!(matches!(
            BigIntegerCodec.parse_decimal(""),
            Err(CodecError::Type { .. })
        ));
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(&BigUint::from(0u32)), "0.000");
        assert_eq!(format_ether(&BigUint::from(WEI_PER_ETHER)), "1.000");
        assert_eq!(
            format_ether(&BigUint::from(1_234_567_000_000_000_000u64)),
            "1.234"
        );
        assert_eq!(format_ether(&BigUint::from(5_000_000_000_000_000u64)), "0.005");
    }

    #[test]
    fn test_enum_ordinals() {
        let codec = EnumCodec::<Color>::new();
        assert_eq!(codec.encode(&Color::Red).unwrap(), 1);
        assert_eq!(codec.decode(2).unwrap(), Color::Green);
    }

    #[test]
    fn test_enum_unknown_ordinal() {
        let codec = EnumCodec::<Color>::new();
        let err = codec.decode(7).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownOrdinal {
                enum_name: "Color",
                ordinal: 7
            }
        );
    }

    #[test]
    fn test_enum_symbol() {
        let codec = EnumCodec::<Color>::new();
        assert_eq!(codec.encode_symbol("green").unwrap(), 2);
        assert_eq!(codec.encode_symbol("RED").unwrap(), 1);
        assert!(matches!(
            codec.encode_symbol("blue"),
            Err(CodecError::Type { .. })
        ));
    }

    #[test]
    fn test_json_nested_value() {
        let codec = JsonCodec::<serde_json::Value>::new();
        let value = json!({
            "tx": "0xabc",
            "block_number": 12,
            "node_info": {"key": "k", "ports": [40102, 40103]},
            "ratio": 0.5,
            "flag": false,
            "missing": null,
        });
        let encoded = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(encoded).unwrap(), value);
    }

    #[test]
    fn test_json_floats_keep_every_bit() {
        let codec = JsonCodec::<serde_json::Value>::new();
        for f in [7.038531e-26, -9.627128433169697e-231, 0.1, f64::MAX, f64::MIN_POSITIVE] {
            let value = json!({"ratio": f});
            let decoded = codec.decode(codec.encode(&value).unwrap()).unwrap();
            assert_eq!(decoded["ratio"].as_f64(), Some(f), "{}", f);
        }
    }

    #[test]
    fn test_json_integer_keys_survive() {
        let codec = JsonCodec::<BTreeMap<u32, String>>::new();
        let mut value = BTreeMap::new();
        value.insert(1, "one".to_string());
        value.insert(20, "twenty".to_string());
        let encoded = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(encoded).unwrap(), value);
    }

    #[test]
    fn test_json_malformed() {
        let codec = JsonCodec::<serde_json::Value>::new();
        let err = codec.decode("{not json".to_string()).unwrap_err();
        assert!(matches!(err, CodecError::Format { .. }));
    }

    #[test]
    fn test_json_default_on_null() {
        let codec = JsonCodec::<serde_json::Map<String, serde_json::Value>>::new();
        assert!(codec.decode_or_default(None).unwrap().is_empty());
        assert!(codec.decode_or_default(Some(String::new())).unwrap().is_empty());
    }

    #[test]
    fn test_format_error_truncates_value() {
        let long = "x".repeat(500);
        let err = RawBytesCodec.decode(long).unwrap_err();
        match err {
            CodecError::Format { value, .. } => assert!(value.len() < 100),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
