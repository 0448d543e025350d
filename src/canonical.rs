//! Canonical serialization for deterministic hashing.
//!
//! Cache keys and fingerprints are derived from these functions, so the same
//! logical request always hashes to the same value.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use BTreeMap for maps in hashed data
//! - Floats are quantized to i64 before hashing (see [`quantize_float`])

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Quantization factor for float normalization.
/// Floats are multiplied by this value and rounded to i64.
pub const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float to an i64 for deterministic hashing.
pub fn quantize_float(value: f32) -> i64 {
    ((value as f64) * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

/// Quantize a whole vector.
pub fn quantize_vector(values: &[f32]) -> Vec<i64> {
    values.iter().copied().map(quantize_float).collect()
}

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Serialization of the plain data types hashed in this crate cannot fail;
/// should a caller pass something that does, the bytes are empty and the
/// hash degenerates to the hash of the empty input.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestStruct {
        name: String,
        value: i32,
    }

    #[test]
    fn test_determinism() {
        let s = TestStruct {
            name: "test".to_string(),
            value: 42,
        };

        let h1 = canonical_hash(&s);
        let h2 = canonical_hash(&s);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hex_is_16_chars() {
        assert_eq!(canonical_hash_hex(&("a", 1)).len(), 16);
    }

    #[test]
    fn test_quantization_absorbs_float_noise() {
        assert_eq!(quantize_float(0.1), quantize_float(0.100_000_01));
        assert_ne!(quantize_float(0.1), quantize_float(0.1001));
    }
}
