//! Stage policies.
//!
//! Each pipeline stage receives its parameters as an explicit policy
//! struct. Policies are plain serde values with a deterministic
//! `params_hash()`, so every artifact in a run manifest can name the exact
//! parameters that produced it.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Floats are quantized to integers before hashing (multiplied by 1e6 and
//! rounded to i64), so the hash does not depend on float formatting.

pub mod filter;
pub mod untangle;

pub use filter::{BubblePolicy, ContextPolicy, FilterPolicy};
pub use untangle::{BridgePolicy, UntanglePolicy};

/// Quantization factor for float normalization.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float to an i64 for deterministic hashing.
pub(crate) fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_float() {
        assert_eq!(quantize_float(0.05), 50_000);
        assert_eq!(quantize_float(1.0), 1_000_000);
        assert_eq!(quantize_float(0.1 + 0.2), quantize_float(0.3));
    }
}
