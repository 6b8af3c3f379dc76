//! HyperLogLog++ sketch implementation for cardinality estimation.
//!
//! This module provides a probabilistic data structure for estimating the
//! cardinality (number of distinct byte keys) of large streams in fixed
//! memory: `m = 2^p` single-byte registers for a precision `p` in `[7, 16]`.
//!
//! # Estimator
//!
//! Each key hashes once with [`fasthash64`](crate::hash::fasthash64); the
//! top `p` bits route to a register and the register keeps the maximum
//! leading-zero rank observed. Queries combine the harmonic-mean raw
//! estimate with the HyperLogLog++ refinements: empirical bias correction
//! below `5m` (see [`bias`](self) table data) and linear counting while the
//! estimate sits below the per-precision threshold.
//!
//! Merging is an element-wise register maximum, so merge order never
//! changes the result and a merged sketch equals the sketch of the
//! concatenated streams.
//!
//! # Usage
//!
//! ```rust
//! use streamsketch::hll::{HllConfig, HyperLogLog};
//!
//! let mut sketch = HyperLogLog::new(HllConfig::new(12)).unwrap();
//! sketch.add(b"apple");
//! sketch.add(b"banana");
//! sketch.add(b"apple");
//! assert_eq!(sketch.query().round() as u64, 2);
//! ```

mod bias;
mod serialization;
mod sketch;

pub use self::sketch::HllConfig;
pub use self::sketch::HyperLogLog;

/// Smallest supported precision.
pub const MIN_P: u8 = 7;

/// Largest supported precision.
pub const MAX_P: u8 = 16;
