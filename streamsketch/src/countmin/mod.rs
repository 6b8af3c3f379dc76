//! Count-Min sketch implementation for frequency estimation.
//!
//! The Count-Min sketch provides approximate frequency counts for streaming
//! byte keys in fixed memory. Three counter layouts share one `d × w` matrix
//! type, selected by [`CmsType`]:
//!
//! - [`CmsType::Linear`]: 32-bit counters, exact up to saturation
//! - [`CmsType::Log16`]: 16-bit approximate counters
//! - [`CmsType::Log8`]: 8-bit approximate counters
//!
//! The log variants store a count `c` that is linear up to `num_reserved`
//! and geometric above it: a stored code `c > num_reserved` decodes to
//! `(x^(c - num_reserved) - 1)/(x - 1) + num_reserved`, where the base `x`
//! is derived so that the largest code represents `max_count`. Increments
//! above the reserved range fire with probability `x^-(c - num_reserved)`
//! from the sketch's own seeded generator, which keeps the decoded estimate
//! unbiased.
//!
//! All variants use the conservative-update policy: an add computes the
//! key's current minimum, advances it by the added count, and only raises
//! cells that sit below the result. Cells a colliding key already pushed
//! higher are left alone, which keeps estimates tight without ever letting
//! one drop below the key's true count.
//!
//! # Usage
//!
//! ```rust
//! use streamsketch::countmin::{CmsConfig, CmsType, CountMinSketch};
//!
//! let mut sketch = CountMinSketch::new(CmsConfig::new(CmsType::Linear, 256)).unwrap();
//!
//! sketch.add(b"apple");
//! sketch.add_count(b"banana", 3);
//!
//! assert!(sketch.query(b"banana") >= 3);
//! ```

mod logcounter;
mod serialization;
mod sketch;

pub use self::sketch::CmsConfig;
pub use self::sketch::CmsType;
pub use self::sketch::CountMinSketch;
