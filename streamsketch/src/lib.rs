//! Probabilistic stream-summary sketches for unbounded byte-key streams.
//!
//! Three complementary fixed-memory summaries, plus an engine that builds
//! any subset of them from a sharded input in one parallel pass:
//!
//! - [`hll`]: HyperLogLog++ cardinality estimation
//! - [`countmin`]: Count-Min frequency estimation, with linear and
//!   8/16-bit approximate-counter layouts
//! - [`heavyhitters`]: Topkapi top-k frequent-element estimation
//! - [`parallel`]: multi-worker ingest with a pairwise tournament merge
//!
//! Every sketch exposes the same surface: `add`/`add_count`, bulk `update`
//! and `update_counts`, a type-specific `query`, a config-checked `merge`,
//! the `n_added`/`n_records` counter pair, and `save`/`load` through a
//! little-endian binary container ([`hash`] documents the bit-exact hashing
//! contract that makes those files portable across implementations).
//!
//! # Quick start
//!
//! ```rust
//! use streamsketch::countmin::{CmsConfig, CmsType, CountMinSketch};
//! use streamsketch::hll::{HllConfig, HyperLogLog};
//!
//! let mut cms = CountMinSketch::new(CmsConfig::new(CmsType::Linear, 1024)).unwrap();
//! let mut hll = HyperLogLog::new(HllConfig::new(12)).unwrap();
//!
//! for key in [b"a".as_slice(), b"b", b"a", b"a"] {
//!     cms.add(key);
//!     hll.add(key);
//! }
//!
//! assert_eq!(cms.query(b"a"), 3);
//! assert_eq!(hll.query().round() as u64, 2);
//! ```

mod codec;
mod common;

pub mod countmin;
pub mod error;
pub mod hash;
pub mod heavyhitters;
pub mod hll;
pub mod parallel;

pub use crate::error::Error;
pub use crate::error::ErrorKind;
pub use crate::error::Result;
