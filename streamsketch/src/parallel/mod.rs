//! Parallel ingest engine: build any subset of the three sketches from a
//! partitioned input in one pass.
//!
//! [`parallel_add`] fans work items out over a bounded queue to worker
//! threads. Every worker owns a private set of sketches built from the same
//! configurations, so ingest never contends on a counter; when the input is
//! exhausted the worker sketches reduce to one result per type through a
//! pairwise tournament merge. Because each sketch's `add` commutes (max for
//! HyperLogLog, sums for Count-Min, the Topkapi vote for heavy hitters),
//! the merged result does not depend on how items were interleaved across
//! workers, up to the seeded randomness of the log Count-Min variants;
//! those draw from per-worker streams derived from
//! `(base_seed, worker_id)`, so a fixed partition reproduces exactly.
//!
//! The user callback comes in two explicit shapes (see [`ProcessFn`]):
//! either it mutates the worker's sketches directly and returns how many
//! records it consumed, or it yields batches of `(key, count)` pairs that
//! the engine feeds to every sketch.
//!
//! # Usage
//!
//! ```rust
//! use streamsketch::hll::HllConfig;
//! use streamsketch::parallel::{parallel_add, ParallelOptions, ProcessFn};
//!
//! let shards: Vec<Vec<&[u8]>> = vec![
//!     vec![b"a", b"b"],
//!     vec![b"b", b"c"],
//! ];
//!
//! let process = ProcessFn::yields_batches(|shard: Vec<&[u8]>| {
//!     Ok(vec![shard.into_iter().map(|k| (k.to_vec(), 1)).collect()])
//! });
//!
//! let options = ParallelOptions::new().with_hll(HllConfig::new(12)).with_workers(2);
//! let result = parallel_add(shards, process, options).unwrap();
//!
//! let hll = result.hll.unwrap();
//! assert_eq!(hll.n_records(), 2);
//! assert_eq!(hll.query().round() as u64, 3);
//! ```

mod engine;

pub use self::engine::parallel_add;
pub use self::engine::Batch;
pub use self::engine::ParallelOptions;
pub use self::engine::ProcessFn;
pub use self::engine::SketchSet;
