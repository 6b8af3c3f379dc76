//! Topkapi heavy-hitters sketch for top-k frequent-element estimation.
//!
//! Implements the sketch of Mandal, Jiang, Shrivastava & Sarkar, "Topkapi:
//! Parallel and Fast Sketches for Finding Top-K Frequent Elements" (NeurIPS
//! 2018). A `d × w` grid of cells each holds one candidate key (up to
//! `max_key_len` bytes), its length, and a 32-bit counter driven by the
//! majority-vote rule: a matching key increments, a competing key
//! decrements, and a cell whose counter is exhausted is taken over by the
//! new key. Grids built on disjoint shards of a stream merge cell-by-cell,
//! which is what makes the sketch parallel-friendly.
//!
//! Keys with frequency above `phi · n` survive the vote with high
//! probability; [`HeavyHitters::query`] returns the top-k above that
//! threshold, scanning every row of the grid for candidates.
//!
//! # Usage
//!
//! ```rust
//! use streamsketch::heavyhitters::{HeavyHitters, HhConfig};
//!
//! let mut sketch = HeavyHitters::new(HhConfig::new(128)).unwrap();
//! for _ in 0..3 {
//!     sketch.add(b"apple");
//! }
//! sketch.add(b"banana");
//!
//! let top = sketch.query(1, 0);
//! assert_eq!(top[0], (b"apple".to_vec(), 3));
//! ```

mod serialization;
mod sketch;

pub use self::sketch::HeavyHitters;
pub use self::sketch::HhConfig;
