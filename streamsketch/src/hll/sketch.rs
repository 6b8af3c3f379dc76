use std::path::Path;

use crate::codec;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;
use crate::error::Result;
use crate::hash::fasthash64;
use crate::hll::bias::estimate_bias;
use crate::hll::bias::threshold;
use crate::hll::serialization::HLL_CONFIG_BYTES;
use crate::hll::serialization::HLL_KIND;
use crate::hll::MAX_P;
use crate::hll::MIN_P;

/// Construction parameters of a [`HyperLogLog`].
///
/// Two sketches can merge only if both fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HllConfig {
    /// Precision: the sketch keeps `2^p` registers. Must be in `[7, 16]`.
    pub p: u8,
    /// Hash seed.
    pub seed: u64,
}

impl HllConfig {
    /// Config with the given precision and seed 0.
    pub fn new(p: u8) -> Self {
        Self { p, seed: 0 }
    }

    /// Sets the hash seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A HyperLogLog++ sketch.
///
/// See the [hll module level documentation](crate::hll) for more.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperLogLog {
    config: HllConfig,
    registers: Vec<u8>,
    n_added: u64,
    n_records: u64,
}

impl HyperLogLog {
    /// Creates a new sketch with `2^p` zeroed registers.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`] if `p` is outside `[7, 16]`.
    ///
    /// [`ErrorKind::InvalidConfig`]: crate::error::ErrorKind::InvalidConfig
    pub fn new(config: HllConfig) -> Result<Self> {
        if !(MIN_P..=MAX_P).contains(&config.p) {
            return Err(Error::invalid_config(format!(
                "p must be in [{MIN_P}, {MAX_P}], got {}",
                config.p
            )));
        }
        Ok(Self {
            config,
            registers: vec![0; 1 << config.p],
            n_added: 0,
            n_records: 0,
        })
    }

    /// Returns the sketch configuration.
    pub fn config(&self) -> HllConfig {
        self.config
    }

    /// Returns the precision.
    pub fn p(&self) -> u8 {
        self.config.p
    }

    /// Returns the hash seed.
    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    /// Returns the register array, `2^p` bytes.
    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    /// Total number of add calls, duplicates included.
    pub fn n_added(&self) -> u64 {
        self.n_added
    }

    /// Number of input records processed, as credited by the caller or the
    /// parallel engine.
    pub fn n_records(&self) -> u64 {
        self.n_records
    }

    /// Credits one processed record.
    pub fn add_record(&mut self) {
        self.n_records += 1;
    }

    /// Credits `n` processed records.
    pub fn update_records(&mut self, n: u64) {
        self.n_records += n;
    }

    /// Adds `key` to the sketch.
    pub fn add(&mut self, key: &[u8]) {
        let p = self.config.p;
        let h = fasthash64(key, self.config.seed);
        let idx = (h >> (64 - p)) as usize;
        // The guard bit keeps the rank finite when the remaining hash bits
        // are all zero.
        let w = (h << p) | (1 << (p - 1));
        let rank = w.leading_zeros() as u8 + 1;
        if rank > self.registers[idx] {
            self.registers[idx] = rank;
        }
        self.n_added += 1;
    }

    /// Adds every key from an iterator.
    pub fn update<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        for key in keys {
            self.add(key.as_ref());
        }
    }

    /// Adds the keys of `(key, count)` pairs, e.g. the entries of a counting
    /// map. Cardinality ignores multiplicities, so each pair credits
    /// `n_added` once and the count is discarded.
    pub fn update_counts<I, K>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, u64)>,
        K: AsRef<[u8]>,
    {
        for (key, _) in pairs {
            self.add(key.as_ref());
        }
    }

    /// Shingles `key` into `ngram`-byte windows and adds each window. A key
    /// shorter than `ngram` is added whole.
    pub fn add_ngram(&mut self, key: &[u8], ngram: usize) {
        if ngram == 0 || key.len() <= ngram {
            self.add(key);
        } else {
            for window in key.windows(ngram) {
                self.add(window);
            }
        }
    }

    /// Applies [`add_ngram`](Self::add_ngram) to every key of an iterator.
    pub fn update_ngram<I, K>(&mut self, keys: I, ngram: usize)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        for key in keys {
            self.add_ngram(key.as_ref(), ngram);
        }
    }

    /// Returns the estimated number of distinct keys added.
    ///
    /// Raw harmonic-mean estimate with the HyperLogLog++ refinements: bias
    /// correction below `5m` and linear counting while the estimate is
    /// below the precision's threshold.
    pub fn query(&self) -> f64 {
        let m = self.registers.len() as f64;
        let mut sum = 0.0;
        let mut zeros = 0u64;
        for &r in &self.registers {
            sum += 1.0 / (1u64 << r) as f64;
            if r == 0 {
                zeros += 1;
            }
        }

        let alpha = 0.7213 / (1.0 + 1.079 / m);
        let raw = alpha * m * m / sum;
        let corrected = if raw <= 5.0 * m {
            raw - estimate_bias(raw, self.config.p)
        } else {
            raw
        };

        let linear = if zeros != 0 {
            m * (m / zeros as f64).ln()
        } else {
            corrected
        };

        if linear <= threshold(self.config.p) {
            linear
        } else {
            corrected
        }
    }

    /// Merges `other` into this sketch: element-wise register maximum, with
    /// counters summing.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IncompatibleSketch`] unless `p` and `seed`
    /// match.
    ///
    /// [`ErrorKind::IncompatibleSketch`]: crate::error::ErrorKind::IncompatibleSketch
    pub fn merge(&mut self, other: &HyperLogLog) -> Result<()> {
        if self.config != other.config {
            return Err(
                Error::incompatible("hyperloglog sketches must share p and seed")
                    .with_context("self", format!("{:?}", self.config))
                    .with_context("other", format!("{:?}", other.config)),
            );
        }
        for (reg, &o) in self.registers.iter_mut().zip(other.registers.iter()) {
            if o > *reg {
                *reg = o;
            }
        }
        self.n_added = self.n_added.saturating_add(other.n_added);
        self.n_records = self.n_records.saturating_add(other.n_records);
        Ok(())
    }
}

// Serialization: the shared container header, precision and seed, the
// counters, and the raw register array.
impl HyperLogLog {
    /// Serializes this sketch into the container format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(HLL_CONFIG_BYTES + self.registers.len());
        codec::write_header(&mut bytes, HLL_KIND);
        bytes.write_u8(self.config.p);
        bytes.write_u64_le(self.config.seed);
        bytes.write_u64_le(self.n_added);
        bytes.write_u64_le(self.n_records);
        bytes.write(&self.registers);
        bytes.into_bytes()
    }

    /// Deserializes a sketch from container bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedData`] on a bad magic, version, kind,
    /// or a register array that does not match the declared precision.
    ///
    /// [`ErrorKind::MalformedData`]: crate::error::ErrorKind::MalformedData
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut slice = SketchSlice::new(bytes);
        codec::read_header(&mut slice, HLL_KIND)?;

        let p = slice.read_u8("p")?;
        let seed = slice.read_u64_le("seed")?;
        let n_added = slice.read_u64_le("n_added")?;
        let n_records = slice.read_u64_le("n_records")?;

        let mut sketch = Self::new(HllConfig { p, seed })
            .map_err(|e| Error::malformed(format!("stored config: {e}")))?;
        if slice.remaining() != sketch.registers.len() {
            return Err(Error::malformed(format!(
                "register length mismatch: p {} needs {} bytes, found {}",
                p,
                sketch.registers.len(),
                slice.remaining()
            )));
        }
        slice.read_exact(&mut sketch.registers, "registers")?;
        let max_rank = 65 - p;
        if let Some(bad) = sketch.registers.iter().find(|&&r| r > max_rank) {
            return Err(Error::malformed(format!(
                "register value {bad} exceeds the maximum rank {max_rank} for p {p}"
            )));
        }
        sketch.n_added = n_added;
        sketch.n_records = n_records;
        Ok(sketch)
    }

    /// Saves the sketch to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        codec::write_file(path.as_ref(), &self.to_bytes())
    }

    /// Loads a sketch from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&codec::read_file(path.as_ref())?)
    }
}
