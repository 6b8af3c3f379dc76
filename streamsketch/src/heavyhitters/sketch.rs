use std::collections::HashMap;
use std::path::Path;

use crate::codec;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;
use crate::error::Result;
use crate::hash::row_hash;
use crate::heavyhitters::serialization::HH_CONFIG_BYTES;
use crate::heavyhitters::serialization::HH_KIND;

/// Construction parameters of a [`HeavyHitters`] sketch.
///
/// Two sketches can merge only if every field matches.
#[derive(Debug, Clone, PartialEq)]
pub struct HhConfig {
    /// Number of cells per row.
    pub width: u64,
    /// Number of rows; each row hashes with seed `seed + row`.
    pub depth: u64,
    /// Largest key size a cell can store, in `[1, 255]`. Longer keys are
    /// truncated to their first `max_key_len` bytes.
    pub max_key_len: u8,
    /// Heavy-hitter fraction: queries drop candidates whose estimate is
    /// below `phi * n_added`.
    pub phi: f64,
    /// Base hash seed.
    pub seed: u64,
}

impl HhConfig {
    /// Config with the given width and the defaults: depth 4, key slots of
    /// 16 bytes, `phi = 1/width`, seed 0.
    pub fn new(width: u64) -> Self {
        Self {
            width,
            depth: 4,
            max_key_len: 16,
            phi: if width == 0 { 1.0 } else { 1.0 / width as f64 },
            seed: 0,
        }
    }

    /// Sets the number of rows.
    pub fn with_depth(mut self, depth: u64) -> Self {
        self.depth = depth;
        self
    }

    /// Sets the per-cell key capacity.
    pub fn with_max_key_len(mut self, max_key_len: u8) -> Self {
        self.max_key_len = max_key_len;
        self
    }

    /// Sets the heavy-hitter fraction.
    pub fn with_phi(mut self, phi: f64) -> Self {
        self.phi = phi;
        self
    }

    /// Sets the base hash seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Topkapi heavy-hitters sketch over byte keys.
///
/// See the [module level documentation](crate::heavyhitters) for the
/// algorithm and its guarantees.
#[derive(Debug, Clone)]
pub struct HeavyHitters {
    config: HhConfig,
    /// Candidate key bytes, row-major `[depth][width][max_key_len]`,
    /// zero-padded past each key's length.
    keys: Vec<u8>,
    /// Stored key lengths, row-major `[depth][width]`.
    lens: Vec<u8>,
    /// Vote counters, row-major `[depth][width]`.
    counts: Vec<u32>,
    n_added: u64,
    n_records: u64,
    saturated: bool,
}

impl HeavyHitters {
    /// Creates a new heavy-hitters sketch from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`] if `width` or `depth` is zero,
    /// `max_key_len` is zero, or `phi` is outside `(0, 1]`.
    ///
    /// [`ErrorKind::InvalidConfig`]: crate::error::ErrorKind::InvalidConfig
    pub fn new(config: HhConfig) -> Result<Self> {
        if config.width == 0 {
            return Err(Error::invalid_config("width must be greater than 0"));
        }
        if config.depth == 0 {
            return Err(Error::invalid_config("depth must be greater than 0"));
        }
        if config.max_key_len == 0 {
            return Err(Error::invalid_config("max_key_len must be greater than 0"));
        }
        if !(config.phi > 0.0 && config.phi <= 1.0) {
            return Err(Error::invalid_config(format!(
                "phi must be in (0, 1], got {}",
                config.phi
            )));
        }
        let cells = (config.width * config.depth) as usize;
        Ok(Self {
            keys: vec![0; cells * usize::from(config.max_key_len)],
            lens: vec![0; cells],
            counts: vec![0; cells],
            config,
            n_added: 0,
            n_records: 0,
            saturated: false,
        })
    }

    /// Returns the sketch configuration.
    pub fn config(&self) -> &HhConfig {
        &self.config
    }

    /// Returns the number of cells per row.
    pub fn width(&self) -> u64 {
        self.config.width
    }

    /// Returns the number of rows.
    pub fn depth(&self) -> u64 {
        self.config.depth
    }

    /// Total number of elements added, duplicates included.
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

    /// True if any cell counter has clamped at `2^32 - 1`.
    pub fn saturated(&self) -> bool {
        self.saturated
    }

    /// Adds a single occurrence of `key`.
    pub fn add(&mut self, key: &[u8]) {
        self.add_count(key, 1);
    }

    /// Adds `count` occurrences of `key`.
    ///
    /// Per row the cell either matches the key (counter grows), or loses
    /// `count` votes; a cell driven past zero is taken over by the key with
    /// the remainder, exactly as if the occurrences had been added one at a
    /// time.
    pub fn add_count(&mut self, key: &[u8], count: u64) {
        if count == 0 {
            return;
        }
        let key = Self::clip(key, self.config.max_key_len);
        self.n_added = self.n_added.saturating_add(count);

        let mkl = usize::from(self.config.max_key_len);
        for row in 0..self.config.depth {
            let col = row_hash(key, self.config.seed, row) % self.config.width;
            let cell = (row * self.config.width + col) as usize;
            let slot = &mut self.keys[cell * mkl..(cell + 1) * mkl];

            if usize::from(self.lens[cell]) == key.len() && &slot[..key.len()] == key {
                let (sum, overflow) = match u32::try_from(count) {
                    Ok(c) => self.counts[cell].overflowing_add(c),
                    Err(_) => (u32::MAX, true),
                };
                if overflow {
                    self.counts[cell] = u32::MAX;
                    self.saturated = true;
                } else {
                    self.counts[cell] = sum;
                }
            } else if u64::from(self.counts[cell]) >= count {
                self.counts[cell] -= count as u32;
            } else {
                // Takeover: the new key absorbs the remaining votes in one
                // step, crossing zero exactly as repeated unit adds would.
                let remainder = count - u64::from(self.counts[cell]);
                slot[..key.len()].copy_from_slice(key);
                slot[key.len()..].fill(0);
                self.lens[cell] = key.len() as u8;
                self.counts[cell] = u32::try_from(remainder).unwrap_or_else(|_| {
                    self.saturated = true;
                    u32::MAX
                });
            }
        }
    }

    /// Adds every key from an iterator once each.
    pub fn update<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        for key in keys {
            self.add(key.as_ref());
        }
    }

    /// Adds `(key, count)` pairs, e.g. the entries of a counting map.
    pub fn update_counts<I, K>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, u64)>,
        K: AsRef<[u8]>,
    {
        for (key, count) in pairs {
            self.add_count(key.as_ref(), count);
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

    /// Returns the estimated count of `key`: the largest counter among the
    /// key's cells, or 0 if no cell holds it.
    pub fn estimate(&self, key: &[u8]) -> u64 {
        let key = Self::clip(key, self.config.max_key_len);
        let mkl = usize::from(self.config.max_key_len);
        let mut max = 0u32;
        for row in 0..self.config.depth {
            let col = row_hash(key, self.config.seed, row) % self.config.width;
            let cell = (row * self.config.width + col) as usize;
            if usize::from(self.lens[cell]) == key.len()
                && &self.keys[cell * mkl..cell * mkl + key.len()] == key
                && self.counts[cell] > max
            {
                max = self.counts[cell];
            }
        }
        u64::from(max)
    }

    /// Returns the top-`k` heavy hitters as `(key, estimated_count)` pairs,
    /// ordered by count descending with ties broken by key order.
    ///
    /// Candidates come from every cell of the grid, each key estimated by
    /// its largest counter. A candidate survives if its estimate is at
    /// least `max(threshold, phi * n_added)`; pass `threshold = 0` to
    /// filter on the phi fraction alone.
    pub fn query(&self, k: usize, threshold: u64) -> Vec<(Vec<u8>, u64)> {
        let mkl = usize::from(self.config.max_key_len);
        let mut candidates: HashMap<&[u8], u32> = HashMap::new();
        for cell in 0..self.counts.len() {
            if self.counts[cell] == 0 {
                continue;
            }
            let key = &self.keys[cell * mkl..cell * mkl + usize::from(self.lens[cell])];
            let entry = candidates.entry(key).or_insert(0);
            if self.counts[cell] > *entry {
                *entry = self.counts[cell];
            }
        }

        let cut = (self.config.phi * self.n_added as f64).max(threshold as f64);
        let mut hitters: Vec<(Vec<u8>, u64)> = candidates
            .into_iter()
            .filter(|&(_, count)| f64::from(count) >= cut)
            .map(|(key, count)| (key.to_vec(), u64::from(count)))
            .collect();
        hitters.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        hitters.truncate(k);
        hitters
    }

    /// Merges `other` into this sketch with the Topkapi cell rule: matching
    /// keys sum their counters, otherwise the larger counter keeps the cell
    /// and is reduced by the smaller. Counters and the saturation flag
    /// combine.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IncompatibleSketch`] unless the configurations
    /// are identical.
    ///
    /// [`ErrorKind::IncompatibleSketch`]: crate::error::ErrorKind::IncompatibleSketch
    pub fn merge(&mut self, other: &HeavyHitters) -> Result<()> {
        if self.config != other.config {
            return Err(Error::incompatible(
                "heavy-hitters sketches must share width, depth, max_key_len, phi, and seed",
            )
            .with_context("self", format!("{:?}", self.config))
            .with_context("other", format!("{:?}", other.config)));
        }

        let mkl = usize::from(self.config.max_key_len);
        for cell in 0..self.counts.len() {
            let slot = cell * mkl..(cell + 1) * mkl;
            let keys_match = self.lens[cell] == other.lens[cell]
                && self.keys[slot.clone()] == other.keys[slot.clone()];
            if keys_match {
                let (sum, overflow) = self.counts[cell].overflowing_add(other.counts[cell]);
                if overflow {
                    self.counts[cell] = u32::MAX;
                    self.saturated = true;
                } else {
                    self.counts[cell] = sum;
                }
            } else if self.counts[cell] >= other.counts[cell] {
                self.counts[cell] -= other.counts[cell];
            } else {
                self.keys[slot.clone()].copy_from_slice(&other.keys[slot]);
                self.lens[cell] = other.lens[cell];
                self.counts[cell] = other.counts[cell] - self.counts[cell];
            }
        }

        self.n_added = self.n_added.saturating_add(other.n_added);
        self.n_records = self.n_records.saturating_add(other.n_records);
        self.saturated |= other.saturated;
        Ok(())
    }

    /// Keys past the slot capacity participate by their leading bytes.
    fn clip(key: &[u8], max_key_len: u8) -> &[u8] {
        &key[..key.len().min(usize::from(max_key_len))]
    }
}

// Serialization: the shared container header, the full construction
// parameters, the counters, and the three row-major grid arrays (vote
// counters, key lengths, key bytes).
impl HeavyHitters {
    /// Serializes this sketch into the container format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(
            HH_CONFIG_BYTES + self.counts.len() * 5 + self.keys.len(),
        );
        codec::write_header(&mut bytes, HH_KIND);
        bytes.write_u64_le(self.config.width);
        bytes.write_u64_le(self.config.depth);
        bytes.write_u8(self.config.max_key_len);
        bytes.write_f64_le(self.config.phi);
        bytes.write_u64_le(self.config.seed);
        bytes.write_u8(u8::from(self.saturated));
        bytes.write_u64_le(self.n_added);
        bytes.write_u64_le(self.n_records);

        for &count in &self.counts {
            bytes.write_u32_le(count);
        }
        bytes.write(&self.lens);
        bytes.write(&self.keys);
        bytes.into_bytes()
    }

    /// Deserializes a sketch from container bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedData`] on a bad magic, version, kind,
    /// or grid arrays that do not match the declared dimensions.
    ///
    /// [`ErrorKind::MalformedData`]: crate::error::ErrorKind::MalformedData
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut slice = SketchSlice::new(bytes);
        codec::read_header(&mut slice, HH_KIND)?;

        let width = slice.read_u64_le("width")?;
        let depth = slice.read_u64_le("depth")?;
        let max_key_len = slice.read_u8("max_key_len")?;
        let phi = slice.read_f64_le("phi")?;
        let seed = slice.read_u64_le("seed")?;
        let saturated = slice.read_u8("saturated")? != 0;
        let n_added = slice.read_u64_le("n_added")?;
        let n_records = slice.read_u64_le("n_records")?;

        let config = HhConfig {
            width,
            depth,
            max_key_len,
            phi,
            seed,
        };
        let mut sketch =
            Self::new(config).map_err(|e| Error::malformed(format!("stored config: {e}")))?;

        let cells = (width * depth) as usize;
        let expected = cells * 5 + cells * usize::from(max_key_len);
        if slice.remaining() != expected {
            return Err(Error::malformed(format!(
                "grid length mismatch: {depth}x{width} cells need {expected} bytes, found {}",
                slice.remaining()
            )));
        }
        for count in sketch.counts.iter_mut() {
            *count = slice.read_u32_le("counts")?;
        }
        slice.read_exact(&mut sketch.lens, "key_lens")?;
        slice.read_exact(&mut sketch.keys, "keys")?;

        sketch.saturated = saturated;
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
