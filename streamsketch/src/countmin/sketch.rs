use std::path::Path;

use crate::codec;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::common::random::XorShift64;
use crate::countmin::logcounter::LogParams;
use crate::countmin::serialization::kind_byte;
use crate::countmin::serialization::CMS_CONFIG_BYTES;
use crate::error::Error;
use crate::error::Result;
use crate::hash::row_hash;

const MAX_TABLE_ENTRIES: u64 = 1 << 34;

/// Counter layout of a Count-Min sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmsType {
    /// 32-bit linear counters; exact until saturation at `2^32 - 1`.
    Linear,
    /// 16-bit approximate log counters.
    Log16,
    /// 8-bit approximate log counters.
    Log8,
}

impl CmsType {
    /// Largest storable code for this layout.
    fn storage_max(self) -> u32 {
        match self {
            CmsType::Linear => u32::MAX,
            CmsType::Log16 => u16::MAX.into(),
            CmsType::Log8 => u8::MAX.into(),
        }
    }

    /// Default linear range of the log layouts.
    fn default_num_reserved(self) -> u32 {
        match self {
            CmsType::Linear => 0,
            CmsType::Log16 => 1023,
            CmsType::Log8 => 15,
        }
    }
}

/// Construction parameters of a [`CountMinSketch`].
///
/// Two sketches can merge only if every field matches.
#[derive(Debug, Clone, PartialEq)]
pub struct CmsConfig {
    /// Counter layout.
    pub cms_type: CmsType,
    /// Number of counters per row.
    pub width: u64,
    /// Number of rows; each row hashes with seed `seed + row`.
    pub depth: u64,
    /// Base hash seed.
    pub seed: u64,
    /// Largest count the log layouts can represent. Ignored for `Linear`.
    pub max_count: u64,
    /// Codes kept exact before the geometric regime. Ignored for `Linear`.
    pub num_reserved: u32,
}

impl CmsConfig {
    /// Config with the defaults of the given layout: depth 8, seed 0, and
    /// for the log layouts `max_count = 2^32 - 1` with 15 (log8) or 1023
    /// (log16) reserved codes.
    pub fn new(cms_type: CmsType, width: u64) -> Self {
        Self {
            cms_type,
            width,
            depth: 8,
            seed: 0,
            max_count: u64::from(u32::MAX),
            num_reserved: cms_type.default_num_reserved(),
        }
    }

    /// Sets the number of rows.
    pub fn with_depth(mut self, depth: u64) -> Self {
        self.depth = depth;
        self
    }

    /// Sets the base hash seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the largest representable count of a log layout.
    pub fn with_max_count(mut self, max_count: u64) -> Self {
        self.max_count = max_count;
        self
    }

    /// Sets the exact linear range of a log layout.
    pub fn with_num_reserved(mut self, num_reserved: u32) -> Self {
        self.num_reserved = num_reserved;
        self
    }
}

/// Variant-typed counter matrix, row-major `[depth][width]`.
#[derive(Debug, Clone, PartialEq)]
enum Counters {
    U32(Vec<u32>),
    U16(Vec<u16>),
    U8(Vec<u8>),
}

impl Counters {
    fn zeroed(cms_type: CmsType, entries: usize) -> Self {
        match cms_type {
            CmsType::Linear => Counters::U32(vec![0; entries]),
            CmsType::Log16 => Counters::U16(vec![0; entries]),
            CmsType::Log8 => Counters::U8(vec![0; entries]),
        }
    }

    fn get(&self, index: usize) -> u32 {
        match self {
            Counters::U32(v) => v[index],
            Counters::U16(v) => v[index].into(),
            Counters::U8(v) => v[index].into(),
        }
    }

    fn set(&mut self, index: usize, code: u32) {
        match self {
            Counters::U32(v) => v[index] = code,
            Counters::U16(v) => v[index] = code as u16,
            Counters::U8(v) => v[index] = code as u8,
        }
    }
}

/// Count-Min sketch for estimating byte-key frequencies.
///
/// See the [module level documentation](crate::countmin) for the counter
/// layouts and update policy.
#[derive(Debug, Clone)]
pub struct CountMinSketch {
    config: CmsConfig,
    log: Option<LogParams>,
    counters: Counters,
    rng: XorShift64,
    n_added: u64,
    n_records: u64,
    saturated: bool,
}

impl CountMinSketch {
    /// Creates a new Count-Min sketch from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`] if `width` or `depth` is zero,
    /// the table exceeds the supported size, or a log layout's
    /// `num_reserved`/`max_count` pair admits no base in `(1, 2]`.
    ///
    /// [`ErrorKind::InvalidConfig`]: crate::error::ErrorKind::InvalidConfig
    pub fn new(config: CmsConfig) -> Result<Self> {
        if config.width == 0 {
            return Err(Error::invalid_config("width must be greater than 0"));
        }
        if config.depth == 0 {
            return Err(Error::invalid_config("depth must be greater than 0"));
        }
        let entries = config
            .width
            .checked_mul(config.depth)
            .filter(|&e| e < MAX_TABLE_ENTRIES)
            .ok_or_else(|| {
                Error::invalid_config(format!(
                    "width * depth must be below {MAX_TABLE_ENTRIES}"
                ))
            })?;

        let log = match config.cms_type {
            CmsType::Linear => None,
            CmsType::Log16 | CmsType::Log8 => Some(LogParams::derive(
                config.num_reserved,
                config.cms_type.storage_max(),
                config.max_count,
            )?),
        };

        let rng = XorShift64::seeded(config.seed);
        Ok(Self {
            counters: Counters::zeroed(config.cms_type, entries as usize),
            config,
            log,
            rng,
            n_added: 0,
            n_records: 0,
            saturated: false,
        })
    }

    /// Convenience constructor for a linear sketch with default depth/seed.
    pub fn linear(width: u64) -> Result<Self> {
        Self::new(CmsConfig::new(CmsType::Linear, width))
    }

    /// Convenience constructor for a log8 sketch with default depth/seed.
    pub fn log8(width: u64) -> Result<Self> {
        Self::new(CmsConfig::new(CmsType::Log8, width))
    }

    /// Convenience constructor for a log16 sketch with default depth/seed.
    pub fn log16(width: u64) -> Result<Self> {
        Self::new(CmsConfig::new(CmsType::Log16, width))
    }

    /// Returns the sketch configuration.
    pub fn config(&self) -> &CmsConfig {
        &self.config
    }

    /// Returns the counter layout.
    pub fn cms_type(&self) -> CmsType {
        self.config.cms_type
    }

    /// Returns the number of counters per row.
    pub fn width(&self) -> u64 {
        self.config.width
    }

    /// Returns the number of rows.
    pub fn depth(&self) -> u64 {
        self.config.depth
    }

    /// Returns the base hash seed.
    pub fn seed(&self) -> u64 {
        self.config.seed
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

    /// True if any counter has clamped at its storage or encoding maximum.
    pub fn saturated(&self) -> bool {
        self.saturated
    }

    /// Adds a single occurrence of `key`.
    pub fn add(&mut self, key: &[u8]) {
        self.add_count(key, 1);
    }

    /// Adds `count` occurrences of `key` under the conservative-update
    /// policy: the key's minimum advances by `count` and only cells below
    /// the result are raised to it.
    pub fn add_count(&mut self, key: &[u8], count: u64) {
        if count == 0 {
            return;
        }
        self.n_added = self.n_added.saturating_add(count);

        let width = self.config.width;
        let mut min = u32::MAX;
        for row in 0..self.config.depth {
            let col = row_hash(key, self.config.seed, row) % width;
            let code = self.counters.get((row * width + col) as usize);
            if code < min {
                min = code;
            }
        }

        // The incremented code is computed once from the minimum; every cell
        // below it is then raised to it. Cells at the minimum stay in
        // lockstep, so the min-query decodes an unbiased single-counter
        // walk, and no cell can linger below the key's true count.
        let updated = match self.log {
            None => {
                let (sum, overflow) = match u32::try_from(count) {
                    Ok(c) => min.overflowing_add(c),
                    Err(_) => (u32::MAX, true),
                };
                if overflow {
                    self.saturated = true;
                    u32::MAX
                } else {
                    sum
                }
            }
            Some(params) => {
                let (code, saturated) = params.increment(min, count, &mut self.rng);
                self.saturated |= saturated;
                code
            }
        };

        for row in 0..self.config.depth {
            let col = row_hash(key, self.config.seed, row) % width;
            let index = (row * width + col) as usize;
            if self.counters.get(index) < updated {
                self.counters.set(index, updated);
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

    /// Returns the estimated frequency of `key`: the minimum decoded counter
    /// across the rows. Never underestimates a linear sketch.
    pub fn query(&self, key: &[u8]) -> u64 {
        let width = self.config.width;
        let mut min = u64::MAX;
        for row in 0..self.config.depth {
            let col = row_hash(key, self.config.seed, row) % width;
            let code = self.counters.get((row * width + col) as usize);
            let value = match self.log {
                None => u64::from(code),
                Some(params) => params.decode_rounded(code),
            };
            if value < min {
                min = value;
            }
        }
        min
    }

    /// Merges `other` into this sketch.
    ///
    /// Linear counters sum with saturation; log counters decode, sum, and
    /// re-encode to the nearest code. Counters and the saturation flag
    /// combine.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IncompatibleSketch`] unless the configurations
    /// are identical.
    ///
    /// [`ErrorKind::IncompatibleSketch`]: crate::error::ErrorKind::IncompatibleSketch
    pub fn merge(&mut self, other: &CountMinSketch) -> Result<()> {
        if self.config != other.config {
            return Err(Error::incompatible(
                "count-min sketches must share cms_type, width, depth, seed, max_count, and num_reserved",
            )
            .with_context("self", format!("{:?}", self.config))
            .with_context("other", format!("{:?}", other.config)));
        }

        let entries = (self.config.width * self.config.depth) as usize;
        match self.log {
            None => {
                for index in 0..entries {
                    let (sum, overflow) =
                        self.counters.get(index).overflowing_add(other.counters.get(index));
                    if overflow {
                        self.counters.set(index, u32::MAX);
                        self.saturated = true;
                    } else {
                        self.counters.set(index, sum);
                    }
                }
            }
            Some(params) => {
                for index in 0..entries {
                    let v = params.decode(self.counters.get(index))
                        + params.decode(other.counters.get(index));
                    let (code, clamped) = params.nearest_code(v);
                    self.counters.set(index, code);
                    self.saturated |= clamped;
                }
            }
        }

        self.n_added = self.n_added.saturating_add(other.n_added);
        self.n_records = self.n_records.saturating_add(other.n_records);
        self.saturated |= other.saturated;
        Ok(())
    }

    /// Re-seeds the log-counter generator onto an independent stream; used
    /// by the parallel engine so each worker's randomness is reproducible.
    pub(crate) fn reseed_stream(&mut self, stream_id: u64) {
        self.rng = XorShift64::stream(self.config.seed, stream_id);
    }
}

// Serialization: the shared container header, the full construction
// parameters (so any conforming implementation can round-trip a file), the
// counters, and the row-major matrix.
impl CountMinSketch {
    /// Serializes this sketch into the container format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let entries = (self.config.width * self.config.depth) as usize;
        let cell = match self.config.cms_type {
            CmsType::Linear => 4,
            CmsType::Log16 => 2,
            CmsType::Log8 => 1,
        };
        let mut bytes = SketchBytes::with_capacity(CMS_CONFIG_BYTES + entries * cell);

        codec::write_header(&mut bytes, kind_byte(self.config.cms_type));
        bytes.write_u64_le(self.config.width);
        bytes.write_u64_le(self.config.depth);
        bytes.write_u64_le(self.config.seed);
        bytes.write_u32_le(self.config.num_reserved);
        bytes.write_u64_le(self.config.max_count);
        bytes.write_u8(u8::from(self.saturated));
        bytes.write_u64_le(self.n_added);
        bytes.write_u64_le(self.n_records);

        match &self.counters {
            Counters::U32(v) => v.iter().for_each(|&c| bytes.write_u32_le(c)),
            Counters::U16(v) => v.iter().for_each(|&c| bytes.write_u16_le(c)),
            Counters::U8(v) => v.iter().for_each(|&c| bytes.write_u8(c)),
        }
        bytes.into_bytes()
    }

    /// Deserializes a sketch of the given layout from container bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedData`] on a bad magic, version, kind,
    /// or a matrix length that does not match the declared dimensions.
    ///
    /// [`ErrorKind::MalformedData`]: crate::error::ErrorKind::MalformedData
    pub fn from_bytes(cms_type: CmsType, bytes: &[u8]) -> Result<Self> {
        let mut slice = SketchSlice::new(bytes);
        codec::read_header(&mut slice, kind_byte(cms_type))?;

        let width = slice.read_u64_le("width")?;
        let depth = slice.read_u64_le("depth")?;
        let seed = slice.read_u64_le("seed")?;
        let num_reserved = slice.read_u32_le("num_reserved")?;
        let max_count = slice.read_u64_le("max_count")?;
        let saturated = slice.read_u8("saturated")? != 0;
        let n_added = slice.read_u64_le("n_added")?;
        let n_records = slice.read_u64_le("n_records")?;

        let config = CmsConfig {
            cms_type,
            width,
            depth,
            seed,
            max_count,
            num_reserved,
        };
        let mut sketch =
            Self::new(config).map_err(|e| Error::malformed(format!("stored config: {e}")))?;

        let entries = (width * depth) as usize;
        let cell = match cms_type {
            CmsType::Linear => 4,
            CmsType::Log16 => 2,
            CmsType::Log8 => 1,
        };
        if slice.remaining() != entries * cell {
            return Err(Error::malformed(format!(
                "matrix length mismatch: {}x{} cells need {} bytes, found {}",
                depth,
                width,
                entries * cell,
                slice.remaining()
            )));
        }
        match &mut sketch.counters {
            Counters::U32(v) => {
                for c in v.iter_mut() {
                    *c = slice.read_u32_le("matrix")?;
                }
            }
            Counters::U16(v) => {
                for c in v.iter_mut() {
                    *c = slice.read_u16_le("matrix")?;
                }
            }
            Counters::U8(v) => {
                for c in v.iter_mut() {
                    *c = slice.read_u8("matrix")?;
                }
            }
        }

        sketch.saturated = saturated;
        sketch.n_added = n_added;
        sketch.n_records = n_records;
        Ok(sketch)
    }

    /// Saves the sketch to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        codec::write_file(path.as_ref(), &self.to_bytes())
    }

    /// Loads a sketch of the given layout from `path`.
    pub fn load(cms_type: CmsType, path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(cms_type, &codec::read_file(path.as_ref())?)
    }
}
