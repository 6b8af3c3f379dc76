use crate::codec;

/// Kind byte: HyperLogLog.
pub(super) const HLL_KIND: u8 = 1;

/// Serialized size of the header, config, and counter fields that precede
/// the register array: magic + version + kind + reserved, p, seed, n_added,
/// n_records.
pub(super) const HLL_CONFIG_BYTES: usize = codec::SKETCH_MAGIC.len() + 4 + 1 + 8 * 3;
