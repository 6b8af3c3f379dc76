use crate::codec;

/// Kind byte: Topkapi heavy hitters.
pub(super) const HH_KIND: u8 = 5;

/// Serialized size of the header, config, and counter fields that precede
/// the grid arrays: magic + version + kind + reserved, width/depth,
/// max_key_len, phi, seed, saturated flag, n_added, n_records.
pub(super) const HH_CONFIG_BYTES: usize =
    codec::SKETCH_MAGIC.len() + 4 + 8 * 2 + 1 + 8 + 8 + 1 + 8 * 2;
