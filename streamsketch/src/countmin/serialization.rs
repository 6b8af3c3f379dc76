use crate::codec;
use crate::countmin::CmsType;

/// Kind byte: Count-Min with linear counters.
pub(super) const CMS_LINEAR_KIND: u8 = 2;
/// Kind byte: Count-Min with 8-bit log counters.
pub(super) const CMS_LOG8_KIND: u8 = 3;
/// Kind byte: Count-Min with 16-bit log counters.
pub(super) const CMS_LOG16_KIND: u8 = 4;

/// Serialized size of the header, config, and counter fields that precede
/// the matrix: magic + version + kind + reserved, width/depth/seed,
/// num_reserved, max_count, saturated flag, n_added, n_records.
pub(super) const CMS_CONFIG_BYTES: usize = codec::SKETCH_MAGIC.len() + 4 + 8 * 3 + 4 + 8 + 1 + 8 * 2;

/// Container kind byte of a counter layout.
pub(super) fn kind_byte(cms_type: CmsType) -> u8 {
    match cms_type {
        CmsType::Linear => CMS_LINEAR_KIND,
        CmsType::Log8 => CMS_LOG8_KIND,
        CmsType::Log16 => CMS_LOG16_KIND,
    }
}
