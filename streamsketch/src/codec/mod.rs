//! Little-endian binary reader/writer helpers and the shared container
//! framing used by every sketch's serialization module.
//!
//! A serialized sketch starts with the 4-byte magic `b"SKCH"`, a format
//! version byte, a kind byte, and two reserved zero bytes; the kind-specific
//! config, the `n_added`/`n_records` counters, and the row-major counter
//! arrays follow. All integers are little-endian.

use std::path::Path;

use crate::error::Error;
use crate::error::Result;

mod decode;
mod encode;

pub(crate) use self::decode::SketchSlice;
pub(crate) use self::encode::SketchBytes;

/// Leading magic of every serialized sketch.
pub(crate) const SKETCH_MAGIC: [u8; 4] = *b"SKCH";

/// Current container format version.
pub(crate) const SERIAL_VERSION: u8 = 1;

/// Writes the shared container header.
pub(crate) fn write_header(bytes: &mut SketchBytes, kind: u8) {
    bytes.write(&SKETCH_MAGIC);
    bytes.write_u8(SERIAL_VERSION);
    bytes.write_u8(kind);
    bytes.write_u16_le(0);
}

/// Reads and validates the shared container header, returning the kind byte.
pub(crate) fn read_header(slice: &mut SketchSlice<'_>, expected_kind: u8) -> Result<()> {
    let mut magic = [0u8; 4];
    slice.read_exact(&mut magic, "magic")?;
    if magic != SKETCH_MAGIC {
        return Err(Error::malformed("bad magic").with_context("magic", format!("{magic:02x?}")));
    }
    let version = slice.read_u8("version")?;
    if version != SERIAL_VERSION {
        return Err(Error::malformed(format!(
            "unsupported serial version: expected {SERIAL_VERSION}, got {version}"
        )));
    }
    let kind = slice.read_u8("kind")?;
    if kind != expected_kind {
        return Err(Error::malformed(format!(
            "wrong sketch kind: expected {expected_kind}, got {kind}"
        )));
    }
    slice.read_u16_le("reserved")?;
    Ok(())
}

/// Writes serialized sketch bytes to `path`.
pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)
        .map_err(|e| Error::io("write", e).with_context("path", path.display()))
}

/// Reads serialized sketch bytes from `path`.
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::io("read", e).with_context("path", path.display()))
}
