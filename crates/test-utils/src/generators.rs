//! Generators for tile payloads.
//!
//! These produce byte patterns that exercise the payload normalization in
//! the tile fetcher: gzip-wrapped vector tiles, corrupt gzip streams and
//! raster-looking bytes that must pass through untouched.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

/// PNG file signature, enough to look like a raster tile.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

/// Gzip-compress `data`.
///
/// # Example
///
/// ```
/// use test_utils::gzip;
///
/// let packed = gzip(b"hello");
/// assert_eq!(&packed[..2], &[0x1f, 0x8b]);
/// ```
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .expect("writing to a Vec cannot fail");
    encoder.finish().expect("finishing a Vec-backed encoder cannot fail")
}

/// Bytes that start with a valid gzip header but carry a deflate block of
/// the reserved type, so inflating fails immediately.
pub fn corrupt_gzip() -> Vec<u8> {
    vec![
        0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, // header
        0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // BFINAL=1, BTYPE=11
    ]
}

/// A fake raster tile: PNG signature followed by a predictable body.
///
/// The body encodes the tile index so tests can tell tiles apart.
pub fn fake_png_tile(z: u32, x: u32, y: u32) -> Vec<u8> {
    let mut data = PNG_SIGNATURE.to_vec();
    data.extend_from_slice(format!("{}/{}/{}", z, x, y).as_bytes());
    data
}
