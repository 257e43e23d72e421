//! EXIF helpers backed by `kamadak-exif`.

use exif::{Exif, In, Reader, Tag};
use std::io::Cursor;

/// Parse the EXIF block embedded in an image container (JPEG, TIFF-based
/// raws, PNG, WebP, HEIF). `None` when the file carries no EXIF.
pub fn read_exif(data: &[u8]) -> Option<Exif> {
    let mut cursor = Cursor::new(data);
    Reader::new().read_from_container(&mut cursor).ok()
}

/// Unsigned integer value of `tag` in the primary IFD.
pub fn exif_uint(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}

/// EXIF orientation (1-8), or 1 (normal) when absent or out of range.
pub fn read_orientation(data: &[u8]) -> u8 {
    read_exif(data)
        .and_then(|exif| exif_uint(&exif, Tag::Orientation))
        .filter(|o| (1..=8).contains(o))
        .map(|o| o as u8)
        .unwrap_or(1)
}

/// Embedded JPEG preview of a camera raw file.
///
/// Looks for the JPEG interchange pointer in the thumbnail IFD first, then in
/// the primary IFD. Offsets are relative to the TIFF header, which is the
/// start of the parsed buffer for TIFF-based raws.
pub fn embedded_preview(data: &[u8]) -> Option<Vec<u8>> {
    let exif = read_exif(data)?;
    let buf = exif.buf();

    [In::THUMBNAIL, In::PRIMARY].into_iter().find_map(|ifd| {
        let offset = exif
            .get_field(Tag::JPEGInterchangeFormat, ifd)?
            .value
            .get_uint(0)? as usize;
        let length = exif
            .get_field(Tag::JPEGInterchangeFormatLength, ifd)?
            .value
            .get_uint(0)? as usize;
        let end = offset.checked_add(length)?;
        buf.get(offset..end).map(|slice| slice.to_vec())
    })
}
