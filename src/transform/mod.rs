//! Inverse Transform Pipeline (§4.4): FSE entropy decode (optional) →
//! inverse ZRLT (optional) → inverse SBRT (rank mode) → inverse BWTS.
//!
//! Each stage is reversible independently (see `zrlt`/`sbrt`/`bwts`); this
//! module only sequences them according to the segment's size-header
//! flags.

mod bwts;
mod sbrt;
mod zrlt;

use crate::error::FileFormatError;
use crate::fse::FseTable;
use crate::varint::{decode_segment_size, SegmentSizeHeader};

/// Run the full inverse pipeline over one block segment.
///
/// `raw` is the segment's bytes starting right after its size header;
/// `decoded_len` is the expected output length of the FSE stage (needed
/// because FSE decode consumes a bit stream, not a byte-counted one).
pub fn decode_segment(
    header: SegmentSizeHeader,
    raw: &[u8],
    fse_table: Option<&FseTable>,
    fse_decoded_len: usize,
) -> Result<Vec<u8>, FileFormatError> {
    let after_fse = if header.ignore_fse {
        raw.to_vec()
    } else {
        let table = fse_table.ok_or(FileFormatError::MalformedFseTable(
            "segment requires FSE table but none was supplied",
        ))?;
        let mut bitstream = crate::bitstream::BitStreamReader::new(raw, 0, raw.len())?;
        table.decode_interleaved(&mut bitstream, fse_decoded_len)?
    };

    let after_zrlt = if header.ignore_zrlt {
        after_fse
    } else {
        zrlt::inverse(&after_fse)?
    };

    let after_sbrt = sbrt::inverse(&after_zrlt);
    let original = bwts::inverse(&after_sbrt);
    Ok(original)
}

/// Parse the segment's size header at `buf[pos]`, returning the header and
/// the cursor position just past it (where segment bytes begin).
pub fn read_segment_header(
    buf: &[u8],
    pos: usize,
) -> Result<(SegmentSizeHeader, usize), FileFormatError> {
    decode_segment_size(buf, pos)
}
