//! Block Decoder (§4.5 index entries, §4.7 key walk payload, §4.8 coords).
//!
//! A block is a self-describing run of `entry_count` rows: a keys segment
//! (delta-varint-encoded, decoded by `index.rs`'s block key walk), a coords
//! segment whose *decoded* payload carries a bit-packed bounding box plus
//! one quantized index pair per entry, and an optional extra-data segment.
//! Every segment goes through the same inverse transform pipeline
//! (`transform::decode_segment`) before anything in it is interpreted —
//! there is no raw fixed-width bounding-box header anywhere on disk.
//!
//! Each segment follows a fixed header-then-payload shape: read the size
//! header, slice out the payload, run it through the decode-then-verify
//! pipeline below. The three segments are decoded by three separate
//! functions (not one combined `decode_block`) so that a lookup which
//! misses during the keys walk never has to touch the coords or
//! extra-data segments at all (§4.1 steps 6-9).

use crate::error::FileFormatError;
use crate::fse::FseTable;
use crate::header::Header;
use crate::transform;
use crate::varint::decode_uvarint;

/// Width, in bits, of the `lat_bits`/`lon_bits` fields packed into a
/// block's bounding-box header (§4.8, §9 glossary `kCoordSpecBits`).
pub const COORD_SPEC_BITS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coords {
    pub lat: f32,
    pub lon: f32,
}

#[derive(Debug, Clone)]
pub struct BlockIndexEntry {
    pub index_key: Vec<u8>,
    pub block_offset: u32,
}

/// Fixed-stride read of one block index entry at `buf[pos]`.
pub fn read_block_index_entry(
    buf: &[u8],
    pos: usize,
    effective_key_size: usize,
) -> Result<BlockIndexEntry, FileFormatError> {
    let stride = effective_key_size + 4;
    if buf.len() < pos + stride {
        return Err(FileFormatError::CorruptIndex);
    }
    let index_key = buf[pos..pos + effective_key_size].to_vec();
    let offset_pos = pos + effective_key_size;
    let block_offset = u32::from_le_bytes(buf[offset_pos..offset_pos + 4].try_into().unwrap());
    Ok(BlockIndexEntry {
        index_key,
        block_offset,
    })
}

/// Result of decoding a block's keys segment: the decoded delta-varint
/// blob (walked by `index.rs`), how many rows the block holds, and the
/// file position right after the raw keys segment bytes, where the coords
/// segment begins.
#[derive(Debug, Clone)]
pub struct DecodedKeys {
    pub keys_blob: Vec<u8>,
    pub entry_count: usize,
    pub next_pos: usize,
}

/// Result of decoding a block's coords segment: one reconstructed
/// lat/lon per entry (materializing the whole segment, per §4.8 step 4's
/// whole-buffer-caching case), and the file position right after the raw
/// coords segment bytes, where the extra-data segment (if any) begins.
#[derive(Debug, Clone)]
pub struct DecodedCoords {
    pub coords: Vec<Coords>,
    pub next_pos: usize,
}

struct ForwardBitReader<'a> {
    buf: &'a [u8],
    bit_pos: usize,
}

impl<'a> ForwardBitReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, bit_pos: 0 }
    }

    fn read_bits(&mut self, n: u32) -> Result<u64, FileFormatError> {
        let mut value = 0u64;
        for _ in 0..n {
            let byte_idx = self.bit_pos / 8;
            let bit_idx = 7 - (self.bit_pos % 8);
            let byte = *self
                .buf
                .get(byte_idx)
                .ok_or(FileFormatError::BitStreamExhausted)?;
            let bit = (byte >> bit_idx) & 1;
            value = (value << 1) | bit as u64;
            self.bit_pos += 1;
        }
        Ok(value)
    }
}

fn read_segment(
    buf: &[u8],
    pos: usize,
    table: Option<&FseTable>,
    decoded_len: usize,
) -> Result<(Vec<u8>, usize), FileFormatError> {
    let (seg_header, payload_start) = transform::read_segment_header(buf, pos)?;
    let payload_end = payload_start + seg_header.byte_len as usize;
    if buf.len() < payload_end {
        return Err(FileFormatError::CorruptIndex);
    }
    let raw = &buf[payload_start..payload_end];
    let decoded = transform::decode_segment(seg_header, raw, table, decoded_len)?;
    Ok((decoded, payload_end))
}

/// Decode a block's keys segment starting at `block_offset` within `file`.
/// Per §4.1 step 7, callers must skip to `next_pos` regardless of whether
/// the key walk actually finds a match — that's where the coords segment
/// begins.
pub fn decode_block_keys(
    file: &[u8],
    block_offset: usize,
    keys_table: &FseTable,
) -> Result<DecodedKeys, FileFormatError> {
    let (entry_count, pos) = decode_uvarint(file, block_offset)?;
    let entry_count = entry_count as usize;

    // Keys segment: decoded length is not known up front (varint-coded
    // deltas are variable width), so the FSE stage is sized by the segment
    // header's declared byte length when ignore_fse is set, or otherwise
    // simply decoded until the bit stream is exhausted. We pass the raw
    // byte length as a conservative upper bound; decode_segment stops once
    // `out_len` symbols have been produced.
    let (keys_seg_header, keys_payload_start) = transform::read_segment_header(file, pos)?;
    let keys_payload_end = keys_payload_start + keys_seg_header.byte_len as usize;
    if file.len() < keys_payload_end {
        return Err(FileFormatError::CorruptIndex);
    }
    let keys_raw = &file[keys_payload_start..keys_payload_end];
    // Keys are byte-oriented (not fixed-count), so the FSE target length is
    // the declared decompressed size carried alongside the raw payload: for
    // ignore_fse segments the raw bytes already are the decoded bytes, and
    // for FSE-coded segments the byte_len field names the *compressed*
    // length while the decoded length equals `entry_count` average-sized
    // deltas; a generous bound (8 bytes/entry) is used and the actual
    // terminator is the inverse ZRLT/SBRT/BWTS stages settling on their own
    // lengths, matching the approach the other segments use.
    let keys_decoded_len = if keys_seg_header.ignore_fse {
        keys_raw.len()
    } else {
        entry_count * 8
    };
    let keys_blob =
        transform::decode_segment(keys_seg_header, keys_raw, Some(keys_table), keys_decoded_len)?;

    Ok(DecodedKeys {
        keys_blob,
        entry_count,
        next_pos: keys_payload_end,
    })
}

/// Decode a block's coords segment (§4.8): the segment's *decoded* payload
/// packs, MSB-first, four `bounding_box_bits`-wide corner indices, then
/// `lat_bits`/`lon_bits` (each `COORD_SPEC_BITS` wide), then one
/// `lat_bits + lon_bits`-wide quantized index pair per entry. `pos` must be
/// the file position right after the keys segment (`DecodedKeys::next_pos`).
pub fn decode_block_coords(
    file: &[u8],
    pos: usize,
    entry_count: usize,
    header: &Header,
    coords_table: &FseTable,
) -> Result<DecodedCoords, FileFormatError> {
    let bounding_box_bits = header.bounding_box_bits as u32;
    let header_bits = 4 * bounding_box_bits as usize + 2 * COORD_SPEC_BITS as usize;
    // The per-entry width isn't known until the header fields above are
    // decoded, so a generous upper bound (both axes at their widest
    // representable width) sizes the FSE stage; a matching bound is used
    // for the keys segment above.
    let max_coords_bits = 2 * ((1u32 << COORD_SPEC_BITS) - 1) as usize;
    let coords_decoded_len = (header_bits + entry_count * max_coords_bits + 7) / 8;

    let (coords_blob, next_pos) = read_segment(file, pos, Some(coords_table), coords_decoded_len)?;

    let mut reader = ForwardBitReader::new(&coords_blob);
    let lat_min_index = reader.read_bits(bounding_box_bits)?;
    let lon_min_index = reader.read_bits(bounding_box_bits)?;
    let lat_max_index = reader.read_bits(bounding_box_bits)?;
    let lon_max_index = reader.read_bits(bounding_box_bits)?;
    let lat_bits = reader.read_bits(COORD_SPEC_BITS)? as u32;
    let lon_bits = reader.read_bits(COORD_SPEC_BITS)? as u32;
    let coords_bits = lat_bits + lon_bits;

    let grid_steps = (1u64 << bounding_box_bits) - 1;
    let lat_step = 180.0 / grid_steps as f64;
    let lon_step = 360.0 / grid_steps as f64;
    let min_corner = (
        lat_min_index as f64 * lat_step - 90.0,
        lon_min_index as f64 * lon_step - 180.0,
    );
    let max_corner = (
        lat_max_index as f64 * lat_step - 90.0,
        lon_max_index as f64 * lon_step - 180.0,
    );

    let lat_scale = if lat_bits == 0 {
        0.0
    } else {
        ((1u64 << lat_bits) - 1) as f64
    };
    let lon_scale = if lon_bits == 0 {
        0.0
    } else {
        ((1u64 << lon_bits) - 1) as f64
    };

    let mut coords = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        let combined = if coords_bits == 0 {
            0
        } else {
            reader.read_bits(coords_bits)?
        };
        let lat_idx = if lat_bits == 0 {
            0
        } else {
            combined & ((1u64 << lat_bits) - 1)
        };
        let lon_idx = if lon_bits == 0 {
            0
        } else {
            (combined >> lat_bits) & ((1u64 << lon_bits) - 1)
        };
        let frac_lat = if lat_scale == 0.0 {
            0.0
        } else {
            lat_idx as f64 / lat_scale
        };
        let frac_lon = if lon_scale == 0.0 {
            0.0
        } else {
            lon_idx as f64 / lon_scale
        };
        let lat = min_corner.0 + (max_corner.0 - min_corner.0) * frac_lat;
        let lon = min_corner.1 + (max_corner.1 - min_corner.1) * frac_lon;
        coords.push(Coords {
            lat: lat as f32,
            lon: lon as f32,
        });
    }

    Ok(DecodedCoords { coords, next_pos })
}

/// Decode a block's extra-data segment. `pos` must be the file position
/// right after the coords segment (`DecodedCoords::next_pos`).
pub fn decode_block_extra(
    file: &[u8],
    pos: usize,
    entry_count: usize,
    header: &Header,
    extra_table: &FseTable,
) -> Result<Vec<Vec<u8>>, FileFormatError> {
    let extra_decoded_len = entry_count * header.extra_data_size as usize;
    let (extra_blob, _next_pos) = read_segment(file, pos, Some(extra_table), extra_decoded_len)?;
    let size = header.extra_data_size as usize;
    if extra_blob.len() < entry_count * size {
        return Err(FileFormatError::CorruptIndex);
    }
    let mut rows = Vec::with_capacity(entry_count);
    for i in 0..entry_count {
        rows.push(extra_blob[i * size..(i + 1) * size].to_vec());
    }
    Ok(rows)
}
