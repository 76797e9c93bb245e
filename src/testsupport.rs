//! Test-only fixture builder: writes a minimal valid `DwarfIdea` file
//! directly (no external builder toolchain exists in this workspace).
//! The keys segment stays a single raw byte per block (identity under
//! SBRT/BWTS at length 1, so no forward transform is needed there), but
//! the coords segment now carries the §4.8 bit-packed bounding box and
//! must go through the *forward* SBRT/BWTS pipeline before being written,
//! since both stages always run on decode regardless of the segment's
//! `ignore_zrlt`/`ignore_fse` flags. `bwts_forward`/`sbrt_forward` below
//! mirror the forward helpers `transform::bwts`/`transform::sbrt` keep
//! privately for their own round-trip tests.

use crate::block::Coords;
use crate::header::{FIXED_HEADER_SIZE, SIGNATURE};

fn push_uvarint(out: &mut Vec<u8>, v: u64) {
    let mut x = v;
    loop {
        let mut byte = (x & 0x7f) as u8;
        x >>= 7;
        if x != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if x == 0 {
            break;
        }
    }
}

fn push_svarint(out: &mut Vec<u8>, v: i64) {
    let zigzag = ((v << 1) ^ (v >> 63)) as u64;
    push_uvarint(out, zigzag);
}

/// A flat two-symbol FSE table, valid but never exercised by any segment
/// in `build_database_file` (every segment sets `ignore_fse`).
fn minimal_fse_table() -> Vec<u8> {
    let mut buf = vec![1u8]; // log2_size = 1, table_size = 2
    push_svarint(&mut buf, 1);
    push_svarint(&mut buf, 1);
    buf
}

fn sbrt_forward(input: &[u8]) -> Vec<u8> {
    let mut table: Vec<u8> = (0..=255u8).collect();
    let mut out = Vec::with_capacity(input.len());
    for &byte in input {
        let rank = table.iter().position(|&s| s == byte).unwrap();
        out.push(rank as u8);
        table.remove(rank);
        table.insert(0, byte);
    }
    out
}

fn bwts_duval_factorize(s: &[u8]) -> Vec<(usize, usize)> {
    let n = s.len();
    let mut factors = Vec::new();
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        let mut k = i;
        while j < n && s[k] <= s[j] {
            if s[k] < s[j] {
                k = i;
            } else {
                k += 1;
            }
            j += 1;
        }
        while i <= k {
            factors.push((i, i + j - k));
            i += j - k;
        }
    }
    factors
}

fn bwts_periodic_cmp(a: &[u8], b: &[u8], len: usize) -> std::cmp::Ordering {
    for k in 0..len {
        let ca = a[k % a.len()];
        let cb = b[k % b.len()];
        if ca != cb {
            return ca.cmp(&cb);
        }
    }
    std::cmp::Ordering::Equal
}

fn bwts_forward(s: &[u8]) -> Vec<u8> {
    let factors = bwts_duval_factorize(s);
    let mut rotations: Vec<Vec<u8>> = Vec::new();
    for (start, end) in &factors {
        let word = &s[*start..*end];
        let k = word.len();
        for r in 0..k {
            let mut rot = Vec::with_capacity(k);
            rot.extend_from_slice(&word[r..]);
            rot.extend_from_slice(&word[..r]);
            rotations.push(rot);
        }
    }
    let compare_len = s.len().max(1) * 2;
    rotations.sort_by(|a, b| bwts_periodic_cmp(a, b, compare_len));
    rotations.iter().map(|r| *r.last().unwrap()).collect()
}

/// Forward-encode a segment's plaintext bytes into what must be written
/// to the file so that `transform::decode_segment` (with `ignore_zrlt`
/// and `ignore_fse` both set) recovers exactly `plain`.
fn encode_plain_segment(plain: &[u8]) -> Vec<u8> {
    sbrt_forward(&bwts_forward(plain))
}

/// MSB-first bit writer, mirroring `block::ForwardBitReader`'s read order.
struct BitWriter {
    bytes: Vec<u8>,
    bit_pos: usize,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit_pos: 0,
        }
    }

    fn write_bits(&mut self, value: u64, n: u32) {
        for i in (0..n).rev() {
            let bit = (value >> i) & 1;
            if self.bit_pos % 8 == 0 {
                self.bytes.push(0);
            }
            let byte_idx = self.bit_pos / 8;
            let bit_idx = 7 - (self.bit_pos % 8);
            self.bytes[byte_idx] |= (bit as u8) << bit_idx;
            self.bit_pos += 1;
        }
    }
}

pub struct TinyDb {
    pub key: [u8; 4],
}

impl Default for TinyDb {
    fn default() -> Self {
        Self { key: [0, 0, 0, 7] }
    }
}

/// The §4.8 global-grid parameters used by `build_database_file`'s single
/// entry: bounding_box_bits=4 (step = 180/15 and 360/15, both integral),
/// a box from (-30,-60) to (30,60), and lat/lon quantized at 2 bits each
/// (scale 3), landing the one entry exactly on a grid point so the
/// reconstructed coordinate is exact in f32.
const BOUNDING_BOX_BITS: u32 = 4;
const LAT_MIN_INDEX: u64 = 5;
const LON_MIN_INDEX: u64 = 5;
const LAT_MAX_INDEX: u64 = 10;
const LON_MAX_INDEX: u64 = 10;
const LAT_BITS: u32 = 2;
const LON_BITS: u32 = 2;
const ENTRY_LAT_IDX: u64 = 1;
const ENTRY_LON_IDX: u64 = 2;

/// The coordinate `build_database_file`'s one entry decodes to, computed
/// by the same global-grid formula as `block::decode_block_coords`.
pub fn tiny_db_expected_coords() -> Coords {
    let grid_steps = (1u64 << BOUNDING_BOX_BITS) - 1;
    let lat_step = 180.0 / grid_steps as f64;
    let lon_step = 360.0 / grid_steps as f64;
    let min_lat = LAT_MIN_INDEX as f64 * lat_step - 90.0;
    let max_lat = LAT_MAX_INDEX as f64 * lat_step - 90.0;
    let min_lon = LON_MIN_INDEX as f64 * lon_step - 180.0;
    let max_lon = LON_MAX_INDEX as f64 * lon_step - 180.0;
    let lat_scale = ((1u64 << LAT_BITS) - 1) as f64;
    let lon_scale = ((1u64 << LON_BITS) - 1) as f64;
    let lat = min_lat + (max_lat - min_lat) * (ENTRY_LAT_IDX as f64 / lat_scale);
    let lon = min_lon + (max_lon - min_lon) * (ENTRY_LON_IDX as f64 / lon_scale);
    Coords {
        lat: lat as f32,
        lon: lon as f32,
    }
}

fn coords_segment_plaintext() -> Vec<u8> {
    let mut w = BitWriter::new();
    w.write_bits(LAT_MIN_INDEX, BOUNDING_BOX_BITS);
    w.write_bits(LON_MIN_INDEX, BOUNDING_BOX_BITS);
    w.write_bits(LAT_MAX_INDEX, BOUNDING_BOX_BITS);
    w.write_bits(LON_MAX_INDEX, BOUNDING_BOX_BITS);
    w.write_bits(LAT_BITS as u64, crate::block::COORD_SPEC_BITS);
    w.write_bits(LON_BITS as u64, crate::block::COORD_SPEC_BITS);
    // combined = lon_idx << lat_bits | lat_idx, MSB-first: lon_idx goes
    // first so its bits land in the high order of `combined`.
    w.write_bits(ENTRY_LON_IDX, LON_BITS);
    w.write_bits(ENTRY_LAT_IDX, LAT_BITS);
    w.bytes
}

/// Build a single-entry database whose one key is `db.key`, mapping to
/// `tiny_db_expected_coords()` with zero extra data.
pub fn build_database_file(db: &TinyDb) -> Vec<u8> {
    let mut buf = Vec::new();

    // Fixed header, written with placeholders first; field offsets mirror
    // header::parse exactly.
    buf.extend_from_slice(SIGNATURE);
    buf.extend_from_slice(&1u16.to_le_bytes()); // version
    buf.extend_from_slice(&4u16.to_le_bytes()); // key_size
    buf.extend_from_slice(&0u16.to_le_bytes()); // extra_data_size
    buf.extend_from_slice(&1u32.to_le_bytes()); // num_entries
    buf.extend_from_slice(&1u32.to_le_bytes()); // index_size
    buf.extend_from_slice(&1u16.to_le_bytes()); // min_entries_per_block
    buf.extend_from_slice(&1u16.to_le_bytes()); // max_entries_per_block
    buf.extend_from_slice(&(BOUNDING_BOX_BITS as u16).to_le_bytes()); // bounding_box_bits
    buf.extend_from_slice(&0.0f32.to_le_bytes()); // max_dist_error
    buf.extend_from_slice(&0u16.to_le_bytes()); // key_map_size (no mapping)
    assert_eq!(buf.len(), FIXED_HEADER_SIZE);

    // last_key (effective_key_size = key_size since no key map)
    buf.extend_from_slice(&db.key);

    // keys FSE table, coords FSE table (extra table omitted: extra_data_size == 0)
    buf.extend_from_slice(&minimal_fse_table());
    buf.extend_from_slice(&minimal_fse_table());

    // Block index: one entry, anchor key == db.key.
    let block_offset_placeholder_pos = buf.len() + 4;
    buf.extend_from_slice(&db.key);
    buf.extend_from_slice(&0u32.to_le_bytes()); // patched below

    let block_offset = buf.len() as u32;
    buf[block_offset_placeholder_pos..block_offset_placeholder_pos + 4]
        .copy_from_slice(&block_offset.to_le_bytes());

    // --- Block payload ---
    push_uvarint(&mut buf, 1); // entry_count = 1

    // Keys segment: ignore_zrlt + ignore_fse, one raw byte (identity at
    // length 1, so no forward transform needed).
    let keys_size_header = (1u64 << 2) | 0b11;
    push_uvarint(&mut buf, keys_size_header);
    buf.push(0x2A);

    // Coords segment: ignore_zrlt + ignore_fse; payload is the forward-
    // encoded bit-packed bounding box + quantized index pair that
    // block::decode_block_coords reconstructs.
    let encoded = encode_plain_segment(&coords_segment_plaintext());
    let coords_size_header = (encoded.len() as u64) << 2 | 0b11;
    push_uvarint(&mut buf, coords_size_header);
    buf.extend_from_slice(&encoded);

    buf
}
