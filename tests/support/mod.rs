//! Minimal `DwarfIdea` file encoder, test-only. No external builder
//! toolchain exists in this workspace, so integration tests write their
//! own fixtures directly, one entry per block. Each block's coords
//! segment carries a degenerate (zero-width) bounding box quantized to a
//! 65535-step global grid (§4.8) centered exactly on that entry's
//! lat/lon, so the only error is grid quantization — bounded well under
//! `max_dist_error`.
//!
//! This crate is compiled separately from `dwarfidea` and only sees its
//! public API, so the coords segment's forward SBRT/BWTS transform (the
//! mandatory inverse pipeline is not an identity past length 1) is
//! reimplemented locally here, duplicating the algorithms in
//! `transform::sbrt`/`transform::bwts`'s own private round-trip tests.

const SIGNATURE: &[u8; 9] = b"DwarfIdea";
const FIXED_HEADER_SIZE: usize = 35;
const BOUNDING_BOX_BITS: u32 = 16;
const COORD_SPEC_BITS: u32 = 5;

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

fn encode_plain_segment(plain: &[u8]) -> Vec<u8> {
    sbrt_forward(&bwts_forward(plain))
}

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

fn quantize(value: f64, is_lat: bool) -> u64 {
    let grid_steps = (1u64 << BOUNDING_BOX_BITS) - 1;
    let (span, offset) = if is_lat { (180.0, 90.0) } else { (360.0, 180.0) };
    let frac = (value + offset) / span;
    (frac * grid_steps as f64).round().clamp(0.0, grid_steps as f64) as u64
}

/// One row: a 4-byte key and the coordinates it decodes to.
pub struct Entry {
    pub key: [u8; 4],
    pub lat: f64,
    pub lon: f64,
}

/// Build a database with one block per entry. `entries` must be sorted
/// ascending by key (as in the real format, the block index and last_key
/// both assume this).
pub fn build_database(entries: &[Entry]) -> Vec<u8> {
    assert!(!entries.is_empty());
    let mut buf = Vec::new();

    buf.extend_from_slice(SIGNATURE);
    buf.extend_from_slice(&1u16.to_le_bytes()); // version
    buf.extend_from_slice(&4u16.to_le_bytes()); // key_size
    buf.extend_from_slice(&0u16.to_le_bytes()); // extra_data_size
    buf.extend_from_slice(&(entries.len() as u32).to_le_bytes()); // num_entries
    buf.extend_from_slice(&(entries.len() as u32).to_le_bytes()); // index_size
    buf.extend_from_slice(&1u16.to_le_bytes()); // min_entries_per_block
    buf.extend_from_slice(&1u16.to_le_bytes()); // max_entries_per_block
    buf.extend_from_slice(&(BOUNDING_BOX_BITS as u16).to_le_bytes()); // bounding_box_bits
    buf.extend_from_slice(&0.01f32.to_le_bytes()); // max_dist_error
    buf.extend_from_slice(&0u16.to_le_bytes()); // key_map_size
    assert_eq!(buf.len(), FIXED_HEADER_SIZE);

    buf.extend_from_slice(&entries.last().unwrap().key); // last_key

    buf.extend_from_slice(&minimal_fse_table()); // keys table
    buf.extend_from_slice(&minimal_fse_table()); // coords table

    // Reserve the block index; patch offsets in after laying out blocks.
    let index_start = buf.len();
    for entry in entries {
        buf.extend_from_slice(&entry.key);
        buf.extend_from_slice(&0u32.to_le_bytes());
    }

    let mut block_offsets = Vec::with_capacity(entries.len());
    for entry in entries {
        block_offsets.push(buf.len() as u32);

        push_uvarint(&mut buf, 1); // entry_count

        let keys_size_header = (1u64 << 2) | 0b11;
        push_uvarint(&mut buf, keys_size_header);
        buf.push(0x01);

        let lat_idx = quantize(entry.lat, true);
        let lon_idx = quantize(entry.lon, false);
        let mut w = BitWriter::new();
        w.write_bits(lat_idx, BOUNDING_BOX_BITS);
        w.write_bits(lon_idx, BOUNDING_BOX_BITS);
        w.write_bits(lat_idx, BOUNDING_BOX_BITS);
        w.write_bits(lon_idx, BOUNDING_BOX_BITS);
        w.write_bits(0, COORD_SPEC_BITS); // lat_bits = 0
        w.write_bits(0, COORD_SPEC_BITS); // lon_bits = 0
        let encoded = encode_plain_segment(&w.bytes);

        let coords_size_header = (encoded.len() as u64) << 2 | 0b11;
        push_uvarint(&mut buf, coords_size_header);
        buf.extend_from_slice(&encoded);
    }

    for (i, offset) in block_offsets.into_iter().enumerate() {
        let pos = index_start + i * 8 + 4;
        buf[pos..pos + 4].copy_from_slice(&offset.to_le_bytes());
    }

    buf
}
