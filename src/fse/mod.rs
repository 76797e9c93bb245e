//! FSE (tANS) Decoder (§4.3) — table construction and the two-state
//! interleaved decompression loop.
//!
//! No crate in the dependency stack implements this exact table format, so
//! this module hand-rolls the one entropy coder the format actually needs.
//! The table-build algorithm below is the standard FSE/tANS "spread and
//! assign" construction.

use crate::bitstream::BitStreamReader;
use crate::error::FileFormatError;
use crate::varint::decode_svarint;

const MAX_LOG2_SIZE: u32 = 12;

pub struct FseTable {
    log2_size: u32,
    table_size: usize,
    symbol: Vec<u8>,
    num_bits: Vec<u8>,
    new_state_base: Vec<u32>,
}

fn highest_bit(v: u32) -> u32 {
    31 - v.leading_zeros()
}

impl FseTable {
    /// Parse a table header starting at `buf[pos]` (§9 open question: this
    /// crate defines the concrete on-disk encoding — see DESIGN.md).
    pub fn read(buf: &[u8], pos: usize) -> Result<(Self, usize), FileFormatError> {
        let log2_size = *buf
            .get(pos)
            .ok_or(FileFormatError::MalformedFseTable("missing log2_size byte"))? as u32;
        let mut cursor = pos + 1;

        if log2_size == 0 || log2_size > MAX_LOG2_SIZE {
            return Err(FileFormatError::MalformedFseTable("log2_size out of range"));
        }
        let table_size = 1usize << log2_size;

        let mut counts: Vec<i64> = Vec::new();
        let mut remaining = table_size as i64;
        while remaining > 0 {
            let (count, next_cursor) = decode_svarint(buf, cursor)
                .map_err(|_| FileFormatError::MalformedFseTable("truncated normalized count"))?;
            cursor = next_cursor;
            if count < -1 {
                return Err(FileFormatError::MalformedFseTable("negative count below -1"));
            }
            let contribution = if count == -1 { 1 } else { count };
            remaining -= contribution;
            counts.push(count);
            if counts.len() > 256 {
                return Err(FileFormatError::MalformedFseTable("too many symbols"));
            }
        }
        if remaining != 0 {
            return Err(FileFormatError::MalformedFseTable(
                "normalized counts do not sum to table size",
            ));
        }

        let table = Self::build(log2_size, table_size, &counts)?;
        Ok((table, cursor))
    }

    fn build(log2_size: u32, table_size: usize, counts: &[i64]) -> Result<Self, FileFormatError> {
        let mut normalized: Vec<i64> = counts.to_vec();
        let mut symbol_next: Vec<u32> = normalized
            .iter()
            .map(|&c| if c == -1 { 1 } else { c.max(0) as u32 })
            .collect();

        let mut table_symbol = vec![0u8; table_size];
        let mut high_threshold = table_size - 1;

        // Low-probability symbols (-1) are placed from the end, directly.
        for (sym, &count) in normalized.iter_mut().enumerate() {
            if count == -1 {
                table_symbol[high_threshold] = sym as u8;
                high_threshold = high_threshold.wrapping_sub(1);
                count_to_one(&mut normalized, sym);
            }
        }

        let step = (table_size >> 1) + (table_size >> 3) + 3;
        let mask = table_size - 1;
        let mut position = 0usize;
        for (sym, &count) in normalized.iter().enumerate() {
            if count <= 0 {
                continue;
            }
            for _ in 0..count {
                table_symbol[position] = sym as u8;
                position = (position + step) & mask;
                while position > high_threshold {
                    position = (position + step) & mask;
                }
            }
        }
        if position != 0 {
            return Err(FileFormatError::MalformedFseTable(
                "symbol spread did not return to origin",
            ));
        }

        let mut symbol = vec![0u8; table_size];
        let mut num_bits = vec![0u8; table_size];
        let mut new_state_base = vec![0u32; table_size];
        for i in 0..table_size {
            let sym = table_symbol[i];
            symbol[i] = sym;
            let next_state = symbol_next[sym as usize];
            symbol_next[sym as usize] += 1;
            let nb_bits = log2_size - highest_bit(next_state);
            num_bits[i] = nb_bits as u8;
            new_state_base[i] = (next_state << nb_bits) - table_size as u32;
        }

        Ok(Self {
            log2_size,
            table_size,
            symbol,
            num_bits,
            new_state_base,
        })
    }

    /// Decode `out_len` symbols from `bitstream` using two interleaved
    /// decoder states sharing the same bit source (§4.3).
    pub fn decode_interleaved(
        &self,
        bitstream: &mut BitStreamReader,
        out_len: usize,
    ) -> Result<Vec<u8>, FileFormatError> {
        let mut out = Vec::with_capacity(out_len);
        if out_len == 0 {
            return Ok(out);
        }

        let mut state1 = bitstream.read_bits(self.log2_size)? as usize;
        let mut state2 = bitstream.read_bits(self.log2_size)? as usize;

        loop {
            out.push(self.symbol[state1]);
            if out.len() == out_len {
                break;
            }
            let nb1 = self.num_bits[state1] as u32;
            let rest1 = bitstream.read_bits(nb1)? as u32;
            state1 = (self.new_state_base[state1] + rest1) as usize;

            out.push(self.symbol[state2]);
            if out.len() == out_len {
                break;
            }
            let nb2 = self.num_bits[state2] as u32;
            let rest2 = bitstream.read_bits(nb2)? as u32;
            state2 = (self.new_state_base[state2] + rest2) as usize;
        }

        Ok(out)
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }
}

fn count_to_one(normalized: &mut [i64], sym: usize) {
    normalized[sym] = 1;
}
