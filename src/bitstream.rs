//! Bit Stream Reader (§4.2) — backward, MSB-first bit extraction over a
//! byte slice, used by the FSE decoder's two interleaved states.
//!
//! The stream is read from its *end* towards its start. The final byte of
//! the range carries an "end mark": its highest set bit is not data, it
//! only records how many of that byte's bits are real payload. A final
//! byte of zero is invalid (there is no way to locate the end mark) and is
//! rejected with `FileFormatError::MissingEndMark`.

use crate::error::FileFormatError;

/// Number of bytes in the 64-bit word the reader buffers at a time.
pub const BITSTREAM_WORD_BYTES: u32 = 8;

pub struct BitStreamReader<'a> {
    buf: &'a [u8],
    /// Start of the readable range (inclusive).
    start: usize,
    /// One past the end of the readable range (exclusive); `buf[end-1]`
    /// holds the end mark.
    end: usize,
    /// Byte offset, within `buf`, of the first byte not yet loaded into
    /// `bits`. Decreases as the stream is consumed (we read backwards).
    cursor: usize,
    /// Buffered little-endian word, most-significant-bit-first consumption.
    bits: u64,
    /// Number of high-order bits of `bits` already consumed.
    bits_consumed: u32,
}

fn highest_set_bit(byte: u8) -> u32 {
    7 - byte.leading_zeros()
}

impl<'a> BitStreamReader<'a> {
    /// Construct a reader over `buf[start..end]`. `end` must be at least
    /// `start + 1`; the byte at `end - 1` must be nonzero.
    pub fn new(buf: &'a [u8], start: usize, end: usize) -> Result<Self, FileFormatError> {
        if end <= start || end > buf.len() {
            return Err(FileFormatError::BitStreamExhausted);
        }
        let last_byte = buf[end - 1];
        if last_byte == 0 {
            return Err(FileFormatError::MissingEndMark);
        }
        let bits_consumed = 8 - (highest_set_bit(last_byte) + 1);

        let mut reader = Self {
            buf,
            start,
            end,
            cursor: end,
            bits: 0,
            bits_consumed: 0,
        };
        reader.load_word()?;
        // `bits_consumed` accounts for the padding above the end mark,
        // *within the last byte of the word we just loaded*; fold it in.
        reader.bits_consumed = bits_consumed;
        Ok(reader)
    }

    /// Load the next (previous-in-file-order) word into `bits`, resetting
    /// `bits_consumed` to account for any short tail at the start of the
    /// readable range.
    fn load_word(&mut self) -> Result<(), FileFormatError> {
        let word_bytes = BITSTREAM_WORD_BYTES as usize;
        if self.cursor <= self.start {
            // Nothing left to load; remaining bits (if any) stay as-is.
            return Ok(());
        }
        let avail = self.cursor - self.start;
        if avail >= word_bytes {
            let from = self.cursor - word_bytes;
            let mut word = [0u8; 8];
            word.copy_from_slice(&self.buf[from..self.cursor]);
            self.bits = u64::from_le_bytes(word);
            self.cursor = from;
            self.bits_consumed = 0;
        } else {
            // Short tail at the very start of the buffer: left-pad with
            // zero bytes so the valid data sits at the high end of `bits`.
            let mut word = [0u8; 8];
            word[word_bytes - avail..].copy_from_slice(&self.buf[self.start..self.cursor]);
            self.bits = u64::from_le_bytes(word);
            self.bits_consumed = ((word_bytes - avail) as u32) * 8;
            self.cursor = self.start;
        }
        Ok(())
    }

    /// Peek the next `n` bits (0..=32) without consuming them, MSB-first.
    pub fn peek_bits(&self, n: u32) -> u64 {
        if n == 0 {
            return 0;
        }
        let total_bits = (BITSTREAM_WORD_BYTES * 8) as u64;
        ((self.bits << self.bits_consumed) >> 1) >> (total_bits - 1 - n as u64)
    }

    /// Consume `n` bits (0..=32), refilling the word buffer as needed.
    pub fn read_bits(&mut self, n: u32) -> Result<u64, FileFormatError> {
        let value = self.peek_bits(n);
        self.consume(n)?;
        Ok(value)
    }

    /// Advance past `n` already-peeked bits, reloading the underlying word
    /// when exhausted.
    pub fn consume(&mut self, n: u32) -> Result<(), FileFormatError> {
        self.bits_consumed += n;
        if self.bits_consumed >= BITSTREAM_WORD_BYTES * 8 {
            if self.cursor <= self.start && self.bits_consumed >= BITSTREAM_WORD_BYTES * 8 {
                // Exactly drained the final word; only an error if the
                // caller asks to consume more bits than exist at all.
                if self.cursor == self.start && self.remaining_bits() == 0 {
                    return Ok(());
                }
            }
            self.load_word()?;
        }
        Ok(())
    }

    /// Number of unconsumed bits still available across the whole stream.
    pub fn remaining_bits(&self) -> u64 {
        let in_word = (BITSTREAM_WORD_BYTES * 8).saturating_sub(self.bits_consumed) as u64;
        let in_word = in_word.min((BITSTREAM_WORD_BYTES * 8) as u64);
        let behind = (self.cursor - self.start) as u64 * 8;
        in_word + behind
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_bits() == 0
    }
}
