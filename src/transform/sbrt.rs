//! Sort-By-Rank Transform, inverse, rank mode (§4.4) — a move-to-front
//! decode: each input byte is a rank into a 256-entry symbol list that is
//! reordered (the used symbol promoted to the front) after every emission.

pub fn inverse(input: &[u8]) -> Vec<u8> {
    let mut table: Vec<u8> = (0..=255u8).collect();
    let mut out = Vec::with_capacity(input.len());
    for &rank in input {
        let symbol = table.remove(rank as usize);
        out.push(symbol);
        table.insert(0, symbol);
    }
    out
}

#[cfg(test)]
pub(crate) fn forward(input: &[u8]) -> Vec<u8> {
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
