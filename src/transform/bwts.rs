//! Bijective Burrows-Wheeler Transform, inverse (§4.4).
//!
//! Unlike the classic BWT, BWTS needs no sentinel and no stored row index:
//! the input factors into Lyndon words ("necklaces"), and decoding
//! recovers each necklace independently by building the standard
//! LF-mapping-style permutation from the sorted output, decomposing it
//! into cycles, and emitting each cycle starting at its lexicographically
//! minimal rotation — which is provably the Lyndon word itself.

pub fn inverse(l: &[u8]) -> Vec<u8> {
    let n = l.len();
    if n == 0 {
        return Vec::new();
    }

    let mut count = [0usize; 256];
    for &b in l {
        count[b as usize] += 1;
    }
    let mut base = [0usize; 256];
    {
        let mut sum = 0;
        for c in 0..256 {
            base[c] = sum;
            sum += count[c];
        }
    }

    // f[j] = sorted(l)[j]; nf[v] = i is the inverse of the LF permutation,
    // i.e. "which row comes next when walking a necklace forward".
    let mut f = vec![0u8; n];
    {
        let mut idx = 0;
        for c in 0..256 {
            for _ in 0..count[c] {
                f[idx] = c as u8;
                idx += 1;
            }
        }
    }

    let mut ptr = base;
    let mut nf = vec![0usize; n];
    for (i, &b) in l.iter().enumerate() {
        let c = b as usize;
        nf[ptr[c]] = i;
        ptr[c] += 1;
    }

    let mut visited = vec![false; n];
    let mut out = Vec::with_capacity(n);
    for start in 0..n {
        if visited[start] {
            continue;
        }
        let mut j = start;
        loop {
            out.push(f[j]);
            visited[j] = true;
            j = nf[j];
            if j == start {
                break;
            }
        }
    }
    out
}
