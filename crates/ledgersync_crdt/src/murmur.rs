//! MurmurHash3, x86 32-bit variant.
//!
//! Clients hash timestamps with the same function, so the output is part
//! of the wire contract and must match the reference implementation bit
//! for bit.

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// Computes MurmurHash3 (x86, 32-bit) of `data` with the given seed.
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let mut hash = seed;

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        hash ^= mix_k(k);
        hash = hash.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, byte) in tail.iter().enumerate() {
            k ^= u32::from(*byte) << (8 * i);
        }
        hash ^= mix_k(k);
    }

    // Length is mixed in modulo 2^32, like the reference.
    hash ^= data.len() as u32;
    fmix(hash)
}

#[inline]
fn mix_k(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

#[inline]
fn fmix(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn murmur_empty() {
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"", 1), 0x514E_28B7);
    }

    #[test]
    fn murmur_known_values() {
        assert_eq!(murmur3_32(b"hello", 0), 613_153_351);
        assert_eq!(
            murmur3_32(b"2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF", 0),
            1_983_295_247
        );
        assert_eq!(
            murmur3_32(b"2018-11-13T13:21:40.122Z-0000-0123456789ABCDEF", 0),
            1_469_038_940
        );
    }

    #[test]
    fn murmur_tail_lengths() {
        assert_eq!(murmur3_32(b"a", 0), 1_009_084_850);
        assert_eq!(murmur3_32(b"ab", 0), 2_613_040_991);
        assert_eq!(murmur3_32(b"abc", 0), 3_017_643_002);
    }
}
