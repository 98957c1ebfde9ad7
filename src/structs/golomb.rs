//! Golomb/Rice codec (component B): one unsigned symbol under parameter `m`.
//!
//! `m` a power of two takes the Rice fast path (`q` unary, `k` literal bits).
//! Otherwise the general Golomb split-remainder scheme is used. Both produce
//! a prefix of `q` one-bits followed by a terminating zero bit; decode counts
//! those ones (bounded by `max_cw_len`) before reading the remainder.

use crate::error::{CmpError, CmpResult};
use crate::helpers::{ceil_log2, is_power_of_two};
use crate::structs::bit_io::{BitReader, BitWriter};

/// Exact bit length of the codeword that [`encode`] would produce for `x`
/// under parameter `m`, without writing anything.
pub fn encoded_len(x: u32, m: u32) -> u64 {
    debug_assert!(m >= 1);
    if is_power_of_two(m) {
        let k = m.trailing_zeros();
        let q = (x >> k) as u64;
        q + 1 + k as u64
    } else {
        let l = ceil_log2(m);
        let cutoff = (1u32 << l) - m;
        let q = (x / m) as u64;
        let r = x % m;
        let rem_bits = if r < cutoff { l - 1 } else { l };
        q + 1 + rem_bits as u64
    }
}

/// Encodes unsigned symbol `x` under Golomb parameter `m` (`m >= 1`).
///
/// Returns [`CmpError::DataValueTooLarge`] if the codeword would exceed
/// `max_cw_len` bits (the caller's bit budget - 32 for ICU, 16 for RDCU);
/// this is the condition the outlier mechanisms in [`crate::structs::field_codec`]
/// exist to avoid.
pub fn encode(w: &mut BitWriter, x: u32, m: u32, max_cw_len: u32) -> CmpResult<()> {
    debug_assert!(m >= 1, "golomb parameter m must be >= 1");

    if encoded_len(x, m) > max_cw_len as u64 {
        return Err(CmpError::DataValueTooLarge);
    }

    if is_power_of_two(m) {
        let k = m.trailing_zeros();
        let q = x >> k;
        let r = x & (m - 1);
        write_unary_ones(w, q)?;
        if k > 0 {
            w.put_bits(r, k)?;
        }
    } else {
        let l = ceil_log2(m);
        let cutoff = (1u32 << l) - m;
        let q = x / m;
        let r = x % m;

        write_unary_ones(w, q)?;
        if r < cutoff {
            if l > 1 {
                w.put_bits(r, l - 1)?;
            }
        } else {
            w.put_bits(r + cutoff, l)?;
        }
    }

    Ok(())
}

/// Decodes one unsigned symbol under Golomb parameter `m`, returning the
/// symbol and the number of bits consumed.
pub fn decode(r: &mut BitReader, m: u32, max_cw_len: u32) -> CmpResult<(u32, u32)> {
    debug_assert!(m >= 1, "golomb parameter m must be >= 1");

    let start = r.bits_read();
    let q = read_unary_ones(r, max_cw_len)?;

    let x = if is_power_of_two(m) {
        let k = m.trailing_zeros();
        let rem = if k > 0 { r.get_bits(k)? } else { 0 };
        (q << k) | rem
    } else {
        let l = ceil_log2(m);
        let cutoff = (1u32 << l) - m;
        if l == 0 {
            q * m
        } else {
            let rem_short = if l > 1 { r.get_bits(l - 1)? } else { 0 };
            if rem_short < cutoff {
                q * m + rem_short
            } else {
                let rem_full = (rem_short << 1) | r.get_bits(1)?;
                q * m + (rem_full - cutoff)
            }
        }
    };

    let consumed = (r.bits_read() - start) as u32;
    if consumed > max_cw_len {
        return Err(CmpError::IntDecoder);
    }

    Ok((x, consumed))
}

fn write_unary_ones(w: &mut BitWriter, q: u32) -> CmpResult<()> {
    let mut remaining = q;
    while remaining >= 32 {
        w.put_bits(u32::MAX, 32)?;
        remaining -= 32;
    }
    if remaining > 0 {
        // `remaining` ones followed by nothing yet - left-align them in a
        // `remaining`-bit field of all ones
        w.put_bits((1u32 << remaining) - 1, remaining)?;
    }
    w.put_bits(0, 1)
}

fn read_unary_ones(r: &mut BitReader, max_cw_len: u32) -> CmpResult<u32> {
    let mut q = 0u32;
    loop {
        if q >= max_cw_len {
            return Err(CmpError::IntDecoder);
        }
        if r.peek_bit()? {
            r.skip_bit()?;
            q += 1;
        } else {
            r.skip_bit()?;
            break;
        }
    }
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unbounded cap used by round-trip tests below: they exercise the codec
    // itself, not the escape-triggering cap (covered separately by
    // `oversized_codeword_is_rejected`), so the budget must stay well above
    // the worst-case unary run a small `m` with a moderate `x` can produce.
    const UNBOUNDED_CAP: u32 = 8192;

    fn round_trip(x: u32, m: u32) {
        let mut buf = [0u8; 1024];
        let mut w = BitWriter::new(&mut buf);
        encode(&mut w, x, m, UNBOUNDED_CAP).unwrap();
        let bits = w.bits_written();

        let mut r = BitReader::new(&buf);
        let (got, consumed) = decode(&mut r, m, UNBOUNDED_CAP).unwrap();
        assert_eq!(got, x, "m={m}");
        assert_eq!(consumed as usize, bits, "m={m}");
    }

    #[test]
    fn round_trips_across_parameters() {
        for m in 1..=64u32 {
            for x in [0, 1, 2, 7, 15, 16, 100, 1000] {
                round_trip(x, m);
            }
        }
    }

    #[test]
    fn rice_fast_path_matches_general_golomb_for_powers_of_two() {
        for k in 0..8u32 {
            let m = 1u32 << k;
            for x in 0..=300u32 {
                let mut buf_rice = [0u8; 1024];
                let mut w_rice = BitWriter::new(&mut buf_rice);
                encode(&mut w_rice, x, m, UNBOUNDED_CAP).unwrap();

                // general path is the same branch for power-of-two m, so
                // this asserts the identity holds against the decode side
                // rather than a second independent implementation
                let mut r = BitReader::new(&buf_rice);
                let (got, _) = decode(&mut r, m, UNBOUNDED_CAP).unwrap();
                assert_eq!(got, x);
            }
        }
    }

    #[test]
    fn encoded_len_matches_actual_write() {
        for m in 1..=40u32 {
            for x in 0..=200u32 {
                let mut buf = [0u8; 1024];
                let mut w = BitWriter::new(&mut buf);
                encode(&mut w, x, m, UNBOUNDED_CAP).unwrap();
                assert_eq!(encoded_len(x, m), w.bits_written() as u64, "x={x} m={m}");
            }
        }
    }

    #[test]
    fn oversized_codeword_is_rejected() {
        let mut buf = [0u8; 64];
        let mut w = BitWriter::new(&mut buf);
        // m=1 means q=x, so x=20 needs 21 bits of unary - fine under 32 but
        // not under a tiny budget
        assert_eq!(
            encode(&mut w, 20, 1, 8).unwrap_err(),
            CmpError::DataValueTooLarge
        );
    }
}
