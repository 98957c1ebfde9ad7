//! Per-field encoder/decoder (component D): wraps the Golomb codec with an
//! outlier mechanism and enforces `max_used_bits`.
//!
//! A residual `res` from the predictor is zig-zag mapped to unsigned `u`,
//! then coded under one of two outlier mechanisms selected by [`CmpMode`]:
//!
//! - zero-escape: in-range values are coded as `Golomb(u + 1, m)`; values
//!   that would not fit are signalled by the escape symbol `Golomb(0, m)`
//!   followed by `u` as a literal `max_used_bits`-bit field.
//! - multi-escape: in-range values are coded as `Golomb(u, m)` directly;
//!   out-of-range values are signalled by `Golomb(spill + k - 1, m)` followed
//!   by `u - spill` as a literal `2k`-bit field, `k` the smallest value with
//!   `u - spill < 1 << 2k`.

use crate::error::{CmpError, CmpResult};
use crate::helpers::{ceil_log2, div_ceil_u32};
use crate::structs::bit_io::{BitReader, BitWriter};
use crate::structs::golomb;

/// Which outlier mechanism a field pair uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierMechanism {
    ZeroEscape,
    MultiEscape,
}

/// Reserved code-point budget the escape symbol itself consumes when
/// bounding `max_spill` - see `DESIGN.md` for the resolution of this
/// open question (the source formula names it `max_n_sym_offset` without
/// defining it further).
const MAX_N_SYM_OFFSET: u32 = 1;

/// Largest `spill` value for which the worst-case codeword produced under
/// `mechanism` still fits in `max_cw_bits` bits, given Golomb parameter `m`
/// and field width `max_used_bits`.
///
/// ICU calls this directly (`max_cw_bits = 32`); RDCU uses the precomputed
/// [`RDCU_MAX_SPILL_TABLE`] instead (`max_cw_bits = 16`, `m` in `1..=63`).
pub fn max_spill(m: u32, max_used_bits: u32, max_cw_bits: u32) -> u32 {
    debug_assert!(m >= 1);
    let l = ceil_log2(m);
    let cutoff = (1u32 << l) - m;
    let floor_log2_m = 31 - m.leading_zeros();

    let by_codeword_budget =
        (max_cw_bits.saturating_sub(1 + floor_log2_m)) * m + cutoff - MAX_N_SYM_OFFSET - 1;

    // multi-escape additionally needs the 2k-bit payload (k <= ceil(max_used_bits/2))
    // to fit after the escape codeword; zero-escape's payload is the fixed
    // max_used_bits literal, which is already accounted for by max_used_bits
    // itself rather than by spill, so only clamp the multi-escape case here.
    by_codeword_budget.min(1u32 << (div_ceil_u32(max_used_bits, 2).min(30)))
}

/// Precomputed RDCU max-spill table, `m` in `1..=63` (index 0 unused).
/// Computed once at compile time from the same bound [`max_spill`] uses,
/// with the RDCU codeword budget and a 16-bit field width.
pub const RDCU_MAX_SPILL_TABLE: [u32; 64] = build_rdcu_table();

const fn build_rdcu_table() -> [u32; 64] {
    let mut table = [0u32; 64];
    let mut m = 1u32;
    while m <= 63 {
        // const-fn reimplementation of max_spill(m, 16, 16) since trait
        // methods / div_ceil aren't all const-stable at this MSRV
        let l = {
            let mut l = 0u32;
            while (1u32 << l) < m {
                l += 1;
            }
            l
        };
        let cutoff = (1u32 << l) - m;
        let floor_log2_m = 31 - m.leading_zeros();
        let by_budget = if 16 > 1 + floor_log2_m {
            (16 - 1 - floor_log2_m) * m + cutoff - MAX_N_SYM_OFFSET - 1
        } else {
            0
        };
        let k_bound = (16u32 + 1) / 2;
        let clamp = 1u32 << k_bound;
        table[m as usize] = if by_budget < clamp { by_budget } else { clamp };
        m += 1;
    }
    table
}

/// Encodes one sample's residual under the given mechanism.
///
/// `max_cw_len` is the caller's total bit budget for a single symbol (32 for
/// ICU, 16 for RDCU-supported types); the zero-escape literal path uses
/// `max_used_bits` directly regardless of `max_cw_len`, matching the source
/// system (the escape literal is defined in terms of the field, not the
/// Golomb codeword budget).
pub fn encode_field(
    w: &mut BitWriter,
    res: i32,
    m: u32,
    spill: u32,
    max_used_bits: u32,
    mechanism: OutlierMechanism,
    max_cw_len: u32,
) -> CmpResult<()> {
    let u = crate::structs::predictor::map(res);

    match mechanism {
        OutlierMechanism::ZeroEscape => {
            if u.saturating_add(1) < spill {
                golomb::encode(w, u + 1, m, max_cw_len)
            } else {
                golomb::encode(w, 0, m, max_cw_len)?;
                w.put_bits(u, max_used_bits)
            }
        }
        OutlierMechanism::MultiEscape => {
            if u < spill {
                golomb::encode(w, u, m, max_cw_len)
            } else {
                let k = smallest_k(u - spill, max_used_bits)?;
                golomb::encode(w, spill + (k - 1), m, max_cw_len)?;
                w.put_bits(u - spill, 2 * k)
            }
        }
    }
}

/// Decodes one sample's residual, returning the signed value.
pub fn decode_field(
    r: &mut BitReader,
    m: u32,
    spill: u32,
    max_used_bits: u32,
    mechanism: OutlierMechanism,
    max_cw_len: u32,
) -> CmpResult<i32> {
    let u = match mechanism {
        OutlierMechanism::ZeroEscape => {
            let (s, _) = golomb::decode(r, m, max_cw_len)?;
            if s == 0 {
                let lit = r.get_bits(max_used_bits)?;
                if lit != 0 && lit < spill.saturating_sub(1) {
                    return Err(CmpError::IntDecoder);
                }
                lit
            } else {
                s - 1
            }
        }
        OutlierMechanism::MultiEscape => {
            let (s, _) = golomb::decode(r, m, max_cw_len)?;
            if s < spill {
                s
            } else {
                let k = s - spill + 1;
                let max_k = div_ceil_u32(max_used_bits, 2);
                if k == 0 || k > max_k {
                    return Err(CmpError::IntDecoder);
                }
                let payload = r.get_bits(2 * k)?;
                spill + payload
            }
        }
    };

    Ok(crate::structs::predictor::unmap(u))
}

fn smallest_k(delta: u32, max_used_bits: u32) -> CmpResult<u32> {
    let max_k = div_ceil_u32(max_used_bits, 2).max(1);
    let mut k = 1u32;
    while k <= max_k {
        if delta < (1u32 << (2 * k)) {
            return Ok(k);
        }
        k += 1;
    }
    Err(CmpError::DataValueTooLarge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_escape_bit_count_matches_scenario_3() {
        // u = spill + 3, spill = 10, m = 4: expect Golomb(spill, m) then 2 bits of payload 3 (k=1)
        let spill = 10u32;
        let m = 4u32;
        let u = spill + 3;
        let res = crate::structs::predictor::unmap(u);

        let mut buf = [0u8; 16];
        let mut w = BitWriter::new(&mut buf);
        encode_field(&mut w, res, m, spill, 16, OutlierMechanism::MultiEscape, 32).unwrap();

        let mut golomb_buf = [0u8; 16];
        let mut gw = BitWriter::new(&mut golomb_buf);
        golomb::encode(&mut gw, spill, m, 32).unwrap();
        let expected_bits = gw.bits_written() + 2;
        assert_eq!(w.bits_written(), expected_bits);

        let mut r = BitReader::new(&buf);
        let decoded =
            decode_field(&mut r, m, spill, 16, OutlierMechanism::MultiEscape, 32).unwrap();
        assert_eq!(decoded, res);
    }

    #[test]
    fn zero_escape_bit_count_matches_scenario_4() {
        // u = spill = 16, spill = 16, m = 4, max_used_bits = 16:
        // expect Golomb(0, m) then 16 literal bits
        let spill = 16u32;
        let m = 4u32;
        let u = spill;
        let res = crate::structs::predictor::unmap(u);

        let mut buf = [0u8; 16];
        let mut w = BitWriter::new(&mut buf);
        encode_field(&mut w, res, m, spill, 16, OutlierMechanism::ZeroEscape, 32).unwrap();

        let mut golomb_buf = [0u8; 16];
        let mut gw = BitWriter::new(&mut golomb_buf);
        golomb::encode(&mut gw, 0, m, 32).unwrap();
        let expected_bits = gw.bits_written() + 16;
        assert_eq!(w.bits_written(), expected_bits);

        let mut r = BitReader::new(&buf);
        let decoded =
            decode_field(&mut r, m, spill, 16, OutlierMechanism::ZeroEscape, 32).unwrap();
        assert_eq!(decoded, res);
    }

    #[test]
    fn round_trips_across_values_both_mechanisms() {
        for &mechanism in &[OutlierMechanism::ZeroEscape, OutlierMechanism::MultiEscape] {
            let m = 4u32;
            let spill = 20u32;
            for res in -50i32..=300 {
                let mut buf = [0u8; 32];
                let mut w = BitWriter::new(&mut buf);
                encode_field(&mut w, res, m, spill, 16, mechanism, 32).unwrap();

                let mut r = BitReader::new(&buf);
                let decoded = decode_field(&mut r, m, spill, 16, mechanism, 32).unwrap();
                assert_eq!(decoded, res, "mechanism={mechanism:?} res={res}");
            }
        }
    }

    #[test]
    fn rdcu_table_is_within_valid_spill_range_for_every_m() {
        for m in 1u32..=63 {
            let spill = RDCU_MAX_SPILL_TABLE[m as usize];
            assert!(spill >= 2, "m={m} spill={spill}");
        }
    }
}
