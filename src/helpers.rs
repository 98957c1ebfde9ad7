//! Small bit-twiddling helpers shared by the Golomb codec and predictor.

/// Number of bits needed to represent `v` (i.e. `floor(log2(v)) + 1`), or 0
/// for `v == 0`. Equivalent to `32 - v.leading_zeros()`.
#[inline(always)]
pub const fn u32_bit_length(v: u32) -> u32 {
    32 - v.leading_zeros()
}

/// `ceil(log2(m))` for `m >= 1`.
#[inline(always)]
pub const fn ceil_log2(m: u32) -> u32 {
    debug_assert!(m >= 1);
    if m == 1 {
        0
    } else {
        u32_bit_length(m - 1)
    }
}

/// True if `m` is a power of two (Rice fast path applies).
#[inline(always)]
pub const fn is_power_of_two(m: u32) -> bool {
    m != 0 && (m & (m - 1)) == 0
}

/// `ceil(a / b)` for `b >= 1`, without relying on `u32::div_ceil`'s MSRV.
#[inline(always)]
pub const fn div_ceil_u32(a: u32, b: u32) -> u32 {
    debug_assert!(b >= 1);
    (a + b - 1) / b
}
