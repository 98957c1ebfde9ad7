//! Crate-wide constants: bit budgets, wire-format sizes, and the PLATO epoch.

/// Maximum codeword length the ICU (software) codec will emit for a single
/// sample, in bits.
pub const ICU_MAX_CW_BITS: u32 = 32;

/// Maximum codeword length the RDCU (hardware) codec supports, in bits.
pub const RDCU_MAX_CW_BITS: u32 = 16;

/// Largest Golomb parameter `m` the RDCU hardware accepts.
pub const RDCU_MAX_GOLOMB_PAR: u32 = 63;

/// Largest Golomb parameter `m` the ICU software codec accepts.
pub const ICU_MAX_GOLOMB_PAR: u32 = u32::MAX;

/// Size in bytes of the generic (data-type-independent) entity header.
pub const GENERIC_HEADER_SIZE: usize = 32;

/// Size in bytes of the imagette-variant header tail.
pub const IMAGETTE_HEADER_TAIL: usize = 4;

/// Size in bytes of the adaptive-imagette-variant header tail.
pub const ADAPTIVE_IMAGETTE_HEADER_TAIL: usize = 12;

/// Size in bytes of the non-imagette-variant header tail.
pub const NON_IMAGETTE_HEADER_TAIL: usize = 32;

/// Size in bytes of a collection header.
pub const COLLECTION_HEADER_SIZE: usize = 12;

/// Size in bytes of the per-collection compressed-length prefix written into
/// the entity body.
pub const COLLECTION_LENGTH_PREFIX_SIZE: usize = 2;

/// Largest value a 24-bit big-endian size field can hold.
pub const MAX_24BIT: u32 = (1 << 24) - 1;

/// Largest value a 48-bit big-endian timestamp field can hold.
pub const MAX_48BIT: u64 = (1 << 48) - 1;

/// Seconds from the Unix epoch (1970-01-01T00:00:00Z) to the PLATO epoch
/// (2020-01-01T00:00:00Z). Used only by the optional wall-clock helper in
/// [`crate::entity_header::plato_timestamp_from_unix`]; the core codec never
/// touches wall-clock time itself.
pub const PLATO_EPOCH_UNIX_SECONDS: u64 = 1_577_836_800;

/// Round `n` up to the next multiple of 4.
pub const fn round_up_4(n: usize) -> usize {
    (n + 3) & !3
}

/// `COMPRESS_CHUNK_BOUND` from the testable-properties section: an upper
/// bound on the entity size (bytes) that is always sufficient to encode
/// `chunk_size` bytes spread across `num_collections` collections, regardless
/// of chosen parameters (worst case is a byte-for-byte raw copy plus framing,
/// under the largest possible header tail).
pub const fn compress_chunk_bound(chunk_size: usize, num_collections: usize) -> usize {
    round_up_4(
        GENERIC_HEADER_SIZE
            + NON_IMAGETTE_HEADER_TAIL
            + chunk_size
            + num_collections * COLLECTION_LENGTH_PREFIX_SIZE,
    )
}
