//! Error taxonomy for the compression core.
//!
//! Every public entry point returns the most specific variant that applies;
//! gates fail fast and leave the destination buffer untouched. There are no
//! panics on the encode/decode fast path - a hard crash in flight telemetry
//! handling is strictly worse than a returned error.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type CmpResult<T> = Result<T, CmpError>;

/// The full error taxonomy returned from public entry points.
///
/// `code()` and `name()` give the legacy numeric/string view used by callers
/// bridging to a C ABI, matching the source system's error-code space.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpError {
    /// Unspecified failure; used only when no narrower kind applies.
    #[error("generic compression error")]
    Generic,

    /// Destination buffer exhausted mid-encode or mid-decode.
    #[error("destination buffer too small")]
    SmallBuf,

    /// A sample exceeds the width allowed by its max-used-bits entry.
    #[error("data value too large for max_used_bits")]
    DataValueTooLarge,

    /// `cmp_mode` / `model_value` / `round` out of range.
    #[error("invalid generic compression parameter")]
    ParGeneric,

    /// Per-field `(m, spill)` invalid or incompatible.
    #[error("invalid field-specific compression parameter")]
    ParSpecific,

    /// Null, overlapping, misaligned, or out-of-range buffer pointers.
    #[error("invalid buffer configuration")]
    ParBuffers,

    /// Configuration pointer missing.
    #[error("missing configuration")]
    ParNull,

    /// Model mode requested without a model buffer.
    #[error("model mode requires a model buffer")]
    ParNoModel,

    /// Chunk pointer/size missing.
    #[error("chunk pointer or size missing")]
    ChunkNull,
    /// Chunk exceeds the maximum representable size.
    #[error("chunk too large")]
    ChunkTooLarge,
    /// Chunk smaller than the smallest valid collection header.
    #[error("chunk too small")]
    ChunkTooSmall,
    /// A collection's declared data length does not match the bytes available.
    #[error("chunk size inconsistent with collection headers")]
    ChunkSizeInconsistent,
    /// Collections in the chunk do not share a subservice, or do not form an
    /// allowed heterogeneous grouping.
    #[error("chunk subservice sequence not supported")]
    ChunkSubserviceInconsistent,

    /// A collection's subservice does not map to a known data type.
    #[error("collection subservice unsupported")]
    ColSubserviceUnsupported,
    /// A collection's declared data length is not a multiple of its sample size.
    #[error("collection size inconsistent with its data type")]
    ColSizeInconsistent,

    /// Destination entity pointer missing.
    #[error("entity pointer missing")]
    EntityNull,
    /// Destination entity buffer smaller than the computed header size.
    #[error("entity buffer too small for its header")]
    EntityTooSmall,
    /// Malformed entity header (bad magic/size fields) encountered on decode.
    #[error("malformed entity header")]
    EntityHeader,
    /// A timestamp earlier than the PLATO epoch was supplied.
    #[error("entity timestamp precedes the PLATO epoch")]
    EntityTimestamp,

    /// Internal invariant violated while decoding a bitstream.
    #[error("internal decoder invariant violated")]
    IntDecoder,
    /// Decoder encountered a data type it does not know how to walk.
    #[error("internal: unsupported data type")]
    IntDataTypeUnsupported,
    /// A collection's compressed length exceeds what fits in its length field.
    #[error("internal: compressed collection too large")]
    IntCmpColTooLarge,
}

impl CmpError {
    /// Stable numeric code, matching the source system's `uint32` error space:
    /// values greater than [`ERROR_MAX_CODE`] indicate an error, and the
    /// negated value is this enum's discriminant (here just the 1-based
    /// position, since Rust has no reason to also expose this as `-code`).
    pub const fn code(self) -> u32 {
        self as u32 + 1
    }

    /// Stable, human-readable name for the error code.
    ///
    /// With the `strip-error-strings` feature enabled this collapses to a
    /// single placeholder, for size-constrained flight builds.
    pub const fn name(self) -> &'static str {
        #[cfg(feature = "strip-error-strings")]
        {
            "CMP_ERROR"
        }
        #[cfg(not(feature = "strip-error-strings"))]
        {
            match self {
                CmpError::Generic => "GENERIC",
                CmpError::SmallBuf => "SMALL_BUF",
                CmpError::DataValueTooLarge => "DATA_VALUE_TOO_LARGE",
                CmpError::ParGeneric => "PAR_GENERIC",
                CmpError::ParSpecific => "PAR_SPECIFIC",
                CmpError::ParBuffers => "PAR_BUFFERS",
                CmpError::ParNull => "PAR_NULL",
                CmpError::ParNoModel => "PAR_NO_MODEL",
                CmpError::ChunkNull => "CHUNK_NULL",
                CmpError::ChunkTooLarge => "CHUNK_TOO_LARGE",
                CmpError::ChunkTooSmall => "CHUNK_TOO_SMALL",
                CmpError::ChunkSizeInconsistent => "CHUNK_SIZE_INCONSISTENT",
                CmpError::ChunkSubserviceInconsistent => "CHUNK_SUBSERVICE_INCONSISTENT",
                CmpError::ColSubserviceUnsupported => "COL_SUBSERVICE_UNSUPPORTED",
                CmpError::ColSizeInconsistent => "COL_SIZE_INCONSISTENT",
                CmpError::EntityNull => "ENTITY_NULL",
                CmpError::EntityTooSmall => "ENTITY_TOO_SMALL",
                CmpError::EntityHeader => "ENTITY_HEADER",
                CmpError::EntityTimestamp => "ENTITY_TIMESTAMP",
                CmpError::IntDecoder => "INT_DECODER",
                CmpError::IntDataTypeUnsupported => "INT_DATA_TYPE_UNSUPPORTED",
                CmpError::IntCmpColTooLarge => "INT_CMP_COL_TOO_LARGE",
            }
        }
    }
}

/// Errors with a code above this value are considered errors by the legacy
/// numeric view; kept for parity with the source error-code space.
pub const ERROR_MAX_CODE: u32 = 0;
