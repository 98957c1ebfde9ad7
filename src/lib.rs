//! Lossless/near-lossless codec for PLATO on-board telemetry collections.
//!
//! The crate compresses fixed-schema "collections" of pixel imagettes and
//! derived per-pixel statistics into a packed Golomb/Rice bitstream, wraps
//! that bitstream in a self-describing compression entity, and decodes the
//! entity back to the original schema (bit-exact when lossy rounding is
//! zero). See `DESIGN.md` for how each module grounds in this codebase's
//! conventions.
//!
//! # Concurrency & resource model
//!
//! Every entry point takes its configuration ([`config::CmpPar`]) and
//! max-used-bits table ([`structs::max_used_bits::MaxUsedBitsRegistry`]) as
//! explicit, caller-owned arguments rather than touching process-wide
//! mutable state. Two calls against independently owned arguments never
//! race; nothing here needs a lock. [`init_process_defaults`] is an optional
//! convenience for callers who *want* a shared, process-wide default
//! registry - it is not required, and the core codec never reaches for it
//! on its own.

pub mod config;
pub mod consts;
pub mod error;
pub mod helpers;

pub mod structs {
    pub mod bit_io;
    pub mod chunk;
    pub mod collection_header;
    pub mod data_type;
    pub mod entity_header;
    pub mod field_codec;
    pub mod golomb;
    pub mod max_used_bits;
    pub mod predictor;
    pub mod walker;
}

pub use config::{validate_icu_buffers, CmpMode, CmpPar, FieldPar, RdcuConfig, Target};
pub use error::{CmpError, CmpResult};
pub use structs::chunk::{
    compress_chunk, compress_chunk_set_model_id_and_counter, decompress_chunk, RawCollection,
};
pub use structs::collection_header::CollectionHeader;
pub use structs::data_type::CmpDataType;
pub use structs::entity_header::{plato_timestamp_from_unix, EntityHeader, TailKind, Timestamp, VersionId};
pub use structs::max_used_bits::MaxUsedBitsRegistry;

use std::sync::OnceLock;

static PROCESS_DEFAULT_REGISTRY: OnceLock<MaxUsedBitsRegistry> = OnceLock::new();

/// Initializes the optional process-wide default [`MaxUsedBitsRegistry`],
/// built from the two built-in versions only. Safe to call from multiple
/// threads; only the first call's effect is observed. Entirely optional -
/// callers that already own a registry should pass it directly to
/// [`compress_chunk`]/[`decompress_chunk`] instead.
pub fn init_process_defaults() -> &'static MaxUsedBitsRegistry {
    PROCESS_DEFAULT_REGISTRY.get_or_init(MaxUsedBitsRegistry::new)
}
