//! Max-used-bits registry (component K): a versioned table mapping field
//! name to bit-width. Version 0 is the conservative upper bound, version 1
//! is the science baseline; further versions can be registered at runtime.
//!
//! Exposed as an explicit context object ([`MaxUsedBitsRegistry`]) rather
//! than ambient global state, per the concurrency model's "explicit context
//! objects threaded through calls" resolution - see `DESIGN.md`.

use crate::error::{CmpError, CmpResult};

/// Every field name recognized by [`crate::config::CmpPar`] and by this
/// registry. `Ncob`/`Ecob` cover both the x and y sub-fields of a sample,
/// which share one `(golomb_par, spill)` pair and one max-used-bits width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Field {
    Imagette,
    ExpFlags,
    Fx,
    Ncob,
    Efx,
    Ecob,
    FxCobVariance,
    OffsetMean,
    OffsetVariance,
    BackgroundMean,
    BackgroundVariance,
    BackgroundOutlierPixels,
    SmearingMean,
    SmearingVariance,
    SmearingOutlierPixels,
}

pub const FIELD_COUNT: usize = 15;

pub const ALL_FIELDS: [Field; FIELD_COUNT] = [
    Field::Imagette,
    Field::ExpFlags,
    Field::Fx,
    Field::Ncob,
    Field::Efx,
    Field::Ecob,
    Field::FxCobVariance,
    Field::OffsetMean,
    Field::OffsetVariance,
    Field::BackgroundMean,
    Field::BackgroundVariance,
    Field::BackgroundOutlierPixels,
    Field::SmearingMean,
    Field::SmearingVariance,
    Field::SmearingOutlierPixels,
];

pub(crate) fn field_index(f: Field) -> usize {
    ALL_FIELDS.iter().position(|&x| x == f).unwrap()
}

/// Version 0: the conservative upper bound used before on-ground calibration
/// narrows the expected dynamic range of each field.
const VERSION_0_WIDTHS: [u8; FIELD_COUNT] = [
    16, // Imagette
    32, // ExpFlags
    32, // Fx
    32, // Ncob
    32, // Efx
    32, // Ecob
    32, // FxCobVariance
    32, // OffsetMean
    32, // OffsetVariance
    32, // BackgroundMean
    32, // BackgroundVariance
    32, // BackgroundOutlierPixels
    32, // SmearingMean
    32, // SmearingVariance
    32, // SmearingOutlierPixels
];

/// Version 1: the science baseline, tightened once flight data characterized
/// the true dynamic range of each field.
const VERSION_1_WIDTHS: [u8; FIELD_COUNT] = [
    16, // Imagette
    2,  // ExpFlags
    22, // Fx
    16, // Ncob
    22, // Efx
    16, // Ecob
    30, // FxCobVariance
    16, // OffsetMean
    19, // OffsetVariance
    16, // BackgroundMean
    19, // BackgroundVariance
    16, // BackgroundOutlierPixels
    16, // SmearingMean
    19, // SmearingVariance
    16, // SmearingOutlierPixels
];

/// A single registered version's widths.
#[derive(Debug, Clone)]
struct VersionEntry {
    version: u8,
    widths: [u8; FIELD_COUNT],
}

/// Process-wide (or caller-scoped) table of `(version, widths)` entries.
///
/// Versions 0 and 1 are always present and read-only; [`register`] adds
/// further versions. Single-threaded initialization is the caller's
/// responsibility - see the crate-level docs for the happens-before
/// discipline around [`crate::init_process_defaults`].
#[derive(Debug, Clone)]
pub struct MaxUsedBitsRegistry {
    entries: Vec<VersionEntry>,
}

impl Default for MaxUsedBitsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MaxUsedBitsRegistry {
    /// A fresh registry containing only the two built-in read-only versions.
    pub fn new() -> Self {
        MaxUsedBitsRegistry {
            entries: vec![
                VersionEntry {
                    version: 0,
                    widths: VERSION_0_WIDTHS,
                },
                VersionEntry {
                    version: 1,
                    widths: VERSION_1_WIDTHS,
                },
            ],
        }
    }

    /// Registers a new version's widths. Versions 0 and 1 cannot be
    /// overwritten.
    pub fn register(&mut self, version: u8, widths: [u8; FIELD_COUNT]) -> CmpResult<()> {
        if version == 0 || version == 1 {
            return Err(CmpError::ParGeneric);
        }
        for w in widths {
            if w == 0 || w > 32 {
                return Err(CmpError::ParGeneric);
            }
        }
        if let Some(existing) = self.entries.iter_mut().find(|e| e.version == version) {
            existing.widths = widths;
        } else {
            self.entries.push(VersionEntry { version, widths });
        }
        Ok(())
    }

    /// Looks up the bit-width of `field` under `version`.
    pub fn lookup(&self, version: u8, field: Field) -> CmpResult<u8> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.version == version)
            .ok_or(CmpError::ParGeneric)?;
        Ok(entry.widths[field_index(field)])
    }
}
