//! `CmpDataType` and its per-variant field schema (component E groundwork).
//!
//! The 22 non-`Unknown` variants group into four families (§4.5): the
//! imagette family (plain 16-bit samples, two of the four carrying adaptive
//! alternate parameter pairs), the offset/background/smearing family
//! (mean/variance/outlier-pixel triples), and the fast/short/long flux
//! family (five field combinations replicated across three cadences).

use crate::structs::max_used_bits::Field;

/// A closed enum of data types a collection can carry. `Unknown` is never a
/// valid collection payload; it exists so decode can report
/// [`crate::error::CmpError::ColSubserviceUnsupported`] instead of panicking
/// on an out-of-range wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CmpDataType {
    Unknown = 0,

    Imagette = 1,
    ImagetteAdaptive = 2,
    SatImagette = 3,
    SatImagetteAdaptive = 4,

    Offset = 5,
    Background = 6,
    Smearing = 7,

    FFx = 8,
    FFxEfx = 9,
    FFxNcob = 10,
    FFxEfxNcobEcob = 11,
    FFxCobVariance = 12,

    SFx = 13,
    SFxEfx = 14,
    SFxNcob = 15,
    SFxEfxNcobEcob = 16,
    SFxCobVariance = 17,

    LFx = 18,
    LFxEfx = 19,
    LFxNcob = 20,
    LFxEfxNcobEcob = 21,
    LFxCobVariance = 22,
}

impl CmpDataType {
    /// Reconstructs a variant from its wire value (bits 0..14 of the entity
    /// header's `data_type` field, or the collection header's subservice
    /// mapping), `Unknown` for anything out of range.
    pub fn from_u16(v: u16) -> CmpDataType {
        use CmpDataType::*;
        match v {
            1 => Imagette,
            2 => ImagetteAdaptive,
            3 => SatImagette,
            4 => SatImagetteAdaptive,
            5 => Offset,
            6 => Background,
            7 => Smearing,
            8 => FFx,
            9 => FFxEfx,
            10 => FFxNcob,
            11 => FFxEfxNcobEcob,
            12 => FFxCobVariance,
            13 => SFx,
            14 => SFxEfx,
            15 => SFxNcob,
            16 => SFxEfxNcobEcob,
            17 => SFxCobVariance,
            18 => LFx,
            19 => LFxEfx,
            20 => LFxNcob,
            21 => LFxEfxNcobEcob,
            22 => LFxCobVariance,
            _ => Unknown,
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Whether this is one of the two "adaptive" imagette variants, which
    /// carry an extra alternate `(m, spill)` pair in the entity header tail.
    pub fn is_adaptive(self) -> bool {
        matches!(
            self,
            CmpDataType::ImagetteAdaptive | CmpDataType::SatImagetteAdaptive
        )
    }

    /// The family this variant belongs to, driving both header-tail shape
    /// and the walker's dispatch.
    pub fn family(self) -> DataTypeFamily {
        use CmpDataType::*;
        match self {
            Unknown => DataTypeFamily::Imagette, // unreachable in valid use
            Imagette | ImagetteAdaptive | SatImagette | SatImagetteAdaptive => {
                DataTypeFamily::Imagette
            }
            Offset | Background | Smearing => DataTypeFamily::ObsStats,
            FFx | FFxEfx | FFxNcob | FFxEfxNcobEcob | FFxCobVariance | SFx | SFxEfx | SFxNcob
            | SFxEfxNcobEcob | SFxCobVariance | LFx | LFxEfx | LFxNcob | LFxEfxNcobEcob
            | LFxCobVariance => DataTypeFamily::Flux,
        }
    }

    /// Ordered field list for one sample of this data type.
    pub fn fields(self) -> &'static [FieldSpec] {
        use CmpDataType::*;
        match self {
            Unknown => &[],

            Imagette | ImagetteAdaptive | SatImagette | SatImagetteAdaptive => &[FieldSpec {
                field: Field::Imagette,
                width_bytes: 2,
            }],

            Offset => &[
                FieldSpec {
                    field: Field::OffsetMean,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::OffsetVariance,
                    width_bytes: 4,
                },
            ],
            Background => &[
                FieldSpec {
                    field: Field::BackgroundMean,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::BackgroundVariance,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::BackgroundOutlierPixels,
                    width_bytes: 2,
                },
            ],
            Smearing => &[
                FieldSpec {
                    field: Field::SmearingMean,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::SmearingVariance,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::SmearingOutlierPixels,
                    width_bytes: 2,
                },
            ],

            FFx | SFx | LFx => &[
                FieldSpec {
                    field: Field::ExpFlags,
                    width_bytes: 1,
                },
                FieldSpec {
                    field: Field::Fx,
                    width_bytes: 4,
                },
            ],
            FFxEfx | SFxEfx | LFxEfx => &[
                FieldSpec {
                    field: Field::ExpFlags,
                    width_bytes: 1,
                },
                FieldSpec {
                    field: Field::Fx,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Efx,
                    width_bytes: 4,
                },
            ],
            FFxNcob | SFxNcob | LFxNcob => &[
                FieldSpec {
                    field: Field::ExpFlags,
                    width_bytes: 1,
                },
                FieldSpec {
                    field: Field::Fx,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Ncob,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Ncob,
                    width_bytes: 4,
                },
            ],
            FFxEfxNcobEcob | SFxEfxNcobEcob | LFxEfxNcobEcob => &[
                FieldSpec {
                    field: Field::ExpFlags,
                    width_bytes: 1,
                },
                FieldSpec {
                    field: Field::Fx,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Efx,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Ncob,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Ncob,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Ecob,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Ecob,
                    width_bytes: 4,
                },
            ],
            FFxCobVariance | SFxCobVariance | LFxCobVariance => &[
                FieldSpec {
                    field: Field::ExpFlags,
                    width_bytes: 1,
                },
                FieldSpec {
                    field: Field::Fx,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Efx,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Ncob,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Ncob,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Ecob,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::Ecob,
                    width_bytes: 4,
                },
                FieldSpec {
                    field: Field::FxCobVariance,
                    width_bytes: 4,
                },
            ],
        }
    }

    /// Size in bytes of one sample, the sum of its fields' wire widths.
    pub fn sample_size(self) -> usize {
        self.fields().iter().map(|f| f.width_bytes as usize).sum()
    }
}

/// Which broad schema family a data type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTypeFamily {
    Imagette,
    ObsStats,
    Flux,
}

/// One field of a sample: which `(golomb_par, spill)`/max-used-bits entry it
/// draws from, and its wire width for the endianness walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub width_bytes: u8,
}

/// Fixed subservice → data-type mapping (§4.6). Subservice numbers are
/// assigned in the same family order as [`CmpDataType`]'s variants.
pub fn data_type_from_subservice(subservice: u8) -> CmpDataType {
    if subservice == 0 || subservice > 22 {
        CmpDataType::Unknown
    } else {
        CmpDataType::from_u16(subservice as u16)
    }
}

pub fn subservice_from_data_type(dt: CmpDataType) -> Option<u8> {
    if dt == CmpDataType::Unknown {
        None
    } else {
        Some(dt.to_u16() as u8)
    }
}
