//! Entity header (component G): the generic 32-byte header plus a
//! data-type-specific tail (imagette: +4, adaptive imagette: +12,
//! non-imagette: +32), all big-endian and packed with no implicit padding.

use byteorder::{BigEndian, ByteOrder};

use crate::config::{CmpMode, FieldPar};
use crate::consts::{
    ADAPTIVE_IMAGETTE_HEADER_TAIL, GENERIC_HEADER_SIZE, IMAGETTE_HEADER_TAIL, MAX_24BIT, MAX_48BIT,
    NON_IMAGETTE_HEADER_TAIL, PLATO_EPOCH_UNIX_SECONDS,
};
use crate::error::{CmpError, CmpResult};
use crate::structs::data_type::CmpDataType;
use crate::structs::max_used_bits::Field;

/// `version_id`: bit 31 set means a cmp_tool (ground-software) build rather
/// than a flight build; the low 15 bits are the major version, the next 16
/// bits the minor version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionId {
    pub cmp_tool_build: bool,
    pub major: u16, // 0..=0x7FFF
    pub minor: u16,
}

impl VersionId {
    pub fn to_u32(self) -> u32 {
        ((self.cmp_tool_build as u32) << 31)
            | ((self.minor as u32) << 15)
            | (self.major as u32 & 0x7FFF)
    }

    pub fn from_u32(v: u32) -> Self {
        VersionId {
            cmp_tool_build: (v >> 31) & 1 == 1,
            minor: ((v >> 15) & 0xFFFF) as u16,
            major: (v & 0x7FFF) as u16,
        }
    }
}

/// A 48-bit entity timestamp: 32-bit coarse seconds since the PLATO epoch
/// plus 16-bit fine sub-second ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub coarse: u32,
    pub fine: u16,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { coarse: 0, fine: 0 };

    pub fn to_u48(self) -> u64 {
        ((self.coarse as u64) << 16) | self.fine as u64
    }

    pub fn from_u48(v: u64) -> Self {
        Timestamp {
            coarse: (v >> 16) as u32,
            fine: (v & 0xFFFF) as u16,
        }
    }
}

/// Converts a Unix timestamp to a PLATO-epoch [`Timestamp`], rejecting
/// anything earlier than 2020-01-01T00:00:00Z. This is the only place the
/// crate touches wall-clock semantics; the core codec never calls it itself.
pub fn plato_timestamp_from_unix(unix_seconds: u64, fine: u16) -> CmpResult<Timestamp> {
    let coarse = unix_seconds
        .checked_sub(PLATO_EPOCH_UNIX_SECONDS)
        .ok_or(CmpError::EntityTimestamp)?;
    if coarse > u32::MAX as u64 {
        return Err(CmpError::EntityTimestamp);
    }
    Ok(Timestamp {
        coarse: coarse as u32,
        fine,
    })
}

/// The data-type-specific tail appended after the 32-byte generic header.
#[derive(Debug, Clone)]
pub enum EntityTail {
    /// Plain imagette family: one `(golomb_par, spill)` pair.
    Imagette { pair: FieldPar },
    /// Adaptive imagette family: the primary pair plus two alternates
    /// carried for downstream re-evaluation.
    AdaptiveImagette {
        primary: FieldPar,
        ap1: FieldPar,
        ap2: FieldPar,
    },
    /// Offset/background/smearing and flux families (and synthetic
    /// heterogeneous "chunk" types): up to 8 distinct field pairs.
    NonImagette { fields: Vec<(Field, FieldPar)> },
}

impl EntityTail {
    pub fn byte_len(&self) -> usize {
        match self {
            EntityTail::Imagette { .. } => IMAGETTE_HEADER_TAIL,
            EntityTail::AdaptiveImagette { .. } => ADAPTIVE_IMAGETTE_HEADER_TAIL,
            EntityTail::NonImagette { .. } => NON_IMAGETTE_HEADER_TAIL,
        }
    }

    fn write(&self, out: &mut [u8]) -> CmpResult<()> {
        if out.len() < self.byte_len() {
            return Err(CmpError::EntityTooSmall);
        }
        match self {
            EntityTail::Imagette { pair } => {
                BigEndian::write_u16(&mut out[0..2], pair.golomb_par as u16);
                BigEndian::write_u16(&mut out[2..4], pair.spill as u16);
            }
            EntityTail::AdaptiveImagette { primary, ap1, ap2 } => {
                for (i, p) in [primary, ap1, ap2].into_iter().enumerate() {
                    let base = i * 4;
                    BigEndian::write_u16(&mut out[base..base + 2], p.golomb_par as u16);
                    BigEndian::write_u16(&mut out[base + 2..base + 4], p.spill as u16);
                }
            }
            EntityTail::NonImagette { fields } => {
                out[..NON_IMAGETTE_HEADER_TAIL].fill(0);
                if fields.len() > 8 {
                    return Err(CmpError::EntityHeader);
                }
                for (i, (_, p)) in fields.iter().enumerate() {
                    let base = i * 4;
                    BigEndian::write_u16(&mut out[base..base + 2], p.golomb_par as u16);
                    BigEndian::write_u16(&mut out[base + 2..base + 4], p.spill as u16);
                }
            }
        }
        Ok(())
    }
}

/// The full entity header: generic fields plus the variant-specific tail.
#[derive(Debug, Clone)]
pub struct EntityHeader {
    pub version_id: VersionId,
    pub cmp_ent_size: u32, // 24-bit
    pub original_size: u32, // 24-bit
    pub start_timestamp: Timestamp,
    pub end_timestamp: Timestamp,
    pub raw_flag: bool,
    pub data_type: CmpDataType,
    pub cmp_mode_used: CmpMode,
    pub model_value_used: u8,
    pub max_used_bits_version: u8,
    pub round_used: u16,
    pub model_id: u16,
    pub tail: EntityTail,
}

impl EntityHeader {
    pub fn header_size(&self) -> usize {
        GENERIC_HEADER_SIZE + self.tail.byte_len()
    }

    fn validate(&self) -> CmpResult<()> {
        if self.cmp_ent_size > MAX_24BIT {
            return Err(CmpError::EntityHeader);
        }
        if self.original_size > MAX_24BIT {
            return Err(CmpError::EntityHeader);
        }
        if self.start_timestamp.to_u48() > MAX_48BIT || self.end_timestamp.to_u48() > MAX_48BIT {
            return Err(CmpError::EntityTimestamp);
        }
        if (self.cmp_ent_size as usize) < self.header_size() {
            return Err(CmpError::EntityTooSmall);
        }
        Ok(())
    }

    /// Serializes the header (generic + tail) into `out`, which must be at
    /// least [`header_size`](Self::header_size) bytes.
    pub fn write(&self, out: &mut [u8]) -> CmpResult<()> {
        self.validate()?;
        if out.len() < self.header_size() {
            return Err(CmpError::EntityTooSmall);
        }

        BigEndian::write_u32(&mut out[0..4], self.version_id.to_u32());
        write_u24(&mut out[4..7], self.cmp_ent_size);
        write_u24(&mut out[7..10], self.original_size);
        write_u48(&mut out[10..16], self.start_timestamp.to_u48());
        write_u48(&mut out[16..22], self.end_timestamp.to_u48());

        let data_type_field: u16 =
            ((self.raw_flag as u16) << 15) | (self.data_type.to_u16() & 0x7FFF);
        BigEndian::write_u16(&mut out[22..24], data_type_field);

        out[24] = cmp_mode_to_u8(self.cmp_mode_used);
        out[25] = self.model_value_used;
        out[26] = self.max_used_bits_version;
        out[27] = 0; // reserved
        BigEndian::write_u16(&mut out[28..30], self.round_used);
        BigEndian::write_u16(&mut out[30..32], self.model_id);

        self.tail.write(&mut out[32..])
    }

    /// Parses a header from `buf`. `family` disambiguates which tail shape
    /// to read, since the tail's own length is not self-describing.
    pub fn read(buf: &[u8], tail_kind: TailKind) -> CmpResult<Self> {
        if buf.len() < GENERIC_HEADER_SIZE {
            return Err(CmpError::EntityTooSmall);
        }

        let version_id = VersionId::from_u32(BigEndian::read_u32(&buf[0..4]));
        let cmp_ent_size = read_u24(&buf[4..7]);
        let original_size = read_u24(&buf[7..10]);
        let start_timestamp = Timestamp::from_u48(read_u48(&buf[10..16]));
        let end_timestamp = Timestamp::from_u48(read_u48(&buf[16..22]));

        let data_type_field = BigEndian::read_u16(&buf[22..24]);
        let raw_flag = (data_type_field >> 15) & 1 == 1;
        let data_type = CmpDataType::from_u16(data_type_field & 0x7FFF);

        let cmp_mode_used = cmp_mode_from_u8(buf[24])?;
        let model_value_used = buf[25];
        let max_used_bits_version = buf[26];
        // buf[27] reserved
        let round_used = BigEndian::read_u16(&buf[28..30]);
        let model_id = BigEndian::read_u16(&buf[30..32]);

        let tail_bytes = &buf[32..];
        let tail = match tail_kind {
            TailKind::Imagette => {
                if tail_bytes.len() < IMAGETTE_HEADER_TAIL {
                    return Err(CmpError::EntityTooSmall);
                }
                EntityTail::Imagette {
                    pair: FieldPar {
                        golomb_par: BigEndian::read_u16(&tail_bytes[0..2]) as u32,
                        spill: BigEndian::read_u16(&tail_bytes[2..4]) as u32,
                    },
                }
            }
            TailKind::AdaptiveImagette => {
                if tail_bytes.len() < ADAPTIVE_IMAGETTE_HEADER_TAIL {
                    return Err(CmpError::EntityTooSmall);
                }
                let read_pair = |i: usize| FieldPar {
                    golomb_par: BigEndian::read_u16(&tail_bytes[i * 4..i * 4 + 2]) as u32,
                    spill: BigEndian::read_u16(&tail_bytes[i * 4 + 2..i * 4 + 4]) as u32,
                };
                EntityTail::AdaptiveImagette {
                    primary: read_pair(0),
                    ap1: read_pair(1),
                    ap2: read_pair(2),
                }
            }
            TailKind::NonImagette(field_order) => {
                if tail_bytes.len() < NON_IMAGETTE_HEADER_TAIL {
                    return Err(CmpError::EntityTooSmall);
                }
                if field_order.len() > 8 {
                    return Err(CmpError::EntityHeader);
                }
                let fields = field_order
                    .iter()
                    .enumerate()
                    .map(|(i, &f)| {
                        let base = i * 4;
                        (
                            f,
                            FieldPar {
                                golomb_par: BigEndian::read_u16(&tail_bytes[base..base + 2])
                                    as u32,
                                spill: BigEndian::read_u16(&tail_bytes[base + 2..base + 4])
                                    as u32,
                            },
                        )
                    })
                    .collect();
                EntityTail::NonImagette { fields }
            }
        };

        let h = EntityHeader {
            version_id,
            cmp_ent_size,
            original_size,
            start_timestamp,
            end_timestamp,
            raw_flag,
            data_type,
            cmp_mode_used,
            model_value_used,
            max_used_bits_version,
            round_used,
            model_id,
            tail,
        };
        h.validate()?;
        Ok(h)
    }
}

/// Which tail shape to parse - the entity's data type determines this, but
/// the decoder must be told explicitly since the tail is not self-describing
/// on the wire.
pub enum TailKind {
    Imagette,
    AdaptiveImagette,
    NonImagette(Vec<Field>),
}

fn cmp_mode_to_u8(m: CmpMode) -> u8 {
    match m {
        CmpMode::Raw => 0,
        CmpMode::DiffZero => 1,
        CmpMode::DiffMulti => 2,
        CmpMode::ModelZero => 3,
        CmpMode::ModelMulti => 4,
        CmpMode::Stuff => 5,
    }
}

fn cmp_mode_from_u8(v: u8) -> CmpResult<CmpMode> {
    match v {
        0 => Ok(CmpMode::Raw),
        1 => Ok(CmpMode::DiffZero),
        2 => Ok(CmpMode::DiffMulti),
        3 => Ok(CmpMode::ModelZero),
        4 => Ok(CmpMode::ModelMulti),
        5 => Ok(CmpMode::Stuff),
        _ => Err(CmpError::EntityHeader),
    }
}

fn write_u24(out: &mut [u8], v: u32) {
    out[0] = (v >> 16) as u8;
    out[1] = (v >> 8) as u8;
    out[2] = v as u8;
}

fn read_u24(buf: &[u8]) -> u32 {
    (buf[0] as u32) << 16 | (buf[1] as u32) << 8 | (buf[2] as u32)
}

fn write_u48(out: &mut [u8], v: u64) {
    for (i, b) in out.iter_mut().enumerate().take(6) {
        *b = (v >> (8 * (5 - i))) as u8;
    }
}

fn read_u48(buf: &[u8]) -> u64 {
    let mut v = 0u64;
    for &b in &buf[..6] {
        v = (v << 8) | b as u64;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(tail: EntityTail) -> EntityHeader {
        EntityHeader {
            version_id: VersionId {
                cmp_tool_build: false,
                major: 1,
                minor: 2,
            },
            cmp_ent_size: (GENERIC_HEADER_SIZE + tail.byte_len()) as u32,
            original_size: 12,
            start_timestamp: Timestamp {
                coarse: 100,
                fine: 1,
            },
            end_timestamp: Timestamp {
                coarse: 200,
                fine: 2,
            },
            raw_flag: false,
            data_type: CmpDataType::Imagette,
            cmp_mode_used: CmpMode::DiffZero,
            model_value_used: 0,
            max_used_bits_version: 1,
            round_used: 0,
            model_id: 7,
            tail,
        }
    }

    #[test]
    fn imagette_header_round_trips() {
        let h = sample_header(EntityTail::Imagette {
            pair: FieldPar {
                golomb_par: 4,
                spill: 20,
            },
        });
        let mut buf = vec![0u8; h.header_size()];
        h.write(&mut buf).unwrap();

        let back = EntityHeader::read(&buf, TailKind::Imagette).unwrap();
        assert_eq!(back.original_size, 12);
        assert_eq!(back.version_id, h.version_id);
        assert_eq!(back.start_timestamp, h.start_timestamp);
        match back.tail {
            EntityTail::Imagette { pair } => {
                assert_eq!(pair.golomb_par, 4);
                assert_eq!(pair.spill, 20);
            }
            _ => panic!("wrong tail kind"),
        }
    }

    #[test]
    fn raw_mode_sets_data_type_bit_15_scenario_2() {
        let mut h = sample_header(EntityTail::Imagette {
            pair: FieldPar {
                golomb_par: 1,
                spill: 2,
            },
        });
        h.raw_flag = true;
        h.data_type = CmpDataType::Imagette;

        let mut buf = vec![0u8; h.header_size()];
        h.write(&mut buf).unwrap();

        let data_type_field = BigEndian::read_u16(&buf[22..24]);
        assert_eq!(data_type_field, (1 << 15) | 1);
    }

    #[test]
    fn oversized_size_field_rejected() {
        let mut h = sample_header(EntityTail::Imagette {
            pair: FieldPar {
                golomb_par: 1,
                spill: 2,
            },
        });
        h.cmp_ent_size = MAX_24BIT + 1;
        let mut buf = vec![0u8; h.header_size()];
        assert_eq!(h.write(&mut buf).unwrap_err(), CmpError::EntityHeader);
    }

    #[test]
    fn version_id_bit_layout() {
        let v = VersionId {
            cmp_tool_build: true,
            major: 0x1234,
            minor: 0x5678,
        };
        let raw = v.to_u32();
        assert_eq!(raw >> 31, 1);
        assert_eq!(VersionId::from_u32(raw), v);
    }

    #[test]
    fn plato_epoch_rejects_pre_epoch_timestamps() {
        assert_eq!(
            plato_timestamp_from_unix(0, 0).unwrap_err(),
            CmpError::EntityTimestamp
        );
        assert!(plato_timestamp_from_unix(PLATO_EPOCH_UNIX_SECONDS, 0).is_ok());
    }

    #[test]
    fn non_imagette_tail_round_trips_with_field_order() {
        let fields = vec![
            (
                Field::OffsetMean,
                FieldPar {
                    golomb_par: 1,
                    spill: 2,
                },
            ),
            (
                Field::OffsetVariance,
                FieldPar {
                    golomb_par: 3,
                    spill: 4,
                },
            ),
        ];
        let h = sample_header(EntityTail::NonImagette {
            fields: fields.clone(),
        });
        let mut buf = vec![0u8; h.header_size()];
        h.write(&mut buf).unwrap();

        let order: Vec<Field> = fields.iter().map(|(f, _)| *f).collect();
        let back = EntityHeader::read(&buf, TailKind::NonImagette(order)).unwrap();
        match back.tail {
            EntityTail::NonImagette { fields: back_fields } => {
                assert_eq!(back_fields.len(), 2);
                assert_eq!(back_fields[0].1.golomb_par, 1);
                assert_eq!(back_fields[1].1.spill, 4);
            }
            _ => panic!("wrong tail kind"),
        }
    }
}
