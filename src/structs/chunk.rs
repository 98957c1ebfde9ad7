//! Chunk driver (component I): walks a chunk's collection headers, infers
//! its data type (a single type, or one of the two allowed heterogeneous
//! groupings), and drives the walker to build a complete compressed entity.

use crate::config::{validate_icu_buffers, CmpPar, Target};
use crate::consts::{round_up_4, COLLECTION_LENGTH_PREFIX_SIZE, GENERIC_HEADER_SIZE};
use crate::error::{CmpError, CmpResult};
use crate::structs::bit_io::{BitReader, BitWriter};
use crate::structs::collection_header::{self, CollectionHeader};
use crate::structs::data_type::CmpDataType;
use crate::structs::entity_header::{EntityHeader, EntityTail, TailKind, Timestamp, VersionId};
use crate::structs::max_used_bits::{Field, MaxUsedBitsRegistry};
use crate::structs::walker::{self, WalkContext};

/// The two heterogeneous collection groupings a single chunk may mix,
/// beyond carrying every collection as the same homogeneous data type.
/// Order is fixed: it determines the non-imagette header tail's field
/// slot layout.
const HETEROGENEOUS_GROUPS: [&[CmpDataType]; 2] = [
    &[CmpDataType::Background, CmpDataType::Offset],
    &[
        CmpDataType::Background,
        CmpDataType::Offset,
        CmpDataType::Smearing,
    ],
];

/// One collection's raw (uncompressed) payload, laid out as big-endian bytes
/// matching its data type's field widths, record after record.
pub struct RawCollection<'a> {
    pub header: CollectionHeader,
    pub payload: &'a [u8],
}

/// Which homogeneous or heterogeneous data type a chunk's collections
/// resolve to, and the ordered list of distinct fields its header tail
/// must carry.
struct ChunkShape {
    data_type: CmpDataType,
    header_fields: Vec<Field>,
}

fn distinct_fields_in_order(types: &[CmpDataType]) -> Vec<Field> {
    let mut seen = Vec::new();
    for &dt in types {
        for spec in dt.fields() {
            if !seen.contains(&spec.field) {
                seen.push(spec.field);
            }
        }
    }
    seen
}

fn resolve_shape(collections: &[RawCollection]) -> CmpResult<ChunkShape> {
    if collections.is_empty() {
        return Err(CmpError::ChunkNull);
    }
    let types: Vec<CmpDataType> = collections.iter().map(|c| c.header.data_type()).collect();

    if types.iter().all(|&t| t == types[0]) {
        let dt = types[0];
        if dt == CmpDataType::Unknown {
            return Err(CmpError::ColSubserviceUnsupported);
        }
        return Ok(ChunkShape {
            data_type: dt,
            header_fields: distinct_fields_in_order(&[dt]),
        });
    }

    for group in HETEROGENEOUS_GROUPS {
        let present: Vec<CmpDataType> = group.iter().copied().filter(|g| types.contains(g)).collect();
        if present.len() == types.len() && types.iter().all(|t| group.contains(t)) {
            return Ok(ChunkShape {
                data_type: CmpDataType::Unknown, // synthetic: no single variant names this grouping
                header_fields: distinct_fields_in_order(group),
            });
        }
    }

    Err(CmpError::ChunkSubserviceInconsistent)
}

/// Parses one collection's raw big-endian payload into per-field i32
/// columns, using its own data type's field widths (not the chunk's
/// synthetic shape).
fn bytes_to_columns(dt: CmpDataType, payload: &[u8]) -> CmpResult<Vec<Vec<i32>>> {
    let sample_size = dt.sample_size();
    if sample_size == 0 || payload.len() % sample_size != 0 {
        return Err(CmpError::ColSizeInconsistent);
    }
    let n = payload.len() / sample_size;
    let fields = dt.fields();
    let mut columns: Vec<Vec<i32>> = fields.iter().map(|_| Vec::with_capacity(n)).collect();

    let mut offset = 0;
    for _ in 0..n {
        for (i, spec) in fields.iter().enumerate() {
            let w = spec.width_bytes as usize;
            let mut v: u32 = 0;
            for &b in &payload[offset..offset + w] {
                v = (v << 8) | b as u32;
            }
            columns[i].push(v as i32);
            offset += w;
        }
    }
    Ok(columns)
}

#[allow(clippy::needless_range_loop)]
fn columns_to_bytes(dt: CmpDataType, columns: &[Vec<i32>], n: usize, out: &mut Vec<u8>) {
    let fields = dt.fields();
    for rec in 0..n {
        for (col, spec) in columns.iter().zip(fields) {
            let w = spec.width_bytes as usize;
            let v = col[rec] as u32;
            for shift in (0..w).rev() {
                out.push((v >> (8 * shift)) as u8);
            }
        }
    }
}

/// Compresses a chunk's collections into a single entity. `out` must be at
/// least [`crate::consts::compress_chunk_bound`] bytes (for the total input
/// size and collection count). `models[i]` is the optional persistent model
/// buffer for `collections[i]` (one `Vec<i32>` per field of that
/// collection's data type, each at least as long as its record count),
/// used and updated in place when `par.cmp_mode` is `ModelZero`/`ModelMulti`;
/// pass `None` (or a shorter slice) for `Raw`/`Diff*` chunks. Returns the
/// number of bytes actually written.
#[allow(clippy::too_many_arguments)]
pub fn compress_chunk(
    collections: &[RawCollection],
    mut models: Option<&mut [Vec<Vec<i32>>]>,
    par: &CmpPar,
    registry: &MaxUsedBitsRegistry,
    target: Target,
    version_id: VersionId,
    start_timestamp: Timestamp,
    end_timestamp: Timestamp,
    model_id: u16,
    out: &mut [u8],
) -> CmpResult<usize> {
    par.validate_generic(target)?;

    let shape = resolve_shape(collections)?;
    for &f in &shape.header_fields {
        let max_used_bits = registry.lookup(par.max_used_bits_version, f)?;
        par.validate_field(f, max_used_bits, target)?;
    }

    let tail = match shape.header_fields.len() {
        _ if collections.len() == 1 && collections[0].header.data_type().family()
            == crate::structs::data_type::DataTypeFamily::Imagette =>
        {
            let dt = collections[0].header.data_type();
            let pair = par.field(Field::Imagette).ok_or(CmpError::ParSpecific)?;
            if dt.is_adaptive() {
                EntityTail::AdaptiveImagette {
                    primary: pair,
                    ap1: pair,
                    ap2: pair,
                }
            } else {
                EntityTail::Imagette { pair }
            }
        }
        _ => {
            let mut fields = Vec::new();
            for &f in &shape.header_fields {
                fields.push((f, par.field(f).ok_or(CmpError::ParSpecific)?));
            }
            EntityTail::NonImagette { fields }
        }
    };

    let header_size = GENERIC_HEADER_SIZE + tail.byte_len();
    if out.len() < header_size {
        return Err(CmpError::EntityTooSmall);
    }

    let mut body = Vec::new();
    let mut original_size: usize = 0;

    for (i, rc) in collections.iter().enumerate() {
        let dt = rc.header.data_type();
        original_size += collection_header::SIZE + rc.payload.len();

        let mut header_bytes = [0u8; collection_header::SIZE];
        rc.header.write(&mut header_bytes)?;
        body.extend_from_slice(&header_bytes);

        let len_pos = body.len();
        body.extend_from_slice(&[0u8, 0u8]); // length prefix, back-patched below

        let model_for_collection = models
            .as_mut()
            .and_then(|m| m.get_mut(i))
            .map(|v| v.as_mut_slice());

        if par.cmp_mode.is_raw() {
            validate_icu_buffers(
                rc.payload,
                out.len(),
                None,
                par.cmp_mode,
                rc.payload.len(),
            )?;
            body.extend_from_slice(rc.payload);
            let written = rc.payload.len();
            patch_u16(&mut body, len_pos, written)?;
            continue;
        }

        let columns = bytes_to_columns(dt, rc.payload)?;
        let n = columns.first().map(|c| c.len()).unwrap_or(0);
        validate_icu_buffers(
            rc.payload,
            out.len(),
            model_for_collection.as_deref().and_then(|m| m.first()).map(|v| v.as_slice()),
            par.cmp_mode,
            n,
        )?;
        let total_values: usize = columns.iter().map(|c| c.len()).sum();
        let mut scratch = vec![0u8; round_up_4(GENERIC_HEADER_SIZE + total_values * 4)];
        let mut w = BitWriter::new(&mut scratch);
        let ctx = WalkContext {
            par,
            registry,
            target,
        };
        walker::encode_record_set(&mut w, dt, &columns, model_for_collection, &ctx)?;
        let written = w.finalize();
        if written > u16::MAX as usize {
            return Err(CmpError::IntCmpColTooLarge);
        }
        body.extend_from_slice(&scratch[..written]);
        patch_u16(&mut body, len_pos, written)?;
    }

    let cmp_ent_size = round_up_4(header_size + body.len());
    if out.len() < cmp_ent_size {
        return Err(CmpError::EntityTooSmall);
    }

    let header = EntityHeader {
        version_id,
        cmp_ent_size: cmp_ent_size as u32,
        original_size: original_size as u32,
        start_timestamp,
        end_timestamp,
        raw_flag: par.cmp_mode.is_raw(),
        data_type: shape.data_type,
        cmp_mode_used: par.cmp_mode,
        model_value_used: par.model_value,
        max_used_bits_version: par.max_used_bits_version,
        round_used: par.round as u16,
        model_id,
        tail,
    };
    header.write(&mut out[..header_size])?;
    out[header_size..header_size + body.len()].copy_from_slice(&body);
    for b in out[header_size + body.len()..cmp_ent_size].iter_mut() {
        *b = 0;
    }

    Ok(cmp_ent_size)
}

fn patch_u16(buf: &mut [u8], pos: usize, value: usize) -> CmpResult<()> {
    if value > u16::MAX as usize {
        return Err(CmpError::IntCmpColTooLarge);
    }
    buf[pos] = (value >> 8) as u8;
    buf[pos + 1] = value as u8;
    Ok(())
}

/// Post-patches `model_id` and `counter` into an already-built entity's
/// generic header, in place, without re-encoding the body. The header's
/// 16-bit `model_id` wire field packs the two: `model_id` in the upper
/// byte, `counter` in the lower - see `DESIGN.md`.
pub fn compress_chunk_set_model_id_and_counter(
    dst: &mut [u8],
    size: usize,
    model_id: u8,
    counter: u8,
) -> CmpResult<()> {
    if size < GENERIC_HEADER_SIZE || dst.len() < size {
        return Err(CmpError::EntityTooSmall);
    }
    let packed = ((model_id as u16) << 8) | counter as u16;
    dst[30] = (packed >> 8) as u8;
    dst[31] = packed as u8;
    Ok(())
}

/// Decompresses an entity back into its collections' raw big-endian payloads.
/// `tail_kind` must match the variant used at compress time (callers that
/// persisted `cmp_mode_used`/`data_type` from a prior header read can
/// reconstruct it; see `DESIGN.md`). `models[i]` is the optional persistent
/// model buffer for the i-th collection found in the entity, used and
/// updated in place under `ModelZero`/`ModelMulti` - see [`compress_chunk`].
pub type DecodedCollection = (CollectionHeader, Vec<u8>);

pub fn decompress_chunk(
    entity: &[u8],
    tail_kind: TailKind,
    mut models: Option<&mut [Vec<Vec<i32>>]>,
    par: &CmpPar,
    registry: &MaxUsedBitsRegistry,
    target: Target,
) -> CmpResult<(EntityHeader, Vec<DecodedCollection>)> {
    let header = EntityHeader::read(entity, tail_kind)?;
    let header_size = header.header_size();
    if entity.len() < header.cmp_ent_size as usize {
        return Err(CmpError::ChunkTooSmall);
    }

    let mut pos = header_size;
    let mut collections = Vec::new();
    let body_end = header.cmp_ent_size as usize;
    let mut index = 0usize;

    while pos + collection_header::SIZE <= body_end {
        let col_header = CollectionHeader::read(&entity[pos..])?;
        pos += collection_header::SIZE;
        if pos + COLLECTION_LENGTH_PREFIX_SIZE > body_end {
            return Err(CmpError::ChunkTooSmall);
        }
        let cmp_len = ((entity[pos] as usize) << 8) | entity[pos + 1] as usize;
        pos += COLLECTION_LENGTH_PREFIX_SIZE;
        if pos + cmp_len > body_end {
            return Err(CmpError::ChunkSizeInconsistent);
        }

        let dt = col_header.data_type();
        let payload = if header.raw_flag {
            entity[pos..pos + cmp_len].to_vec()
        } else {
            let sample_size = dt.sample_size();
            if sample_size == 0 || col_header.data_length as usize % sample_size != 0 {
                return Err(CmpError::ColSizeInconsistent);
            }
            let n = col_header.data_length as usize / sample_size;
            let mut r = BitReader::new(&entity[pos..pos + cmp_len]);
            let ctx = WalkContext {
                par,
                registry,
                target,
            };
            let model_for_collection = models
                .as_mut()
                .and_then(|m| m.get_mut(index))
                .map(|v| v.as_mut_slice());
            let columns = walker::decode_record_set(&mut r, dt, n, model_for_collection, &ctx)?;
            let mut out = Vec::with_capacity(col_header.data_length as usize);
            columns_to_bytes(dt, &columns, n, &mut out);
            out
        };

        collections.push((col_header, payload));
        pos += cmp_len;
        index += 1;
    }

    Ok((header, collections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CmpMode;
    use crate::consts::compress_chunk_bound;

    fn sample_par() -> CmpPar {
        let mut par = CmpPar::new(CmpMode::DiffZero, 0, 0, 1);
        par.set_field(Field::Imagette, 4, 20);
        par
    }

    #[test]
    fn single_imagette_collection_round_trips() {
        let registry = MaxUsedBitsRegistry::new();
        let par = sample_par();

        let header = CollectionHeader::new(1000, 1, 0, 1, 0, 0, 6).unwrap();
        let payload: [u8; 6] = [0, 10, 0, 12, 0, 9];
        let collections = [RawCollection {
            header,
            payload: &payload,
        }];

        let bound = compress_chunk_bound(payload.len() + collection_header::SIZE, 1);
        let mut out = vec![0u8; bound];
        let written = compress_chunk(
            &collections,
            None,
            &par,
            &registry,
            Target::Icu,
            VersionId {
                cmp_tool_build: false,
                major: 1,
                minor: 0,
            },
            Timestamp {
                coarse: 10,
                fine: 0,
            },
            Timestamp {
                coarse: 20,
                fine: 0,
            },
            5,
            &mut out,
        )
        .unwrap();

        let (decoded_header, decoded_collections) = decompress_chunk(
            &out[..written],
            TailKind::Imagette,
            None,
            &par,
            &registry,
            Target::Icu,
        )
        .unwrap();

        assert_eq!(decoded_header.model_id, 5);
        assert_eq!(decoded_collections.len(), 1);
        assert_eq!(decoded_collections[0].1, payload);
    }

    #[test]
    fn model_mode_round_trips_with_updated_model_buffer() {
        let registry = MaxUsedBitsRegistry::new();
        let mut par = CmpPar::new(CmpMode::ModelZero, 8, 0, 1);
        par.set_field(Field::Imagette, 4, 20);

        let header = CollectionHeader::new(0, 0, 0, 1, 0, 0, 6).unwrap();
        let payload: [u8; 6] = [0, 10, 0, 12, 0, 9];
        let collections = [RawCollection {
            header,
            payload: &payload,
        }];

        let mut encode_models = [vec![vec![0i32; 3]]];
        let bound = compress_chunk_bound(payload.len() + collection_header::SIZE, 1);
        let mut out = vec![0u8; bound];
        let written = compress_chunk(
            &collections,
            Some(&mut encode_models),
            &par,
            &registry,
            Target::Icu,
            VersionId {
                cmp_tool_build: false,
                major: 1,
                minor: 0,
            },
            Timestamp::ZERO,
            Timestamp::ZERO,
            0,
            &mut out,
        )
        .unwrap();

        let mut decode_models = [vec![vec![0i32; 3]]];
        let (_header, decoded_collections) = decompress_chunk(
            &out[..written],
            TailKind::Imagette,
            Some(&mut decode_models),
            &par,
            &registry,
            Target::Icu,
        )
        .unwrap();

        assert_eq!(decoded_collections[0].1, payload);
        assert_eq!(encode_models, decode_models);
    }

    #[test]
    fn oversized_spill_rejected_before_any_bytes_written_scenario_6() {
        let registry = MaxUsedBitsRegistry::new();
        let mut par = CmpPar::new(CmpMode::DiffZero, 0, 0, 1);
        par.set_field(Field::Imagette, 4, 65535); // far beyond max_spill for m=4, 16 bits

        let header = CollectionHeader::new(0, 0, 0, 1, 0, 0, 6).unwrap();
        let payload: [u8; 6] = [0, 10, 0, 12, 0, 9];
        let collections = [RawCollection {
            header,
            payload: &payload,
        }];

        let mut out = vec![0xAAu8; 256];
        let before = out.clone();
        let err = compress_chunk(
            &collections,
            None,
            &par,
            &registry,
            Target::Icu,
            VersionId {
                cmp_tool_build: false,
                major: 0,
                minor: 0,
            },
            Timestamp::ZERO,
            Timestamp::ZERO,
            0,
            &mut out,
        )
        .unwrap_err();
        assert_eq!(err, CmpError::ParSpecific);
        assert_eq!(out, before);
    }

    #[test]
    fn mismatched_subservices_outside_allowed_groups_rejected() {
        let registry = MaxUsedBitsRegistry::new();
        let par = sample_par();

        let h1 = CollectionHeader::new(0, 0, 0, 1, 0, 0, 2).unwrap(); // Imagette
        let h2 = CollectionHeader::new(0, 0, 0, 8, 0, 0, 5).unwrap(); // FFx
        let p1 = [0u8, 1];
        let p2 = [0u8, 0, 0, 0, 5];
        let collections = [
            RawCollection {
                header: h1,
                payload: &p1,
            },
            RawCollection {
                header: h2,
                payload: &p2,
            },
        ];

        let mut out = vec![0u8; 256];
        let err = compress_chunk(
            &collections,
            None,
            &par,
            &registry,
            Target::Icu,
            VersionId {
                cmp_tool_build: false,
                major: 0,
                minor: 0,
            },
            Timestamp::ZERO,
            Timestamp::ZERO,
            0,
            &mut out,
        )
        .unwrap_err();
        assert_eq!(err, CmpError::ChunkSubserviceInconsistent);
    }

    #[test]
    fn model_id_and_counter_patch_without_reencoding() {
        let registry = MaxUsedBitsRegistry::new();
        let par = sample_par();

        let header = CollectionHeader::new(0, 0, 0, 1, 0, 0, 6).unwrap();
        let payload: [u8; 6] = [0, 10, 0, 12, 0, 9];
        let collections = [RawCollection {
            header,
            payload: &payload,
        }];

        let bound = compress_chunk_bound(payload.len() + collection_header::SIZE, 1);
        let mut out = vec![0u8; bound];
        let written = compress_chunk(
            &collections,
            None,
            &par,
            &registry,
            Target::Icu,
            VersionId {
                cmp_tool_build: false,
                major: 0,
                minor: 0,
            },
            Timestamp::ZERO,
            Timestamp::ZERO,
            0,
            &mut out,
        )
        .unwrap();
        let body_before = out[GENERIC_HEADER_SIZE..written].to_vec();

        compress_chunk_set_model_id_and_counter(&mut out, written, 0x12, 0x34).unwrap();

        assert_eq!(out[30], 0x12);
        assert_eq!(out[31], 0x34);
        assert_eq!(out[GENERIC_HEADER_SIZE..written], body_before[..]);
    }
}
