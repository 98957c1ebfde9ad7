//! Data-type walker (component E): drives [`field_codec`] across every
//! field of a [`CmpDataType`], in column-major order (one Golomb parameter
//! pair per field, shared across every record in the collection).

use crate::config::{CmpPar, Target};
use crate::error::{CmpError, CmpResult};
use crate::structs::bit_io::{BitReader, BitWriter};
use crate::structs::data_type::CmpDataType;
use crate::structs::field_codec::{self, OutlierMechanism};
use crate::structs::max_used_bits::MaxUsedBitsRegistry;
use crate::structs::predictor;

/// Everything the walker needs besides the samples themselves.
pub struct WalkContext<'a> {
    pub par: &'a CmpPar,
    pub registry: &'a MaxUsedBitsRegistry,
    pub target: Target,
}

/// Encodes one field's column of `n` samples.
///
/// `model` is `None` for `Raw`/`Diff*` modes; for `Model*` modes it holds one
/// persistent value per record, updated in place towards the just-coded
/// sample so the next call to this field sees the advanced model.
fn encode_field_column(
    w: &mut BitWriter,
    field: crate::structs::max_used_bits::Field,
    values: &[i32],
    model: Option<&mut [i32]>,
    ctx: &WalkContext,
) -> CmpResult<()> {
    let par = ctx.par;
    let max_used_bits = ctx
        .registry
        .lookup(par.max_used_bits_version, field)?
        .into();
    let field_par = par.field(field).ok_or(CmpError::ParSpecific)?;
    let mechanism = par
        .cmp_mode
        .mechanism()
        .ok_or(CmpError::ParGeneric)?;
    let max_cw_len = ctx.target.max_cw_bits();

    if par.cmp_mode.uses_model() {
        let model = model.ok_or(CmpError::ParNoModel)?;
        if model.len() < values.len() {
            return Err(CmpError::ParBuffers);
        }
        for (i, &data) in values.iter().enumerate() {
            check_fits(data, max_used_bits)?;
            let res = predictor::model_residual(data, model[i]);
            encode_one(w, res, field_par.golomb_par, field_par.spill, max_used_bits, mechanism, max_cw_len)?;
            model[i] = predictor::update_model(model[i], data, par.model_value, par.round);
        }
    } else {
        let mut prev = 0i32;
        for &data in values {
            check_fits(data, max_used_bits)?;
            let res = predictor::diff_residual(data, prev);
            encode_one(w, res, field_par.golomb_par, field_par.spill, max_used_bits, mechanism, max_cw_len)?;
            prev = data;
        }
    }
    Ok(())
}

fn encode_one(
    w: &mut BitWriter,
    res: i32,
    m: u32,
    spill: u32,
    max_used_bits: u32,
    mechanism: OutlierMechanism,
    max_cw_len: u32,
) -> CmpResult<()> {
    field_codec::encode_field(w, res, m, spill, max_used_bits, mechanism, max_cw_len)
}

fn check_fits(data: i32, max_used_bits: u32) -> CmpResult<()> {
    if max_used_bits >= 32 {
        return Ok(());
    }
    let u = predictor::map(data);
    if u >= 1u32 << max_used_bits {
        return Err(CmpError::DataValueTooLarge);
    }
    Ok(())
}

/// Decodes one field's column of `n` samples.
fn decode_field_column(
    r: &mut BitReader,
    field: crate::structs::max_used_bits::Field,
    n: usize,
    model: Option<&mut [i32]>,
    ctx: &WalkContext,
) -> CmpResult<Vec<i32>> {
    let par = ctx.par;
    let max_used_bits = ctx
        .registry
        .lookup(par.max_used_bits_version, field)?
        .into();
    let field_par = par.field(field).ok_or(CmpError::ParSpecific)?;
    let mechanism = par
        .cmp_mode
        .mechanism()
        .ok_or(CmpError::ParGeneric)?;
    let max_cw_len = ctx.target.max_cw_bits();

    let mut out = Vec::with_capacity(n);
    if par.cmp_mode.uses_model() {
        let model = model.ok_or(CmpError::ParNoModel)?;
        if model.len() < n {
            return Err(CmpError::ParBuffers);
        }
        for m_val in model.iter_mut().take(n) {
            let res = field_codec::decode_field(r, field_par.golomb_par, field_par.spill, max_used_bits, mechanism, max_cw_len)?;
            let data = res.wrapping_add(*m_val);
            out.push(data);
            *m_val = predictor::update_model(*m_val, data, par.model_value, par.round);
        }
    } else {
        let mut prev = 0i32;
        for _ in 0..n {
            let res = field_codec::decode_field(r, field_par.golomb_par, field_par.spill, max_used_bits, mechanism, max_cw_len)?;
            let data = res.wrapping_add(prev);
            out.push(data);
            prev = data;
        }
    }
    Ok(out)
}

/// Encodes every field of `data_type`'s schema, in `fields()` order.
///
/// `columns[i]` is the i-th field's samples, aligned with
/// `data_type.fields()[i]`; `models[i]` is its persistent model array (used
/// only in `Model*` modes, otherwise ignored).
pub fn encode_record_set(
    w: &mut BitWriter,
    data_type: CmpDataType,
    columns: &[Vec<i32>],
    mut models: Option<&mut [Vec<i32>]>,
    ctx: &WalkContext,
) -> CmpResult<()> {
    let fields = data_type.fields();
    if columns.len() != fields.len() {
        return Err(CmpError::IntDataTypeUnsupported);
    }

    if ctx.par.cmp_mode.is_raw() {
        for (col, spec) in columns.iter().zip(fields) {
            let bits = spec.width_bytes as u32 * 8;
            for &v in col {
                w.put_bits(v as u32, bits)?;
            }
        }
        return Ok(());
    }

    for (i, spec) in fields.iter().enumerate() {
        let model_col = models.as_mut().and_then(|m| m.get_mut(i)).map(|v| v.as_mut_slice());
        encode_field_column(w, spec.field, &columns[i], model_col, ctx)?;
    }
    Ok(())
}

/// Decodes `n` records of `data_type`, returning one `Vec<i32>` per field in
/// `fields()` order.
pub fn decode_record_set(
    r: &mut BitReader,
    data_type: CmpDataType,
    n: usize,
    mut models: Option<&mut [Vec<i32>]>,
    ctx: &WalkContext,
) -> CmpResult<Vec<Vec<i32>>> {
    let fields = data_type.fields();

    if ctx.par.cmp_mode.is_raw() {
        let mut out = Vec::with_capacity(fields.len());
        for spec in fields {
            let bits = spec.width_bytes as u32 * 8;
            let mut col = Vec::with_capacity(n);
            for _ in 0..n {
                col.push(r.get_bits(bits)? as i32);
            }
            out.push(col);
        }
        return Ok(out);
    }

    let mut out = Vec::with_capacity(fields.len());
    for (i, spec) in fields.iter().enumerate() {
        let model_col = models.as_mut().and_then(|m| m.get_mut(i)).map(|v| v.as_mut_slice());
        out.push(decode_field_column(r, spec.field, n, model_col, ctx)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CmpMode, CmpPar};
    use crate::structs::max_used_bits::{Field, MaxUsedBitsRegistry};

    fn ctx<'a>(par: &'a CmpPar, registry: &'a MaxUsedBitsRegistry) -> WalkContext<'a> {
        WalkContext {
            par,
            registry,
            target: Target::Icu,
        }
    }

    #[test]
    fn imagette_diff_round_trips() {
        let registry = MaxUsedBitsRegistry::new();
        let mut par = CmpPar::new(CmpMode::DiffZero, 0, 0, 1);
        par.set_field(Field::Imagette, 4, 20);

        let samples = vec![10i32, 12, 9, 9, 400];
        let columns = vec![samples.clone()];

        let mut buf = [0u8; 256];
        let mut w = BitWriter::new(&mut buf);
        encode_record_set(&mut w, CmpDataType::Imagette, &columns, None, &ctx(&par, &registry)).unwrap();
        let written_bits = w.bits_written();

        let mut r = BitReader::new(&buf);
        let decoded = decode_record_set(&mut r, CmpDataType::Imagette, samples.len(), None, &ctx(&par, &registry)).unwrap();
        assert_eq!(decoded[0], samples);
        assert_eq!(r.bits_read(), written_bits);
    }

    #[test]
    fn background_model_mode_round_trips() {
        let registry = MaxUsedBitsRegistry::new();
        let mut par = CmpPar::new(CmpMode::ModelZero, 8, 0, 1);
        par.set_field(Field::BackgroundMean, 8, 50);
        par.set_field(Field::BackgroundVariance, 8, 50);
        par.set_field(Field::BackgroundOutlierPixels, 2, 20);

        let mean = vec![100i32, 102, 98, 101];
        let variance = vec![20i32, 19, 21, 20];
        let outliers = vec![0i32, 1, 0, 2];
        let columns = vec![mean.clone(), variance.clone(), outliers.clone()];

        let mut models = vec![vec![0i32; 4], vec![0i32; 4], vec![0i32; 4]];
        let mut buf = [0u8; 512];
        let mut w = BitWriter::new(&mut buf);
        encode_record_set(
            &mut w,
            CmpDataType::Background,
            &columns,
            Some(&mut models),
            &ctx(&par, &registry),
        )
        .unwrap();

        let mut decode_models = vec![vec![0i32; 4], vec![0i32; 4], vec![0i32; 4]];
        let mut r = BitReader::new(&buf);
        let decoded = decode_record_set(
            &mut r,
            CmpDataType::Background,
            4,
            Some(&mut decode_models),
            &ctx(&par, &registry),
        )
        .unwrap();

        assert_eq!(decoded[0], mean);
        assert_eq!(decoded[1], variance);
        assert_eq!(decoded[2], outliers);
        assert_eq!(models, decode_models);
    }

    #[test]
    fn raw_mode_copies_verbatim() {
        let registry = MaxUsedBitsRegistry::new();
        let par = CmpPar::new(CmpMode::Raw, 0, 0, 1);
        // Imagette's raw width is 16 bits; values are the field's unsigned
        // bit pattern, not an arbitrary signed i32 (matching how
        // `chunk::bytes_to_columns` interprets narrow fields).
        let columns = vec![vec![1i32, 2, 1000, 65535]];

        let mut buf = [0u8; 64];
        let mut w = BitWriter::new(&mut buf);
        encode_record_set(&mut w, CmpDataType::Imagette, &columns, None, &ctx(&par, &registry)).unwrap();

        let mut r = BitReader::new(&buf);
        let decoded = decode_record_set(&mut r, CmpDataType::Imagette, 4, None, &ctx(&par, &registry)).unwrap();
        assert_eq!(decoded, columns);
    }

    #[test]
    fn value_exceeding_max_used_bits_is_rejected() {
        let registry = MaxUsedBitsRegistry::new();
        let mut par = CmpPar::new(CmpMode::DiffZero, 0, 0, 1);
        par.set_field(Field::BackgroundOutlierPixels, 2, 10);
        // BackgroundOutlierPixels v1 width is 16 bits, so 1 << 20 overflows it
        let columns = [vec![1i32 << 20]];

        let mut buf = [0u8; 64];
        let mut w = BitWriter::new(&mut buf);
        let err = encode_field_column_test_helper(&mut w, &columns[0], &par, &registry);
        assert_eq!(err.unwrap_err(), CmpError::DataValueTooLarge);
    }

    fn encode_field_column_test_helper(
        w: &mut BitWriter,
        values: &[i32],
        par: &CmpPar,
        registry: &MaxUsedBitsRegistry,
    ) -> CmpResult<()> {
        encode_field_column(w, Field::BackgroundOutlierPixels, values, None, &ctx(par, registry))
    }
}
