//! Configuration surface and validation engine (component H): `CmpMode`,
//! `CmpPar`, `RdcuConfig`, and the range/combination/buffer-overlap checks
//! every encode/decode call is gated behind.

use log::debug;

use crate::error::{CmpError, CmpResult};
use crate::structs::field_codec::{max_spill, OutlierMechanism, RDCU_MAX_SPILL_TABLE};
use crate::structs::max_used_bits::{field_index, Field, FIELD_COUNT};

/// Compression mode. `Raw` copies data verbatim; `Diff*`/`Model*` select the
/// predictor, and `Zero`/`Multi` select the outlier mechanism; `Stuff` is an
/// ICU-only dry-run mode used to measure the bits a configuration would need
/// without producing real output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpMode {
    Raw,
    DiffZero,
    DiffMulti,
    ModelZero,
    ModelMulti,
    Stuff,
}

impl CmpMode {
    pub fn uses_model(self) -> bool {
        matches!(self, CmpMode::ModelZero | CmpMode::ModelMulti)
    }

    pub fn is_raw(self) -> bool {
        self == CmpMode::Raw
    }

    pub fn is_stuff(self) -> bool {
        self == CmpMode::Stuff
    }

    /// The outlier mechanism this mode uses, or `None` for `Raw`/`Stuff`
    /// (which bypass the Golomb codec entirely).
    pub fn mechanism(self) -> Option<OutlierMechanism> {
        match self {
            CmpMode::DiffZero | CmpMode::ModelZero => Some(OutlierMechanism::ZeroEscape),
            CmpMode::DiffMulti | CmpMode::ModelMulti => Some(OutlierMechanism::MultiEscape),
            CmpMode::Raw | CmpMode::Stuff => None,
        }
    }

    fn supported_by(self, target: Target) -> bool {
        match target {
            Target::Icu => true, // ICU accepts all six modes
            Target::Rdcu => self != CmpMode::Stuff,
        }
    }
}

/// Which codec target a configuration is being validated for - the ICU
/// (software, in scope) or the RDCU (hardware, validation-surface only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Icu,
    Rdcu,
}

impl Target {
    pub fn max_cw_bits(self) -> u32 {
        match self {
            Target::Icu => crate::consts::ICU_MAX_CW_BITS,
            Target::Rdcu => crate::consts::RDCU_MAX_CW_BITS,
        }
    }

    pub fn max_golomb_par(self) -> u32 {
        match self {
            Target::Icu => crate::consts::ICU_MAX_GOLOMB_PAR,
            Target::Rdcu => crate::consts::RDCU_MAX_GOLOMB_PAR,
        }
    }

    pub fn max_round(self) -> u8 {
        match self {
            Target::Icu => 3,
            Target::Rdcu => 2,
        }
    }
}

/// One field's `(golomb_par, spill)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPar {
    pub golomb_par: u32,
    pub spill: u32,
}

/// The software-codec (ICU) compression parameters for one chunk: a global
/// mode/model/rounding configuration plus a `(golomb_par, spill)` pair for
/// each of the 15 recognized fields (only the fields the chosen data type
/// actually carries need to be set).
#[derive(Debug, Clone)]
pub struct CmpPar {
    pub cmp_mode: CmpMode,
    pub model_value: u8,
    pub round: u8,
    pub max_used_bits_version: u8,
    pars: [Option<FieldPar>; FIELD_COUNT],
}

impl CmpPar {
    pub fn new(cmp_mode: CmpMode, model_value: u8, round: u8, max_used_bits_version: u8) -> Self {
        CmpPar {
            cmp_mode,
            model_value,
            round,
            max_used_bits_version,
            pars: [None; FIELD_COUNT],
        }
    }

    pub fn set_field(&mut self, field: Field, golomb_par: u32, spill: u32) {
        self.pars[field_index(field)] = Some(FieldPar { golomb_par, spill });
    }

    pub fn field(&self, field: Field) -> Option<FieldPar> {
        self.pars[field_index(field)]
    }

    /// Validates the generic (mode/model/round) part of this configuration
    /// against `target`.
    pub fn validate_generic(&self, target: Target) -> CmpResult<()> {
        if !self.cmp_mode.supported_by(target) {
            debug!("cmp_mode {:?} unsupported for {:?}", self.cmp_mode, target);
            return Err(CmpError::ParGeneric);
        }
        if self.model_value > 16 {
            debug!("model_value {} > 16", self.model_value);
            return Err(CmpError::ParGeneric);
        }
        if self.round > target.max_round() {
            debug!(
                "round {} > max {} for {:?}",
                self.round,
                target.max_round(),
                target
            );
            return Err(CmpError::ParGeneric);
        }
        Ok(())
    }

    /// Validates the `(golomb_par, spill)` pair registered for `field`
    /// against `target`, given the field's current `max_used_bits`.
    pub fn validate_field(
        &self,
        field: Field,
        max_used_bits: u8,
        target: Target,
    ) -> CmpResult<()> {
        let par = self.field(field).ok_or_else(|| {
            debug!("missing field pair for {field:?}");
            CmpError::ParSpecific
        })?;

        if par.golomb_par < 1 || par.golomb_par > target.max_golomb_par() {
            debug!("golomb_par {} out of range for {:?}", par.golomb_par, target);
            return Err(CmpError::ParSpecific);
        }

        let max = match target {
            Target::Icu => max_spill(par.golomb_par, max_used_bits as u32, target.max_cw_bits()),
            Target::Rdcu => {
                if par.golomb_par > 63 {
                    return Err(CmpError::ParSpecific);
                }
                RDCU_MAX_SPILL_TABLE[par.golomb_par as usize]
            }
        };

        if par.spill < 2 || par.spill > max {
            debug!("spill {} out of range [2, {max}] for {field:?}", par.spill);
            return Err(CmpError::ParSpecific);
        }

        Ok(())
    }
}

/// Configuration for the external hardware compressor (RDCU). Only its
/// validation surface is in scope - the register-mirror/SpaceWire control
/// path that actually drives the hardware is an external collaborator.
#[derive(Debug, Clone, Copy)]
pub struct RdcuConfig {
    pub cmp_mode: CmpMode,
    pub golomb_par: u32,
    pub spill: u32,
    pub model_value: u8,
    pub round: u8,
    pub ap1_golomb_par: u32,
    pub ap1_spill: u32,
    pub ap2_golomb_par: u32,
    pub ap2_spill: u32,
    pub data_addr: u32,
    pub model_addr: u32,
    pub new_model_addr: u32,
    pub buffer_addr: u32,
    pub samples: u32,
    pub buffer_length: u32,
}

/// Base address of the RDCU's 4 MiB SRAM window.
pub const RDCU_SRAM_BASE: u32 = 0x0000_0000;
/// Size in bytes of the RDCU's SRAM window.
pub const RDCU_SRAM_SIZE: u32 = 4 * 1024 * 1024;

impl RdcuConfig {
    fn in_sram(addr: u32, len_bytes: u32) -> bool {
        let Some(end) = addr.checked_add(len_bytes) else {
            return false;
        };
        end <= RDCU_SRAM_BASE + RDCU_SRAM_SIZE
    }

    fn aligned(addr: u32) -> bool {
        addr % 4 == 0
    }

    /// Validates the generic mode/model/round fields plus the primary
    /// `(golomb_par, spill)` pair (and, for adaptive imagette use, the two
    /// alternates).
    pub fn validate_generic(&self) -> CmpResult<()> {
        if !self.cmp_mode.supported_by(Target::Rdcu) {
            return Err(CmpError::ParGeneric);
        }
        if self.model_value > 16 {
            return Err(CmpError::ParGeneric);
        }
        if self.round > Target::Rdcu.max_round() {
            return Err(CmpError::ParGeneric);
        }
        for (gp, sp) in [
            (self.golomb_par, self.spill),
            (self.ap1_golomb_par, self.ap1_spill),
            (self.ap2_golomb_par, self.ap2_spill),
        ] {
            if gp == 0 {
                continue; // alternate pairs are optional
            }
            if gp > 63 {
                return Err(CmpError::ParSpecific);
            }
            let max = RDCU_MAX_SPILL_TABLE[gp as usize];
            if sp < 2 || sp > max {
                return Err(CmpError::ParSpecific);
            }
        }
        Ok(())
    }

    /// Validates buffer placement: 4-byte alignment, residence within the
    /// SRAM window, and pairwise non-overlap of data/model/new-model/buffer.
    pub fn validate_buffers(&self) -> CmpResult<()> {
        let sample_bytes = self.samples.saturating_mul(2); // RDCU samples are 16-bit imagette words

        let regions: &[(u32, u32, bool)] = &[
            (self.data_addr, sample_bytes, true),
            (
                self.model_addr,
                sample_bytes,
                self.cmp_mode.uses_model(),
            ),
            (
                self.new_model_addr,
                sample_bytes,
                self.cmp_mode.uses_model(),
            ),
            (self.buffer_addr, self.buffer_length, !self.cmp_mode.is_stuff()),
        ];

        if self.cmp_mode.uses_model() && self.model_addr == 0 && self.samples > 0 {
            debug!("model mode requires a model buffer");
            return Err(CmpError::ParNoModel);
        }

        let mut active = Vec::new();
        for &(addr, len, required) in regions {
            if !required {
                continue;
            }
            if len == 0 {
                return Err(CmpError::ParBuffers);
            }
            if !Self::aligned(addr) || !Self::in_sram(addr, len) {
                debug!("buffer at {addr:#x} len {len} fails alignment/SRAM check");
                return Err(CmpError::ParBuffers);
            }
            active.push((addr, len));
        }

        for i in 0..active.len() {
            for j in i + 1..active.len() {
                let (a0, a1) = active[i];
                let (b0, b1) = active[j];
                let overlap = a0 < b0 + b1 && b0 < a0 + a1;
                if overlap {
                    debug!("buffers {active:?} overlap");
                    return Err(CmpError::ParBuffers);
                }
            }
        }

        if self.buffer_length < sample_bytes && !self.cmp_mode.is_stuff() {
            return Err(CmpError::SmallBuf);
        }

        Ok(())
    }
}

/// Caller-supplied slice validation for the ICU path (component H's "buffer
/// requirements" clause, expressed over Rust slices rather than raw
/// pointers): non-null/non-empty-when-required, non-overlapping, and - for
/// raw mode - destination capacity at least as large as the input.
pub fn validate_icu_buffers(
    input: &[u8],
    output_capacity: usize,
    model: Option<&[i32]>,
    mode: CmpMode,
    samples: usize,
) -> CmpResult<()> {
    if samples != 0 && output_capacity == 0 && !mode.is_stuff() {
        return Err(CmpError::ParBuffers);
    }
    if mode.uses_model() && model.is_none() {
        return Err(CmpError::ParNoModel);
    }
    if let Some(m) = model {
        if m.len() < samples {
            return Err(CmpError::ParBuffers);
        }
    }
    if mode.is_raw() && output_capacity < input.len() {
        return Err(CmpError::SmallBuf);
    }
    Ok(())
}
