// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! In-phase/quadrature samples carried by iqdat records.

use serde::{Deserialize, Serialize};

use super::hydrate::{self, Hydrate, IqBank};
use super::prm::OperatingParams;
use crate::{FieldMap, FieldValue, Result};

/// Samples indexed `[sequence][sample][i/q]`.
pub type SampleSeries = Vec<Vec<[i32; 2]>>;

/// Raw receiver samples for one sounding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IqSamples {
    /// Number of pulse sequences
    pub seqnum: i32,
    /// Number of receiver channels
    pub chnnum: i32,
    /// Samples per pulse sequence
    pub smpnum: i32,
    /// Samples skipped at the start of each sequence
    pub skpnum: i32,
    /// Number of bad transmit samples
    pub btnum: i32,
    /// Sequence start, whole seconds
    pub tsc: Vec<i32>,
    /// Sequence start, microsecond part
    pub tus: Vec<i32>,
    /// Attenuation per sequence
    pub tatten: Vec<i32>,
    /// Noise per sequence
    pub tnoise: Vec<f32>,
    /// Sample offset per sequence
    pub toff: Vec<i32>,
    /// Sample count per sequence
    pub tsze: Vec<i32>,
    /// Bad transmit sample count per sequence
    pub tbadtr: Vec<i32>,
    /// Bad transmit sample positions
    pub badtr: Vec<i32>,
    /// Main array samples
    pub main_data: SampleSeries,
    /// Interferometer array samples (empty for single-array soundings)
    pub int_data: SampleSeries,
}

impl IqSamples {
    /// Whether interferometer samples were recorded.
    pub fn has_interferometer(&self) -> bool {
        !self.int_data.is_empty()
    }
}

impl Hydrate for IqSamples {
    const FIELDS: &'static [&'static str] = &[
        "seqnum",
        "chnnum",
        "smpnum",
        "skpnum",
        "btnum",
        "tsc",
        "tus",
        "tatten",
        "tnoise",
        "toff",
        "tsze",
        "tbadtr",
        "badtr",
        "main_data",
        "int_data",
    ];
    const COMPOSITE: &'static [&'static str] = &["main_data", "int_data"];

    fn assign(&mut self, field: &str, value: &FieldValue) -> Result<()> {
        match field {
            "seqnum" => self.seqnum = hydrate::int(field, value)?,
            "chnnum" => self.chnnum = hydrate::int(field, value)?,
            "smpnum" => self.smpnum = hydrate::int(field, value)?,
            "skpnum" => self.skpnum = hydrate::int(field, value)?,
            "btnum" => self.btnum = hydrate::int(field, value)?,
            "tsc" => self.tsc = hydrate::ints(field, value)?,
            "tus" => self.tus = hydrate::ints(field, value)?,
            "tatten" => self.tatten = hydrate::ints(field, value)?,
            "tnoise" => self.tnoise = hydrate::floats(field, value)?,
            "toff" => self.toff = hydrate::ints(field, value)?,
            "tsze" => self.tsze = hydrate::ints(field, value)?,
            "tbadtr" => self.tbadtr = hydrate::ints(field, value)?,
            "badtr" => self.badtr = hydrate::ints(field, value)?,
            _ => {}
        }
        Ok(())
    }

    fn compose(&mut self, field: &str, flat: &FieldMap, _prm: &OperatingParams) -> Result<()> {
        match field {
            "main_data" => self.main_data = hydrate::iq_samples(flat, IqBank::Main)?,
            "int_data" => self.int_data = hydrate::iq_samples(flat, IqBank::Interferometer)?,
            _ => {}
        }
        Ok(())
    }
}
