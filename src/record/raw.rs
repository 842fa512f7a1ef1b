// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Raw auto/cross-correlation data carried by rawacf records.

use serde::{Deserialize, Serialize};

use super::hydrate::{self, Hydrate};
use super::prm::OperatingParams;
use crate::{FieldMap, FieldValue, Result};

/// Correlation functions indexed `[range gate][lag][re/im]`.
pub type LagSeries = Vec<Vec<[f32; 2]>>;

/// Raw correlation spectrum for one sounding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSpectrum {
    /// Lag-0 power per range gate
    pub pwr0: Vec<f32>,
    /// Auto-correlation function
    pub acfd: LagSeries,
    /// Cross-correlation function (empty when `xcf` is off)
    pub xcfd: LagSeries,
}

impl Hydrate for RawSpectrum {
    const FIELDS: &'static [&'static str] = &["pwr0", "acfd", "xcfd"];
    const COMPOSITE: &'static [&'static str] = &["acfd", "xcfd"];

    fn assign(&mut self, field: &str, value: &FieldValue) -> Result<()> {
        if field == "pwr0" {
            self.pwr0 = hydrate::floats(field, value)?;
        }
        Ok(())
    }

    fn compose(&mut self, field: &str, flat: &FieldMap, prm: &OperatingParams) -> Result<()> {
        let series = hydrate::correlation(flat, field, prm)?;
        match field {
            "acfd" => self.acfd = series,
            "xcfd" => self.xcfd = series,
            _ => {}
        }
        Ok(())
    }
}
