// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Radar operating parameters.

use serde::{Deserialize, Serialize};

use super::hydrate::{self, Hydrate};
use crate::{FieldValue, Result};

/// Scalar instrument settings for one sounding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingParams {
    /// Number of averages
    pub nave: i32,
    /// Lag to first range (us)
    pub lagfr: i32,
    /// Sample separation (us)
    pub smsep: i32,
    /// Beam azimuth (degrees)
    pub bmazm: f32,
    /// New-scan flag
    pub scan: i32,
    /// Receiver rise time (us)
    pub rxrise: i32,
    /// Integration time, whole seconds
    pub inttsc: i32,
    /// Integration time, microsecond part
    pub inttus: i32,
    /// Multi-pulse increment (us)
    pub mpinc: i32,
    /// Number of pulses
    pub mppul: i32,
    /// Number of lags
    pub mplgs: i32,
    /// Number of lags (extended sequence)
    pub mplgexs: i32,
    /// Number of range gates
    pub nrang: i32,
    /// Distance to first range gate (km)
    pub frang: i32,
    /// Range gate separation (km)
    pub rsep: i32,
    /// Cross-correlation flag
    pub xcf: i32,
    /// Transmit frequency (kHz)
    pub tfreq: i32,
    /// Transmit pulse length (us)
    pub txpl: i32,
    /// IF mode flag
    pub ifmode: i32,
    /// Pulse table
    pub ptab: Vec<i32>,
    /// Lag table, one pulse pair per lag
    pub ltab: Vec<Vec<i32>>,
    /// Mean noise level
    pub noisemean: f32,
    /// Sky noise level
    pub noisesky: f32,
    /// Frequency search noise level
    pub noisesearch: f32,
}

impl OperatingParams {
    /// Whether this sounding opens a new scan.
    pub fn is_scan_start(&self) -> bool {
        self.scan == 1
    }

    /// Integration time in seconds.
    pub fn integration_secs(&self) -> f64 {
        self.inttsc as f64 + self.inttus as f64 / 1e6
    }
}

impl Hydrate for OperatingParams {
    const FIELDS: &'static [&'static str] = &[
        "nave",
        "lagfr",
        "smsep",
        "bmazm",
        "scan",
        "rxrise",
        "inttsc",
        "inttus",
        "mpinc",
        "mppul",
        "mplgs",
        "mplgexs",
        "nrang",
        "frang",
        "rsep",
        "xcf",
        "tfreq",
        "txpl",
        "ifmode",
        "ptab",
        "ltab",
        "noisemean",
        "noisesky",
        "noisesearch",
    ];

    fn assign(&mut self, field: &str, value: &FieldValue) -> Result<()> {
        match field {
            "nave" => self.nave = hydrate::int(field, value)?,
            "lagfr" => self.lagfr = hydrate::int(field, value)?,
            "smsep" => self.smsep = hydrate::int(field, value)?,
            "bmazm" => self.bmazm = hydrate::float(field, value)?,
            "scan" => self.scan = hydrate::int(field, value)?,
            "rxrise" => self.rxrise = hydrate::int(field, value)?,
            "inttsc" => self.inttsc = hydrate::int(field, value)?,
            "inttus" => self.inttus = hydrate::int(field, value)?,
            "mpinc" => self.mpinc = hydrate::int(field, value)?,
            "mppul" => self.mppul = hydrate::int(field, value)?,
            "mplgs" => self.mplgs = hydrate::int(field, value)?,
            "mplgexs" => self.mplgexs = hydrate::int(field, value)?,
            "nrang" => self.nrang = hydrate::int(field, value)?,
            "frang" => self.frang = hydrate::int(field, value)?,
            "rsep" => self.rsep = hydrate::int(field, value)?,
            "xcf" => self.xcf = hydrate::int(field, value)?,
            "tfreq" => self.tfreq = hydrate::int(field, value)?,
            "txpl" => self.txpl = hydrate::int(field, value)?,
            "ifmode" => self.ifmode = hydrate::int(field, value)?,
            "ptab" => self.ptab = hydrate::ints(field, value)?,
            "ltab" => self.ltab = hydrate::int_table(field, value)?,
            "noisemean" => self.noisemean = hydrate::float(field, value)?,
            "noisesky" => self.noisesky = hydrate::float(field, value)?,
            "noisesearch" => self.noisesearch = hydrate::float(field, value)?,
            _ => {}
        }
        Ok(())
    }
}
