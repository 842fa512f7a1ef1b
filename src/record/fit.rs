// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Fitted parameters carried by fitacf, fitex and lmfit records.

use serde::{Deserialize, Serialize};

use super::hydrate::{self, Hydrate};
use crate::{FieldValue, Result};

/// Per-range-gate fitted parameters.
///
/// `pwr0` spans every range gate; the remaining arrays are indexed in
/// parallel with `slist`, the list of gates that returned scatter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FittedParams {
    /// Lag-0 power for every range gate
    pub pwr0: Vec<f32>,
    /// Range gates with scatter
    pub slist: Vec<i32>,
    /// Number of range gates with scatter
    pub npnts: i32,
    /// Number of good lags
    pub nlag: Vec<i32>,
    /// Quality flag
    pub qflg: Vec<i32>,
    /// Ground scatter flag
    pub gflg: Vec<i32>,
    /// Lambda power
    pub p_l: Vec<f32>,
    /// Lambda power error
    pub p_l_e: Vec<f32>,
    /// Sigma power
    pub p_s: Vec<f32>,
    /// Sigma power error
    pub p_s_e: Vec<f32>,
    /// Line-of-sight velocity
    pub v: Vec<f32>,
    /// Velocity error
    pub v_e: Vec<f32>,
    /// Lambda spectral width
    pub w_l: Vec<f32>,
    /// Lambda spectral width error
    pub w_l_e: Vec<f32>,
    /// Sigma spectral width
    pub w_s: Vec<f32>,
    /// Sigma spectral width error
    pub w_s_e: Vec<f32>,
    /// Phase at lag 0
    pub phi0: Vec<f32>,
    /// Phase at lag 0 error
    pub phi0_e: Vec<f32>,
    /// Elevation angle
    pub elv: Vec<f32>,
}

impl FittedParams {
    /// Iterate `(gate, velocity)` pairs for gates with scatter.
    pub fn velocities(&self) -> impl Iterator<Item = (i32, f32)> + '_ {
        self.slist.iter().copied().zip(self.v.iter().copied())
    }

    /// Whether the gate at position `i` in `slist` is flagged ground scatter.
    pub fn is_ground_scatter(&self, i: usize) -> bool {
        self.gflg.get(i).is_some_and(|g| *g != 0)
    }
}

impl Hydrate for FittedParams {
    const FIELDS: &'static [&'static str] = &[
        "pwr0", "slist", "npnts", "nlag", "qflg", "gflg", "p_l", "p_l_e", "p_s", "p_s_e", "v",
        "v_e", "w_l", "w_l_e", "w_s", "w_s_e", "phi0", "phi0_e", "elv",
    ];

    fn assign(&mut self, field: &str, value: &FieldValue) -> Result<()> {
        match field {
            "pwr0" => self.pwr0 = hydrate::floats(field, value)?,
            "slist" => self.slist = hydrate::ints(field, value)?,
            "npnts" => self.npnts = hydrate::int(field, value)?,
            "nlag" => self.nlag = hydrate::ints(field, value)?,
            "qflg" => self.qflg = hydrate::ints(field, value)?,
            "gflg" => self.gflg = hydrate::ints(field, value)?,
            "p_l" => self.p_l = hydrate::floats(field, value)?,
            "p_l_e" => self.p_l_e = hydrate::floats(field, value)?,
            "p_s" => self.p_s = hydrate::floats(field, value)?,
            "p_s_e" => self.p_s_e = hydrate::floats(field, value)?,
            "v" => self.v = hydrate::floats(field, value)?,
            "v_e" => self.v_e = hydrate::floats(field, value)?,
            "w_l" => self.w_l = hydrate::floats(field, value)?,
            "w_l_e" => self.w_l_e = hydrate::floats(field, value)?,
            "w_s" => self.w_s = hydrate::floats(field, value)?,
            "w_s_e" => self.w_s_e = hydrate::floats(field, value)?,
            "phi0" => self.phi0 = hydrate::floats(field, value)?,
            "phi0_e" => self.phi0_e = hydrate::floats(field, value)?,
            "elv" => self.elv = hydrate::floats(field, value)?,
            _ => {}
        }
        Ok(())
    }

    fn finish(&mut self) {
        // fit files do not store npnts; it follows slist
        if self.npnts == 0 {
            self.npnts = self.slist.len() as i32;
        }
    }
}
