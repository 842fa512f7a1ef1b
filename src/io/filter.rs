// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Record selection for data pointers.
//!
//! A [`RecordFilter`] holds the optional selectors a caller asked for; a
//! [`TimeWindow`] holds the inclusive time range. A record is delivered
//! only when it falls inside the window and matches every active
//! selector.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::record::RecordHeader;
use crate::{Channel, DarnError, Result};

/// Inclusive time range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window; `end` must not precede `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(DarnError::invalid_request(
                "end",
                format!("end time {end} is before start time {start}"),
            ));
        }
        Ok(Self { start, end })
    }

    /// Window covering one day from `start`.
    pub fn day_from(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Check if `time` lies inside the window.
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }

    /// Check if `time` lies past the end of the window.
    pub fn is_past(&self, time: DateTime<Utc>) -> bool {
        time > self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Optional record selectors; `None` matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Station id
    pub stid: Option<i32>,
    /// Receiver channel
    pub channel: Option<Channel>,
    /// Beam number
    pub bmnum: Option<i32>,
    /// Control program id
    pub cp: Option<i32>,
}

impl RecordFilter {
    /// Filter that accepts every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn station(mut self, stid: i32) -> Self {
        self.stid = Some(stid);
        self
    }

    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn beam(mut self, bmnum: i32) -> Self {
        self.bmnum = Some(bmnum);
        self
    }

    pub fn control_program(mut self, cp: i32) -> Self {
        self.cp = Some(cp);
        self
    }

    /// Check if a record header passes every active selector.
    pub fn matches(&self, header: &RecordHeader) -> bool {
        self.stid.map_or(true, |v| v == header.stid)
            && self.channel.map_or(true, |v| v == header.channel)
            && self.bmnum.map_or(true, |v| v == header.bmnum)
            && self.cp.map_or(true, |v| v == header.cp)
    }

    /// Check if no selector is active.
    pub fn is_all(&self) -> bool {
        *self == Self::all()
    }
}
