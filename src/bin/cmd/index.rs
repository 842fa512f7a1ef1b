// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Index command - build the time index of the resolved file.

use clap::Args;

use crate::common::{format_duration, format_time, RequestArgs, Result};

/// Build the time index and print its statistics.
#[derive(Args, Clone, Debug)]
pub struct IndexCmd {
    #[command(flatten)]
    request: RequestArgs,

    /// List every scan start with its byte offset
    #[arg(long)]
    scans: bool,
}

impl IndexCmd {
    pub fn run(self) -> Result<()> {
        let mut ptr = self.request.open()?;
        if let Some(path) = ptr.path() {
            println!("=== {} ===", path.display());
        }

        let index = ptr.create_index()?;
        println!("Records: {}", index.len());
        println!("Scans: {}", index.scan_count());
        if let Some((start, end)) = index.span() {
            println!("Start: {}", format_time(start));
            println!("End: {}", format_time(end));
            println!("Duration: {}", format_duration(end - start));
        }

        if self.scans {
            println!();
            println!("Scan starts:");
            for (time, offset) in index.scan_starts() {
                println!("  {} @ {offset}", format_time(*time));
            }
        }
        Ok(())
    }
}
