// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Scan command - one summary line per scan.

use clap::Args;

use crate::common::{format_duration, format_time, RequestArgs, Result};

/// Print one summary line per scan.
#[derive(Args, Clone, Debug)]
pub struct ScanCmd {
    #[command(flatten)]
    request: RequestArgs,

    /// List the beam numbers of each scan
    #[arg(long)]
    beams: bool,
}

impl ScanCmd {
    pub fn run(self) -> Result<()> {
        let mut ptr = self.request.open()?;

        let mut scans = 0;
        loop {
            let scan = ptr.read_scan()?;
            let (Some(start), Some(end)) = (scan.start_time(), scan.end_time()) else {
                break;
            };
            scans += 1;
            println!(
                "[{scans:>4}] {} | {} beams | {}",
                format_time(start),
                scan.len(),
                format_duration(end - start)
            );
            if self.beams {
                let beams: Vec<String> = scan.iter().map(|b| b.bmnum.to_string()).collect();
                println!("       beams: {}", beams.join(" "));
            }
        }

        println!("{scans} scans");
        Ok(())
    }
}
