// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Read command - print records in the requested window.

use clap::Args;

use darnio::{BeamRecord, Payload};

use crate::common::{format_time, RequestArgs, Result};

/// Print records in the requested window.
#[derive(Args, Clone, Debug)]
pub struct ReadCmd {
    #[command(flatten)]
    request: RequestArgs,

    /// Print one JSON document per record
    #[arg(long)]
    json: bool,

    /// Stop after this many records
    #[arg(short = 'n', long)]
    limit: Option<usize>,
}

impl ReadCmd {
    pub fn run(self) -> Result<()> {
        let mut ptr = self.request.open()?;
        let limit = self.limit.unwrap_or(usize::MAX);

        let mut count = 0;
        while count < limit {
            let Some(record) = ptr.read_record()? else {
                break;
            };
            if self.json {
                println!("{}", serde_json::to_string(&record)?);
            } else {
                println!("{}", summary_line(&record));
            }
            count += 1;
        }

        if !self.json {
            println!("{count} records");
        }
        Ok(())
    }
}

fn summary_line(record: &BeamRecord) -> String {
    let detail = match &record.payload {
        Payload::Fit(fit) => format!("{} fitted gates", fit.npnts),
        Payload::Raw(raw) => format!("{} range gates", raw.acfd.len()),
        Payload::Iq(iq) => format!("{} sequences", iq.seqnum),
        Payload::None => "no subtype data".to_string(),
    };
    format!(
        "{} stid={} chan={} beam={:>2} cp={} tfreq={} {}",
        format_time(record.time),
        record.stid,
        record.channel,
        record.bmnum,
        record.cp,
        record.prm.tfreq,
        detail
    )
}
