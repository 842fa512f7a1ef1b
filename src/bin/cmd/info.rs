// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Info command - summarize one record file.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;

use darnio::io::{detect_compression, detect_data_kind};
use darnio::source::{ArchiveName, StagedName};
use darnio::{DataPointer, FileType, RecordFilter, TimeWindow};

use crate::common::{format_duration, format_time, Result};

/// Summarize a record file.
#[derive(Args, Clone, Debug)]
pub struct InfoCmd {
    /// Uncompressed record file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Subtype, when the file name does not tell
    #[arg(long)]
    file_type: Option<FileType>,
}

impl InfoCmd {
    pub fn run(self) -> Result<()> {
        let compression = detect_compression(&self.input)?;
        if compression.extension().is_some() {
            return Err(anyhow::anyhow!(
                "{} is {compression:?} compressed, decompress it first",
                self.input.display()
            ));
        }
        let kind = detect_data_kind(&self.input)?
            .ok_or_else(|| anyhow::anyhow!("{} is not a DMAP file", self.input.display()))?;
        let file_type = self.file_type.or_else(|| name_file_type(&self.input)).unwrap_or(FileType::FitEx);

        let window = TimeWindow::new(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)?;
        let mut ptr = DataPointer::open(&self.input, file_type, window, RecordFilter::all())?;

        let mut records = 0usize;
        let mut stations = BTreeSet::new();
        let mut channels = BTreeSet::new();
        let mut beams = BTreeSet::new();
        let mut programs = BTreeSet::new();
        for record in &mut ptr {
            let record = record?;
            records += 1;
            stations.insert(record.stid);
            channels.insert(record.channel.as_char());
            beams.insert(record.bmnum);
            programs.insert(record.cp);
        }

        ptr.rewind()?;
        let index = ptr.create_index()?;

        println!("=== {} ===", self.input.display());
        println!("Format: {}", kind.as_str());
        println!("Type: {file_type}");
        println!("Records: {records}");
        println!("Scans: {}", index.scan_count());
        if let Some((start, end)) = index.span() {
            println!("Start: {}", format_time(start));
            println!("End: {}", format_time(end));
            println!("Duration: {}", format_duration(end - start));
        }
        println!("Stations: {}", join(&stations));
        println!("Channels: {}", join(&channels));
        println!("Beams: {}", join(&beams));
        println!("Control programs: {}", join(&programs));
        Ok(())
    }
}

fn name_file_type(path: &std::path::Path) -> Option<FileType> {
    let name = path.file_name()?.to_str()?;
    ArchiveName::parse(name)
        .map(|n| n.file_type)
        .or_else(|| StagedName::parse(name).map(|n| n.file_type))
}

fn join<T: ToString>(set: &BTreeSet<T>) -> String {
    set.iter().map(T::to_string).collect::<Vec<_>>().join(", ")
}
