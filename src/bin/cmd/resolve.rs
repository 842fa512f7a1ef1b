// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Resolve command - locate and stage data for a request.

use clap::Args;

use crate::common::{RequestArgs, Result};

/// Locate and stage data, print the staged file.
#[derive(Args, Clone, Debug)]
pub struct ResolveCmd {
    #[command(flatten)]
    request: RequestArgs,

    /// Print the resolution as JSON
    #[arg(long)]
    json: bool,
}

impl ResolveCmd {
    pub fn run(self) -> Result<()> {
        let request = self.request.request()?;
        let resolver = self.request.resolver()?;

        let Some(resolution) = resolver.resolve(&request)? else {
            return Err(anyhow::anyhow!("No data found for {}", request.window()));
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        } else {
            println!("{}", resolution.path.display());
            println!("  type:     {}", resolution.file_type);
            println!("  origin:   {}", resolution.origin);
            println!("  filtered: {}", resolution.filtered);
        }
        Ok(())
    }
}
