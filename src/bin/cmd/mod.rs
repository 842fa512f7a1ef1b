// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI subcommands.

mod index;
mod info;
mod read;
mod resolve;
mod scan;

pub use index::IndexCmd;
pub use info::InfoCmd;
pub use read::ReadCmd;
pub use resolve::ResolveCmd;
pub use scan::ScanCmd;
