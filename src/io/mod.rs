// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer over staged record files.
//!
//! This module provides the pointer that streams records out of a staged
//! file, the time index built over it, and the selectors and detection
//! helpers both rely on.

pub mod detection;
pub use detection::{detect_compression, detect_data_kind, is_compressed, Compression};

// Record selection
pub mod filter;
pub use filter::{RecordFilter, TimeWindow};

// Time index
pub mod index;
pub use index::RecordIndex;

// Pointer over one staged file
pub mod pointer;
pub use pointer::DataPointer;
