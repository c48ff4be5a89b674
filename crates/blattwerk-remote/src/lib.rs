// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk Remote — client for the processing backend that handles the
// tools not run locally (compression, OCR, media trimming, true redaction).
// One multipart POST per operation; no retries.

pub mod client;
pub mod disposition;
pub mod params;

pub use client::{RemoteClient, RemoteFile, RemoteOutput, default_output_name};
pub use disposition::filename_from_disposition;
pub use params::ToolParams;
