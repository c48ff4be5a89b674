// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the remote processing backend (tool slug is appended).
    pub backend_url: String,
    /// Per-request timeout for remote operations, in seconds.
    pub request_timeout_secs: u64,
    /// Width of a freshly placed signature, as a percentage of page width.
    pub default_signature_width_percent: f64,
    /// Smallest width/height an overlay may shrink to, in percent.
    pub min_overlay_percent: f64,
    /// Maximum number of undo snapshots kept per editor.
    pub history_limit: usize,
    /// Freehand signature pad canvas size in pixels.
    pub signature_pad_width: u32,
    pub signature_pad_height: u32,
    /// Freehand pen width in pixels.
    pub pen_width: f32,
    /// Padding around rendered text signatures, in pixels.
    pub text_signature_padding: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8080/api/tools".into(),
            request_timeout_secs: 120,
            default_signature_width_percent: 15.0,
            min_overlay_percent: 3.0,
            history_limit: 100,
            signature_pad_width: 600,
            signature_pad_height: 200,
            pen_width: 3.0,
            text_signature_padding: 20,
        }
    }
}

impl AppConfig {
    /// Read configuration from a JSON file. A missing file yields defaults;
    /// keys absent from the file keep their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Write configuration as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
