// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::PathBuf;

const CONFIG_FILE: &str = "config.json";

/// Default location of the configuration file.
pub fn config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

/// The application data directory. Not created here; writers create it.
pub fn data_dir() -> PathBuf {
    resolve(
        std::env::var("XDG_DATA_HOME").ok(),
        std::env::var("HOME").ok(),
    )
}

fn resolve(xdg_data_home: Option<String>, home: Option<String>) -> PathBuf {
    let base = match (xdg_data_home, home) {
        (Some(xdg), _) if !xdg.is_empty() => PathBuf::from(xdg),
        (_, Some(home)) if !home.is_empty() => PathBuf::from(home).join(".local").join("share"),
        // Last resort
        _ => std::env::temp_dir(),
    };
    base.join("blattwerk")
}
