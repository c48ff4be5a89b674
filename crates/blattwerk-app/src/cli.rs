// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "blattwerk",
    about = "Organise, split, sign and redact PDFs locally; hand other tools to a processing backend",
    version
)]
pub struct Cli {
    /// Configuration file (defaults to $XDG_DATA_HOME/blattwerk/config.json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reorder, rotate, delete and merge pages.
    Organize(OrganizeArgs),

    /// Cut a document into parts or extract a page selection.
    Split(SplitArgs),

    /// Place a signature image or typed signature on a page.
    Sign(SignArgs),

    /// Black out rectangular areas.
    Redact(RedactArgs),

    /// Run a tool on the remote processing backend.
    Remote(RemoteArgs),

    /// Show the configuration in effect, or write the defaults.
    Config {
        /// Write a default configuration file if none exists.
        #[arg(long)]
        init: bool,
    },
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// Input PDFs; several inputs are merged in the order given.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// New page order, e.g. "3,1-2". Pages not listed are dropped.
    #[arg(long)]
    pub order: Option<String>,

    /// Pages to turn a quarter clockwise.
    #[arg(long)]
    pub rotate_cw: Option<String>,

    /// Pages to turn a quarter counter-clockwise.
    #[arg(long)]
    pub rotate_ccw: Option<String>,

    /// Pages to delete.
    #[arg(long)]
    pub delete: Option<String>,

    /// Output file (defaults to `<input>_organized.pdf` or `_merged.pdf`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct SplitMode {
    /// Parts of this many pages each.
    #[arg(long)]
    pub every: Option<u32>,

    /// Cut after these pages, e.g. "2,5".
    #[arg(long)]
    pub cuts: Option<String>,

    /// Write only these pages, e.g. "1-3,5", as one file.
    #[arg(long)]
    pub extract: Option<String>,
}

#[derive(Debug, Args)]
pub struct SplitArgs {
    pub input: PathBuf,

    #[command(flatten)]
    pub mode: SplitMode,

    /// Directory for the parts (defaults to the input's directory).
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct SignatureSource {
    /// PNG or JPEG signature image.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Text to render as the signature (needs --font).
    #[arg(long, requires = "font")]
    pub text: Option<String>,
}

#[derive(Debug, Args)]
pub struct SignArgs {
    pub input: PathBuf,

    #[command(flatten)]
    pub source: SignatureSource,

    /// TTF/OTF font for a typed signature.
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Text colour as #rrggbb.
    #[arg(long, default_value = "#000000")]
    pub color: String,

    /// Text size in pixels.
    #[arg(long, default_value_t = 64.0)]
    pub size: f32,

    /// 1-indexed page to sign.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Centre of the signature as "x,y" percent of the page.
    #[arg(long, default_value = "75,85", value_parser = parse_point)]
    pub at: (f64, f64),

    /// Signature width as percent of the page width.
    #[arg(long)]
    pub width: Option<f64>,

    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RedactArgs {
    pub input: PathBuf,

    /// Area as "page:x,y,width,height" in percent; repeat for more.
    #[arg(long = "area", required = true, value_parser = parse_area)]
    pub areas: Vec<AreaArg>,

    /// Also print the areas as the JSON the remote redaction tool accepts.
    #[arg(long)]
    pub print_areas: bool,

    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RemoteArgs {
    /// Files to upload.
    #[arg(long = "file", required = true)]
    pub files: Vec<PathBuf>,

    /// Directory for the result (defaults to the first file's directory).
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub tool: RemoteTool,
}

#[derive(Debug, Subcommand)]
pub enum RemoteTool {
    /// Shrink a PDF or image.
    Compress {
        #[arg(long, default_value_t = 75)]
        quality: u8,
    },
    /// Set the rotation of each page, e.g. "0,90,0".
    RotatePdf {
        #[arg(long)]
        angles: String,
    },
    /// Cut audio or video between two timestamps in seconds.
    Trim {
        #[arg(long)]
        start: f64,
        #[arg(long)]
        end: f64,
    },
    /// Recognise text.
    Ocr {
        #[arg(long, default_value = "eng")]
        language: String,
    },
    /// Remove content under areas ("page:x,y,width,height", page 1-indexed).
    Redact {
        #[arg(long = "area", required = true, value_parser = parse_area)]
        areas: Vec<AreaArg>,
    },
    /// Any other backend tool.
    Custom {
        tool: String,
        /// Form field as key=value; repeat for more.
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

/// A redaction area given on the command line; `page` is 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaArg {
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

pub fn parse_point(text: &str) -> Result<(f64, f64), String> {
    let numbers = parse_numbers(text)?;
    match numbers.as_slice() {
        [x, y] => Ok((*x, *y)),
        _ => Err(format!("expected \"x,y\", got '{text}'")),
    }
}

pub fn parse_area(text: &str) -> Result<AreaArg, String> {
    let (page, rect) = text
        .split_once(':')
        .ok_or_else(|| format!("expected \"page:x,y,width,height\", got '{text}'"))?;
    let page: usize = page
        .trim()
        .parse()
        .ok()
        .filter(|page| *page >= 1)
        .ok_or_else(|| format!("'{page}' is not a page number"))?;
    match parse_numbers(rect)?.as_slice() {
        [x, y, width, height] if *width > 0.0 && *height > 0.0 => Ok(AreaArg {
            page,
            x: *x,
            y: *y,
            width: *width,
            height: *height,
        }),
        _ => Err(format!("expected four numbers with a positive size, got '{rect}'")),
    }
}

pub fn parse_field(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{text}'")),
    }
}

fn parse_numbers(text: &str) -> Result<Vec<f64>, String> {
    text.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| format!("'{}' is not a number", part.trim()))
        })
        .collect()
}
