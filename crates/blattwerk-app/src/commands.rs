// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations. Each one reads its inputs, drives an
// EditSession (or the remote client) and writes the results; nothing is
// written until the whole operation has succeeded.

use std::path::{Path, PathBuf};

use blattwerk_core::error::Result;
use blattwerk_core::{AppConfig, BlattwerkError, OutputKind, PageId, RotationDirection, output_file_name};
use blattwerk_document::signature::parse_hex_color;
use blattwerk_document::{
    DocumentAssembler, EditSession, ExportedFile, PageLedger, PercentPoint, SignatureMode,
    SplitPlan, TextSignatureStyle, parse_page_ranges,
};
use blattwerk_remote::{RemoteClient, RemoteFile, ToolParams};
use tracing::{info, instrument, warn};

use crate::cli::{AreaArg, OrganizeArgs, RedactArgs, RemoteArgs, RemoteTool, SignArgs, SplitArgs};

// -- Organize -----------------------------------------------------------------

#[instrument(skip_all, fields(inputs = args.inputs.len()))]
pub async fn organize(config: &AppConfig, args: OrganizeArgs) -> Result<Vec<PathBuf>> {
    let mut session = open_session(config, &args.inputs)?;

    // Every selection refers to the combined input numbering.
    let page_count = session.ledger().len() as u32;
    let ids_for = |ranges: &Option<String>, ledger: &PageLedger| -> Result<Vec<PageId>> {
        let Some(ranges) = ranges else {
            return Ok(Vec::new());
        };
        Ok(parse_page_ranges(ranges, page_count)?
            .into_iter()
            .map(|number| ledger.pages()[number as usize - 1].id)
            .collect())
    };
    let clockwise = ids_for(&args.rotate_cw, session.ledger())?;
    let counter_clockwise = ids_for(&args.rotate_ccw, session.ledger())?;
    let deleted = ids_for(&args.delete, session.ledger())?;
    let order = ids_for(&args.order, session.ledger())?;

    session.with_ledger(|ledger| {
        ledger.rotate(&clockwise, RotationDirection::Clockwise);
        ledger.rotate(&counter_clockwise, RotationDirection::CounterClockwise);
        ledger.delete(&deleted);
        if !order.is_empty() {
            let dropped: Vec<PageId> = ledger
                .pages()
                .iter()
                .map(|page| page.id)
                .filter(|id| !order.contains(id))
                .collect();
            ledger.delete(&dropped);
            let kept: Vec<PageId> = order
                .iter()
                .copied()
                .filter(|id| ledger.get(*id).is_some())
                .collect();
            for (position, id) in kept.into_iter().enumerate() {
                ledger.reorder(id, position + 1);
            }
        }
    });

    let exported = session.export_async().await?;
    let target = args
        .output
        .unwrap_or_else(|| beside(&args.inputs[0], &exported.file_name));
    let written = write_output(&target, &exported)?;
    session.close();
    Ok(vec![written])
}

// -- Split --------------------------------------------------------------------

#[instrument(skip_all, fields(input = %args.input.display()))]
pub fn split(config: &AppConfig, args: SplitArgs) -> Result<Vec<PathBuf>> {
    let session = open_session(config, std::slice::from_ref(&args.input))?;
    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| parent_dir(&args.input));
    let page_count = session.ledger().len() as u32;

    let files = if let Some(ranges) = &args.mode.extract {
        let pages = parse_page_ranges(ranges, page_count)?;
        let source = &session.sources()[0];
        let assembled = DocumentAssembler::new().extract(source, &pages)?;
        vec![ExportedFile {
            file_name: output_file_name(source.name(), OutputKind::Organized),
            bytes: assembled.bytes,
            report: assembled.report,
        }]
    } else {
        let plan = match (&args.mode.every, &args.mode.cuts) {
            (Some(every), _) => SplitPlan::every(page_count, *every)?,
            (None, Some(cuts)) => plan_from_cuts(page_count, cuts)?,
            (None, None) => {
                return Err(BlattwerkError::validation(
                    "Choose --every, --cuts or --extract.",
                ));
            }
        };
        session.export_split(&plan)?
    };

    let written = files
        .iter()
        .map(|file| write_output(&out_dir.join(&file.file_name), file))
        .collect::<Result<Vec<_>>>()?;
    session.close();
    Ok(written)
}

fn plan_from_cuts(page_count: u32, cuts: &str) -> Result<SplitPlan> {
    let mut plan = SplitPlan::new(page_count);
    for part in cuts.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let added = part
            .parse::<u32>()
            .ok()
            .is_some_and(|after_page| plan.add_cut(after_page));
        if !added {
            return Err(BlattwerkError::validation(format!(
                "'{part}' is not a cut point between pages 1 and {page_count}"
            )));
        }
    }
    if plan.part_count() < 2 {
        return Err(BlattwerkError::validation("Give at least one cut point."));
    }
    Ok(plan)
}

// -- Sign ---------------------------------------------------------------------

#[instrument(skip_all, fields(input = %args.input.display(), page = args.page))]
pub async fn sign(config: &AppConfig, args: SignArgs) -> Result<Vec<PathBuf>> {
    let mut config = config.clone();
    if let Some(width) = args.width {
        config.default_signature_width_percent = width;
    }
    let mut session = open_session(&config, std::slice::from_ref(&args.input))?;

    match (&args.source.image, &args.source.text) {
        (Some(image), _) => {
            let bytes = read_file(image)?;
            let flow = session.signature_mut();
            flow.configure(SignatureMode::Upload);
            flow.use_upload(bytes)?;
        }
        (None, Some(text)) => {
            let font_path = args
                .font
                .as_ref()
                .ok_or_else(|| BlattwerkError::validation("A typed signature needs --font."))?;
            let font = read_file(font_path)?;
            let style = TextSignatureStyle {
                size_px: args.size,
                color: parse_hex_color(&args.color)?,
                padding: config.text_signature_padding,
            };
            let flow = session.signature_mut();
            flow.configure(SignatureMode::Text);
            flow.use_text(text, &font, &style)?;
        }
        (None, None) => {
            return Err(BlattwerkError::validation("Choose --image or --text."));
        }
    }

    let page_index = args.page.saturating_sub(1);
    let (x, y) = args.at;
    session.place_signature(page_index, PercentPoint::new(x, y), None)?;

    let exported = session.export_async().await?;
    let target = args
        .output
        .unwrap_or_else(|| beside(&args.input, &exported.file_name));
    let written = write_output(&target, &exported)?;
    session.close();
    Ok(vec![written])
}

// -- Redact -------------------------------------------------------------------

#[instrument(skip_all, fields(input = %args.input.display(), areas = args.areas.len()))]
pub async fn redact(config: &AppConfig, args: RedactArgs) -> Result<Vec<PathBuf>> {
    let mut session = open_session(config, std::slice::from_ref(&args.input))?;
    for area in &args.areas {
        let (start, end) = corners(area);
        session.mark_redaction(area.page - 1, start, end)?;
    }
    if args.print_areas {
        println!("{}", serde_json::to_string_pretty(&session.redaction_areas())?);
    }

    let exported = session.export_async().await?;
    let target = args
        .output
        .unwrap_or_else(|| beside(&args.input, &exported.file_name));
    let written = write_output(&target, &exported)?;
    session.close();
    Ok(vec![written])
}

fn corners(area: &AreaArg) -> (PercentPoint, PercentPoint) {
    (
        PercentPoint::new(area.x, area.y),
        PercentPoint::new(area.x + area.width, area.y + area.height),
    )
}

// -- Remote -------------------------------------------------------------------

#[instrument(skip_all, fields(files = args.files.len()))]
pub async fn remote(config: &AppConfig, args: RemoteArgs) -> Result<Vec<PathBuf>> {
    let params = tool_params(args.tool)?;
    let files = args
        .files
        .iter()
        .map(|path| Ok(RemoteFile::new(file_name(path), read_file(path)?)))
        .collect::<Result<Vec<_>>>()?;

    let client = RemoteClient::from_config(config)?;
    let output = client.run(&files, &params).await?;

    let out_dir = args
        .out_dir
        .unwrap_or_else(|| parent_dir(&args.files[0]));
    let target = out_dir.join(&output.file_name);
    write_bytes(&target, &output.bytes)?;
    Ok(vec![target])
}

fn tool_params(tool: RemoteTool) -> Result<ToolParams> {
    Ok(match tool {
        RemoteTool::Compress { quality } => ToolParams::Compress { quality },
        RemoteTool::RotatePdf { angles } => ToolParams::RotatePdf {
            angles: angles
                .split(',')
                .map(|angle| {
                    angle
                        .trim()
                        .parse::<i64>()
                        .ok()
                        .and_then(blattwerk_core::Rotation::from_degrees)
                        .ok_or_else(|| {
                            BlattwerkError::validation(format!(
                                "'{}' is not a multiple of 90 degrees",
                                angle.trim()
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?,
        },
        RemoteTool::Trim { start, end } => ToolParams::TrimMedia {
            start_secs: start,
            end_secs: end,
        },
        RemoteTool::Ocr { language } => ToolParams::Ocr { language },
        RemoteTool::Redact { areas } => ToolParams::Redact {
            areas: areas
                .iter()
                .map(|area| blattwerk_core::RedactionArea {
                    page: area.page - 1,
                    x: area.x,
                    y: area.y,
                    width: area.width,
                    height: area.height,
                })
                .collect(),
        },
        RemoteTool::Custom { tool, fields } => ToolParams::Custom { tool, fields },
    })
}

// -- Shared helpers -----------------------------------------------------------

fn open_session(config: &AppConfig, inputs: &[PathBuf]) -> Result<EditSession> {
    let documents = inputs
        .iter()
        .map(|path| Ok((file_name(path), read_file(path)?)))
        .collect::<Result<Vec<_>>>()?;
    let mut session = EditSession::new(config);
    session.load_documents(documents)?;
    Ok(session)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|err| {
        warn!(path = %path.display(), error = %err, "cannot read input");
        BlattwerkError::Io(err)
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".into())
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn beside(input: &Path, file_name: &str) -> PathBuf {
    parent_dir(input).join(file_name)
}

fn write_output(path: &Path, file: &ExportedFile) -> Result<PathBuf> {
    if !file.report.skipped_overlays.is_empty() {
        warn!(
            file = %file.file_name,
            skipped = file.report.skipped_overlays.len(),
            "some overlays could not be applied"
        );
    }
    write_bytes(path, &file.bytes)?;
    Ok(path.to_path_buf())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "output written");
    Ok(())
}
