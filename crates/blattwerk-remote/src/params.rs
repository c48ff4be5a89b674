// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-tool operation parameters, flattened into multipart form fields.

use blattwerk_core::BlattwerkError;
use blattwerk_core::error::Result;
use blattwerk_core::{RedactionArea, Rotation};
use serde::{Deserialize, Serialize};

/// Parameters for one backend tool. Each variant knows its endpoint slug and
/// how to become form fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolParams {
    /// Re-encode to shrink the file; `quality` is 1 (smallest) to 100.
    Compress { quality: u8 },
    /// Absolute rotation per page, in page order.
    RotatePdf { angles: Vec<Rotation> },
    /// Cut an audio/video file to `[start_secs, end_secs)`.
    TrimMedia { start_secs: f64, end_secs: f64 },
    /// Text recognition; `language` is a backend language code such as "eng".
    Ocr { language: String },
    /// Remove content under the given areas.
    Redact { areas: Vec<RedactionArea> },
    /// Any other backend tool, with its fields passed through unchanged.
    Custom {
        tool: String,
        fields: Vec<(String, String)>,
    },
}

impl ToolParams {
    /// Path segment appended to the backend base URL.
    pub fn tool(&self) -> &str {
        match self {
            Self::Compress { .. } => "compress",
            Self::RotatePdf { .. } => "rotate-pdf",
            Self::TrimMedia { .. } => "trim",
            Self::Ocr { .. } => "ocr",
            Self::Redact { .. } => "redact",
            Self::Custom { tool, .. } => tool,
        }
    }

    /// Reject out-of-range values before anything is uploaded.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Compress { quality } if !(1..=100).contains(quality) => Err(
                BlattwerkError::validation("Compression quality must be between 1 and 100."),
            ),
            Self::RotatePdf { angles } if angles.is_empty() => {
                Err(BlattwerkError::validation("Give a rotation for at least one page."))
            }
            Self::TrimMedia {
                start_secs,
                end_secs,
            } => {
                let valid = start_secs.is_finite()
                    && end_secs.is_finite()
                    && *start_secs >= 0.0
                    && end_secs > start_secs;
                if valid {
                    Ok(())
                } else {
                    Err(BlattwerkError::validation(
                        "The trim end must come after the start.",
                    ))
                }
            }
            Self::Ocr { language } if language.trim().is_empty() => {
                Err(BlattwerkError::validation("Choose a language for text recognition."))
            }
            Self::Redact { areas } if areas.is_empty() => {
                Err(BlattwerkError::validation("Mark at least one area to redact."))
            }
            Self::Custom { tool, .. } if !is_slug(tool) => Err(BlattwerkError::validation(
                format!("'{tool}' is not a valid tool name"),
            )),
            _ => Ok(()),
        }
    }

    /// Form fields sent next to the file parts.
    pub fn form_fields(&self) -> Result<Vec<(String, String)>> {
        let fields = match self {
            Self::Compress { quality } => vec![("quality".into(), quality.to_string())],
            Self::RotatePdf { angles } => {
                let degrees: Vec<u16> = angles.iter().map(|angle| angle.degrees()).collect();
                vec![("angles".into(), serde_json::to_string(&degrees)?)]
            }
            Self::TrimMedia {
                start_secs,
                end_secs,
            } => vec![
                ("start".into(), format_seconds(*start_secs)),
                ("end".into(), format_seconds(*end_secs)),
            ],
            Self::Ocr { language } => vec![("language".into(), language.trim().to_string())],
            Self::Redact { areas } => vec![("areas".into(), serde_json::to_string(areas)?)],
            Self::Custom { fields, .. } => fields.clone(),
        };
        Ok(fields)
    }
}

fn is_slug(tool: &str) -> bool {
    !tool.is_empty()
        && tool
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Seconds with millisecond precision, trailing zeros dropped.
fn format_seconds(secs: f64) -> String {
    let text = format!("{secs:.3}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(fields: &'a [(String, String)], name: &str) -> &'a str {
        fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .expect("field present")
    }

    #[test]
    fn rotation_angles_are_degrees() {
        let params = ToolParams::RotatePdf {
            angles: vec![Rotation::Deg0, Rotation::Deg270],
        };
        assert_eq!(params.tool(), "rotate-pdf");
        assert_eq!(field(&params.form_fields().expect("fields"), "angles"), "[0,270]");
    }

    #[test]
    fn redaction_areas_serialise_as_json() {
        let params = ToolParams::Redact {
            areas: vec![RedactionArea {
                page: 2,
                x: 10.0,
                y: 20.5,
                width: 30.0,
                height: 5.0,
            }],
        };
        let fields = params.form_fields().expect("fields");
        let parsed: Vec<RedactionArea> =
            serde_json::from_str(field(&fields, "areas")).expect("json");
        assert_eq!(parsed[0].page, 2);
        assert_eq!(parsed[0].y, 20.5);
    }

    #[test]
    fn trim_times_are_compact() {
        let params = ToolParams::TrimMedia {
            start_secs: 1.5,
            end_secs: 90.0,
        };
        let fields = params.form_fields().expect("fields");
        assert_eq!(field(&fields, "start"), "1.5");
        assert_eq!(field(&fields, "end"), "90");
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let invalid = [
            ToolParams::Compress { quality: 0 },
            ToolParams::RotatePdf { angles: vec![] },
            ToolParams::TrimMedia {
                start_secs: 5.0,
                end_secs: 5.0,
            },
            ToolParams::TrimMedia {
                start_secs: f64::NAN,
                end_secs: 5.0,
            },
            ToolParams::Ocr {
                language: "  ".into(),
            },
            ToolParams::Redact { areas: vec![] },
            ToolParams::Custom {
                tool: "../admin".into(),
                fields: vec![],
            },
        ];
        for params in invalid {
            assert!(
                matches!(params.validate(), Err(BlattwerkError::Validation(_))),
                "{params:?}"
            );
        }
        assert!(ToolParams::Compress { quality: 60 }.validate().is_ok());
    }

    #[test]
    fn custom_fields_pass_through() {
        let params = ToolParams::Custom {
            tool: "video-to-gif".into(),
            fields: vec![("fps".into(), "12".into())],
        };
        assert_eq!(params.tool(), "video-to-gif");
        assert_eq!(
            params.form_fields().expect("fields"),
            vec![("fps".to_string(), "12".to_string())]
        );
    }
}
