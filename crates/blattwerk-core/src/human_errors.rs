// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how the UI layer presents the message.

use crate::error::BlattwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or busy backend; trying again may work.
    Transient,
    /// User must change their input (empty signature, too few files).
    ActionRequired,
    /// Cannot be fixed by retrying: damaged or unsupported file.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same action could succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `BlattwerkError` into a `HumanError` for inline display.
pub fn humanize_error(err: &BlattwerkError) -> HumanError {
    match err {
        BlattwerkError::DocumentLoad(_) => HumanError {
            message: "This file couldn't be opened as a PDF.".into(),
            suggestion: "The file may be damaged or password-protected. Try opening it in another viewer, or choose a different file.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        BlattwerkError::ImageDecode(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "Try saving the signature as a PNG or JPEG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        BlattwerkError::PdfWrite(_) => HumanError {
            message: "The new PDF couldn't be created.".into(),
            suggestion: "Try again. If it keeps failing, try with fewer changes at once.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // Validation messages are already written for the user.
        BlattwerkError::Validation(detail) => HumanError {
            message: detail.clone(),
            suggestion: "Adjust your input and try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::AssemblyInProgress => HumanError {
            message: "Your file is still being prepared.".into(),
            suggestion: "Wait for the current download to finish.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // Backend errors are surfaced verbatim.
        BlattwerkError::RemoteOperation(detail) => HumanError {
            message: detail.clone(),
            suggestion: "Your settings are kept, so you can try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BlattwerkError::RemoteUnavailable(_) => HumanError {
            message: "An unknown error occurred.".into(),
            suggestion: "Check your internet connection, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BlattwerkError::Io(_) => HumanError {
            message: "The file couldn't be read or saved.".into(),
            suggestion: "Check that the location exists and that there is free space.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BlattwerkError::Serialization(_) => HumanError {
            message: "Settings couldn't be read.".into(),
            suggestion: "The settings file may be damaged. Delete it to restore defaults.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_is_shown_verbatim() {
        let err = BlattwerkError::RemoteOperation("file too large for compression".into());
        let human = humanize_error(&err);
        assert_eq!(human.message, "file too large for compression");
        assert!(human.retriable);
    }

    #[test]
    fn network_failure_is_unknown_error() {
        let human = humanize_error(&BlattwerkError::RemoteUnavailable("connection refused".into()));
        assert_eq!(human.message, "An unknown error occurred.");
        assert_eq!(human.severity, Severity::Transient);
    }

    #[test]
    fn validation_is_action_required() {
        let human = humanize_error(&BlattwerkError::validation("Please draw your signature first."));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn broken_pdf_is_permanent() {
        let human = humanize_error(&BlattwerkError::DocumentLoad("xref missing".into()));
        assert_eq!(human.severity, Severity::Permanent);
    }
}
