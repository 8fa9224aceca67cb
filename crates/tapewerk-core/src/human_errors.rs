// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for front ends.
//
// Every driver error is mapped to a plain sentence and a suggestion. The
// severity drives how a front end presents it.

use crate::error::TapewerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or busy device; trying again later is fine.
    Transient,
    /// Someone has to do something at the printer first.
    ActionRequired,
    /// Trying again will not help.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether resubmitting the same label can succeed without intervention.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    fn new(message: &str, suggestion: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable: severity == Severity::Transient,
            severity,
        }
    }
}

/// Convert a `TapewerkError` into something a person at the printer can act on.
pub fn humanize_error(err: &TapewerkError) -> HumanError {
    match err {
        TapewerkError::Connectivity(detail) => humanize_connectivity(detail),

        TapewerkError::Protocol { .. } => HumanError::new(
            "The printer answered in a way we don't understand.",
            "The printer firmware may differ from the supported model. Check the model and firmware version.",
            Severity::Permanent,
        ),

        TapewerkError::NotIdle(status) => {
            if status.is_printing() {
                HumanError::new(
                    "The printer is still printing.",
                    "Wait for the current label to finish, then try again.",
                    Severity::ActionRequired,
                )
            } else {
                HumanError::new(
                    "The printer isn't ready.",
                    "Check the tape cassette is seated, the cover is closed and no error light is on. If a previous print failed, turn the printer off and on to release it.",
                    Severity::ActionRequired,
                )
            }
        }

        TapewerkError::Capacity {
            requested,
            available,
            tape,
        } => {
            if *available == 0 {
                HumanError::new(
                    "No usable tape is loaded.",
                    format!("Insert a tape cassette. (Reported: {tape})"),
                    Severity::ActionRequired,
                )
            } else {
                HumanError::new(
                    "The label is too wide for the loaded tape.",
                    format!(
                        "Load wider tape or make the label narrower: it needs {requested} dots, the {tape} fits {available}."
                    ),
                    Severity::ActionRequired,
                )
            }
        }

        TapewerkError::Busy(_) => HumanError::new(
            "Another label is being printed on this printer.",
            "Wait a moment and try again.",
            Severity::Transient,
        ),

        TapewerkError::InvalidImage(detail) => HumanError::new(
            "This image can't be printed.",
            format!("Check the image has content and fits on tape. ({detail})"),
            Severity::Permanent,
        ),

        TapewerkError::Lock(_) => HumanError::new(
            "The printer wouldn't let us start a job.",
            "It may be in use from another computer. Try again when it is free.",
            Severity::ActionRequired,
        ),

        TapewerkError::Connect(_) | TapewerkError::Start(_) | TapewerkError::Transfer(_) => {
            HumanError::new(
                "Sending the label to the printer failed.",
                "The printer is still reserved for this job. Turn it off and on, then print again.",
                Severity::ActionRequired,
            )
        }

        TapewerkError::Close(_) => HumanError::new(
            "The label was sent but the connection didn't close cleanly.",
            "Check whether the label printed before printing it again.",
            Severity::ActionRequired,
        ),

        TapewerkError::StatusPoll(_) | TapewerkError::PrintTimeout(_) => HumanError::new(
            "We lost track of the printer while it was printing.",
            "Check whether the label came out and that the tape isn't jammed.",
            Severity::ActionRequired,
        ),

        TapewerkError::Cancelled => HumanError::new(
            "Printing was cancelled.",
            "The label may have been partly printed.",
            Severity::Permanent,
        ),

        TapewerkError::Unlock(_) => HumanError::new(
            "The label printed, but the printer is still reserved.",
            "Turn the printer off and on before printing the next label.",
            Severity::ActionRequired,
        ),

        TapewerkError::Config(detail) => HumanError::new(
            "The printer settings are invalid.",
            format!("Fix the configuration and restart. ({detail})"),
            Severity::Permanent,
        ),

        TapewerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError::new(
                    "The file couldn't be found.",
                    "It may have been moved or deleted.",
                    Severity::ActionRequired,
                )
            } else {
                HumanError::new(
                    "There was a problem reading or writing a file.",
                    "Try again. If this keeps happening, the disk may be full.",
                    Severity::Transient,
                )
            }
        }

        TapewerkError::Serialization(_) => HumanError::new(
            "The settings file couldn't be read.",
            "Check it is valid JSON.",
            Severity::Permanent,
        ),
    }
}

fn humanize_connectivity(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("timed out") {
        HumanError::new(
            "The printer didn't respond in time.",
            "Check it is switched on and on the same network, then try again.",
            Severity::Transient,
        )
    } else if lower.contains("refused") {
        HumanError::new(
            "The printer refused our connection.",
            "Check the printer address and port.",
            Severity::Transient,
        )
    } else if lower.contains("resolve") {
        HumanError::new(
            "The printer address doesn't look right.",
            "Check the address. It should look like 192.168.1.50:9100.",
            Severity::ActionRequired,
        )
    } else {
        HumanError::new(
            "We couldn't reach the printer.",
            format!("Check the network connection. (Detail: {detail})"),
            Severity::Transient,
        )
    }
}
