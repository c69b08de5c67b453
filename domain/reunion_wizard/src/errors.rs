//! Errors raised by the step controller and the draft rules.

use thiserror::Error;

use crate::schema::ValidationReport;
use crate::steps::StepName;

/// A boolean gate that must hold before the wizard may move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    EmailVerified,
    CaptchaVerified,
    QuizPassed,
    PaymentCompleted,
}

impl Gate {
    pub fn message(&self) -> &'static str {
        match self {
            Self::EmailVerified => "Please verify your email first",
            Self::CaptchaVerified => "Please complete the CAPTCHA verification",
            Self::QuizPassed => "Please pass the alumni verification quiz",
            Self::PaymentCompleted => "Please complete your contribution payment before submitting",
        }
    }
}

#[derive(Debug, Error)]
pub enum WizardError {
    /// The active step (or the full draft) failed validation.
    #[error("{message}")]
    Invalid {
        step: StepName,
        field: &'static str,
        message: String,
        report: ValidationReport,
    },

    #[error("{}", .0.message())]
    GateClosed(Gate),

    #[error("Already on the first step")]
    AtFirstStep,

    #[error("Already on the final step; submit the registration instead")]
    AtFinalStep,

    #[error("Registration can only be submitted from the final step")]
    NotOnFinalStep,

    #[error("Email cannot be changed after it has been verified")]
    EmailLocked,

    #[error("Field `{0}` cannot be edited directly")]
    ReadOnlyField(String),

    #[error("The verification quiz is only part of the alumni registration")]
    QuizNotApplicable,

    #[error("Invalid form data: {0}")]
    MalformedDraft(String),
}

impl WizardError {
    /// Build an [`WizardError::Invalid`] from a failing report.
    ///
    /// Returns `None` when the report is valid.
    pub fn from_report(step: StepName, report: ValidationReport) -> Option<Self> {
        let first = report.first()?.clone();
        Some(Self::Invalid {
            step,
            field: first.field,
            message: first.message,
            report,
        })
    }
}

pub type Result<T> = std::result::Result<T, WizardError>;
