//! Outcomes of the OTP, CAPTCHA and quiz challenges and how they land on
//! the draft.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, WizardError};
use crate::types::{RegistrantType, RegistrationDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationKind {
    Otp,
    Captcha,
    Quiz,
}

/// One challenge attempt. Each attempt supersedes the previous one of the
/// same kind; nothing is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub kind: VerificationKind,
    pub passed: bool,
    /// Issued at OTP-verify time; correlates later step saves.
    pub token: Option<String>,
    pub registration_id: Option<String>,
}

impl VerificationResult {
    pub fn otp(passed: bool, token: Option<String>, registration_id: Option<String>) -> Self {
        Self {
            kind: VerificationKind::Otp,
            passed,
            token,
            registration_id,
        }
    }

    pub fn captcha(passed: bool) -> Self {
        Self {
            kind: VerificationKind::Captcha,
            passed,
            token: None,
            registration_id: None,
        }
    }

    pub fn quiz(passed: bool) -> Self {
        Self {
            kind: VerificationKind::Quiz,
            passed,
            token: None,
            registration_id: None,
        }
    }
}

/// Reject a new OTP round once the email is verified; the address is
/// frozen from then on.
pub fn ensure_email_unlocked(draft: &RegistrationDraft) -> Result<()> {
    if draft.email_verified {
        return Err(WizardError::EmailLocked);
    }
    Ok(())
}

/// Record an attempt on the draft's gate flags.
pub fn apply_verification(draft: &mut RegistrationDraft, result: &VerificationResult) -> Result<()> {
    match result.kind {
        VerificationKind::Otp => draft.email_verified = result.passed,
        VerificationKind::Captcha => draft.captcha_verified = result.passed,
        VerificationKind::Quiz => {
            if draft.registration_type != RegistrantType::Alumni {
                return Err(WizardError::QuizNotApplicable);
            }
            draft.verification_quiz_passed = result.passed;
        }
    }
    Ok(())
}
