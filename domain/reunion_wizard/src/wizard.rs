//! # Step controller
//!
//! The wizard is a small state machine with one state per step index:
//!
//! ```text
//! Verification ──► Personal ──► … ──► Financial ──► (submit)
//!      ▲   gates: email, CAPTCHA,          gate: payment
//!      │   quiz (Alumni)
//!      └──────────── retreat() from any step > 0
//! ```
//!
//! `advance` never moves past a step whose fields fail validation or whose
//! gates are closed. Steps that do not apply (travel steps for someone who is
//! not attending) are jumped over in both directions.
//!
//! Persistence, progressive saves and notifications belong to the caller;
//! the controller only decides whether a transition is allowed.

use serde::Serialize;
use tracing::debug;

use crate::errors::{Gate, Result, WizardError};
use crate::schema::{validate, validate_fields};
use crate::steps::{is_skipped, step_fields, step_plan, StepName};
use crate::types::{RegistrantType, RegistrationDraft};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wizard {
    kind: RegistrantType,
    current: usize,
}

/// A wizard plus the draft it was restored with.
#[derive(Debug, Clone)]
pub struct Resumed {
    pub wizard: Wizard,
    pub draft: RegistrationDraft,
    /// `true` when a saved draft of the right type was picked up.
    pub restored: bool,
}

/// Serialisable snapshot of where the registrant is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub registration_type: RegistrantType,
    pub current_step_index: usize,
    pub current_step: StepName,
    pub step_names: Vec<StepName>,
    pub is_final_step: bool,
}

impl Wizard {
    pub fn new(kind: RegistrantType) -> Self {
        Self { kind, current: 0 }
    }

    /// Pick up a saved draft and step index.
    ///
    /// A draft saved for another registrant type is ignored and a fresh
    /// draft is started instead. The step index is clamped into range.
    pub fn resume(kind: RegistrantType, saved: Option<(RegistrationDraft, usize)>) -> Resumed {
        match saved {
            Some((draft, step)) if draft.registration_type == kind => {
                let last = step_plan(kind).len() - 1;
                Resumed {
                    wizard: Self {
                        kind,
                        current: step.min(last),
                    },
                    draft,
                    restored: true,
                }
            }
            Some((draft, _)) => {
                debug!(
                    "ignoring saved {} draft while rendering the {kind} form",
                    draft.registration_type
                );
                Self::fresh(kind)
            }
            None => Self::fresh(kind),
        }
    }

    fn fresh(kind: RegistrantType) -> Resumed {
        Resumed {
            wizard: Self::new(kind),
            draft: RegistrationDraft::new(kind),
            restored: false,
        }
    }

    pub fn kind(&self) -> RegistrantType {
        self.kind
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn steps(&self) -> &'static [StepName] {
        step_plan(self.kind)
    }

    pub fn current_step(&self) -> StepName {
        self.steps()[self.current]
    }

    pub fn is_final(&self) -> bool {
        self.current == self.steps().len() - 1
    }

    pub fn progress(&self) -> Progress {
        Progress {
            registration_type: self.kind,
            current_step_index: self.current,
            current_step: self.current_step(),
            step_names: self.steps().to_vec(),
            is_final_step: self.is_final(),
        }
    }

    /// Check the active step and move forward.
    ///
    /// Returns the step now active. On error the wizard stays where it was.
    pub fn advance(&mut self, draft: &RegistrationDraft) -> Result<StepName> {
        if self.is_final() {
            return Err(WizardError::AtFinalStep);
        }

        // A step the draft now skips (attendance declined while on it) is
        // left without checking its fields.
        let step = self.current_step();
        if !is_skipped(step, draft) {
            if step == StepName::Verification {
                check_verification_gates(self.kind, draft)?;
            }
            let report = validate_fields(draft, &step_fields(self.kind, step, draft));
            if let Some(err) = WizardError::from_report(step, report) {
                return Err(err);
            }
        }

        let steps = self.steps();
        self.current = (self.current + 1..steps.len())
            .find(|i| !is_skipped(steps[*i], draft))
            .unwrap_or(steps.len() - 1);

        debug!(
            "{} wizard advanced from {} to {}",
            self.kind,
            step.as_str(),
            self.current_step().as_str()
        );
        Ok(self.current_step())
    }

    /// Move back one (non-skipped) step without validating anything.
    pub fn retreat(&mut self, draft: &RegistrationDraft) -> Result<StepName> {
        if self.current == 0 {
            return Err(WizardError::AtFirstStep);
        }
        let steps = self.steps();
        self.current = (0..self.current)
            .rev()
            .find(|i| !is_skipped(steps[*i], draft))
            .unwrap_or(0);
        Ok(self.current_step())
    }

    /// Whether the final submit may go ahead: full-draft validation plus
    /// the payment gate.
    pub fn ensure_submittable(&self, draft: &RegistrationDraft) -> Result<()> {
        if !self.is_final() {
            return Err(WizardError::NotOnFinalStep);
        }
        if let Some(err) = WizardError::from_report(self.current_step(), validate(self.kind, draft)) {
            return Err(err);
        }
        if payment_required(self.kind, draft) && !draft.has_previous_contribution {
            return Err(WizardError::GateClosed(Gate::PaymentCompleted));
        }
        Ok(())
    }

    /// Back to the first step, after a successful submission.
    pub fn reset(&mut self) {
        self.current = 0;
    }
}

/// Alumni may submit without paying when they chose not to contribute;
/// Staff and Other registrations always need a completed payment.
pub fn payment_required(kind: RegistrantType, draft: &RegistrationDraft) -> bool {
    match kind {
        RegistrantType::Alumni => draft.will_contribute == Some(true),
        RegistrantType::Staff | RegistrantType::Other => true,
    }
}

/// Step 0 gates, checked before any field rule.
pub fn check_verification_gates(kind: RegistrantType, draft: &RegistrationDraft) -> Result<()> {
    if !draft.email_verified {
        return Err(WizardError::GateClosed(Gate::EmailVerified));
    }
    if !draft.captcha_verified {
        return Err(WizardError::GateClosed(Gate::CaptchaVerified));
    }
    if kind == RegistrantType::Alumni && !draft.verification_quiz_passed {
        return Err(WizardError::GateClosed(Gate::QuizPassed));
    }
    Ok(())
}
