#![allow(dead_code)]

use crate::steps::StepName;
use crate::types::RegistrationDraft;
use crate::wizard::Wizard;

/// The step index always points inside the type's plan.
pub fn assert_step_in_range(wizard: &Wizard) {
    assert!(
        wizard.current_index() < wizard.steps().len(),
        "step index {} out of range for {} plan of {} steps",
        wizard.current_index(),
        wizard.kind(),
        wizard.steps().len()
    );
}

/// Nobody gets past Verification with an open gate.
pub fn assert_gates_hold_beyond_verification(wizard: &Wizard, draft: &RegistrationDraft) {
    if wizard.current_step() != StepName::Verification {
        assert!(draft.email_verified, "left verification with unverified email");
        assert!(draft.captcha_verified, "left verification without CAPTCHA");
        if wizard.kind() == crate::types::RegistrantType::Alumni {
            assert!(draft.verification_quiz_passed, "left verification without quiz pass");
        }
    }
}

/// Verification and payment bookkeeping untouched between two snapshots.
pub fn assert_registrar_fields_unchanged(before: &RegistrationDraft, after: &RegistrationDraft) {
    assert_eq!(before.email_verified, after.email_verified, "emailVerified changed");
    assert_eq!(before.captcha_verified, after.captcha_verified, "captchaVerified changed");
    assert_eq!(
        before.verification_quiz_passed, after.verification_quiz_passed,
        "verificationQuizPassed changed"
    );
    assert_eq!(before.payment_status, after.payment_status, "paymentStatus changed");
    assert_eq!(
        before.has_previous_contribution, after.has_previous_contribution,
        "hasPreviousContribution changed"
    );
    assert_eq!(
        before.previous_contribution_amount, after.previous_contribution_amount,
        "previousContributionAmount changed"
    );
}

/// The running contribution total never shrinks.
pub fn assert_contribution_monotonic(before: u64, after: u64) {
    assert!(
        after >= before,
        "previous contribution decreased from {before} to {after}"
    );
}

pub fn assert_all_wizard_invariants(wizard: &Wizard, draft: &RegistrationDraft) {
    assert_step_in_range(wizard);
    assert_gates_hold_beyond_verification(wizard, draft);
    assert_eq!(draft.registration_type, wizard.kind(), "draft type differs from wizard type");
}
