use crate::contribution::record_payment;
use crate::errors::{Gate, WizardError};
use crate::invariants::{
    assert_all_wizard_invariants, assert_contribution_monotonic, assert_registrar_fields_unchanged,
};
use crate::schema::Field;
use crate::steps::{step_fields, step_plan, StepName};
use crate::types::{Accommodation, AttendeeCounts, CarPooling, RegistrantType, RegistrationDraft};
use crate::wizard::Wizard;

/// A draft that satisfies every rule for `kind`, short of a payment.
pub(crate) fn complete_draft(kind: RegistrantType) -> RegistrationDraft {
    let mut draft = RegistrationDraft::new(kind);
    draft.email = Some("asha@example.com".into());
    draft.contact_number = Some("+919876543210".into());
    draft.email_verified = true;
    draft.captcha_verified = true;
    draft.verification_quiz_passed = kind == RegistrantType::Alumni;
    draft.name = Some("Asha Menon".into());
    draft.country = Some("India".into());
    draft.state_ut = Some("Kerala".into());
    draft.district = Some("Ernakulam".into());
    draft.batch_year = Some(2005);
    draft.designation = Some("Associate Professor".into());
    draft.department = Some("Physics".into());
    draft.profession = Some("Engineer".into());
    draft.is_attending = Some(true);
    draft.food_preference = Some("veg".into());
    draft.attendees = AttendeeCounts::new(2, 1, 0, 1);
    draft.car_pooling = Some(CarPooling::No);
    draft.accommodation = Some(Accommodation::Need);
    draft.interested_in_sponsorship = Some(false);
    draft.will_contribute = Some(true);
    draft.contribution_amount = Some(1250);
    draft
}

/// Break exactly the rule behind `field`.
fn invalidate(draft: &mut RegistrationDraft, field: Field) {
    match field {
        Field::Name => draft.name = None,
        Field::Email => draft.email = Some("broken".into()),
        Field::ContactNumber => draft.contact_number = None,
        Field::WhatsappNumber => draft.whatsapp_number = Some("12".into()),
        Field::Country => draft.country = None,
        Field::StateUt => draft.state_ut = None,
        Field::District => draft.district = None,
        Field::BatchYear => draft.batch_year = Some(1800),
        Field::Designation => draft.designation = None,
        Field::Department => draft.department = Some(" ".into()),
        Field::YearsOfService => draft.years_of_service = Some(80),
        Field::Profession => draft.profession = None,
        Field::IsAttending => draft.is_attending = None,
        Field::FoodPreference => draft.food_preference = None,
        Field::Adults => draft.attendees.adults = None,
        Field::CarPooling => draft.car_pooling = None,
        Field::CarPoolingSeats => draft.car_pooling_seats = Some(0),
        Field::Accommodation => draft.accommodation = None,
        Field::AccommodationCapacity => draft.accommodation_capacity = None,
        Field::InterestedInSponsorship => draft.interested_in_sponsorship = None,
        Field::SponsorshipCategory => draft.sponsorship_category = None,
        Field::Suggestions => draft.suggestions = Some("x".repeat(2000)),
        Field::WillContribute => draft.will_contribute = None,
        Field::ContributionAmount => draft.contribution_amount = Some(0),
        Field::EmailVerified => draft.email_verified = false,
        Field::CaptchaVerified => draft.captcha_verified = false,
        Field::VerificationQuizPassed => draft.verification_quiz_passed = false,
    }
}

fn wizard_at(kind: RegistrantType, draft: &RegistrationDraft, step: usize) -> Wizard {
    Wizard::resume(kind, Some((draft.clone(), step))).wizard
}

#[test]
fn test_advance_fails_on_any_broken_step_field() {
    for kind in RegistrantType::ALL {
        let base = complete_draft(kind);
        let plan = step_plan(kind);
        for (index, step) in plan.iter().enumerate().take(plan.len() - 1) {
            for field in step_fields(kind, *step, &base) {
                let mut draft = base.clone();
                invalidate(&mut draft, field);

                let mut wizard = wizard_at(kind, &draft, index);
                let result = wizard.advance(&draft);
                assert!(
                    result.is_err(),
                    "{kind}/{}: advanced with broken {}",
                    step.as_str(),
                    field.path()
                );
                assert_eq!(wizard.current_index(), index);
            }
        }
    }
}

#[test]
fn test_advance_succeeds_when_step_is_valid() {
    for kind in RegistrantType::ALL {
        let draft = complete_draft(kind);
        let mut wizard = Wizard::new(kind);
        while !wizard.is_final() {
            let before = wizard.current_index();
            wizard.advance(&draft).unwrap();
            assert_eq!(wizard.current_index(), before + 1);
            assert_all_wizard_invariants(&wizard, &draft);
        }
        assert_eq!(wizard.current_step(), StepName::Financial);
        assert!(matches!(wizard.advance(&draft), Err(WizardError::AtFinalStep)));
    }
}

#[test]
fn test_unverified_email_blocks_then_unblocks() {
    let mut draft = complete_draft(RegistrantType::Alumni);
    draft.email_verified = false;
    draft.captcha_verified = false;
    draft.verification_quiz_passed = false;

    let mut wizard = Wizard::new(RegistrantType::Alumni);
    let err = wizard.advance(&draft).unwrap_err();
    assert!(matches!(err, WizardError::GateClosed(Gate::EmailVerified)));
    assert_eq!(err.to_string(), "Please verify your email first");
    assert_eq!(wizard.current_index(), 0);

    draft.email_verified = true;
    draft.captcha_verified = true;
    let err = wizard.advance(&draft).unwrap_err();
    assert!(matches!(err, WizardError::GateClosed(Gate::QuizPassed)));

    draft.verification_quiz_passed = true;
    assert_eq!(wizard.advance(&draft).unwrap(), StepName::Personal);
    assert_eq!(wizard.current_index(), 1);
}

#[test]
fn test_quiz_not_needed_for_staff() {
    let mut draft = complete_draft(RegistrantType::Staff);
    draft.verification_quiz_passed = false;
    let mut wizard = Wizard::new(RegistrantType::Staff);
    assert_eq!(wizard.advance(&draft).unwrap(), StepName::Personal);
}

#[test]
fn test_declined_attendance_skips_travel_both_ways() {
    let mut draft = complete_draft(RegistrantType::Alumni);
    draft.is_attending = Some(false);

    let attendance = step_plan(RegistrantType::Alumni)
        .iter()
        .position(|s| *s == StepName::Attendance)
        .unwrap();
    let mut wizard = wizard_at(RegistrantType::Alumni, &draft, attendance);

    assert_eq!(wizard.advance(&draft).unwrap(), StepName::Optional);
    assert_eq!(wizard.retreat(&draft).unwrap(), StepName::Attendance);
}

#[test]
fn test_declining_while_on_a_travel_step_moves_past_it_unchecked() {
    let mut draft = complete_draft(RegistrantType::Alumni);
    draft.is_attending = Some(false);
    draft.car_pooling = None;
    draft.accommodation = None;

    let plan = step_plan(RegistrantType::Alumni);
    let transportation = plan.iter().position(|s| *s == StepName::Transportation).unwrap();
    let accommodation = plan.iter().position(|s| *s == StepName::Accommodation).unwrap();

    for index in [transportation, accommodation] {
        let mut wizard = wizard_at(RegistrantType::Alumni, &draft, index);
        assert_eq!(wizard.advance(&draft).unwrap(), StepName::Optional);
    }
}

#[test]
fn test_retreat_needs_no_validation() {
    let draft = RegistrationDraft::new(RegistrantType::Other);
    let mut wizard = wizard_at(RegistrantType::Other, &draft, 3);
    assert_eq!(wizard.retreat(&draft).unwrap(), StepName::Professional);
    wizard.retreat(&draft).unwrap();
    wizard.retreat(&draft).unwrap();
    assert_eq!(wizard.current_index(), 0);
    assert!(matches!(wizard.retreat(&draft), Err(WizardError::AtFirstStep)));
}

#[test]
fn test_payment_gate_on_final_step() {
    let draft = complete_draft(RegistrantType::Staff);
    let wizard = wizard_at(RegistrantType::Staff, &draft, usize::MAX);
    assert!(matches!(
        wizard.ensure_submittable(&draft),
        Err(WizardError::GateClosed(Gate::PaymentCompleted))
    ));

    let mut paid = draft.clone();
    record_payment(&mut paid, 1250);
    assert_contribution_monotonic(draft.previous_contribution_amount, paid.previous_contribution_amount);
    wizard.ensure_submittable(&paid).unwrap();
}

#[test]
fn test_alumni_may_submit_without_contributing() {
    let mut draft = complete_draft(RegistrantType::Alumni);
    draft.will_contribute = Some(false);
    draft.contribution_amount = None;
    let wizard = wizard_at(RegistrantType::Alumni, &draft, usize::MAX);
    wizard.ensure_submittable(&draft).unwrap();

    // Other has no such exemption.
    let mut other = complete_draft(RegistrantType::Other);
    other.will_contribute = Some(false);
    let wizard = wizard_at(RegistrantType::Other, &other, usize::MAX);
    assert!(wizard.ensure_submittable(&other).is_err());
}

#[test]
fn test_submit_only_from_final_step() {
    let draft = complete_draft(RegistrantType::Other);
    let wizard = Wizard::new(RegistrantType::Other);
    assert!(matches!(
        wizard.ensure_submittable(&draft),
        Err(WizardError::NotOnFinalStep)
    ));
}

#[test]
fn test_resume_ignores_draft_of_another_type() {
    let staff_draft = complete_draft(RegistrantType::Staff);
    let resumed = Wizard::resume(RegistrantType::Alumni, Some((staff_draft, 4)));
    assert!(!resumed.restored);
    assert_eq!(resumed.wizard.current_index(), 0);
    assert_eq!(resumed.draft, RegistrationDraft::new(RegistrantType::Alumni));
}

#[test]
fn test_resume_restores_flags_and_clamps_step() {
    let draft = complete_draft(RegistrantType::Other);
    let resumed = Wizard::resume(RegistrantType::Other, Some((draft.clone(), 42)));
    assert!(resumed.restored);
    assert!(resumed.wizard.is_final());
    assert_registrar_fields_unchanged(&draft, &resumed.draft);
}

#[test]
fn test_progress_snapshot() {
    let wizard = Wizard::new(RegistrantType::Staff);
    let progress = wizard.progress();
    assert_eq!(progress.current_step, StepName::Verification);
    assert_eq!(progress.step_names.len(), 8);
    assert!(!progress.is_final_step);

    let json = serde_json::to_value(&progress).unwrap();
    assert_eq!(json["currentStepIndex"], 0);
    assert_eq!(json["stepNames"][6], "sponsorship");
}
