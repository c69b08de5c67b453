use crate::schema::{validate, validate_fields, Field};
use crate::steps::StepName;
use crate::test_wizard::complete_draft;
use crate::types::{Accommodation, CarPooling, RegistrantType};
use crate::wizard::Wizard;
use crate::{step_fields, WizardError};

#[test]
fn test_complete_drafts_validate_for_every_type() {
    for kind in RegistrantType::ALL {
        let draft = complete_draft(kind);
        let report = validate(kind, &draft);
        assert!(report.valid, "{kind}: {:?}", report.errors);
    }
}

#[test]
fn test_contribution_amount_required_when_contributing() {
    let mut draft = complete_draft(RegistrantType::Alumni);
    draft.will_contribute = Some(true);
    draft.contribution_amount = Some(0);

    let report = validate(RegistrantType::Alumni, &draft);
    assert!(!report.valid);
    assert_eq!(
        report.error_for("contributionAmount"),
        Some("Contribution amount must be greater than 0")
    );

    draft.contribution_amount = None;
    assert!(validate(RegistrantType::Alumni, &draft)
        .error_for("contributionAmount")
        .is_some());
}

#[test]
fn test_amount_ignored_when_not_contributing() {
    let mut draft = complete_draft(RegistrantType::Alumni);
    draft.will_contribute = Some(false);
    draft.contribution_amount = Some(0);
    assert!(validate(RegistrantType::Alumni, &draft).valid);
}

#[test]
fn test_india_requires_state_and_kerala_requires_district() {
    let mut draft = complete_draft(RegistrantType::Other);
    draft.country = Some("India".into());
    draft.state_ut = None;
    draft.district = None;

    let report = validate(RegistrantType::Other, &draft);
    assert!(report.error_for("stateUT").is_some());
    assert!(report.error_for("district").is_none());

    draft.state_ut = Some("Kerala".into());
    let report = validate(RegistrantType::Other, &draft);
    assert!(report.error_for("stateUT").is_none());
    assert_eq!(report.error_for("district"), Some("District is required for Kerala"));

    draft.district = Some("Thrissur".into());
    assert!(validate(RegistrantType::Other, &draft).valid);
}

#[test]
fn test_iso_country_code_does_not_trigger_state_rules() {
    let mut draft = complete_draft(RegistrantType::Staff);
    draft.country = Some("IN".into());
    draft.state_ut = None;
    assert!(validate(RegistrantType::Staff, &draft).valid);
}

#[test]
fn test_accommodation_capacity_rule() {
    let mut draft = complete_draft(RegistrantType::Staff);
    draft.accommodation = Some(Accommodation::Provide);
    draft.accommodation_capacity = None;
    assert!(validate(RegistrantType::Staff, &draft)
        .error_for("accommodationCapacity")
        .is_some());

    draft.accommodation_capacity = Some(3);
    assert!(validate(RegistrantType::Staff, &draft).valid);
}

#[test]
fn test_car_pooling_seats_rule() {
    let mut draft = complete_draft(RegistrantType::Alumni);
    draft.car_pooling = Some(CarPooling::Offer);
    draft.car_pooling_seats = Some(0);
    assert!(validate(RegistrantType::Alumni, &draft)
        .error_for("carPoolingSeats")
        .is_some());

    draft.car_pooling = Some(CarPooling::No);
    assert!(validate(RegistrantType::Alumni, &draft).valid);
}

#[test]
fn test_attending_requires_food_and_adults() {
    let mut draft = complete_draft(RegistrantType::Other);
    draft.food_preference = None;
    draft.attendees.adults = Some(0);
    let report = validate_fields(
        &draft,
        &step_fields(RegistrantType::Other, StepName::Attendance, &draft),
    );
    assert!(report.error_for("foodPreference").is_some());
    assert!(report.error_for("attendees.adults").is_some());

    draft.is_attending = Some(false);
    let report = validate(RegistrantType::Other, &draft);
    assert!(report.valid, "{:?}", report.errors);
}

#[test]
fn test_declined_attendance_ignores_travel_fields() {
    let mut draft = complete_draft(RegistrantType::Staff);
    draft.is_attending = Some(false);
    draft.car_pooling = None;
    draft.accommodation = Some(Accommodation::Provide);
    draft.accommodation_capacity = None;
    assert!(validate(RegistrantType::Staff, &draft).valid);
}

#[test]
fn test_verification_flags_required_regardless_of_fields() {
    let mut draft = complete_draft(RegistrantType::Alumni);
    draft.verification_quiz_passed = false;
    let report = validate(RegistrantType::Alumni, &draft);
    assert_eq!(report.first().map(|e| e.field), Some(Field::VerificationQuizPassed.path()));

    // Staff has no quiz.
    let mut staff = complete_draft(RegistrantType::Staff);
    staff.verification_quiz_passed = false;
    assert!(validate(RegistrantType::Staff, &staff).valid);
}

#[test]
fn test_submit_reports_first_error_from_full_validation() {
    let mut draft = complete_draft(RegistrantType::Other);
    draft.profession = None;
    draft.has_previous_contribution = true;

    let mut wizard = Wizard::resume(RegistrantType::Other, Some((draft.clone(), 99))).wizard;
    assert!(wizard.is_final());
    match wizard.ensure_submittable(&draft) {
        Err(WizardError::Invalid { field, .. }) => assert_eq!(field, "profession"),
        other => panic!("expected invalid profession, got {other:?}"),
    }
    wizard.reset();
    assert_eq!(wizard.current_index(), 0);
}
