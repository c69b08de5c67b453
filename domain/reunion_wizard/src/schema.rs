//! # Validation schema set
//!
//! Declarative per-field rules, evaluated either against an explicit field
//! list (one wizard step) or against every field the registrant type needs
//! (final submission). Conditional requirements are expressed by which
//! fields [`crate::steps::step_fields`] puts on the list, so a field is only
//! ever checked when it is relevant.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::steps::submission_fields;
use crate::types::{RegistrantType, RegistrationDraft};

pub const MIN_BATCH_YEAR: u32 = 1950;
pub const MAX_BATCH_YEAR: u32 = 2100;
pub const MAX_YEARS_OF_SERVICE: u32 = 60;
pub const MAX_SUGGESTIONS_LEN: usize = 1000;

/// A validated field, named by its JSON path in the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    ContactNumber,
    WhatsappNumber,
    Country,
    StateUt,
    District,
    BatchYear,
    Designation,
    Department,
    YearsOfService,
    Profession,
    IsAttending,
    FoodPreference,
    Adults,
    CarPooling,
    CarPoolingSeats,
    Accommodation,
    AccommodationCapacity,
    InterestedInSponsorship,
    SponsorshipCategory,
    Suggestions,
    WillContribute,
    ContributionAmount,
    EmailVerified,
    CaptchaVerified,
    VerificationQuizPassed,
}

impl Field {
    /// Path of the field in the draft's JSON form.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::ContactNumber => "contactNumber",
            Self::WhatsappNumber => "whatsappNumber",
            Self::Country => "country",
            Self::StateUt => "stateUT",
            Self::District => "district",
            Self::BatchYear => "batchYear",
            Self::Designation => "designation",
            Self::Department => "department",
            Self::YearsOfService => "yearsOfService",
            Self::Profession => "profession",
            Self::IsAttending => "isAttending",
            Self::FoodPreference => "foodPreference",
            Self::Adults => "attendees.adults",
            Self::CarPooling => "carPooling",
            Self::CarPoolingSeats => "carPoolingSeats",
            Self::Accommodation => "accommodation",
            Self::AccommodationCapacity => "accommodationCapacity",
            Self::InterestedInSponsorship => "interestedInSponsorship",
            Self::SponsorshipCategory => "sponsorshipCategory",
            Self::Suggestions => "suggestions",
            Self::WillContribute => "willContribute",
            Self::ContributionAmount => "contributionAmount",
            Self::EmailVerified => "emailVerified",
            Self::CaptchaVerified => "captchaVerified",
            Self::VerificationQuizPassed => "verificationQuizPassed",
        }
    }

    /// Run this field's rule. Returns the error message on failure.
    fn check(&self, draft: &RegistrationDraft) -> Option<String> {
        let msg = |m: &str| Some(m.to_string());
        match self {
            Self::Name => match present(&draft.name) {
                None => msg("Full name is required"),
                Some(n) if n.chars().count() < 2 => msg("Name must be at least 2 characters"),
                Some(_) => None,
            },
            Self::Email => match present(&draft.email) {
                None => msg("Email is required"),
                Some(e) if !email_pattern().is_match(e) => msg("Enter a valid email address"),
                Some(_) => None,
            },
            Self::ContactNumber => match present(&draft.contact_number) {
                None => msg("Contact number is required"),
                Some(p) if !is_phone_number(p) => msg("Enter a valid contact number"),
                Some(_) => None,
            },
            Self::WhatsappNumber => match present(&draft.whatsapp_number) {
                Some(p) if !is_phone_number(p) => msg("Enter a valid WhatsApp number"),
                _ => None,
            },
            Self::Country => required_text(&draft.country, "Country is required"),
            Self::StateUt => required_text(&draft.state_ut, "State/UT is required for India"),
            Self::District => required_text(&draft.district, "District is required for Kerala"),
            Self::BatchYear => match draft.batch_year {
                None => msg("Batch year is required"),
                Some(y) if !(MIN_BATCH_YEAR..=MAX_BATCH_YEAR).contains(&y) => {
                    Some(format!("Batch year must be between {MIN_BATCH_YEAR} and {MAX_BATCH_YEAR}"))
                }
                Some(_) => None,
            },
            Self::Designation => required_text(&draft.designation, "Designation is required"),
            Self::Department => required_text(&draft.department, "Department is required"),
            Self::YearsOfService => match draft.years_of_service {
                Some(y) if y > MAX_YEARS_OF_SERVICE => Some(format!(
                    "Years of service cannot exceed {MAX_YEARS_OF_SERVICE}"
                )),
                _ => None,
            },
            Self::Profession => required_text(&draft.profession, "Profession is required"),
            Self::IsAttending => required(&draft.is_attending, "Please tell us if you are attending"),
            Self::FoodPreference => {
                required_text(&draft.food_preference, "Food preference is required")
            }
            Self::Adults => positive(draft.attendees.adults, "At least one adult must attend"),
            Self::CarPooling => required(&draft.car_pooling, "Please choose a car pooling option"),
            Self::CarPoolingSeats => {
                positive(draft.car_pooling_seats, "Number of seats must be greater than 0")
            }
            Self::Accommodation => {
                required(&draft.accommodation, "Please choose an accommodation option")
            }
            Self::AccommodationCapacity => positive(
                draft.accommodation_capacity,
                "Accommodation capacity must be greater than 0",
            ),
            Self::InterestedInSponsorship => required(
                &draft.interested_in_sponsorship,
                "Please tell us if you are interested in sponsorship",
            ),
            Self::SponsorshipCategory => {
                required_text(&draft.sponsorship_category, "Sponsorship category is required")
            }
            Self::Suggestions => match present(&draft.suggestions) {
                Some(s) if s.chars().count() > MAX_SUGGESTIONS_LEN => Some(format!(
                    "Suggestions must be at most {MAX_SUGGESTIONS_LEN} characters"
                )),
                _ => None,
            },
            Self::WillContribute => {
                required(&draft.will_contribute, "Please tell us if you will contribute")
            }
            Self::ContributionAmount => positive(
                draft.contribution_amount,
                "Contribution amount must be greater than 0",
            ),
            Self::EmailVerified => (!draft.email_verified).then(|| "Please verify your email".to_string()),
            Self::CaptchaVerified => {
                (!draft.captcha_verified).then(|| "Please complete the CAPTCHA".to_string())
            }
            Self::VerificationQuizPassed => (!draft.verification_quiz_passed)
                .then(|| "Please pass the verification quiz".to_string()),
        }
    }
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Outcome of a validation pass. Errors keep the order of the checked
/// field list, so [`ValidationReport::first`] is the blocking error to show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn first(&self) -> Option<&FieldError> {
        self.errors.first()
    }

    pub fn error_for(&self, path: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == path)
            .map(|e| e.message.as_str())
    }

    /// Errors keyed by field path.
    pub fn field_errors(&self) -> BTreeMap<&'static str, &str> {
        self.errors
            .iter()
            .map(|e| (e.field, e.message.as_str()))
            .collect()
    }
}

/// Validate the whole draft for final submission.
pub fn validate(kind: RegistrantType, draft: &RegistrationDraft) -> ValidationReport {
    validate_fields(draft, &submission_fields(kind, draft))
}

/// Validate only the listed fields (step mode).
pub fn validate_fields(draft: &RegistrationDraft, fields: &[Field]) -> ValidationReport {
    let errors: Vec<FieldError> = fields
        .iter()
        .filter_map(|field| {
            field.check(draft).map(|message| FieldError {
                field: field.path(),
                message,
            })
        })
        .collect();
    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn required_text(value: &Option<String>, message: &str) -> Option<String> {
    present(value).is_none().then(|| message.to_string())
}

fn required<T>(value: &Option<T>, message: &str) -> Option<String> {
    value.is_none().then(|| message.to_string())
}

/// Missing counts as failing, and so does zero.
fn positive<T: Into<u64> + Copy>(value: Option<T>, message: &str) -> Option<String> {
    match value.map(Into::into) {
        Some(n) if n > 0 => None,
        _ => Some(message.to_string()),
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

fn is_phone_number(raw: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("phone pattern is a valid regex"));
    let compact: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    pattern.is_match(&compact)
}
