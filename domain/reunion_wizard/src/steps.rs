//! Step plans and the dynamic field list of each step.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::Field;
use crate::types::{Accommodation, CarPooling, RegistrantType, RegistrationDraft};

/// One screen's worth of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepName {
    Verification,
    Personal,
    Professional,
    Attendance,
    Transportation,
    Accommodation,
    Sponsorship,
    Optional,
    Financial,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verification => "verification",
            Self::Personal => "personal",
            Self::Professional => "professional",
            Self::Attendance => "attendance",
            Self::Transportation => "transportation",
            Self::Accommodation => "accommodation",
            Self::Sponsorship => "sponsorship",
            Self::Optional => "optional",
            Self::Financial => "financial",
        }
    }

    /// Steps that only make sense for someone who is coming.
    pub fn requires_attendance(&self) -> bool {
        matches!(self, Self::Transportation | Self::Accommodation)
    }
}

const ALUMNI_STEPS: &[StepName] = &[
    StepName::Verification,
    StepName::Personal,
    StepName::Professional,
    StepName::Attendance,
    StepName::Transportation,
    StepName::Accommodation,
    StepName::Optional,
    StepName::Financial,
];

const STAFF_STEPS: &[StepName] = &[
    StepName::Verification,
    StepName::Personal,
    StepName::Professional,
    StepName::Attendance,
    StepName::Transportation,
    StepName::Accommodation,
    StepName::Sponsorship,
    StepName::Financial,
];

const OTHER_STEPS: &[StepName] = &[
    StepName::Verification,
    StepName::Personal,
    StepName::Professional,
    StepName::Attendance,
    StepName::Optional,
    StepName::Financial,
];

/// The fixed, ordered step list for a registrant type.
///
/// Verification is always first and Financial always last.
pub fn step_plan(kind: RegistrantType) -> &'static [StepName] {
    match kind {
        RegistrantType::Alumni => ALUMNI_STEPS,
        RegistrantType::Staff => STAFF_STEPS,
        RegistrantType::Other => OTHER_STEPS,
    }
}

/// A step is skipped entirely (not merely left unvalidated) when the
/// registrant has declined to attend.
pub fn is_skipped(step: StepName, draft: &RegistrationDraft) -> bool {
    step.requires_attendance() && draft.declined_attendance()
}

/// Fields the given step must validate, computed from the current draft.
pub fn step_fields(kind: RegistrantType, step: StepName, draft: &RegistrationDraft) -> Vec<Field> {
    let mut fields = Vec::new();
    match step {
        StepName::Verification => {
            fields.extend([
                Field::Email,
                Field::ContactNumber,
                Field::EmailVerified,
                Field::CaptchaVerified,
            ]);
            if kind == RegistrantType::Alumni {
                fields.push(Field::VerificationQuizPassed);
            }
        }
        StepName::Personal => {
            fields.extend([Field::Name, Field::WhatsappNumber, Field::Country]);
            if draft.lives_in_india() {
                fields.push(Field::StateUt);
            }
            if draft.lives_in_kerala() {
                fields.push(Field::District);
            }
            if kind == RegistrantType::Alumni {
                fields.push(Field::BatchYear);
            }
        }
        StepName::Professional => {
            if kind == RegistrantType::Staff {
                fields.extend([Field::Designation, Field::Department, Field::YearsOfService]);
            }
            fields.push(Field::Profession);
        }
        StepName::Attendance => {
            fields.push(Field::IsAttending);
            if draft.is_attending == Some(true) {
                fields.extend([Field::FoodPreference, Field::Adults]);
            }
        }
        StepName::Transportation => {
            fields.push(Field::CarPooling);
            if matches!(draft.car_pooling, Some(CarPooling::Offer | CarPooling::Need)) {
                fields.push(Field::CarPoolingSeats);
            }
        }
        StepName::Accommodation => {
            fields.push(Field::Accommodation);
            if draft.accommodation == Some(Accommodation::Provide) {
                fields.push(Field::AccommodationCapacity);
            }
        }
        StepName::Sponsorship => {
            fields.push(Field::InterestedInSponsorship);
            if draft.interested_in_sponsorship == Some(true) {
                fields.push(Field::SponsorshipCategory);
            }
        }
        StepName::Optional => fields.push(Field::Suggestions),
        StepName::Financial => {
            fields.push(Field::WillContribute);
            if draft.will_contribute == Some(true) {
                fields.push(Field::ContributionAmount);
            }
        }
    }
    fields
}

/// Draft keys collected on a step, optional ones included.
pub fn step_keys(step: StepName) -> &'static [&'static str] {
    match step {
        StepName::Verification => &[
            "email",
            "contactNumber",
            "emailVerified",
            "captchaVerified",
            "verificationQuizPassed",
        ],
        StepName::Personal => &[
            "name",
            "whatsappNumber",
            "gender",
            "country",
            "stateUT",
            "district",
            "address",
            "batchYear",
            "rollNumber",
        ],
        StepName::Professional => &[
            "profession",
            "organization",
            "designation",
            "department",
            "yearsOfService",
        ],
        StepName::Attendance => &["isAttending", "foodPreference", "attendees"],
        StepName::Transportation => &["carPooling", "carPoolingSeats"],
        StepName::Accommodation => &["accommodation", "accommodationCapacity"],
        StepName::Sponsorship => &["interestedInSponsorship", "sponsorshipCategory"],
        StepName::Optional => &["volunteerInterest", "suggestions"],
        StepName::Financial => &[
            "willContribute",
            "contributionAmount",
            "paymentStatus",
            "hasPreviousContribution",
            "previousContributionAmount",
        ],
    }
}

/// The slice of the draft a progressive save sends for `step`.
pub fn step_data(step: StepName, draft: &RegistrationDraft) -> Value {
    let full = draft.to_json();
    let data: Map<String, Value> = step_keys(step)
        .iter()
        .filter_map(|key| full.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect();
    Value::Object(data)
}

/// Every field the full draft must satisfy: the union of all non-skipped
/// steps, in step order.
pub fn submission_fields(kind: RegistrantType, draft: &RegistrationDraft) -> Vec<Field> {
    step_plan(kind)
        .iter()
        .filter(|step| !is_skipped(**step, draft))
        .flat_map(|step| step_fields(kind, *step, draft))
        .collect()
}
