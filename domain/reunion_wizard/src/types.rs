//! # Types
//!
//! The accumulating form state for one in-progress registration.
//!
//! ## Design decisions
//!
//! ### One draft shape for every registrant type
//!
//! [`RegistrationDraft`] carries the union of the Alumni, Staff and Other
//! field sets. The [`RegistrantType`] picks which of them the schema looks
//! at; fields that do not apply to the type are kept in storage untouched
//! and ignored by validation.
//!
//! ### Lenient numbers
//!
//! Front ends post numeric inputs as strings. Every numeric field accepts a
//! JSON number, a numeric string, `null` or `""`, and an empty string becomes
//! `None` before any range check runs. Empty is not zero.
//!
//! ### Registrar-owned fields
//!
//! The verification gates and payment bookkeeping are only ever written by
//! the registrar itself (see [`crate::patch`]), never by a field patch.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which registration form a draft belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrantType {
    Alumni,
    Staff,
    Other,
}

impl RegistrantType {
    pub const ALL: [RegistrantType; 3] = [Self::Alumni, Self::Staff, Self::Other];

    /// Short identifier used in storage keys and URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alumni => "alumni",
            Self::Staff => "staff",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for RegistrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alumni" => Ok(Self::Alumni),
            "staff" => Ok(Self::Staff),
            "other" | "others" => Ok(Self::Other),
            other => Err(format!("unknown registrant type `{other}`")),
        }
    }
}

/// Ride-share choice on the transportation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarPooling {
    #[serde(alias = "No", alias = "NO")]
    No,
    /// Offering seats in own vehicle.
    #[serde(alias = "Offer", alias = "yes-offer")]
    Offer,
    /// Looking for seats in someone else's vehicle.
    #[serde(alias = "Need", alias = "yes-need")]
    Need,
}

/// Accommodation choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accommodation {
    #[serde(alias = "notRequired", alias = "no")]
    NotRequired,
    #[serde(alias = "Need")]
    Need,
    /// Hosting other attendees.
    #[serde(alias = "Provide")]
    Provide,
}

/// Local view of the contribution payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    /// Never set by the wizard: a failed attempt leaves the status as it
    /// was. Only arrives in drafts restored from the backend or edited by
    /// an admin, and a later verified payment still completes it.
    Failed,
}

/// Declared head count per age group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeCounts {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub adults: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub teens: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub children: Option<u32>,
    /// Free of charge regardless of count.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub toddlers: Option<u32>,
}

impl AttendeeCounts {
    pub fn new(adults: u32, teens: u32, children: u32, toddlers: u32) -> Self {
        Self {
            adults: Some(adults),
            teens: Some(teens),
            children: Some(children),
            toddlers: Some(toddlers),
        }
    }

    pub fn total(&self) -> u32 {
        [self.adults, self.teens, self.children, self.toddlers]
            .iter()
            .map(|c| c.unwrap_or(0))
            .fold(0u32, u32::saturating_add)
    }
}

/// The accumulating, locally persisted form data for one registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDraft {
    pub registration_type: RegistrantType,

    // ── Personal ──────────────────────────────────────────
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, rename = "stateUT")]
    pub state_ut: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub address: Option<String>,

    // ── Identity (type specific) ──────────────────────────
    #[serde(default, deserialize_with = "blank_as_none")]
    pub batch_year: Option<u32>,
    #[serde(default)]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub years_of_service: Option<u32>,

    // ── Professional ──────────────────────────────────────
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,

    // ── Attendance ────────────────────────────────────────
    #[serde(default)]
    pub is_attending: Option<bool>,
    #[serde(default)]
    pub food_preference: Option<String>,
    #[serde(default)]
    pub attendees: AttendeeCounts,

    // ── Transportation ────────────────────────────────────
    #[serde(default)]
    pub car_pooling: Option<CarPooling>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub car_pooling_seats: Option<u32>,

    // ── Accommodation ─────────────────────────────────────
    #[serde(default)]
    pub accommodation: Option<Accommodation>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub accommodation_capacity: Option<u32>,

    // ── Sponsorship (Staff) ───────────────────────────────
    #[serde(default)]
    pub interested_in_sponsorship: Option<bool>,
    #[serde(default)]
    pub sponsorship_category: Option<String>,

    // ── Optional ──────────────────────────────────────────
    #[serde(default)]
    pub volunteer_interest: Option<bool>,
    #[serde(default)]
    pub suggestions: Option<String>,

    // ── Financial ─────────────────────────────────────────
    #[serde(default)]
    pub will_contribute: Option<bool>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub contribution_amount: Option<u64>,

    // ── Registrar-owned ───────────────────────────────────
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub captcha_verified: bool,
    #[serde(default)]
    pub verification_quiz_passed: bool,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub has_previous_contribution: bool,
    #[serde(default)]
    pub previous_contribution_amount: u64,
}

impl RegistrationDraft {
    /// An empty draft for a freshly picked registrant type.
    pub fn new(registration_type: RegistrantType) -> Self {
        Self {
            registration_type,
            name: None,
            email: None,
            contact_number: None,
            whatsapp_number: None,
            gender: None,
            country: None,
            state_ut: None,
            district: None,
            address: None,
            batch_year: None,
            roll_number: None,
            designation: None,
            department: None,
            years_of_service: None,
            profession: None,
            organization: None,
            is_attending: None,
            food_preference: None,
            attendees: AttendeeCounts::default(),
            car_pooling: None,
            car_pooling_seats: None,
            accommodation: None,
            accommodation_capacity: None,
            interested_in_sponsorship: None,
            sponsorship_category: None,
            volunteer_interest: None,
            suggestions: None,
            will_contribute: None,
            contribution_amount: None,
            email_verified: false,
            captcha_verified: false,
            verification_quiz_passed: false,
            payment_status: PaymentStatus::Pending,
            has_previous_contribution: false,
            previous_contribution_amount: 0,
        }
    }

    /// Country is compared by full name only; ISO codes are not recognised.
    pub fn lives_in_india(&self) -> bool {
        self.country
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case(INDIA))
    }

    pub fn lives_in_kerala(&self) -> bool {
        self.lives_in_india()
            && self
                .state_ut
                .as_deref()
                .is_some_and(|s| s.trim().eq_ignore_ascii_case(KERALA))
    }

    /// `false` only when the registrant explicitly said they will not attend.
    pub fn declined_attendance(&self) -> bool {
        self.is_attending == Some(false)
    }

    /// The JSON object sent upstream and kept in the draft store.
    pub fn to_json(&self) -> Value {
        // Serialising a plain struct of strings, numbers and bools cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub const INDIA: &str = "India";
pub const KERALA: &str = "Kerala";

/// Deserialise an optional number that may arrive as `""`, `null`, a string
/// or a JSON number.
pub(crate) fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
        Some(Value::Number(n)) => n.to_string().parse().map(Some).map_err(de::Error::custom),
        Some(other) => Err(de::Error::custom(format!("expected a number, got {other}"))),
    }
}
