//! # Reunion Wizard
//!
//! Domain core of the reunion registration flow. It holds everything that
//! decides *whether* a registrant may move on, and nothing that talks to the
//! outside world:
//!
//! | Concern              | Module                                    |
//! |----------------------|-------------------------------------------|
//! | Draft model          | [`types`], [`patch`]                      |
//! | Validation schemas   | [`schema`]                                |
//! | Step plans           | [`steps`]                                 |
//! | Step controller      | [`wizard`]                                |
//! | Verification gates   | [`verification`], [`quiz`]                |
//! | Contribution quote   | [`contribution`]                          |
//!
//! ## Architecture
//!
//! The three registrant variants (Alumni, Staff, Other) share one generic
//! [`Wizard`] parameterised by the type's step plan and field map. Storage,
//! HTTP and payment plumbing live in the `registrar` service, which calls
//! into this crate for every decision.

pub mod contribution;
pub mod errors;
pub mod patch;
pub mod quiz;
pub mod schema;
pub mod steps;
pub mod types;
pub mod verification;
pub mod wizard;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_validation;
#[cfg(test)]
mod test_wizard;

pub use contribution::{
    calculate_contribution, check_amount, record_payment, AmountCheck, ContributionQuote,
    ContributionRates,
};
pub use errors::{Gate, WizardError};
pub use patch::apply_patch;
pub use quiz::{Quiz, QuizOutcome};
pub use schema::{validate, validate_fields, Field, FieldError, ValidationReport};
pub use steps::{step_data, step_fields, step_plan, StepName};
pub use types::{
    Accommodation, AttendeeCounts, CarPooling, PaymentStatus, RegistrantType, RegistrationDraft,
};
pub use verification::{apply_verification, ensure_email_unlocked, VerificationKind, VerificationResult};
pub use wizard::{payment_required, Progress, Resumed, Wizard};
