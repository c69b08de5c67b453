//! Applying a front-end field patch to a draft.
//!
//! A patch is a JSON object of camelCase fields merged over the draft. The
//! registrant type, the verification gates and the payment bookkeeping are
//! owned by the registrar and cannot be patched, and the email is frozen
//! once verified.

use serde_json::{Map, Value};

use crate::errors::{Result, WizardError};
use crate::types::RegistrationDraft;

const READ_ONLY_FIELDS: &[&str] = &[
    "registrationType",
    "emailVerified",
    "captchaVerified",
    "verificationQuizPassed",
    "paymentStatus",
    "hasPreviousContribution",
    "previousContributionAmount",
];

/// Merge `patch` over `draft` and return the updated draft.
///
/// Nested objects (the attendee counts) are merged key by key; `null`
/// clears a field.
pub fn apply_patch(draft: &RegistrationDraft, patch: &Value) -> Result<RegistrationDraft> {
    let patch = patch
        .as_object()
        .ok_or_else(|| WizardError::MalformedDraft("field patch must be a JSON object".into()))?;

    if let Some(key) = patch.keys().find(|k| READ_ONLY_FIELDS.contains(&k.as_str())) {
        return Err(WizardError::ReadOnlyField(key.clone()));
    }

    if draft.email_verified {
        if let Some(email) = patch.get("email") {
            if email.as_str().map(str::trim) != draft.email.as_deref().map(str::trim) {
                return Err(WizardError::EmailLocked);
            }
        }
    }

    let mut merged = draft.to_json();
    if let Value::Object(target) = &mut merged {
        merge_into(target, patch);
    }
    serde_json::from_value(merged).map_err(|e| WizardError::MalformedDraft(e.to_string()))
}

fn merge_into(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming)
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
