//! # Contribution quote and payment bookkeeping
//!
//! The quote is a suggestion only: it is used to pre-fill the amount and to
//! warn when the chosen amount undershoots it, never to overwrite what the
//! registrant picked.

use serde::{Deserialize, Serialize};

use crate::types::{AttendeeCounts, PaymentStatus, RegistrationDraft};

/// Per-head rates. Toddlers are always free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionRates {
    pub adult: u64,
    pub teen: u64,
    pub child: u64,
}

impl Default for ContributionRates {
    fn default() -> Self {
        Self {
            adult: 500,
            teen: 250,
            child: 150,
        }
    }
}

/// Suggested amount for a declared head count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionQuote {
    pub amount: u64,
    pub attendees: AttendeeCounts,
    pub rates: ContributionRates,
}

impl ContributionQuote {
    pub fn for_draft(draft: &RegistrationDraft, rates: &ContributionRates) -> Self {
        Self {
            amount: calculate_contribution(&draft.attendees, rates),
            attendees: draft.attendees.clone(),
            rates: *rates,
        }
    }
}

/// Weighted sum over the age groups.
pub fn calculate_contribution(counts: &AttendeeCounts, rates: &ContributionRates) -> u64 {
    let weighted = |count: Option<u32>, rate: u64| u64::from(count.unwrap_or(0)).saturating_mul(rate);
    weighted(counts.adults, rates.adult)
        .saturating_add(weighted(counts.teens, rates.teen))
        .saturating_add(weighted(counts.children, rates.child))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AmountCheck {
    Sufficient,
    /// Needs an explicit "proceed anyway" from the registrant.
    BelowQuote { quote: u64, shortfall: u64 },
}

pub fn check_amount(amount: u64, quote: &ContributionQuote) -> AmountCheck {
    if amount >= quote.amount {
        AmountCheck::Sufficient
    } else {
        AmountCheck::BelowQuote {
            quote: quote.amount,
            shortfall: quote.amount - amount,
        }
    }
}

/// Book a verified payment. Payments in the same session add up.
pub fn record_payment(draft: &mut RegistrationDraft, amount: u64) {
    draft.has_previous_contribution = true;
    draft.previous_contribution_amount = draft.previous_contribution_amount.saturating_add(amount);
    draft.payment_status = PaymentStatus::Completed;
}
