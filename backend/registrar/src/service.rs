//! Wizard service: one step controller per `(client, type)`, driven by the
//! HTTP routes.
//!
//! ## Life of an action
//!
//! 1. Claim the wizard's action lock. A second request while one is in
//!    flight gets [`RegistrarError::Busy`].
//! 2. Rebuild the wizard from the draft store.
//! 3. Ask the domain crate whether the action is allowed.
//! 4. Make any upstream call under the wizard's cancellation token, so a
//!    reset drops it without touching state.
//! 5. Persist and return a fresh [`WizardView`].
//!
//! Nothing is written before the upstream call succeeds, so a failed
//! action leaves the stored draft as it was.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use reunion_wizard::quiz::{QuestionView, REVEAL_DELAY_MS};
use reunion_wizard::steps::is_skipped;
use reunion_wizard::{
    apply_patch, apply_verification, check_amount, ensure_email_unlocked, payment_required,
    record_payment, step_data, validate_fields, AmountCheck, ContributionQuote,
    ContributionRates, Field, Progress, Quiz, QuizOutcome, RegistrantType, RegistrationDraft,
    StepName, VerificationResult, Wizard, WizardError,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api_client::ApiClient;
use crate::config::SaveStrategy;
use crate::draft_store::{DraftKey, DraftStore};
use crate::errors::{RegistrarError, Result};
use crate::payment::{CheckoutSession, OverlayResult, PaymentFlow, PaymentOutcome};
use crate::wire::{Order, StepSaveRequest};

const MAX_CLIENT_ID_LEN: usize = 64;

// ─────────────────────────────────────────────────────────
// Views
// ─────────────────────────────────────────────────────────

/// Everything the front end needs to render the current step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub progress: Progress,
    pub draft: RegistrationDraft,
    pub registration_id: Option<String>,
    /// A saved draft was picked up when the wizard was opened.
    pub restored: bool,
    /// The step changed; the page should scroll back to the top.
    pub scroll_to_top: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSent {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    #[serde(flatten)]
    pub outcome: QuizOutcome,
    pub reveal_delay_ms: u64,
    pub wizard: WizardView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    pub quote: ContributionQuote,
    /// How the amount currently on the draft compares to the quote.
    pub amount_check: Option<AmountCheck>,
    pub payment_required: bool,
    pub already_paid: u64,
}

/// What the hosted overlay needs to open.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub order: Order,
    pub amount: u64,
    pub key_id: Option<String>,
    pub prefill_name: Option<String>,
    pub prefill_email: Option<String>,
    pub prefill_contact: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub outcome: PaymentOutcome,
    pub wizard: WizardView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submitted {
    pub registration_id: String,
    pub progress: Progress,
}

// ─────────────────────────────────────────────────────────
// Per-wizard runtime state
// ─────────────────────────────────────────────────────────

struct WizardSlot {
    action: Arc<tokio::sync::Mutex<()>>,
    cancel: Mutex<CancellationToken>,
    checkout: Mutex<Option<CheckoutSession>>,
}

impl WizardSlot {
    fn new() -> Self {
        Self {
            action: Arc::new(tokio::sync::Mutex::new(())),
            cancel: Mutex::new(CancellationToken::new()),
            checkout: Mutex::new(None),
        }
    }

    fn token(&self) -> CancellationToken {
        lock(&self.cancel).clone()
    }
}

type SlotMap = Arc<Mutex<HashMap<DraftKey, Arc<WizardSlot>>>>;

/// Holding this means no other action runs on the wizard.
struct ActionGuard {
    slots: SlotMap,
    key: DraftKey,
    slot: Arc<WizardSlot>,
    cancel: CancellationToken,
    _held: OwnedMutexGuard<()>,
}

impl Drop for ActionGuard {
    /// Forget the slot once nothing refers to it and no checkout is open,
    /// so the map only holds wizards with work pending.
    fn drop(&mut self) {
        if lock(&self.slot.checkout).is_some() {
            return;
        }
        let mut slots = lock(&self.slots);
        let idle = slots
            .get(&self.key)
            .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot) && Arc::strong_count(slot) == 2);
        if idle {
            slots.remove(&self.key);
        }
    }
}

impl ActionGuard {
    /// Run an upstream call, abandoning it if the wizard is reset meanwhile.
    async fn guarded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(RegistrarError::Cancelled),
            result = call => result,
        }
    }
}

/// A wizard rebuilt from the store.
struct Loaded {
    key: DraftKey,
    wizard: Wizard,
    draft: RegistrationDraft,
    verification_token: Option<String>,
    registration_id: Option<String>,
    restored: bool,
}

impl Loaded {
    fn view(&self, scroll_to_top: bool) -> WizardView {
        WizardView {
            progress: self.wizard.progress(),
            draft: self.draft.clone(),
            registration_id: self.registration_id.clone(),
            restored: self.restored,
            scroll_to_top,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────

pub struct WizardService {
    store: DraftStore,
    api: ApiClient,
    rates: ContributionRates,
    strategy: SaveStrategy,
    payment_key_id: Option<String>,
    quiz: Quiz,
    slots: SlotMap,
}

impl WizardService {
    pub fn new(
        store: DraftStore,
        api: ApiClient,
        rates: ContributionRates,
        strategy: SaveStrategy,
        payment_key_id: Option<String>,
    ) -> Self {
        Self {
            store,
            api,
            rates,
            strategy,
            payment_key_id,
            quiz: Quiz::alumni(),
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn slot(&self, key: &DraftKey) -> Arc<WizardSlot> {
        lock(&self.slots)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(WizardSlot::new()))
            .clone()
    }

    fn begin(&self, key: &DraftKey) -> Result<ActionGuard> {
        let slot = self.slot(key);
        let held = slot
            .action
            .clone()
            .try_lock_owned()
            .map_err(|_| RegistrarError::Busy)?;
        Ok(self.guard(key, slot, held))
    }

    fn guard(&self, key: &DraftKey, slot: Arc<WizardSlot>, held: OwnedMutexGuard<()>) -> ActionGuard {
        ActionGuard {
            slots: Arc::clone(&self.slots),
            key: key.clone(),
            cancel: slot.token(),
            slot,
            _held: held,
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        lock(&self.slots).len()
    }

    async fn load(&self, key: DraftKey, kind: RegistrantType) -> Result<Loaded> {
        let saved = self.store.load(&key).await?;
        if let Some(saved) = &saved {
            debug!("Loaded `{}` saved at {}", key.draft(), saved.saved_at);
        }
        let (verification_token, registration_id) = saved
            .as_ref()
            .map(|s| (s.verification_token.clone(), s.registration_id.clone()))
            .unwrap_or_default();
        let resumed = Wizard::resume(kind, saved.map(|s| (s.draft, s.step)));
        Ok(Loaded {
            key,
            wizard: resumed.wizard,
            draft: resumed.draft,
            verification_token,
            registration_id,
            restored: resumed.restored,
        })
    }

    async fn persist(&self, loaded: &Loaded) -> Result<()> {
        self.store
            .save(&loaded.key, &loaded.draft, loaded.wizard.current_index())
            .await
    }

    // ─────────────────────────────────────────────────────────
    // Opening and editing
    // ─────────────────────────────────────────────────────────

    /// Open the wizard, restoring a saved draft of the same type if any.
    pub async fn open(&self, client: &str, kind: RegistrantType) -> Result<WizardView> {
        let key = draft_key(client, kind)?;
        let loaded = self.load(key, kind).await?;
        if loaded.restored {
            debug!(
                "Restored {kind} draft for `{client}` at step {}",
                loaded.wizard.current_index()
            );
        }
        Ok(loaded.view(false))
    }

    /// Merge a field patch into the draft and persist it straight away.
    pub async fn update_fields(
        &self,
        client: &str,
        kind: RegistrantType,
        patch: &Value,
    ) -> Result<WizardView> {
        let key = draft_key(client, kind)?;
        let _guard = self.begin(&key)?;
        let mut loaded = self.load(key, kind).await?;

        loaded.draft = apply_patch(&loaded.draft, patch)?;
        self.persist(&loaded).await?;
        Ok(loaded.view(false))
    }

    // ─────────────────────────────────────────────────────────
    // Verification
    // ─────────────────────────────────────────────────────────

    /// Ask the OTP service to send a code to the draft's email and phone.
    pub async fn send_otp(&self, client: &str, kind: RegistrantType) -> Result<OtpSent> {
        let key = draft_key(client, kind)?;
        let guard = self.begin(&key)?;
        let loaded = self.load(key, kind).await?;

        ensure_email_unlocked(&loaded.draft)?;
        let (email, phone) = contact_details(&loaded.draft)?;

        let reply = guarded_verification(guard.guarded(self.api.send_otp(email, phone)).await)?;
        if !reply.is_success() {
            return Err(RegistrarError::Verification(
                reply.message.unwrap_or_else(|| "Failed to send OTP".to_string()),
            ));
        }
        info!("OTP sent for {kind} registration of `{client}`");
        Ok(OtpSent {
            message: reply
                .message
                .unwrap_or_else(|| format!("OTP sent to {email}")),
        })
    }

    /// Check a code. On success the email is verified (and frozen) and the
    /// server's token and registration id are cached.
    pub async fn verify_otp(&self, client: &str, kind: RegistrantType, code: &str) -> Result<WizardView> {
        let key = draft_key(client, kind)?;
        let guard = self.begin(&key)?;
        let mut loaded = self.load(key, kind).await?;

        ensure_email_unlocked(&loaded.draft)?;
        let (email, phone) = contact_details(&loaded.draft)?;
        if code.trim().is_empty() {
            return Err(RegistrarError::Verification("Please enter the OTP".into()));
        }

        let reply = guarded_verification(
            guard
                .guarded(self.api.verify_otp(email, phone, code.trim()))
                .await,
        )?;
        if !reply.verified {
            return Err(RegistrarError::Verification(
                reply.message.unwrap_or_else(|| "Invalid OTP".to_string()),
            ));
        }

        let result = VerificationResult::otp(true, reply.verification_token, reply.registration_id);
        apply_verification(&mut loaded.draft, &result)?;
        self.persist(&loaded).await?;
        self.store
            .save_credentials(
                &loaded.key,
                result.token.as_deref(),
                result.registration_id.as_deref(),
            )
            .await?;
        if result.registration_id.is_some() {
            loaded.registration_id = result.registration_id;
        }

        info!("Email verified for {kind} registration of `{client}`");
        Ok(loaded.view(false))
    }

    /// Record the CAPTCHA widget's verdict.
    pub async fn record_captcha(
        &self,
        client: &str,
        kind: RegistrantType,
        passed: bool,
    ) -> Result<WizardView> {
        let key = draft_key(client, kind)?;
        let _guard = self.begin(&key)?;
        let mut loaded = self.load(key, kind).await?;

        apply_verification(&mut loaded.draft, &VerificationResult::captcha(passed))?;
        self.persist(&loaded).await?;
        Ok(loaded.view(false))
    }

    pub fn quiz_questions(&self, kind: RegistrantType) -> Result<Vec<QuestionView<'_>>> {
        if kind != RegistrantType::Alumni {
            return Err(WizardError::QuizNotApplicable.into());
        }
        Ok(self.quiz.questions())
    }

    /// Grade the alumni quiz locally; the gate flag follows the result.
    pub async fn submit_quiz(
        &self,
        client: &str,
        kind: RegistrantType,
        answers: &[Option<usize>],
    ) -> Result<QuizResult> {
        let key = draft_key(client, kind)?;
        let _guard = self.begin(&key)?;
        let mut loaded = self.load(key, kind).await?;

        let outcome = self.quiz.grade(answers);
        apply_verification(&mut loaded.draft, &VerificationResult::quiz(outcome.passed))?;
        self.persist(&loaded).await?;

        debug!("Quiz for `{client}` scored {}/{}", outcome.score, outcome.total);
        Ok(QuizResult {
            outcome,
            reveal_delay_ms: REVEAL_DELAY_MS,
            wizard: loaded.view(false),
        })
    }

    // ─────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────

    /// Validate the active step and move on. Under the progressive
    /// strategy the completed step is saved upstream first, and a failed
    /// save keeps the registrant where they are.
    pub async fn advance(&self, client: &str, kind: RegistrantType) -> Result<WizardView> {
        let key = draft_key(client, kind)?;
        let guard = self.begin(&key)?;
        let mut loaded = self.load(key, kind).await?;

        let completed_index = loaded.wizard.current_index();
        let completed = loaded.wizard.current_step();
        loaded.wizard.advance(&loaded.draft)?;

        if self.strategy == SaveStrategy::Progressive && !is_skipped(completed, &loaded.draft) {
            self.save_step_upstream(&guard, &mut loaded, completed_index, completed)
                .await?;
        }

        self.persist(&loaded).await?;
        Ok(loaded.view(true))
    }

    async fn save_step_upstream(
        &self,
        guard: &ActionGuard,
        loaded: &mut Loaded,
        index: usize,
        step: StepName,
    ) -> Result<()> {
        let request = StepSaveRequest {
            step: index,
            step_name: step.as_str(),
            step_data: step_data(step, &loaded.draft),
            verification_token: loaded.verification_token.as_deref(),
        };
        let id = guard
            .guarded(self.api.save_step(loaded.registration_id.as_deref(), &request))
            .await
            .map_err(|e| {
                warn!("Saving step `{}` upstream failed: {e}", step.as_str());
                e
            })?;

        if loaded.registration_id.as_deref() != Some(id.as_str()) {
            self.store.save_credentials(&loaded.key, None, Some(&id)).await?;
            loaded.registration_id = Some(id);
        }
        Ok(())
    }

    /// Step back. Nothing is validated and only the step index is saved.
    pub async fn retreat(&self, client: &str, kind: RegistrantType) -> Result<WizardView> {
        let key = draft_key(client, kind)?;
        let _guard = self.begin(&key)?;
        let mut loaded = self.load(key, kind).await?;

        loaded.wizard.retreat(&loaded.draft)?;
        self.store
            .save_step(&loaded.key, loaded.wizard.current_index())
            .await?;
        Ok(loaded.view(true))
    }

    // ─────────────────────────────────────────────────────────
    // Contribution and payment
    // ─────────────────────────────────────────────────────────

    pub async fn quote(&self, client: &str, kind: RegistrantType) -> Result<QuoteView> {
        let key = draft_key(client, kind)?;
        let loaded = self.load(key, kind).await?;
        let quote = ContributionQuote::for_draft(&loaded.draft, &self.rates);
        Ok(QuoteView {
            amount_check: loaded
                .draft
                .contribution_amount
                .map(|amount| check_amount(amount, &quote)),
            payment_required: payment_required(kind, &loaded.draft),
            already_paid: loaded.draft.previous_contribution_amount,
            quote,
        })
    }

    /// Create a gateway order. An amount below the quote needs
    /// `confirm_below_quote`; it is never adjusted.
    pub async fn start_payment(
        &self,
        client: &str,
        kind: RegistrantType,
        amount: Option<u64>,
        confirm_below_quote: bool,
    ) -> Result<CheckoutView> {
        let key = draft_key(client, kind)?;
        let guard = self.begin(&key)?;
        let loaded = self.load(key, kind).await?;

        let amount = amount
            .or(loaded.draft.contribution_amount)
            .filter(|a| *a > 0)
            .ok_or_else(|| {
                RegistrarError::BadRequest("Contribution amount must be greater than 0".into())
            })?;

        let quote = ContributionQuote::for_draft(&loaded.draft, &self.rates);
        if let AmountCheck::BelowQuote { quote, shortfall } = check_amount(amount, &quote) {
            if !confirm_below_quote {
                return Err(RegistrarError::BelowQuote { quote, shortfall });
            }
            debug!("Proceeding with {amount}, {shortfall} below the quote");
        }

        let session = guard.guarded(PaymentFlow::new(&self.api).open(amount)).await?;
        let view = CheckoutView {
            order: session.order.clone(),
            amount,
            key_id: self.payment_key_id.clone(),
            prefill_name: loaded.draft.name.clone(),
            prefill_email: loaded.draft.email.clone(),
            prefill_contact: loaded.draft.contact_number.clone(),
        };
        *lock(&guard.slot.checkout) = Some(session);
        Ok(view)
    }

    /// Settle the open checkout with what the overlay reported. Only a
    /// verified payment touches the draft.
    pub async fn complete_payment(
        &self,
        client: &str,
        kind: RegistrantType,
        result: OverlayResult,
    ) -> Result<PaymentReceipt> {
        let key = draft_key(client, kind)?;
        let guard = self.begin(&key)?;
        let session = lock(&guard.slot.checkout)
            .take()
            .ok_or_else(|| RegistrarError::BadRequest("No payment is in progress".into()))?;

        let outcome = guard
            .guarded(async {
                Ok::<_, RegistrarError>(PaymentFlow::new(&self.api).settle(&session, result).await)
            })
            .await?;

        match &outcome {
            PaymentOutcome::Paid { amount, payment_id } => {
                let mut loaded = self.load(key, kind).await?;
                record_payment(&mut loaded.draft, *amount);
                self.persist(&loaded).await?;
                info!("Recorded payment {payment_id} of {amount} for `{client}`");
                Ok(PaymentReceipt {
                    outcome,
                    wizard: loaded.view(false),
                })
            }
            PaymentOutcome::Failed { reason } => Err(RegistrarError::Payment(reason.clone())),
        }
    }

    /// The registrant closed the overlay without paying.
    pub async fn dismiss_payment(&self, client: &str, kind: RegistrantType) -> Result<PaymentReceipt> {
        self.complete_payment(client, kind, OverlayResult::Dismissed)
            .await
    }

    // ─────────────────────────────────────────────────────────
    // Submission and reset
    // ─────────────────────────────────────────────────────────

    /// Submit the full registration. On success the local draft is gone
    /// and the wizard is back at the first step.
    pub async fn submit(&self, client: &str, kind: RegistrantType) -> Result<Submitted> {
        let key = draft_key(client, kind)?;
        let guard = self.begin(&key)?;
        let mut loaded = self.load(key, kind).await?;

        loaded.wizard.ensure_submittable(&loaded.draft)?;

        let mut body = loaded.draft.to_json();
        if let Some(map) = body.as_object_mut() {
            if let Some(token) = &loaded.verification_token {
                map.insert("verificationToken".into(), Value::String(token.clone()));
            }
            if let Some(id) = &loaded.registration_id {
                map.insert("registrationId".into(), Value::String(id.clone()));
            }
        }

        let registration_id = guard
            .guarded(self.api.submit_registration(&body))
            .await?;

        self.store.clear(&loaded.key).await?;
        *lock(&guard.slot.checkout) = None;
        loaded.wizard.reset();
        info!("{kind} registration `{registration_id}` submitted for `{client}`");

        Ok(Submitted {
            registration_id,
            progress: loaded.wizard.progress(),
        })
    }

    /// Drop the draft and cancel whatever is in flight for this wizard.
    pub async fn reset(&self, client: &str, kind: RegistrantType) -> Result<WizardView> {
        let key = draft_key(client, kind)?;
        let existing = lock(&self.slots).get(&key).cloned();

        if let Some(slot) = existing {
            let previous = std::mem::replace(&mut *lock(&slot.cancel), CancellationToken::new());
            previous.cancel();
            let held = slot.action.clone().lock_owned().await;
            *lock(&slot.checkout) = None;
            let _guard = self.guard(&key, slot, held);
            self.store.clear(&key).await?;
        } else {
            self.store.clear(&key).await?;
        }
        info!("Reset {kind} wizard for `{client}`");

        Ok(self.load(key, kind).await?.view(true))
    }

    /// Public status lookup for a submitted registration.
    pub async fn status(&self, registration_id: &str) -> Result<Value> {
        if registration_id.trim().is_empty() {
            return Err(RegistrarError::BadRequest("Registration id is required".into()));
        }
        self.api
            .registration_status(registration_id.trim())
            .await
            .map_err(|e| match e {
                RegistrarError::Api { status: 404, message } => RegistrarError::NotFound(message),
                other => other,
            })
    }
}

fn draft_key(client: &str, kind: RegistrantType) -> Result<DraftKey> {
    let valid = !client.is_empty()
        && client.len() <= MAX_CLIENT_ID_LEN
        && client
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(RegistrarError::BadRequest(format!("Invalid client id `{client}`")));
    }
    Ok(DraftKey::new(client, kind))
}

/// Email and phone, both valid, or the first validation error.
fn contact_details(draft: &RegistrationDraft) -> Result<(&str, &str)> {
    let report = validate_fields(draft, &[Field::Email, Field::ContactNumber]);
    if let Some(err) = WizardError::from_report(StepName::Verification, report) {
        return Err(err.into());
    }
    match (draft.email.as_deref(), draft.contact_number.as_deref()) {
        (Some(email), Some(phone)) => Ok((email.trim(), phone.trim())),
        _ => Err(RegistrarError::BadRequest("Email and phone number are required".into())),
    }
}

/// A rejected OTP request is something the registrant can retry, not an
/// upstream outage.
fn guarded_verification<T>(result: Result<T>) -> Result<T> {
    result.map_err(|e| match e {
        RegistrarError::Api { status, message } if (400..500).contains(&status) => {
            RegistrarError::Verification(message)
        }
        other => other,
    })
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
