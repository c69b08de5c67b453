//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use reunion_wizard::quiz::QuestionView;
use reunion_wizard::RegistrantType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api_client::ApiClient;
use crate::errors::{RegistrarError, Result};
use crate::payment::OverlayResult;
use crate::service::{
    CheckoutView, OtpSent, PaymentReceipt, QuizResult, QuoteView, Submitted, WizardService,
    WizardView,
};
use crate::session::AdminSession;
use crate::wire::{AdminCall, LoginRequest, LoginResponse, RegistrationFilters};

pub struct AppState {
    pub wizards: WizardService,
    pub admin: AdminSession,
    pub api: ApiClient,
}

type Shared = State<Arc<AppState>>;
type WizardPath = Path<(String, String)>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/wizard/:client/:kind", get(open_wizard).delete(reset_wizard))
        .route("/wizard/:client/:kind/fields", patch(update_fields))
        .route("/wizard/:client/:kind/otp/send", post(send_otp))
        .route("/wizard/:client/:kind/otp/verify", post(verify_otp))
        .route("/wizard/:client/:kind/captcha", post(record_captcha))
        .route("/wizard/:client/:kind/quiz", get(quiz_questions).post(submit_quiz))
        .route("/wizard/:client/:kind/advance", post(advance))
        .route("/wizard/:client/:kind/retreat", post(retreat))
        .route("/wizard/:client/:kind/quote", get(quote))
        .route("/wizard/:client/:kind/payment/start", post(start_payment))
        .route("/wizard/:client/:kind/payment/complete", post(complete_payment))
        .route("/wizard/:client/:kind/payment/dismiss", post(dismiss_payment))
        .route("/wizard/:client/:kind/submit", post(submit))
        .route("/status/:registration_id", get(registration_status))
        .route("/admin/login", post(admin_login))
        .route("/admin/logout", post(admin_logout))
        .route("/admin/dashboard-stats", get(dashboard_stats))
        .route("/admin/registrations", get(list_registrations))
        .route("/admin/registrations/export", get(export_registrations))
        .route(
            "/admin/registrations/:id",
            get(get_registration)
                .put(update_registration)
                .delete(delete_registration),
        )
        .route("/admin/analytics", get(analytics))
        .route("/admin/settings", axum::routing::put(update_settings))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct OtpBody {
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptchaBody {
    pub verified: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuizBody {
    pub answers: Vec<Option<usize>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPaymentBody {
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub confirm_below_quote: bool,
}

#[derive(Serialize)]
pub struct QuizQuestions<'a> {
    pub questions: Vec<QuestionView<'a>>,
}

fn parse_kind(raw: &str) -> Result<RegistrantType> {
    raw.parse().map_err(RegistrarError::BadRequest)
}

/// The token from an `Authorization: Bearer <token>` header, if any.
fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /wizard/:client/:kind`
///
/// Opens the wizard, restoring a saved draft of the same type.
async fn open_wizard(State(state): Shared, Path((client, kind)): WizardPath) -> Result<Json<WizardView>> {
    Ok(Json(state.wizards.open(&client, parse_kind(&kind)?).await?))
}

/// `DELETE /wizard/:client/:kind`
async fn reset_wizard(State(state): Shared, Path((client, kind)): WizardPath) -> Result<Json<WizardView>> {
    Ok(Json(state.wizards.reset(&client, parse_kind(&kind)?).await?))
}

/// `PATCH /wizard/:client/:kind/fields`
async fn update_fields(
    State(state): Shared,
    Path((client, kind)): WizardPath,
    Json(patch): Json<Value>,
) -> Result<Json<WizardView>> {
    Ok(Json(
        state
            .wizards
            .update_fields(&client, parse_kind(&kind)?, &patch)
            .await?,
    ))
}

/// `POST /wizard/:client/:kind/otp/send`
async fn send_otp(State(state): Shared, Path((client, kind)): WizardPath) -> Result<Json<OtpSent>> {
    Ok(Json(state.wizards.send_otp(&client, parse_kind(&kind)?).await?))
}

/// `POST /wizard/:client/:kind/otp/verify`
async fn verify_otp(
    State(state): Shared,
    Path((client, kind)): WizardPath,
    Json(body): Json<OtpBody>,
) -> Result<Json<WizardView>> {
    Ok(Json(
        state
            .wizards
            .verify_otp(&client, parse_kind(&kind)?, &body.otp)
            .await?,
    ))
}

/// `POST /wizard/:client/:kind/captcha`
async fn record_captcha(
    State(state): Shared,
    Path((client, kind)): WizardPath,
    Json(body): Json<CaptchaBody>,
) -> Result<Json<WizardView>> {
    Ok(Json(
        state
            .wizards
            .record_captcha(&client, parse_kind(&kind)?, body.verified)
            .await?,
    ))
}

/// `GET /wizard/:client/:kind/quiz`
async fn quiz_questions(State(state): Shared, Path((_client, kind)): WizardPath) -> Result<Json<Value>> {
    let questions = state.wizards.quiz_questions(parse_kind(&kind)?)?;
    Ok(Json(serde_json::to_value(QuizQuestions { questions })?))
}

/// `POST /wizard/:client/:kind/quiz`
async fn submit_quiz(
    State(state): Shared,
    Path((client, kind)): WizardPath,
    Json(body): Json<QuizBody>,
) -> Result<Json<QuizResult>> {
    Ok(Json(
        state
            .wizards
            .submit_quiz(&client, parse_kind(&kind)?, &body.answers)
            .await?,
    ))
}

/// `POST /wizard/:client/:kind/advance`
async fn advance(State(state): Shared, Path((client, kind)): WizardPath) -> Result<Json<WizardView>> {
    Ok(Json(state.wizards.advance(&client, parse_kind(&kind)?).await?))
}

/// `POST /wizard/:client/:kind/retreat`
async fn retreat(State(state): Shared, Path((client, kind)): WizardPath) -> Result<Json<WizardView>> {
    Ok(Json(state.wizards.retreat(&client, parse_kind(&kind)?).await?))
}

/// `GET /wizard/:client/:kind/quote`
async fn quote(State(state): Shared, Path((client, kind)): WizardPath) -> Result<Json<QuoteView>> {
    Ok(Json(state.wizards.quote(&client, parse_kind(&kind)?).await?))
}

/// `POST /wizard/:client/:kind/payment/start`
async fn start_payment(
    State(state): Shared,
    Path((client, kind)): WizardPath,
    Json(body): Json<StartPaymentBody>,
) -> Result<Json<CheckoutView>> {
    Ok(Json(
        state
            .wizards
            .start_payment(&client, parse_kind(&kind)?, body.amount, body.confirm_below_quote)
            .await?,
    ))
}

/// `POST /wizard/:client/:kind/payment/complete`
async fn complete_payment(
    State(state): Shared,
    Path((client, kind)): WizardPath,
    Json(result): Json<OverlayResult>,
) -> Result<Json<PaymentReceipt>> {
    Ok(Json(
        state
            .wizards
            .complete_payment(&client, parse_kind(&kind)?, result)
            .await?,
    ))
}

/// `POST /wizard/:client/:kind/payment/dismiss`
async fn dismiss_payment(
    State(state): Shared,
    Path((client, kind)): WizardPath,
) -> Result<Json<PaymentReceipt>> {
    Ok(Json(
        state
            .wizards
            .dismiss_payment(&client, parse_kind(&kind)?)
            .await?,
    ))
}

/// `POST /wizard/:client/:kind/submit`
async fn submit(
    State(state): Shared,
    Path((client, kind)): WizardPath,
) -> Result<(StatusCode, Json<Submitted>)> {
    let submitted = state.wizards.submit(&client, parse_kind(&kind)?).await?;
    Ok((StatusCode::CREATED, Json(submitted)))
}

/// `GET /status/:registration_id`
async fn registration_status(
    State(state): Shared,
    Path(registration_id): Path<String>,
) -> Result<Json<Value>> {
    Ok(Json(state.wizards.status(&registration_id).await?))
}

// ─────────────────────────────────────────────────────────
// Admin
// ─────────────────────────────────────────────────────────

/// `POST /admin/login`
async fn admin_login(
    State(state): Shared,
    Json(credentials): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    Ok(Json(state.admin.login(&state.api, &credentials).await?))
}

/// `POST /admin/logout`
async fn admin_logout(State(state): Shared, headers: HeaderMap) -> Result<StatusCode> {
    if let Some(token) = bearer(&headers) {
        state.admin.logout(token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_call(state: &AppState, headers: &HeaderMap, call: AdminCall) -> Result<Json<Value>> {
    Ok(Json(state.admin.call(&state.api, bearer(headers), &call).await?))
}

/// `GET /admin/dashboard-stats`
async fn dashboard_stats(State(state): Shared, headers: HeaderMap) -> Result<Json<Value>> {
    admin_call(&state, &headers, AdminCall::DashboardStats).await
}

/// `GET /admin/registrations?{filters}`
async fn list_registrations(
    State(state): Shared,
    headers: HeaderMap,
    Query(filters): Query<RegistrationFilters>,
) -> Result<Json<Value>> {
    admin_call(&state, &headers, AdminCall::Registrations(filters)).await
}

/// `GET /admin/registrations/export`, every registration unfiltered.
async fn export_registrations(State(state): Shared, headers: HeaderMap) -> Result<Json<Value>> {
    admin_call(&state, &headers, AdminCall::AllRegistrations).await
}

/// `GET /admin/registrations/:id`
async fn get_registration(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    admin_call(&state, &headers, AdminCall::Registration(id)).await
}

/// `PUT /admin/registrations/:id`
async fn update_registration(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    admin_call(&state, &headers, AdminCall::UpdateRegistration(id, body)).await
}

/// `DELETE /admin/registrations/:id`
async fn delete_registration(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    admin_call(&state, &headers, AdminCall::DeleteRegistration(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/analytics`
async fn analytics(State(state): Shared, headers: HeaderMap) -> Result<Json<Value>> {
    admin_call(&state, &headers, AdminCall::Analytics).await
}

/// `PUT /admin/settings`
async fn update_settings(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    admin_call(&state, &headers, AdminCall::UpdateSettings(body)).await
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
