//! Test fixtures: an in-memory draft store and a mock registration backend
//! bound to an ephemeral port.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use reqwest::Client;
use reunion_wizard::{ContributionRates, RegistrantType};
use serde_json::{json, Value};

use crate::api_client::ApiClient;
use crate::config::SaveStrategy;
use crate::draft_store::{init_pool, DraftStore};
use crate::service::WizardService;

pub const GOOD_OTP: &str = "123456";
pub const GOOD_SIGNATURE: &str = "sig-ok";
pub const ADMIN_PASSWORD: &str = "hunter2";
pub const ADMIN_TOKEN: &str = "admin-jwt";

pub async fn memory_store() -> DraftStore {
    let pool = init_pool("sqlite::memory:").await.unwrap();
    DraftStore::new(pool)
}

/// Knobs and recordings of the mock backend.
#[derive(Default)]
pub struct MockState {
    calls: Mutex<Vec<String>>,
    submissions: Mutex<Vec<Value>>,
    pub fail_submit: AtomicBool,
    pub fail_step_save: AtomicBool,
    pub fail_verify_payment: AtomicBool,
    pub submit_delay_ms: AtomicU64,
}

pub struct Upstream {
    pub state: Arc<MockState>,
    pub base_url: String,
}

impl Upstream {
    pub fn client(&self) -> ApiClient {
        ApiClient::with_client(Client::new(), &self.base_url, &self.base_url)
    }

    /// `"METHOD /path"` of every request received so far.
    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn last_submission(&self) -> Option<Value> {
        self.state.submissions.lock().unwrap().last().cloned()
    }
}

pub async fn spawn_upstream() -> Upstream {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/registrations/send-otp", post(send_otp))
        .route("/registrations/verify-otp", post(verify_otp))
        .route("/registrations/step/:id", post(save_step))
        .route("/registrations", post(submit).get(all_registrations))
        .route(
            "/registrations/:id",
            get(registration).put(update_registration).delete(delete_registration),
        )
        .route("/payment/create-order", post(create_order))
        .route("/payment/verify-payment", post(verify_payment))
        .route("/admin/login", post(login))
        .route("/admin/dashboard-stats", get(dashboard_stats))
        .route("/admin/registrations", get(admin_registrations))
        .route("/admin/analytics", get(analytics))
        .route("/admin/settings", put(settings))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Upstream {
        state,
        base_url: format!("http://{addr}"),
    }
}

pub fn wizard_service(upstream: &Upstream, store: DraftStore, strategy: SaveStrategy) -> WizardService {
    WizardService::new(
        store,
        upstream.client(),
        ContributionRates::default(),
        strategy,
        Some("rzp_test_key".into()),
    )
}

/// Every form field a registrant of `kind` fills in, ready to pass step
/// validation all the way to the financial step.
pub fn complete_patch(kind: RegistrantType) -> Value {
    let mut patch = json!({
        "email": "asha@example.com",
        "contactNumber": "+919876543210",
        "name": "Asha Menon",
        "country": "India",
        "stateUT": "Kerala",
        "district": "Ernakulam",
        "profession": "Engineer",
        "isAttending": true,
        "foodPreference": "veg",
        "attendees": { "adults": 2, "teens": 1, "children": 0, "toddlers": 1 },
        "carPooling": "no",
        "accommodation": "need",
        "willContribute": true,
        "contributionAmount": 1250
    });
    let extra = match kind {
        RegistrantType::Alumni => json!({ "batchYear": 2005 }),
        RegistrantType::Staff => json!({
            "designation": "Associate Professor",
            "department": "Physics",
            "yearsOfService": 12,
            "interestedInSponsorship": false
        }),
        RegistrantType::Other => json!({}),
    };
    if let (Some(map), Some(extra)) = (patch.as_object_mut(), extra.as_object()) {
        map.extend(extra.clone());
    }
    patch
}

// ─────────────────────────────────────────────────────────
// Mock handlers
// ─────────────────────────────────────────────────────────

async fn record(State(state): State<Arc<MockState>>, request: Request, next: Next) -> Response {
    state
        .calls
        .lock()
        .unwrap()
        .push(format!("{} {}", request.method(), request.uri().path()));
    next.run(request).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {ADMIN_TOKEN}"))
}

async fn send_otp(Json(body): Json<Value>) -> Response {
    if body["email"].as_str().is_none() {
        return error(StatusCode::BAD_REQUEST, "Email is required");
    }
    Json(json!({ "status": "success", "message": "OTP sent" })).into_response()
}

async fn verify_otp(Json(body): Json<Value>) -> Response {
    if body["otp"] != GOOD_OTP {
        return error(StatusCode::UNAUTHORIZED, "Invalid OTP");
    }
    Json(json!({
        "status": "success",
        "verified": true,
        "verificationToken": "tok-1",
        "registrationId": "reg-1"
    }))
    .into_response()
}

async fn save_step(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    if state.fail_step_save.load(Ordering::SeqCst) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Could not save step");
    }
    let id = if id == "new" { "reg-new".to_string() } else { id };
    Json(json!({ "data": { "registrationId": id } })).into_response()
}

async fn submit(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let delay = state.submit_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if state.fail_submit.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))).into_response();
    }
    state.submissions.lock().unwrap().push(body);
    (
        StatusCode::CREATED,
        Json(json!({ "data": { "registrationId": "reg-final" } })),
    )
        .into_response()
}

async fn registration(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return error(StatusCode::NOT_FOUND, "Registration not found");
    }
    Json(json!({ "data": { "registrationId": id, "status": "confirmed" } })).into_response()
}

async fn all_registrations(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    Json(json!({ "data": [{ "registrationId": "reg-final" }] })).into_response()
}

async fn update_registration(
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    Json(json!({ "data": { "registrationId": id, "update": body } })).into_response()
}

async fn delete_registration(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn create_order(Json(body): Json<Value>) -> Response {
    Json(json!({ "id": "order_1", "amount": body["amount"], "currency": "INR" })).into_response()
}

async fn verify_payment(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    if state.fail_verify_payment.load(Ordering::SeqCst) || body["razorpay_signature"] != GOOD_SIGNATURE {
        return error(StatusCode::BAD_REQUEST, "Invalid payment signature");
    }
    Json(json!({ "status": "success" })).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != ADMIN_PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    Json(json!({ "token": ADMIN_TOKEN, "user": { "email": body["email"] } })).into_response()
}

async fn dashboard_stats(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    Json(json!({ "totalRegistrations": 3 })).into_response()
}

async fn admin_registrations(headers: HeaderMap, Query(filters): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    Json(json!({ "filters": filters })).into_response()
}

async fn analytics(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    Json(json!({ "byType": { "alumni": 1, "staff": 1, "other": 1 } })).into_response()
}

async fn settings(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    Json(body).into_response()
}
