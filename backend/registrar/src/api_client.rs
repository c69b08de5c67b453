//! Registration backend client: OTP, step saves, submission, payment and
//! admin calls.
//!
//! ## Behaviour
//!
//! * Every request shares one [`reqwest::Client`] with a fixed timeout.
//! * There is no retry or backoff: a failure is reported once and the user
//!   decides whether to try again.
//! * Non-success responses become [`RegistrarError::Api`] carrying the
//!   backend's `message`, or [`FALLBACK_MESSAGE`] when there is none.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::{RegistrarError, Result, FALLBACK_MESSAGE};
use crate::wire::{
    AdminCall, CreateOrderRequest, DataEnvelope, ErrorBody, LoginRequest, LoginResponse, Order,
    PaymentCallback, RegistrationRef, SendOtpRequest, StatusResponse, StepSaveRequest,
    VerifyOtpRequest, VerifyOtpResponse,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    otp_base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(
            http,
            &config.api_base_url,
            &config.otp_base_url,
        ))
    }

    pub fn with_client(http: Client, base_url: &str, otp_base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            otp_base_url: otp_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    // ─────────────────────────────────────────────────────────
    // OTP
    // ─────────────────────────────────────────────────────────

    /// `POST /registrations/send-otp`
    pub async fn send_otp(&self, email: &str, contact_number: &str) -> Result<StatusResponse> {
        let request = self
            .http
            .post(format!("{}/registrations/send-otp", self.otp_base_url))
            .json(&SendOtpRequest {
                email,
                contact_number,
            });
        send_json(request).await
    }

    /// `POST /registrations/verify-otp`
    ///
    /// A wrong code comes back as a 401 from the OTP service; callers treat
    /// any error here as a failed attempt.
    pub async fn verify_otp(
        &self,
        email: &str,
        contact_number: &str,
        otp: &str,
    ) -> Result<VerifyOtpResponse> {
        let request = self
            .http
            .post(format!("{}/registrations/verify-otp", self.otp_base_url))
            .json(&VerifyOtpRequest {
                email,
                contact_number,
                otp,
            });
        send_json(request).await
    }

    // ─────────────────────────────────────────────────────────
    // Registrations
    // ─────────────────────────────────────────────────────────

    /// `POST /registrations/step/{id|new}`. Returns the backend's
    /// registration id, which is the one to use for later saves.
    pub async fn save_step(
        &self,
        registration_id: Option<&str>,
        request: &StepSaveRequest<'_>,
    ) -> Result<String> {
        let target = registration_id.map(path_segment).transpose()?.unwrap_or("new");
        let envelope: DataEnvelope<RegistrationRef> = send_json(
            self.http
                .post(self.url(&format!("/registrations/step/{target}")))
                .json(request),
        )
        .await?;
        Ok(envelope.data.registration_id)
    }

    /// `POST /registrations` with the full draft.
    pub async fn submit_registration(&self, body: &Value) -> Result<String> {
        let envelope: DataEnvelope<RegistrationRef> =
            send_json(self.http.post(self.url("/registrations")).json(body)).await?;
        Ok(envelope.data.registration_id)
    }

    /// `GET /registrations/:id`, unauthenticated status lookup.
    pub async fn registration_status(&self, registration_id: &str) -> Result<Value> {
        let id = path_segment(registration_id)?;
        send_json(self.http.get(self.url(&format!("/registrations/{id}")))).await
    }

    // ─────────────────────────────────────────────────────────
    // Payment
    // ─────────────────────────────────────────────────────────

    /// `POST /payment/create-order`
    pub async fn create_order(&self, amount: u64) -> Result<Order> {
        send_json(
            self.http
                .post(self.url("/payment/create-order"))
                .json(&CreateOrderRequest { amount }),
        )
        .await
    }

    /// `POST /payment/verify-payment`
    pub async fn verify_payment(&self, callback: &PaymentCallback) -> Result<StatusResponse> {
        send_json(
            self.http
                .post(self.url("/payment/verify-payment"))
                .json(callback),
        )
        .await
    }

    // ─────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────

    /// `POST /admin/login`
    pub async fn admin_login(&self, credentials: &LoginRequest) -> Result<LoginResponse> {
        send_json(self.http.post(self.url("/admin/login")).json(credentials)).await
    }

    /// Run a bearer-authenticated admin call.
    pub async fn admin(&self, token: &str, call: &AdminCall) -> Result<Value> {
        if let Some(id) = call.registration_id() {
            path_segment(id)?;
        }
        let mut request = self
            .http
            .request(call.method(), self.url(&call.path()))
            .bearer_auth(token);
        if let Some(filters) = call.filters() {
            request = request.query(filters);
        }
        if let Some(body) = call.body() {
            request = request.json(body);
        }
        send_json(request).await
    }
}

/// Registration ids are spliced into upstream paths, so they are limited
/// to a single plain segment.
fn path_segment(id: &str) -> Result<&str> {
    let plain = !id.is_empty()
        && id.len() <= 128
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if plain {
        Ok(id)
    } else {
        warn!("Refusing registration id {id:?} in an upstream path");
        Err(RegistrarError::BadRequest("Invalid registration id".into()))
    }
}

/// Send a request and decode a JSON body, mapping non-success statuses.
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request.send().await.map_err(|e| {
        warn!("Upstream request failed: {e}");
        RegistrarError::Http(e)
    })?;
    read_json(response).await
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let url = response.url().path().to_string();

    if !status.is_success() {
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .into_message()
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        warn!("{url} answered {status}: {message}");
        return Err(RegistrarError::Api {
            status: status.as_u16(),
            message,
        });
    }

    debug!("{url} answered {status}");
    if status == reqwest::StatusCode::NO_CONTENT {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(response.json().await?)
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
