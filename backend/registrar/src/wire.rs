//! Request and response shapes of the registration, OTP and payment
//! backends. Only the fields the registrar relies on are modelled; admin
//! payloads pass through as raw JSON.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────
// Generic envelopes
// ─────────────────────────────────────────────────────────

/// `{ "status": …, "message": … }`, the reply of most write endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn is_success(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "success" | "ok" | "sent" | "verified"
        )
    }
}

/// `{ "data": … }`
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRef {
    #[serde(rename = "registrationId", alias = "_id", alias = "id")]
    pub registration_id: String,
}

/// Body of a non-success response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}

// ─────────────────────────────────────────────────────────
// OTP
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest<'a> {
    pub email: &'a str,
    pub contact_number: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest<'a> {
    pub email: &'a str,
    pub contact_number: &'a str,
    pub otp: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub verification_token: Option<String>,
    #[serde(default)]
    pub registration_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Registrations
// ─────────────────────────────────────────────────────────

/// `POST /registrations/step/{registrationId|new}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSaveRequest<'a> {
    pub step: usize,
    pub step_name: &'a str,
    pub step_data: Value,
    pub verification_token: Option<&'a str>,
}

// ─────────────────────────────────────────────────────────
// Payment
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub amount: u64,
}

/// A gateway order as created by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub amount: u64,
    pub currency: String,
}

/// Fields the hosted overlay hands back on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCallback {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

// ─────────────────────────────────────────────────────────
// Admin
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Value,
}

/// Query filters for `GET /admin/registrations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Every bearer-authenticated backend call.
#[derive(Debug, Clone)]
pub enum AdminCall {
    DashboardStats,
    Registrations(RegistrationFilters),
    AllRegistrations,
    Registration(String),
    UpdateRegistration(String, Value),
    DeleteRegistration(String),
    Analytics,
    UpdateSettings(Value),
}

impl AdminCall {
    pub fn method(&self) -> Method {
        match self {
            Self::UpdateRegistration(..) | Self::UpdateSettings(_) => Method::PUT,
            Self::DeleteRegistration(_) => Method::DELETE,
            _ => Method::GET,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::DashboardStats => "/admin/dashboard-stats".to_string(),
            Self::Registrations(_) => "/admin/registrations".to_string(),
            Self::AllRegistrations => "/registrations".to_string(),
            Self::Registration(id) | Self::UpdateRegistration(id, _) | Self::DeleteRegistration(id) => {
                format!("/registrations/{id}")
            }
            Self::Analytics => "/admin/analytics".to_string(),
            Self::UpdateSettings(_) => "/admin/settings".to_string(),
        }
    }

    /// The registration id spliced into [`AdminCall::path`], if any.
    pub fn registration_id(&self) -> Option<&str> {
        match self {
            Self::Registration(id) | Self::UpdateRegistration(id, _) | Self::DeleteRegistration(id) => {
                Some(id)
            }
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::UpdateRegistration(_, body) | Self::UpdateSettings(body) => Some(body),
            _ => None,
        }
    }

    pub fn filters(&self) -> Option<&RegistrationFilters> {
        match self {
            Self::Registrations(filters) => Some(filters),
            _ => None,
        }
    }
}
