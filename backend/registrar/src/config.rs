//! Application configuration loaded from environment variables.

use std::str::FromStr;

use reunion_wizard::ContributionRates;

use crate::errors::{RegistrarError, Result};

/// When step data reaches the registration backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStrategy {
    /// Each successful advance posts the completed step upstream.
    Progressive,
    /// Only the final submit talks to the backend.
    SubmitAtEnd,
}

impl FromStr for SaveStrategy {
    type Err = RegistrarError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "progressive" => Ok(Self::Progressive),
            "submit-at-end" | "submit_at_end" => Ok(Self::SubmitAtEnd),
            other => Err(RegistrarError::Config(format!(
                "Invalid SAVE_STRATEGY `{other}` (expected `progressive` or `submit-at-end`)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Registration backend base URL (e.g. https://api.example.org/api)
    pub api_base_url: String,
    /// OTP service base URL; defaults to the registration backend
    pub otp_base_url: String,
    /// Path to the SQLite database holding local drafts
    pub database_url: String,
    /// Port for the wizard HTTP API
    pub api_port: u16,
    /// Fixed timeout for every upstream request
    pub request_timeout_secs: u64,
    pub save_strategy: SaveStrategy,
    pub contribution_rates: ContributionRates,
    /// Public key handed to the hosted payment overlay
    pub payment_key_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. `from_env` uses the process
    /// environment; tests pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let defaults = ContributionRates::default();

        let api_base_url = trim_slash(var("API_BASE_URL", "http://localhost:5000/api"));
        let otp_base_url = lookup("OTP_BASE_URL")
            .map(trim_slash)
            .unwrap_or_else(|| api_base_url.clone());

        Ok(Config {
            otp_base_url,
            api_base_url,
            database_url: var("DATABASE_URL", "sqlite:./registrar.db"),
            api_port: parse(&var("API_PORT", "3001"), "API_PORT")?,
            request_timeout_secs: parse(&var("REQUEST_TIMEOUT_SECS", "30"), "REQUEST_TIMEOUT_SECS")?,
            save_strategy: var("SAVE_STRATEGY", "progressive").parse()?,
            contribution_rates: ContributionRates {
                adult: parse(
                    &var("CONTRIBUTION_RATE_ADULT", &defaults.adult.to_string()),
                    "CONTRIBUTION_RATE_ADULT",
                )?,
                teen: parse(
                    &var("CONTRIBUTION_RATE_TEEN", &defaults.teen.to_string()),
                    "CONTRIBUTION_RATE_TEEN",
                )?,
                child: parse(
                    &var("CONTRIBUTION_RATE_CHILD", &defaults.child.to_string()),
                    "CONTRIBUTION_RATE_CHILD",
                )?,
            },
            payment_key_id: lookup("PAYMENT_KEY_ID").filter(|k| !k.trim().is_empty()),
        })
    }
}

fn parse<T: FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| RegistrarError::Config(format!("Invalid {key}")))
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
