use regex::Regex;
use std::sync::LazyLock;
use crate::error::{AppError, AppResult};

static WA_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^62\d{8,13}$").unwrap());

/// Normalizes an Indonesian mobile number to the gateway form `62xxxxxxxxxx`.
/// Accepts `08…`, `8…`, `62…` and `+62…`, ignoring spaces and dashes.
pub fn normalize_wa_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if let Some(rest) = digits.strip_prefix('0') {
        format!("62{}", rest)
    } else if digits.starts_with('8') {
        format!("62{}", digits)
    } else {
        digits
    }
}

/// Validates after normalization and returns the normalized number.
pub fn validate_wa_number(phone: &str) -> AppResult<String> {
    let normalized = normalize_wa_number(phone);

    if !WA_NUMBER.is_match(&normalized) {
        return Err(AppError::ValidationError(
            "Invalid WhatsApp number, expected an Indonesian mobile number (08xx / 62xx)".to_string(),
        ));
    }

    Ok(normalized)
}
