//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Currency, EngineError, ResultEngine};

/// Trim a required text field, rejecting empty values.
pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Parse a currency code stored in the DB into a strongly typed `Currency`.
pub(crate) fn model_currency(value: &str) -> ResultEngine<Currency> {
    Currency::try_from(value)
        .map_err(|_| EngineError::Corrupted(format!("invalid currency: {value}")))
}

/// Encode a JSON text column.
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T, label: &str) -> ResultEngine<String> {
    serde_json::to_string(value)
        .map_err(|err| EngineError::Corrupted(format!("cannot encode {label}: {err}")))
}

/// Decode a JSON text column.
pub(crate) fn from_json<T: DeserializeOwned>(value: &str, label: &str) -> ResultEngine<T> {
    serde_json::from_str(value)
        .map_err(|err| EngineError::Corrupted(format!("cannot decode {label}: {err}")))
}
