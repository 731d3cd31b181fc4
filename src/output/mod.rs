pub mod human;

use serde_json::{Value, json};

use crate::error::DoseError;

/// Standard JSON envelope for a successful command.
pub fn success(command: &str, data: Value) -> Value {
    json!({
        "status": "ok",
        "command": command,
        "data": data,
        "error": null
    })
}

pub fn error(command: &str, code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "command": command,
        "data": null,
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Error envelope for any failure, with the code taken from [`DoseError`]
/// when there is one in the chain.
pub fn from_error(command: &str, err: &anyhow::Error) -> Value {
    match err.downcast_ref::<DoseError>() {
        Some(e) => {
            let mut out = error(command, e.code(), &e.to_string());
            if let Some(field) = e.field() {
                out["error"]["field"] = json!(field);
            }
            out
        }
        None => error(command, "general_error", &err.to_string()),
    }
}
