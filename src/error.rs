use thiserror::Error;

/// Failures a caller can act on: bad input or a missing record.
///
/// Storage and I/O failures travel as plain `anyhow` errors; these are the
/// cases the CLI reports with a dedicated error code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DoseError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Dose '{0}' not found")]
    NotFound(String),
}

impl DoseError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable machine-readable code used in the JSON error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound(_) => "not_found",
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::NotFound(_) => None,
        }
    }
}
