//! Compile errors.
//!
//! The pipeline is total apart from identifier problems detected at finalize
//! time and manifest problems raised by the YAML front-end.

use thiserror::Error;

/// Failure raised while finalizing, converting or lowering a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A mandatory identifier was never set (or set to an empty string).
    #[error("{resource}: required field '{field}' is missing")]
    MissingRequiredField {
        resource: &'static str,
        field: &'static str,
    },

    /// Sanitizing a name left nothing usable.
    #[error("invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// The deployment manifest could not be read or lowered.
    #[error("manifest error: {message}")]
    Manifest { message: String },
}

impl CompileError {
    pub fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_missing_field_display() {
        let err = CompileError::MissingRequiredField {
            resource: "web app",
            field: "name",
        };
        assert_eq!(err.to_string(), "web app: required field 'name' is missing");
    }

    #[test]
    fn test_error_invalid_identifier_display() {
        let err = CompileError::InvalidIdentifier {
            name: "--".to_string(),
            reason: "no alphanumeric characters".to_string(),
        };
        assert!(err.to_string().contains("'--'"));
        assert!(err.to_string().contains("no alphanumeric"));
    }

    #[test]
    fn test_error_manifest_helper() {
        let err = CompileError::manifest("unknown storage 'x'");
        assert_eq!(err.to_string(), "manifest error: unknown storage 'x'");
    }
}
