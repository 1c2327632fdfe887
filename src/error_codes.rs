use std::fmt;

use anyhow::Error;
use serde::Serialize;
use serde_json::Value;

pub const INVALID_CONFIG: &str = "INVALID_CONFIG";
pub const UNSUPPORTED_PLATFORM: &str = "UNSUPPORTED_PLATFORM";
pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
pub const COMMAND_FAILED: &str = "COMMAND_FAILED";
pub const SURFACE_ALLOCATION_FAILED: &str = "SURFACE_ALLOCATION_FAILED";
pub const IMAGE_ENCODE_FAILED: &str = "IMAGE_ENCODE_FAILED";

/// Which side of the boundary a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodedErrorKind {
    /// Platform, permissions or external commands.
    Environment,
    /// Caller-supplied data that cannot be used.
    Input,
    /// Drawing surfaces and encoders.
    Resource,
}

#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
    pub kind: CodedErrorKind,
}

impl CodedError {
    pub fn environment(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, message, CodedErrorKind::Environment)
    }

    pub fn input(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, message, CodedErrorKind::Input)
    }

    pub fn resource(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, message, CodedErrorKind::Resource)
    }

    fn new(code: &'static str, message: impl Into<String>, kind: CodedErrorKind) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code.to_owned(),
                kind: self.kind,
                message: self.message.clone(),
                details: self.details.clone(),
            },
        }
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub kind: CodedErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

/// Envelope for any error; uncoded failures are reported as `UNCLASSIFIED`.
pub fn envelope_for(error: &Error) -> ErrorEnvelope {
    match find_coded_error(error) {
        Some(coded) => {
            let mut envelope = coded.envelope();
            envelope.error.message = format!("{error:#}");
            envelope
        }
        None => ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: "UNCLASSIFIED".to_owned(),
                kind: CodedErrorKind::Environment,
                message: format!("{error:#}"),
                details: None,
            },
        },
    }
}
