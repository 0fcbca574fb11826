//! Error types for DID resolution and dereferencing.
//!
//! Two classes of failure exist. [`ErrorCode`] values are the fixed W3C
//! taxonomy: they are embedded in result metadata and the request still
//! produces a well-formed envelope. [`ResolverError`] values are hard errors
//! (ledger failures, unsupported content types, malformed ledger data) that
//! abort the call and surface to the transport as an internal error.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError;

/// Hard errors that abort a resolution or dereferencing call
#[derive(Error, Debug)]
pub enum ResolverError {
    /// A ledger query did not complete within the configured deadline
    #[error("ledger query for {0} timed out")]
    LedgerTimeout(String),

    /// The ledger gateway answered with an unexpected status
    #[error("ledger query failed: {0}")]
    LedgerFailed(String),

    /// The ledger returned data that could not be decoded
    #[error("invalid ledger data: {0}")]
    InvalidLedgerData(String),

    /// Verification key material on the ledger could not be decoded
    #[error("invalid verification material for {id}: {reason}")]
    InvalidVerificationMaterial { id: String, reason: String },

    /// A resource payload does not match its recorded checksum
    #[error("checksum mismatch for resource {0}")]
    ChecksumMismatch(String),

    /// The negotiated content type cannot shape a DID document
    #[error("content type {0} is not supported")]
    UnsupportedContentType(String),

    /// Invalid resolver configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlError(#[from] ParseError),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ResolverError {
    /// Converts a hard error into the generic internal error reported to callers.
    pub fn to_identity_error(&self, is_dereferencing: bool) -> IdentityError {
        IdentityError::new(ErrorCode::InternalError, self.to_string(), is_dereferencing)
    }
}

/// Error codes defined by the DID Resolution specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    InvalidDid,
    InvalidDidUrl,
    NotFound,
    MethodNotSupported,
    RepresentationNotSupported,
    /// Query-based dereferencing and unrecognized paths
    NotSupported,
    InternalError,
}

impl ErrorCode {
    /// Wire name of the code, as it appears in metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidDid => "invalidDid",
            Self::InvalidDidUrl => "invalidDidUrl",
            Self::NotFound => "notFound",
            Self::MethodNotSupported => "methodNotSupported",
            Self::RepresentationNotSupported => "representationNotSupported",
            Self::NotSupported => "notSupported",
            Self::InternalError => "internalError",
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            Self::InvalidDid => "The requested DID is not valid",
            Self::InvalidDidUrl => "The requested DID URL is not valid",
            Self::NotFound => "The requested DID or DID URL was not found",
            Self::MethodNotSupported => "The requested DID method is not supported",
            Self::RepresentationNotSupported => "The requested representation is not supported",
            Self::NotSupported => "The requested operation is not supported",
            Self::InternalError => "An internal error occurred during resolution",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error as seen by the transport: code, message and which envelope it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityError {
    pub code: ErrorCode,
    pub message: String,
    /// Selects the dereferencing envelope and status table instead of the resolution ones
    pub is_dereferencing: bool,
}

impl IdentityError {
    pub fn new(code: ErrorCode, message: impl Into<String>, is_dereferencing: bool) -> Self {
        Self {
            code,
            message: message.into(),
            is_dereferencing,
        }
    }

    /// Builds an error carrying the code's standard message.
    pub fn from_code(code: ErrorCode, is_dereferencing: bool) -> Self {
        Self::new(code, code.default_message(), is_dereferencing)
    }

    /// HTTP status code the transport should answer with.
    pub fn status_code(&self) -> u16 {
        if self.is_dereferencing {
            dereferencing_status(self.code)
        } else {
            resolution_status(self.code)
        }
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for IdentityError {}

fn resolution_status(code: ErrorCode) -> u16 {
    match code {
        ErrorCode::NotFound => 404,
        ErrorCode::InvalidDid | ErrorCode::InvalidDidUrl => 400,
        ErrorCode::RepresentationNotSupported => 406,
        ErrorCode::MethodNotSupported => 501,
        _ => 500,
    }
}

// Dereferencing shares the resolution table; kept separate so the two can diverge.
fn dereferencing_status(code: ErrorCode) -> u16 {
    resolution_status(code)
}
