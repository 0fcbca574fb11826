//! Resolution and dereferencing metadata.
//!
//! Every branch of the engines builds its metadata here, so success and error
//! records share one shape: the negotiated content type, the error code when
//! there is one, and the properties of the DID the request was about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentType;
use crate::did::DidUrl;
use crate::error::ErrorCode;

/// Properties of the DID a request was about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidProperties {
    pub did_string: String,
    pub method_specific_id: String,
    pub method: String,
}

impl DidProperties {
    /// Derives properties from a DID or DID URL; empty when it cannot be decomposed
    pub fn from_identifier(identifier: &str) -> Self {
        match DidUrl::parse(identifier) {
            Ok(did_url) => Self {
                did_string: did_url.did(),
                method_specific_id: did_url.id,
                method: did_url.method,
            },
            Err(_) => Self::default(),
        }
    }
}

/// Metadata about a resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionMetadata {
    pub content_type: ContentType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved: Option<DateTime<Utc>>,

    #[serde(rename = "did")]
    pub did_properties: DidProperties,
}

impl ResolutionMetadata {
    pub fn new(identifier: &str, content_type: &ContentType, error: Option<ErrorCode>) -> Self {
        Self {
            content_type: content_type.clone(),
            error,
            retrieved: None,
            did_properties: DidProperties::from_identifier(identifier),
        }
    }

    pub fn failed(identifier: &str, content_type: &ContentType, code: ErrorCode) -> Self {
        Self::new(identifier, content_type, Some(code))
    }

    /// Records when the result was retrieved
    pub fn stamped(mut self, retrieved: DateTime<Utc>) -> Self {
        self.retrieved = Some(retrieved);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Metadata about a dereferencing; shares the resolution vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DereferencingMetadata {
    pub content_type: ContentType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved: Option<DateTime<Utc>>,

    #[serde(rename = "did")]
    pub did_properties: DidProperties,
}

impl DereferencingMetadata {
    pub fn new(identifier: &str, content_type: &ContentType, error: Option<ErrorCode>) -> Self {
        ResolutionMetadata::new(identifier, content_type, error).into()
    }

    pub fn failed(identifier: &str, content_type: &ContentType, code: ErrorCode) -> Self {
        Self::new(identifier, content_type, Some(code))
    }

    pub fn stamped(mut self, retrieved: DateTime<Utc>) -> Self {
        self.retrieved = Some(retrieved);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<ResolutionMetadata> for DereferencingMetadata {
    fn from(metadata: ResolutionMetadata) -> Self {
        Self {
            content_type: metadata.content_type,
            error: metadata.error,
            retrieved: metadata.retrieved,
            did_properties: metadata.did_properties,
        }
    }
}
