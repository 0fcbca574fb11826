//! Core types for DID resolution and dereferencing.
//!
//! This module provides the DID Document model, ledger resources, and the
//! results produced by the resolution and dereferencing engines.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::content::{ContentType, DID_SCHEMA_JSONLD};
use crate::error::ResolverError;
use crate::metadata::{DereferencingMetadata, ResolutionMetadata};

/// A DID Document as defined in the DID Core specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// JSON-LD contexts; a set, only touched by content negotiation
    #[serde(rename = "@context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,

    /// The DID itself
    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controller: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_invocation: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_delegation: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_agreement: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_known_as: Vec<String>,
}

impl DidDocument {
    /// Adds a context URI unless it is already present
    pub fn add_context(&mut self, context: &str) {
        if !self.context.iter().any(|c| c == context) {
            self.context.insert(0, context.to_string());
        }
    }

    pub fn remove_context(&mut self) {
        self.context.clear();
    }

    /// Finds the verification method or service whose id ends in `#fragment`
    ///
    /// Verification methods are searched before services, each in document
    /// order; the first match wins.
    pub fn dereference_fragment(&self, fragment: &str) -> Option<ContentStream> {
        let matches = |id: &str| fragment_of(id) == Some(fragment);

        if let Some(vm) = self.verification_method.iter().find(|vm| matches(&vm.id)) {
            return Some(ContentStream::VerificationMethod(vm.clone()));
        }
        self.service
            .iter()
            .find(|s| matches(&s.id))
            .map(|s| ContentStream::Service(s.clone()))
    }
}

fn fragment_of(id: &str) -> Option<&str> {
    id.split_once('#').map(|(_, fragment)| fragment)
}

/// A verification method in a DID Document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationMethod {
    #[serde(rename = "@context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,

    /// The unique identifier for this verification method
    pub id: String,

    /// The type of the verification method
    #[serde(rename = "type")]
    pub method_type: String,

    /// The controller of this verification method
    pub controller: String,

    /// The public key, in exactly one encoding
    #[serde(flatten)]
    pub key: KeyMaterial,
}

/// Public key material of a verification method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeyMaterial {
    #[serde(rename = "publicKeyJwk")]
    Jwk(Map<String, Value>),

    #[serde(rename = "publicKeyMultibase")]
    Multibase(String),

    #[serde(rename = "publicKeyBase58")]
    Base58(String),
}

/// A service endpoint in a DID Document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "@context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,

    /// The unique identifier for this service
    pub id: String,

    /// The type of the service
    #[serde(rename = "type")]
    pub service_type: String,

    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: Vec<String>,
}

/// Metadata about a DID Document, as kept by the ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub deactivated: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub next_version_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub previous_version_id: String,

    /// Resources published in the DID's collection
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_resource_metadata: Vec<DereferencedResource>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Ledger-side metadata of a resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceMetadata {
    pub collection_id: String,
    pub id: String,
    pub name: String,
    pub version: String,
    pub resource_type: String,
    pub media_type: String,
    pub created: Option<DateTime<Utc>>,
    /// Hex SHA-256 of the resource data
    pub checksum: String,
    pub previous_version_id: String,
    pub next_version_id: String,
    pub also_known_as: Vec<AlternativeUri>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternativeUri {
    pub uri: String,
    pub description: String,
}

/// A ledger resource: opaque data plus its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub metadata: ResourceMetadata,
    pub data: Vec<u8>,
}

/// Resource metadata as rendered in results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DereferencedResource {
    #[serde(rename = "resourceURI")]
    pub resource_uri: String,
    pub resource_collection_id: String,
    pub resource_id: String,
    pub resource_name: String,
    pub resource_type: String,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    pub created: Option<DateTime<Utc>>,
    pub checksum: String,
    pub previous_version_id: Option<String>,
    pub next_version_id: Option<String>,
}

impl DereferencedResource {
    pub fn new(did: &str, metadata: &ResourceMetadata) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

        Self {
            resource_uri: format!("{did}/resources/{}", metadata.id),
            resource_collection_id: metadata.collection_id.clone(),
            resource_id: metadata.id.clone(),
            resource_name: metadata.name.clone(),
            resource_type: metadata.resource_type.clone(),
            media_type: metadata.media_type.clone(),
            resource_version: metadata.version.clone(),
            created: metadata.created,
            checksum: metadata.checksum.clone(),
            previous_version_id: non_empty(&metadata.previous_version_id),
            next_version_id: non_empty(&metadata.next_version_id),
        }
    }
}

/// A list of resource metadata records, the payload of metadata paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DereferencedResourceList {
    #[serde(rename = "@context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,

    #[serde(rename = "linkedResourceMetadata")]
    pub resources: Vec<DereferencedResource>,
}

impl DereferencedResourceList {
    pub fn new(did: &str, resources: &[ResourceMetadata]) -> Self {
        Self {
            context: Vec::new(),
            resources: resources.iter().map(|r| DereferencedResource::new(did, r)).collect(),
        }
    }
}

/// The target a DID URL dereferences to
///
/// Each variant renders through its own type; the flow that produced the
/// content picks the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentStream {
    Document(DidDocument),
    VerificationMethod(VerificationMethod),
    Service(Service),
    ResourceList(DereferencedResourceList),
    /// A resource payload already rendered for its media type
    Resource(Value),
}

impl ContentStream {
    /// Renders a resource payload according to its media type
    ///
    /// JSON media types are embedded as JSON, `text/*` as a string and
    /// everything else as base64.
    pub fn from_resource(resource: &Resource) -> Result<Self, ResolverError> {
        let media_type = resource.metadata.media_type.to_ascii_lowercase();

        let value = if media_type.contains("json") {
            serde_json::from_slice(&resource.data)?
        } else if media_type.starts_with("text/") {
            let text = String::from_utf8(resource.data.clone()).map_err(|_| {
                ResolverError::InvalidLedgerData(format!("resource {} is not valid UTF-8", resource.metadata.id))
            })?;
            Value::String(text)
        } else {
            Value::String(STANDARD.encode(&resource.data))
        };

        Ok(Self::Resource(value))
    }

    /// Adds or strips the DID v1 context on fragments and resource lists
    ///
    /// Documents are shaped during resolution and raw resources carry no
    /// context, so both are left untouched.
    pub fn apply_context(&mut self, content_type: &ContentType) {
        let context = match self {
            Self::VerificationMethod(vm) => &mut vm.context,
            Self::Service(service) => &mut service.context,
            Self::ResourceList(list) => &mut list.context,
            Self::Document(_) | Self::Resource(_) => return,
        };

        if content_type.is_json_ld() {
            if !context.iter().any(|c| c == DID_SCHEMA_JSONLD) {
                context.push(DID_SCHEMA_JSONLD.to_string());
            }
        } else {
            context.clear();
        }
    }
}

/// Metadata describing a dereferenced payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentMetadata {
    Document(DocumentMetadata),
    Resource(DereferencedResource),
}

/// Result of DID resolution
#[derive(Debug, Clone, PartialEq)]
pub struct DidResolution {
    /// The resolved DID Document, absent on error
    pub did_document: Option<DidDocument>,

    /// Document metadata, absent on error
    pub metadata: Option<DocumentMetadata>,

    /// Metadata about the resolution process
    pub resolution_metadata: ResolutionMetadata,
}

impl DidResolution {
    /// A result carrying only metadata, used for every error branch
    pub fn failed(resolution_metadata: ResolutionMetadata) -> Self {
        Self {
            did_document: None,
            metadata: None,
            resolution_metadata,
        }
    }
}

/// Result of DID URL dereferencing
#[derive(Debug, Clone, PartialEq)]
pub struct DidDereferencing {
    /// The dereferenced content, absent on error
    pub content_stream: Option<ContentStream>,

    /// Metadata about the content, absent on error
    pub metadata: Option<ContentMetadata>,

    /// Metadata about the dereferencing process
    pub dereferencing_metadata: DereferencingMetadata,
}

impl DidDereferencing {
    pub fn failed(dereferencing_metadata: DereferencingMetadata) -> Self {
        Self {
            content_stream: None,
            metadata: None,
            dereferencing_metadata,
        }
    }
}
