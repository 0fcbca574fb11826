//! Content negotiation.
//!
//! Decides the representation a result is produced in, from the caller's
//! requested media type and, for ledger resources, the media type the resource
//! was published with. Also owns the JSON-LD context rule for DID documents.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ResolverError;
use crate::types::DidDocument;

/// The DID v1 JSON-LD context
pub const DID_SCHEMA_JSONLD: &str = "https://www.w3.org/ns/did/v1";

const JSONLD_MEDIA_TYPE: &str = "application/ld+json";

/// A media type a result can be requested or produced in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    /// `application/did+ld+json`
    #[default]
    DidJsonLd,
    /// `application/ld+json`
    JsonLd,
    /// `application/did+json`
    DidJson,
    /// `application/json`
    Json,
    /// `text/html`
    Html,
    /// `*/*`
    Any,
    /// Any other media type, kept verbatim
    Other(String),
}

impl ContentType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::DidJsonLd => "application/did+ld+json",
            Self::JsonLd => JSONLD_MEDIA_TYPE,
            Self::DidJson => "application/did+json",
            Self::Json => "application/json",
            Self::Html => "text/html",
            Self::Any => "*/*",
            Self::Other(raw) => raw,
        }
    }

    /// JSON-LD family: DID JSON-LD, or anything carrying `application/ld+json`
    /// (for example with a `profile` parameter)
    pub fn is_json_ld(&self) -> bool {
        match self {
            Self::DidJsonLd | Self::JsonLd => true,
            Self::Other(raw) => raw.contains(JSONLD_MEDIA_TYPE),
            _ => false,
        }
    }

    /// Types a DID document (or a fragment of one) can be rendered in
    pub fn is_did_representation(&self) -> bool {
        self.is_json_ld() || matches!(self, Self::DidJson | Self::Html)
    }

    /// The concrete type a wildcard request settles on
    pub fn negotiated(&self) -> Self {
        match self {
            Self::Any => Self::DidJsonLd,
            other => other.clone(),
        }
    }

    /// Picks a type from an `Accept` header
    ///
    /// Entries are scanned in order with `q` and `charset` parameters
    /// ignored. The first DID representation wins; a wildcard (or nothing at
    /// all) means DID JSON-LD; otherwise the first entry is taken as-is.
    pub fn from_accept(header: &str) -> Self {
        let mut first = None;
        let mut wildcard = false;

        for entry in header.split(',') {
            let params: Vec<&str> = entry
                .split(';')
                .map(str::trim)
                .filter(|p| !p.is_empty() && !is_ignored_parameter(p))
                .collect();
            if params.is_empty() {
                continue;
            }

            let content_type = Self::from(params.join(";"));
            if content_type.is_did_representation() {
                return content_type;
            }
            if content_type == Self::Any {
                wildcard = true;
            } else if first.is_none() {
                first = Some(content_type);
            }
        }

        match first {
            Some(content_type) if !wildcard => content_type,
            _ => Self::DidJsonLd,
        }
    }
}

/// Parameters that do not change which representation is meant
fn is_ignored_parameter(param: &str) -> bool {
    let name = param.split('=').next().unwrap_or_default().trim();
    name.eq_ignore_ascii_case("q") || name.eq_ignore_ascii_case("charset")
}

impl From<&str> for ContentType {
    fn from(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "application/did+ld+json" => Self::DidJsonLd,
            JSONLD_MEDIA_TYPE => Self::JsonLd,
            "application/did+json" => Self::DidJson,
            "application/json" => Self::Json,
            "text/html" => Self::Html,
            "*/*" | "" => Self::Any,
            _ => Self::Other(raw.to_string()),
        }
    }
}

impl From<String> for ContentType {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<ContentType> for String {
    fn from(content_type: ContentType) -> Self {
        content_type.as_str().to_string()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options accepted by DID resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionOptions {
    pub accept: ContentType,
}

impl ResolutionOptions {
    pub fn new(accept: ContentType) -> Self {
        Self { accept }
    }
}

/// Options accepted by DID URL dereferencing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DereferencingOptions {
    pub accept: ContentType,
}

impl DereferencingOptions {
    pub fn new(accept: ContentType) -> Self {
        Self { accept }
    }
}

impl From<DereferencingOptions> for ResolutionOptions {
    fn from(options: DereferencingOptions) -> Self {
        Self { accept: options.accept }
    }
}

impl From<ResolutionOptions> for DereferencingOptions {
    fn from(options: ResolutionOptions) -> Self {
        Self { accept: options.accept }
    }
}

/// Adds or strips the DID v1 context according to the negotiated type
pub fn shape_document(document: &mut DidDocument, content_type: &ContentType) -> Result<(), ResolverError> {
    if content_type.is_json_ld() {
        document.add_context(DID_SCHEMA_JSONLD);
    } else if matches!(content_type, ContentType::DidJson | ContentType::Html) {
        document.remove_context();
    } else {
        return Err(ResolverError::UnsupportedContentType(content_type.to_string()));
    }
    Ok(())
}

/// Representation of a ledger resource payload
///
/// A wildcard or any DID representation yields the resource's own media type,
/// as does an explicit request for exactly that type. Anything else cannot be
/// produced.
pub fn negotiate_resource(requested: &ContentType, media_type: &ContentType) -> Option<ContentType> {
    if *requested == ContentType::Any || requested.is_did_representation() || requested == media_type {
        Some(media_type.clone())
    } else {
        None
    }
}

/// Representation of a resource metadata list, which only exists as DID JSON
pub fn negotiate_resource_list(requested: &ContentType) -> Option<ContentType> {
    let negotiated = requested.negotiated();
    negotiated.is_did_representation().then_some(negotiated)
}
