//! Ledger access.
//!
//! [`LedgerService`] is the gateway the engines read DID documents and
//! resources through. [`HttpLedgerService`] implements it against the ledger's
//! REST gateway, one endpoint per namespace, with every query bounded by the
//! configured deadline.

use std::sync::Arc;

use async_trait::async_trait;
use base58::FromBase58;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::config::ResolverConfig;
use crate::did::DidUrl;
use crate::error::ResolverError;
use crate::types::{
    DidDocument, DocumentMetadata, KeyMaterial, Resource, ResourceMetadata, Service,
    VerificationMethod,
};

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Read access to DID documents and resources on the ledger
///
/// `Ok(None)` means the ledger answered and the item does not exist. Every
/// other failure, including a missed deadline, is an error.
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// Fetches a DID document and its metadata
    async fn query_did_doc(&self, did: &str) -> Result<Option<(DidDocument, DocumentMetadata)>, ResolverError>;

    /// Fetches one resource from a DID's collection
    async fn query_resource(&self, did: &str, resource_id: &str) -> Result<Option<Resource>, ResolverError>;

    /// Fetches the metadata of every resource in a DID's collection
    async fn query_collection_resources(&self, did: &str) -> Result<Option<Vec<ResourceMetadata>>, ResolverError>;
}

/// Ledger gateway speaking to the REST API of each configured namespace
#[derive(Debug, Clone)]
pub struct HttpLedgerService {
    client: Client,
    config: Arc<ResolverConfig>,
}

impl HttpLedgerService {
    pub fn new(config: Arc<ResolverConfig>) -> Result<Self, ResolverError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client, config })
    }

    /// Endpoint and unique id for a DID this ledger can answer for
    fn locate(&self, did: &str) -> Option<(&Url, DidUrl)> {
        let did_url = DidUrl::parse(did).ok()?;
        if did_url.method != self.config.did_method {
            return None;
        }
        let endpoint = self.config.endpoint(&did_url.namespace)?;
        Some((endpoint, did_url))
    }

    fn url(endpoint: &Url, segments: &[&str]) -> Result<Url, ResolverError> {
        let mut url = endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ResolverError::Config(format!("endpoint {endpoint} cannot carry a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GETs a JSON body within the ledger deadline; 404 is reported as `None`
    async fn get_json<T: DeserializeOwned>(&self, target: &str, url: Url) -> Result<Option<T>, ResolverError> {
        debug!(%url, "querying ledger");

        tokio::time::timeout(self.config.ledger_timeout, self.fetch_json(url))
            .await
            .map_err(|_| ResolverError::LedgerTimeout(target.to_string()))?
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, ResolverError> {
        let response = self.client.get(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ResolverError::LedgerFailed(format!("HTTP {} from {url}", response.status())));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ResolverError::InvalidLedgerData(e.to_string()))
    }
}

#[async_trait]
impl LedgerService for HttpLedgerService {
    async fn query_did_doc(&self, did: &str) -> Result<Option<(DidDocument, DocumentMetadata)>, ResolverError> {
        let Some((endpoint, _)) = self.locate(did) else {
            return Ok(None);
        };
        let url = Self::url(endpoint, &["cheqd", "did", "v2", did])?;

        let Some(response) = self.get_json::<DidDocResponse>(did, url).await? else {
            return Ok(None);
        };
        let document = DidDocument::try_from(response.value.did_doc)?;
        Ok(Some((document, response.value.metadata.into())))
    }

    async fn query_resource(&self, did: &str, resource_id: &str) -> Result<Option<Resource>, ResolverError> {
        let Some((endpoint, did_url)) = self.locate(did) else {
            return Ok(None);
        };
        let url = Self::url(endpoint, &["cheqd", "resource", "v2", &did_url.id, "resources", resource_id])?;

        let Some(response) = self.get_json::<ResourceResponse>(did, url).await? else {
            return Ok(None);
        };
        let ledger = response.resource;
        let data = STANDARD
            .decode(ledger.resource.data.as_bytes())
            .map_err(|e| ResolverError::InvalidLedgerData(format!("resource data: {e}")))?;
        verify_checksum(&ledger.metadata, &data)?;

        Ok(Some(Resource {
            metadata: ledger.metadata,
            data,
        }))
    }

    async fn query_collection_resources(&self, did: &str) -> Result<Option<Vec<ResourceMetadata>>, ResolverError> {
        let Some((endpoint, did_url)) = self.locate(did) else {
            return Ok(None);
        };
        let url = Self::url(endpoint, &["cheqd", "resource", "v2", &did_url.id, "metadata"])?;

        Ok(self
            .get_json::<CollectionResponse>(did, url)
            .await?
            .map(|response| response.resources))
    }
}

/// Rejects data whose SHA-256 differs from a recorded checksum
fn verify_checksum(metadata: &ResourceMetadata, data: &[u8]) -> Result<(), ResolverError> {
    if metadata.checksum.is_empty() {
        return Ok(());
    }
    let digest = hex::encode(Sha256::digest(data));
    if !digest.eq_ignore_ascii_case(&metadata.checksum) {
        return Err(ResolverError::ChecksumMismatch(metadata.id.clone()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct DidDocResponse {
    value: DidDocWithMetadata,
}

#[derive(Debug, Deserialize)]
struct DidDocWithMetadata {
    did_doc: LedgerDidDoc,
    #[serde(default)]
    metadata: LedgerDidDocMetadata,
}

#[derive(Debug, Deserialize)]
struct ResourceResponse {
    resource: LedgerResource,
}

#[derive(Debug, Deserialize)]
struct LedgerResource {
    resource: LedgerResourceData,
    metadata: ResourceMetadata,
}

#[derive(Debug, Deserialize)]
struct LedgerResourceData {
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    resources: Vec<ResourceMetadata>,
}

/// A DID document as stored on the ledger
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerDidDoc {
    pub context: Vec<String>,
    pub id: String,
    pub controller: Vec<String>,
    pub verification_method: Vec<LedgerVerificationMethod>,
    pub authentication: Vec<String>,
    pub assertion_method: Vec<String>,
    pub capability_invocation: Vec<String>,
    pub capability_delegation: Vec<String>,
    pub key_agreement: Vec<String>,
    pub service: Vec<LedgerServiceEntry>,
    pub also_known_as: Vec<String>,
}

/// A verification method as stored on the ledger, key material still encoded
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerVerificationMethod {
    pub id: String,
    pub verification_method_type: String,
    pub controller: String,
    pub verification_material: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerServiceEntry {
    pub id: String,
    pub service_type: String,
    pub service_endpoint: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerDidDocMetadata {
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub deactivated: bool,
    pub version_id: String,
    pub next_version_id: String,
    pub previous_version_id: String,
}

impl From<LedgerDidDocMetadata> for DocumentMetadata {
    fn from(metadata: LedgerDidDocMetadata) -> Self {
        Self {
            created: metadata.created,
            updated: metadata.updated,
            deactivated: metadata.deactivated,
            version_id: metadata.version_id,
            next_version_id: metadata.next_version_id,
            previous_version_id: metadata.previous_version_id,
            linked_resource_metadata: Vec::new(),
        }
    }
}

impl TryFrom<LedgerDidDoc> for DidDocument {
    type Error = ResolverError;

    fn try_from(doc: LedgerDidDoc) -> Result<Self, Self::Error> {
        let verification_method = doc
            .verification_method
            .into_iter()
            .map(VerificationMethod::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let service = doc
            .service
            .into_iter()
            .map(|s| Service {
                context: Vec::new(),
                id: s.id,
                service_type: s.service_type,
                service_endpoint: s.service_endpoint,
            })
            .collect();

        Ok(Self {
            context: doc.context,
            id: doc.id,
            controller: doc.controller,
            verification_method,
            authentication: doc.authentication,
            assertion_method: doc.assertion_method,
            capability_invocation: doc.capability_invocation,
            capability_delegation: doc.capability_delegation,
            key_agreement: doc.key_agreement,
            service,
            also_known_as: doc.also_known_as,
        })
    }
}

impl TryFrom<LedgerVerificationMethod> for VerificationMethod {
    type Error = ResolverError;

    fn try_from(vm: LedgerVerificationMethod) -> Result<Self, Self::Error> {
        let key = decode_verification_material(&vm)?;
        Ok(Self {
            context: Vec::new(),
            id: vm.id,
            method_type: vm.verification_method_type,
            controller: vm.controller,
            key,
        })
    }
}

/// Older ledger entries store key material as a JSON envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyVerificationMaterial {
    public_key_jwk: Option<Map<String, Value>>,
    public_key_multibase: Option<String>,
}

fn decode_verification_material(vm: &LedgerVerificationMethod) -> Result<KeyMaterial, ResolverError> {
    let invalid = |reason: &str| ResolverError::InvalidVerificationMaterial {
        id: vm.id.clone(),
        reason: reason.to_string(),
    };
    let material = vm.verification_material.as_str();

    match vm.verification_method_type.as_str() {
        "JsonWebKey2020" => match serde_json::from_str::<Value>(material) {
            Ok(Value::Object(jwk)) => Ok(KeyMaterial::Jwk(jwk)),
            Ok(_) => Err(invalid("JWK must be a JSON object")),
            Err(e) => Err(invalid(&e.to_string())),
        },
        "Ed25519VerificationKey2020" => {
            let encoded = material
                .strip_prefix('z')
                .ok_or_else(|| invalid("multibase key must use base58btc"))?;
            encoded.from_base58().map_err(|_| invalid("invalid base58btc encoding"))?;
            Ok(KeyMaterial::Multibase(material.to_string()))
        }
        "Ed25519VerificationKey2018" => {
            material.from_base58().map_err(|_| invalid("invalid base58 encoding"))?;
            Ok(KeyMaterial::Base58(material.to_string()))
        }
        _ => {
            let legacy: LegacyVerificationMaterial =
                serde_json::from_str(material).map_err(|e| invalid(&e.to_string()))?;
            match (legacy.public_key_jwk, legacy.public_key_multibase) {
                (Some(jwk), None) => Ok(KeyMaterial::Jwk(jwk)),
                (None, Some(multibase)) => Ok(KeyMaterial::Multibase(multibase)),
                _ => Err(invalid("expected exactly one of publicKeyJwk or publicKeyMultibase")),
            }
        }
    }
}
