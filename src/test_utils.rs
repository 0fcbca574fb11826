//! In-memory ledger and fixtures for engine tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::config::ResolverConfig;
use crate::error::ResolverError;
use crate::ledger::LedgerService;
use crate::resolver::Resolver;
use crate::types::{
    DidDocument, DocumentMetadata, KeyMaterial, Resource, ResourceMetadata, Service,
    VerificationMethod,
};

pub const VALID_METHOD: &str = "cheqd";
pub const VALID_NAMESPACE: &str = "testnet";
pub const VALID_IDENTIFIER: &str = "fb53dd05-329b-4614-a3f2-c0a8c7554ee3";
pub const VALID_DID: &str = "did:cheqd:testnet:fb53dd05-329b-4614-a3f2-c0a8c7554ee3";
pub const ABSENT_DID: &str = "did:cheqd:testnet:a86f9cae-0902-4a7c-a144-96b60ced2fc9";
pub const VALID_RESOURCE_ID: &str = "a09abea0-22e0-4b35-8f70-9cc3a6d0b5fd";
pub const VALID_RESOURCE_DATA: &[u8] = br#"{"attr":["name","age"]}"#;

pub fn valid_did_doc() -> DidDocument {
    DidDocument {
        context: vec![],
        id: VALID_DID.to_string(),
        controller: vec![VALID_DID.to_string()],
        verification_method: vec![VerificationMethod {
            context: vec![],
            id: format!("{VALID_DID}#key-1"),
            method_type: "Ed25519VerificationKey2020".to_string(),
            controller: VALID_DID.to_string(),
            key: KeyMaterial::Multibase("z6MkszZtxCmA2Ce4vUV132PCuLQmwnaDD5mw2L23fGNnsiX3".to_string()),
        }],
        authentication: vec![format!("{VALID_DID}#key-1")],
        service: vec![Service {
            context: vec![],
            id: format!("{VALID_DID}#website"),
            service_type: "LinkedDomains".to_string(),
            service_endpoint: vec!["https://example.com".to_string()],
        }],
        ..Default::default()
    }
}

pub fn valid_metadata() -> DocumentMetadata {
    DocumentMetadata {
        created: Utc.with_ymd_and_hms(2022, 10, 20, 10, 0, 0).single(),
        version_id: "a7f7b2a4-0e1c-4d6f-9f54-8ba4a2c0c7e1".to_string(),
        ..Default::default()
    }
}

pub fn valid_resource() -> Resource {
    Resource {
        metadata: ResourceMetadata {
            collection_id: VALID_IDENTIFIER.to_string(),
            id: VALID_RESOURCE_ID.to_string(),
            name: "Demo Schema".to_string(),
            version: "1.0".to_string(),
            resource_type: "CL-Schema".to_string(),
            media_type: "application/json".to_string(),
            created: Utc.with_ymd_and_hms(2022, 10, 21, 9, 30, 0).single(),
            checksum: String::new(),
            ..Default::default()
        },
        data: VALID_RESOURCE_DATA.to_vec(),
    }
}

/// Ledger backed by maps; optionally fails every call with a timeout
#[derive(Debug, Clone, Default)]
pub struct MockLedgerService {
    documents: HashMap<String, (DidDocument, DocumentMetadata)>,
    resources: HashMap<String, Vec<Resource>>,
    timeout: bool,
}

impl MockLedgerService {
    pub fn new(document: DidDocument, metadata: DocumentMetadata, resources: Vec<Resource>) -> Self {
        let did = document.id.clone();
        let mut ledger = Self::default();
        ledger.documents.insert(did.clone(), (document, metadata));
        ledger.resources.insert(did, resources);
        ledger
    }

    /// The ledger holding [`valid_did_doc`] and [`valid_resource`]
    pub fn valid() -> Self {
        Self::new(valid_did_doc(), valid_metadata(), vec![valid_resource()])
    }

    pub fn timing_out() -> Self {
        Self {
            timeout: true,
            ..Self::valid()
        }
    }

    fn check(&self, did: &str) -> Result<(), ResolverError> {
        if self.timeout {
            return Err(ResolverError::LedgerTimeout(did.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerService for MockLedgerService {
    async fn query_did_doc(&self, did: &str) -> Result<Option<(DidDocument, DocumentMetadata)>, ResolverError> {
        self.check(did)?;
        Ok(self.documents.get(did).cloned())
    }

    async fn query_resource(&self, did: &str, resource_id: &str) -> Result<Option<Resource>, ResolverError> {
        self.check(did)?;
        Ok(self
            .resources
            .get(did)
            .and_then(|resources| resources.iter().find(|r| r.metadata.id == resource_id))
            .cloned())
    }

    async fn query_collection_resources(&self, did: &str) -> Result<Option<Vec<ResourceMetadata>>, ResolverError> {
        self.check(did)?;
        Ok(self
            .resources
            .get(did)
            .map(|resources| resources.iter().map(|r| r.metadata.clone()).collect()))
    }
}

pub fn test_config() -> Arc<ResolverConfig> {
    Arc::new(ResolverConfig::default())
}

pub fn test_resolver(ledger: MockLedgerService) -> Resolver<MockLedgerService> {
    Resolver::new(test_config(), ledger)
}
