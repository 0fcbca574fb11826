use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use did_ledger_resolver::{
    ContentStream, ContentType, DereferencingOptions, ErrorCode, HttpLedgerService, KeyMaterial, LedgerService,
    ResolutionOptions, Resolver, ResolverConfig, ResolverError, DID_SCHEMA_JSONLD,
};

const ID: &str = "fb53dd05-329b-4614-a3f2-c0a8c7554ee3";
const DID: &str = "did:cheqd:testnet:fb53dd05-329b-4614-a3f2-c0a8c7554ee3";
const RESOURCE_ID: &str = "a09abea0-22e0-4b35-8f70-9cc3a6d0b5fd";
const RESOURCE_DATA: &[u8] = br#"{"attr":["name","age"]}"#;

fn config(server: &MockServer) -> ResolverConfig {
    let mut endpoints = BTreeMap::new();
    endpoints.insert("testnet".to_string(), Url::parse(&server.uri()).unwrap());
    ResolverConfig {
        endpoints,
        ledger_timeout: Duration::from_millis(500),
        ..ResolverConfig::default()
    }
}

fn ledger(server: &MockServer) -> HttpLedgerService {
    HttpLedgerService::new(Arc::new(config(server))).unwrap()
}

fn did_doc_body() -> Value {
    json!({
        "value": {
            "did_doc": {
                "context": [],
                "id": DID,
                "controller": [DID],
                "verification_method": [{
                    "id": format!("{DID}#key-1"),
                    "verification_method_type": "Ed25519VerificationKey2020",
                    "controller": DID,
                    "verification_material": "z6MkszZtxCmA2Ce4vUV132PCuLQmwnaDD5mw2L23fGNnsiX3"
                }],
                "authentication": [format!("{DID}#key-1")],
                "assertion_method": [],
                "capability_invocation": [],
                "capability_delegation": [],
                "key_agreement": [],
                "service": [{
                    "id": format!("{DID}#website"),
                    "service_type": "LinkedDomains",
                    "service_endpoint": ["https://example.com"]
                }],
                "also_known_as": []
            },
            "metadata": {
                "created": "2022-10-20T10:00:00Z",
                "updated": null,
                "deactivated": false,
                "version_id": "a7f7b2a4-0e1c-4d6f-9f54-8ba4a2c0c7e1",
                "next_version_id": "",
                "previous_version_id": ""
            }
        }
    })
}

fn resource_metadata(checksum: &str) -> Value {
    json!({
        "collection_id": ID,
        "id": RESOURCE_ID,
        "name": "Demo Schema",
        "version": "1.0",
        "resource_type": "CL-Schema",
        "also_known_as": [],
        "media_type": "application/json",
        "created": "2022-10-21T09:30:00Z",
        "checksum": checksum,
        "previous_version_id": "",
        "next_version_id": ""
    })
}

fn resource_body(checksum: &str) -> Value {
    json!({
        "resource": {
            "resource": { "data": STANDARD.encode(RESOURCE_DATA) },
            "metadata": resource_metadata(checksum)
        }
    })
}

fn valid_checksum() -> String {
    hex::encode(Sha256::digest(RESOURCE_DATA))
}

async fn mount_json(server: &MockServer, route: String, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_ledger(server: &MockServer) {
    mount_json(server, format!("/cheqd/did/v2/{DID}"), did_doc_body()).await;
    mount_json(
        server,
        format!("/cheqd/resource/v2/{ID}/resources/{RESOURCE_ID}"),
        resource_body(&valid_checksum()),
    )
    .await;
    mount_json(
        server,
        format!("/cheqd/resource/v2/{ID}/metadata"),
        json!({ "resources": [resource_metadata(&valid_checksum())] }),
    )
    .await;
}

#[tokio::test]
async fn test_query_did_doc() {
    let server = MockServer::start().await;
    mount_ledger(&server).await;

    let (document, metadata) = ledger(&server).query_did_doc(DID).await.unwrap().unwrap();

    assert_eq!(document.id, DID);
    assert_eq!(document.verification_method.len(), 1);
    assert_eq!(document.verification_method[0].method_type, "Ed25519VerificationKey2020");
    assert!(matches!(document.verification_method[0].key, KeyMaterial::Multibase(_)));
    assert_eq!(document.service[0].service_endpoint, vec!["https://example.com".to_string()]);
    assert_eq!(metadata.version_id, "a7f7b2a4-0e1c-4d6f-9f54-8ba4a2c0c7e1");
    assert!(metadata.updated.is_none());
}

#[tokio::test]
async fn test_query_missing_did_doc() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"code": 5, "message": "not found"})))
        .mount(&server)
        .await;

    assert!(ledger(&server).query_did_doc(DID).await.unwrap().is_none());
    assert!(ledger(&server).query_resource(DID, RESOURCE_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn test_query_unknown_namespace_skips_the_network() {
    let server = MockServer::start().await;

    let result = ledger(&server)
        .query_did_doc(&format!("did:cheqd:mainnet:{ID}"))
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_ledger_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = ledger(&server).query_did_doc(DID).await.unwrap_err();
    assert!(matches!(err, ResolverError::LedgerFailed(_)));
}

#[tokio::test]
async fn test_malformed_ledger_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = ledger(&server).query_did_doc(DID).await.unwrap_err();
    assert!(matches!(err, ResolverError::InvalidLedgerData(_)));
}

#[tokio::test]
async fn test_ledger_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(did_doc_body())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = ledger(&server).query_did_doc(DID).await.unwrap_err();
    assert!(matches!(err, ResolverError::LedgerTimeout(_)));
}

#[tokio::test]
async fn test_query_resource() {
    let server = MockServer::start().await;
    mount_ledger(&server).await;

    let resource = ledger(&server).query_resource(DID, RESOURCE_ID).await.unwrap().unwrap();

    assert_eq!(resource.data, RESOURCE_DATA);
    assert_eq!(resource.metadata.name, "Demo Schema");
    assert_eq!(resource.metadata.media_type, "application/json");
}

#[tokio::test]
async fn test_resource_checksum_mismatch() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        format!("/cheqd/resource/v2/{ID}/resources/{RESOURCE_ID}"),
        resource_body(&"ab".repeat(32)),
    )
    .await;

    let err = ledger(&server).query_resource(DID, RESOURCE_ID).await.unwrap_err();
    assert!(matches!(err, ResolverError::ChecksumMismatch(_)));
}

#[tokio::test]
async fn test_query_collection_resources() {
    let server = MockServer::start().await;
    mount_ledger(&server).await;

    let resources = ledger(&server).query_collection_resources(DID).await.unwrap().unwrap();

    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].id, RESOURCE_ID);
    assert_eq!(resources[0].checksum, valid_checksum());
}

#[tokio::test]
async fn test_resolve_through_gateway() {
    let server = MockServer::start().await;
    mount_ledger(&server).await;
    let resolver = Resolver::from_config(config(&server)).unwrap();

    let result = resolver.resolve(DID, ResolutionOptions::default()).await.unwrap();
    let document = result.did_document.unwrap();
    assert_eq!(document.context, vec![DID_SCHEMA_JSONLD.to_string()]);
    assert_eq!(result.metadata.unwrap().linked_resource_metadata[0].resource_id, RESOURCE_ID);

    let result = resolver
        .dereference(
            &format!("{DID}/resources/{RESOURCE_ID}"),
            DereferencingOptions::new(ContentType::Any),
        )
        .await
        .unwrap();
    assert_eq!(result.content_stream, Some(ContentStream::Resource(json!({"attr": ["name", "age"]}))));

    let result = resolver
        .dereference(&format!("{DID}#unknown"), DereferencingOptions::default())
        .await
        .unwrap();
    assert_eq!(result.dereferencing_metadata.error, Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn test_respond_through_gateway() {
    let server = MockServer::start().await;
    mount_ledger(&server).await;
    let resolver = Resolver::from_config(config(&server)).unwrap();

    let response = resolver.respond(&format!("{DID}#key-1"), ResolutionOptions::default()).await;
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(body["contentStream"]["publicKeyMultibase"], "z6MkszZtxCmA2Ce4vUV132PCuLQmwnaDD5mw2L23fGNnsiX3");
    assert_eq!(body["contentMetadata"]["versionId"], "a7f7b2a4-0e1c-4d6f-9f54-8ba4a2c0c7e1");
    assert_eq!(body["dereferencingMetadata"]["contentType"], "application/did+ld+json");

    let absent = "did:cheqd:testnet:a86f9cae-0902-4a7c-a144-96b60ced2fc9";
    let response = resolver.respond(absent, ResolutionOptions::default()).await;
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(response.status, 404);
    assert_eq!(body["didResolutionMetadata"]["error"], "notFound");
    assert_eq!(body["didDocumentMetadata"], json!([]));
}

#[tokio::test]
async fn test_respond_maps_gateway_failure_to_internal_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let resolver = Resolver::from_config(config(&server)).unwrap();

    let response = resolver.respond(DID, ResolutionOptions::default()).await;
    let body: Value = serde_json::from_str(&response.body).unwrap();

    assert_eq!(response.status, 500);
    assert_eq!(body["didResolutionMetadata"]["error"], "internalError");
    assert_eq!(body["didDocument"], Value::Null);
}
