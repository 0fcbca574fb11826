//! A DID resolver for ledger-anchored DIDs.
//!
//! This library resolves `did:cheqd` identifiers to DID Documents and
//! dereferences DID URLs to verification methods, services and ledger
//! resources. Results follow the W3C DID Resolution data model: errors are
//! reported in metadata and rendered in stable JSON envelopes.

mod config;
mod content;
mod dereference;
mod did;
mod envelope;
mod error;
mod ledger;
mod metadata;
mod resolver;
mod types;

#[cfg(test)]
mod test_utils;

pub use config::{ResolverConfig, DEFAULT_DID_METHOD, DEFAULT_NAMESPACE};
pub use content::{
    negotiate_resource, negotiate_resource_list, shape_document, ContentType, DereferencingOptions,
    ResolutionOptions, DID_SCHEMA_JSONLD,
};
pub use did::{is_valid_did, is_valid_did_url, is_valid_unique_id, DidUrl, MalformedDidUrl};
pub use envelope::{dereferencing_envelope, error_envelope, html_page, resolution_envelope};
pub use error::{ErrorCode, IdentityError, ResolverError};
pub use ledger::{HttpLedgerService, LedgerService};
pub use metadata::{DereferencingMetadata, DidProperties, ResolutionMetadata};
pub use resolver::{Resolver, ResolverResponse};
pub use types::{
    AlternativeUri, ContentMetadata, ContentStream, DereferencedResource, DereferencedResourceList,
    DidDereferencing, DidDocument, DidResolution, DocumentMetadata, KeyMaterial, Resource, ResourceMetadata,
    Service, VerificationMethod,
};

/// Resolves a DID against the public ledger gateways
///
/// # Arguments
/// * `did` - The DID to resolve
/// * `options` - Optional resolution parameters
///
/// # Example
/// ```no_run
/// use did_ledger_resolver::{resolve, ResolutionOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let result = resolve(
///         "did:cheqd:mainnet:c1685ca0-1f5b-439c-8eb8-5c0e85ab7cd0",
///         None
///     ).await?;
///
///     println!("Resolved DID Document: {:?}", result.did_document);
///     Ok(())
/// }
/// ```
pub async fn resolve(did: &str, options: Option<ResolutionOptions>) -> Result<DidResolution, ResolverError> {
    let resolver = Resolver::from_config(ResolverConfig::default())?;
    resolver.resolve(did, options.unwrap_or_default()).await
}

/// Dereferences a DID URL against the public ledger gateways
pub async fn dereference(
    did_url: &str,
    options: Option<DereferencingOptions>,
) -> Result<DidDereferencing, ResolverError> {
    let resolver = Resolver::from_config(ResolverConfig::default())?;
    resolver.dereference(did_url, options.unwrap_or_default()).await
}
