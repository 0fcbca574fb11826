//! Core DID resolution functionality.
//!
//! This module provides the resolution engine for ledger DIDs and the request
//! entry point that picks resolution or dereferencing, renders the envelope
//! and maps the outcome to a transport status.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, trace, warn};

use crate::config::ResolverConfig;
use crate::content::{shape_document, ContentType, DereferencingOptions, ResolutionOptions};
use crate::did::{self, is_valid_did};
use crate::envelope::{dereferencing_envelope, error_envelope, html_page, resolution_envelope};
use crate::error::{ErrorCode, IdentityError, ResolverError};
use crate::ledger::{HttpLedgerService, LedgerService};
use crate::metadata::{DereferencingMetadata, ResolutionMetadata};
use crate::types::{DereferencedResource, DidResolution};

/// Fallback body when even the error envelope cannot be rendered
const INTERNAL_ERROR_BODY: &str = r#"{"error":"internalError"}"#;

/// Resolution and dereferencing engine over a ledger gateway
///
/// Holds only immutable configuration and the gateway; every call is
/// independent and the engine can be shared across tasks.
pub struct Resolver<L> {
    config: Arc<ResolverConfig>,
    ledger: L,
}

/// What a transport answers with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverResponse {
    pub body: String,
    pub status: u16,
    pub content_type: ContentType,
}

impl Resolver<HttpLedgerService> {
    /// Creates a resolver talking to the ledger REST gateways in `config`
    pub fn from_config(config: ResolverConfig) -> Result<Self, ResolverError> {
        let config = Arc::new(config);
        let ledger = HttpLedgerService::new(Arc::clone(&config))?;
        Ok(Self::new(config, ledger))
    }
}

impl<L: LedgerService> Resolver<L> {
    pub fn new(config: Arc<ResolverConfig>, ledger: L) -> Self {
        Self { config, ledger }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub(crate) fn ledger(&self) -> &L {
        &self.ledger
    }

    /// True when the identifier carries a path, query or fragment
    pub fn is_did_url(identifier: &str) -> bool {
        identifier.contains(['/', '?', '#'])
    }

    /// Resolves a DID to its document
    ///
    /// Soft failures (unsupported method, invalid DID, unknown DID) come back
    /// as a result whose metadata carries the error code. Ledger failures and
    /// unsupported content types are returned as `Err`.
    ///
    /// # Example
    /// ```no_run
    /// use did_ledger_resolver::{ResolutionOptions, Resolver, ResolverConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let resolver = Resolver::from_config(ResolverConfig::default())?;
    ///     let result = resolver
    ///         .resolve(
    ///             "did:cheqd:mainnet:c1685ca0-1f5b-439c-8eb8-5c0e85ab7cd0",
    ///             ResolutionOptions::default(),
    ///         )
    ///         .await?;
    ///     println!("Resolved DID Document: {:?}", result.did_document);
    ///     Ok(())
    /// }
    /// ```
    pub async fn resolve(&self, did: &str, options: ResolutionOptions) -> Result<DidResolution, ResolverError> {
        let content_type = options.accept.negotiated();

        let method = did::method_of(did);
        if method != self.config.did_method {
            warn!(did, method, "DID method is not supported");
            return Ok(DidResolution::failed(self.resolution_metadata(
                did,
                &content_type,
                Some(ErrorCode::MethodNotSupported),
            )));
        }

        if !is_valid_did(did, &self.config.namespaces()) {
            warn!(did, "invalid DID");
            return Ok(DidResolution::failed(self.resolution_metadata(
                did,
                &content_type,
                Some(ErrorCode::InvalidDid),
            )));
        }

        let Some((mut document, mut metadata)) = self.ledger.query_did_doc(did).await? else {
            info!(did, "DID not found on the ledger");
            return Ok(DidResolution::failed(self.resolution_metadata(
                did,
                &content_type,
                Some(ErrorCode::NotFound),
            )));
        };

        if let Some(resources) = self.ledger.query_collection_resources(did).await? {
            metadata.linked_resource_metadata = resources
                .iter()
                .map(|resource| DereferencedResource::new(did, resource))
                .collect();
        }

        shape_document(&mut document, &content_type)?;
        trace!(did, %content_type, "resolved DID document");

        Ok(DidResolution {
            did_document: Some(document),
            metadata: Some(metadata),
            resolution_metadata: self.resolution_metadata(did, &content_type, None),
        })
    }

    /// Resolves or dereferences `identifier` and renders the envelope
    ///
    /// HTML requests get the JSON envelope wrapped in a page. Hard errors are
    /// returned as `Err`; see [`Resolver::respond`] for the variant that
    /// always produces a response.
    pub async fn process_did_request(
        &self,
        identifier: &str,
        options: ResolutionOptions,
    ) -> Result<ResolverResponse, ResolverError> {
        let is_dereferencing = Self::is_did_url(identifier);

        let (body, error, content_type) = if is_dereferencing {
            let result = self.dereference(identifier, DereferencingOptions::from(options.clone())).await?;
            let metadata = &result.dereferencing_metadata;
            (dereferencing_envelope(&result)?, metadata.error, metadata.content_type.clone())
        } else {
            let result = self.resolve(identifier, options.clone()).await?;
            let metadata = &result.resolution_metadata;
            (resolution_envelope(&result)?, metadata.error, metadata.content_type.clone())
        };

        let status = error.map_or(200, |code| IdentityError::from_code(code, is_dereferencing).status_code());
        info!(identifier, status, %content_type, "processed DID request");

        Ok(if options.accept == ContentType::Html {
            ResolverResponse {
                body: html_page(&body),
                status,
                content_type: ContentType::Html,
            }
        } else {
            ResolverResponse {
                body,
                status,
                content_type,
            }
        })
    }

    /// Like [`Resolver::process_did_request`], but hard errors become an
    /// `internalError` envelope with status 500
    pub async fn respond(&self, identifier: &str, options: ResolutionOptions) -> ResolverResponse {
        match self.process_did_request(identifier, options.clone()).await {
            Ok(response) => response,
            Err(err) => {
                error!(identifier, error = %err, "DID request failed");

                let identity = err.to_identity_error(Self::is_did_url(identifier));
                let content_type = options.accept.negotiated();
                let body = match error_envelope(&identity, identifier, &content_type) {
                    Ok(body) if content_type == ContentType::Html => html_page(&body),
                    Ok(body) => body,
                    Err(_) => INTERNAL_ERROR_BODY.to_string(),
                };

                ResolverResponse {
                    body,
                    status: identity.status_code(),
                    content_type,
                }
            }
        }
    }

    pub(crate) fn resolution_metadata(
        &self,
        identifier: &str,
        content_type: &ContentType,
        error: Option<ErrorCode>,
    ) -> ResolutionMetadata {
        let metadata = ResolutionMetadata::new(identifier, content_type, error);
        if self.config.stamp_retrieved {
            metadata.stamped(Utc::now())
        } else {
            metadata
        }
    }

    pub(crate) fn dereferencing_metadata(
        &self,
        identifier: &str,
        content_type: &ContentType,
        error: Option<ErrorCode>,
    ) -> DereferencingMetadata {
        self.resolution_metadata(identifier, content_type, error).into()
    }
}
