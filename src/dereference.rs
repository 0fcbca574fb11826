//! DID URL dereferencing.
//!
//! A DID URL with a path goes through the resource flow, which reads ledger
//! resources directly. A DID URL with only a fragment (or nothing) goes through
//! the fragment flow, which resolves the DID and selects a node of the document.

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::content::{negotiate_resource, negotiate_resource_list, ContentType, DereferencingOptions};
use crate::did::{is_valid_did_url, DidUrl};
use crate::error::{ErrorCode, ResolverError};
use crate::ledger::LedgerService;
use crate::resolver::Resolver;
use crate::types::{
    ContentMetadata, ContentStream, DereferencedResource, DereferencedResourceList, DidDereferencing,
};

/// The resource paths a DID URL can carry
#[derive(Debug, Clone, PartialEq, Eq)]
enum ResourcePath<'a> {
    /// `/resources/all`
    Collection,
    /// `/resources/{id}`
    Resource(&'a str),
    /// `/resources/{id}/metadata`
    Metadata(&'a str),
    Unsupported,
}

impl<'a> ResourcePath<'a> {
    fn classify(path: &'a str) -> Self {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        match segments.as_slice() {
            ["resources", "all"] => Self::Collection,
            ["resources", id] if !id.is_empty() => Self::Resource(*id),
            ["resources", id, "metadata"] if !id.is_empty() => Self::Metadata(*id),
            _ => Self::Unsupported,
        }
    }
}

/// Canonical form of a resource id, or `None` when it cannot exist on the ledger
fn normalize_resource_id(id: &str) -> Option<String> {
    if id.len() != 36 {
        return None;
    }
    Uuid::parse_str(id).ok().map(|uuid| uuid.hyphenated().to_string())
}

impl<L: LedgerService> Resolver<L> {
    /// Dereferences a DID URL
    ///
    /// Queries are not supported. Paths select ledger resources; otherwise the
    /// DID is resolved and the fragment, if any, selects a verification method
    /// or service of the document.
    pub async fn dereference(
        &self,
        did_url: &str,
        options: DereferencingOptions,
    ) -> Result<DidDereferencing, ResolverError> {
        let requested = options.accept.negotiated();

        let parsed = match DidUrl::parse(did_url) {
            Ok(parsed) if is_valid_did_url(did_url, &[]) => parsed,
            _ => {
                warn!(did_url, "invalid DID URL");
                return Ok(self.dereferencing_failed(did_url, &requested, ErrorCode::InvalidDidUrl));
            }
        };

        if parsed.query.is_some() {
            debug!(did_url, "query dereferencing is not supported");
            return Ok(self.dereferencing_failed(did_url, &requested, ErrorCode::NotSupported));
        }

        if parsed.path.is_some() {
            return self.dereference_primary(did_url, &parsed, &options.accept).await;
        }

        self.dereference_secondary(did_url, &parsed, options).await
    }

    /// Resource flow: `/resources/...` paths
    async fn dereference_primary(
        &self,
        did_url: &str,
        parsed: &DidUrl,
        accept: &ContentType,
    ) -> Result<DidDereferencing, ResolverError> {
        let requested = accept.negotiated();

        let path = parsed.path.as_deref().unwrap_or_default();
        let resource_path = ResourcePath::classify(path);
        trace!(did_url, ?resource_path, "classified DID URL path");

        let did = parsed.did();
        match resource_path {
            ResourcePath::Unsupported => {
                debug!(did_url, path, "path is not supported");
                Ok(self.dereferencing_failed(did_url, &requested, ErrorCode::NotSupported))
            }
            ResourcePath::Collection => {
                let Some(resources) = self.ledger().query_collection_resources(&did).await? else {
                    return Ok(self.dereferencing_failed(did_url, &requested, ErrorCode::NotFound));
                };
                self.resource_list(did_url, DereferencedResourceList::new(&did, &resources), accept)
            }
            ResourcePath::Metadata(id) => {
                let Some(resource_id) = normalize_resource_id(id) else {
                    return Ok(self.dereferencing_failed(did_url, &requested, ErrorCode::NotFound));
                };
                let resource = self
                    .ledger()
                    .query_collection_resources(&did)
                    .await?
                    .and_then(|resources| {
                        resources
                            .into_iter()
                            .find(|r| r.id.eq_ignore_ascii_case(&resource_id))
                    });
                let Some(resource) = resource else {
                    return Ok(self.dereferencing_failed(did_url, &requested, ErrorCode::NotFound));
                };
                self.resource_list(did_url, DereferencedResourceList::new(&did, &[resource]), accept)
            }
            ResourcePath::Resource(id) => {
                let Some(resource_id) = normalize_resource_id(id) else {
                    return Ok(self.dereferencing_failed(did_url, &requested, ErrorCode::NotFound));
                };
                let Some(resource) = self.ledger().query_resource(&did, &resource_id).await? else {
                    return Ok(self.dereferencing_failed(did_url, &requested, ErrorCode::NotFound));
                };

                let media_type = ContentType::from(resource.metadata.media_type.as_str());
                let Some(content_type) = negotiate_resource(accept, &media_type) else {
                    warn!(did_url, %accept, %media_type, "resource representation is not supported");
                    return Ok(self.dereferencing_failed(did_url, &requested, ErrorCode::RepresentationNotSupported));
                };

                Ok(DidDereferencing {
                    content_stream: Some(ContentStream::from_resource(&resource)?),
                    metadata: Some(ContentMetadata::Resource(DereferencedResource::new(&did, &resource.metadata))),
                    dereferencing_metadata: self.dereferencing_metadata(did_url, &content_type, None),
                })
            }
        }
    }

    fn resource_list(
        &self,
        did_url: &str,
        list: DereferencedResourceList,
        accept: &ContentType,
    ) -> Result<DidDereferencing, ResolverError> {
        let Some(content_type) = negotiate_resource_list(accept) else {
            warn!(did_url, %accept, "resource metadata is only available as a DID representation");
            return Ok(self.dereferencing_failed(did_url, &accept.negotiated(), ErrorCode::RepresentationNotSupported));
        };

        let mut content = ContentStream::ResourceList(list);
        content.apply_context(&content_type);

        Ok(DidDereferencing {
            content_stream: Some(content),
            metadata: None,
            dereferencing_metadata: self.dereferencing_metadata(did_url, &content_type, None),
        })
    }

    /// Fragment flow: resolve the DID, then select by fragment
    async fn dereference_secondary(
        &self,
        did_url: &str,
        parsed: &DidUrl,
        options: DereferencingOptions,
    ) -> Result<DidDereferencing, ResolverError> {
        let resolution = self.resolve(&parsed.did(), options.into()).await?;
        let content_type = resolution.resolution_metadata.content_type.clone();

        if resolution.resolution_metadata.is_error() {
            return Ok(DidDereferencing::failed(resolution.resolution_metadata.into()));
        }

        let (Some(document), Some(metadata)) = (resolution.did_document, resolution.metadata) else {
            return Ok(self.dereferencing_failed(did_url, &content_type, ErrorCode::NotFound));
        };

        let content = match parsed.fragment.as_deref() {
            None => ContentStream::Document(document),
            Some(fragment) => match document.dereference_fragment(fragment) {
                Some(mut content) => {
                    content.apply_context(&content_type);
                    content
                }
                None => {
                    debug!(did_url, fragment, "fragment not found in DID document");
                    return Ok(self.dereferencing_failed(did_url, &content_type, ErrorCode::NotFound));
                }
            },
        };

        Ok(DidDereferencing {
            content_stream: Some(content),
            metadata: Some(ContentMetadata::Document(metadata)),
            dereferencing_metadata: resolution.resolution_metadata.into(),
        })
    }

    fn dereferencing_failed(&self, did_url: &str, content_type: &ContentType, code: ErrorCode) -> DidDereferencing {
        DidDereferencing::failed(self.dereferencing_metadata(did_url, content_type, Some(code)))
    }
}
