//! Envelope formatting.
//!
//! Renders results into the JSON envelopes handed to transports. Field order
//! is fixed by the envelope structs. On error the payload is `null` and the
//! payload metadata is an empty array.

use serde::Serialize;

use crate::content::ContentType;
use crate::error::{IdentityError, ResolverError};
use crate::metadata::{DereferencingMetadata, ResolutionMetadata};
use crate::types::{ContentMetadata, ContentStream, DidDereferencing, DidDocument, DidResolution, DocumentMetadata};

/// Metadata slot that renders as `[]` when there is nothing to report
#[derive(Serialize)]
#[serde(untagged)]
enum OrEmpty<'a, T> {
    Present(&'a T),
    Empty([(); 0]),
}

impl<'a, T> OrEmpty<'a, T> {
    fn from_option(value: Option<&'a T>) -> Self {
        value.map_or(Self::Empty([]), Self::Present)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolutionEnvelope<'a> {
    did_resolution_metadata: &'a ResolutionMetadata,
    did_document: Option<&'a DidDocument>,
    did_document_metadata: OrEmpty<'a, DocumentMetadata>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DereferencingEnvelope<'a> {
    content_stream: Option<&'a ContentStream>,
    content_metadata: OrEmpty<'a, ContentMetadata>,
    dereferencing_metadata: &'a DereferencingMetadata,
}

pub fn resolution_envelope(resolution: &DidResolution) -> Result<String, ResolverError> {
    let failed = resolution.resolution_metadata.is_error();
    let envelope = ResolutionEnvelope {
        did_resolution_metadata: &resolution.resolution_metadata,
        did_document: resolution.did_document.as_ref().filter(|_| !failed),
        did_document_metadata: OrEmpty::from_option(resolution.metadata.as_ref().filter(|_| !failed)),
    };
    Ok(serde_json::to_string(&envelope)?)
}

pub fn dereferencing_envelope(dereferencing: &DidDereferencing) -> Result<String, ResolverError> {
    let failed = dereferencing.dereferencing_metadata.is_error();
    let envelope = DereferencingEnvelope {
        content_stream: dereferencing.content_stream.as_ref().filter(|_| !failed),
        content_metadata: OrEmpty::from_option(dereferencing.metadata.as_ref().filter(|_| !failed)),
        dereferencing_metadata: &dereferencing.dereferencing_metadata,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Renders an error that never reached an engine result
pub fn error_envelope(
    error: &IdentityError,
    identifier: &str,
    content_type: &ContentType,
) -> Result<String, ResolverError> {
    if error.is_dereferencing {
        let metadata = DereferencingMetadata::failed(identifier, content_type, error.code);
        dereferencing_envelope(&DidDereferencing::failed(metadata))
    } else {
        let metadata = ResolutionMetadata::failed(identifier, content_type, error.code);
        resolution_envelope(&DidResolution::failed(metadata))
    }
}

/// Wraps a JSON envelope in a minimal HTML page
pub fn html_page(json: &str) -> String {
    let data = json.replace("</", "<\\/");
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>DID Resolver</title>\n</head>\n<body>\n\
         <script id=\"did-resolution\" type=\"application/json\">{data}</script>\n\
         <pre>{}</pre>\n</body>\n</html>\n",
        escape_html(json)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}
