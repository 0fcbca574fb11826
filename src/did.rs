//! DID and DID URL decomposition.
//!
//! This module splits ledger DID URLs of the form
//! `did:<method>:[<namespace>:]<id>[/path][?query][#fragment]` into their
//! components and provides the syntax predicates used by the engines.

use std::fmt;

use base58::FromBase58;
use uuid::Uuid;

/// Byte length of a base58 unique identifier
const UNIQUE_ID_LEN: usize = 16;

/// A decomposed DID URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidUrl {
    /// The DID method name
    pub method: String,
    /// Ledger namespace, empty when the DID omits it
    pub namespace: String,
    /// The unique identifier within the namespace
    pub id: String,
    /// Path component, including its leading `/`
    pub path: Option<String>,
    /// Query component, without the `?`
    pub query: Option<String>,
    /// Fragment component, without the `#`
    pub fragment: Option<String>,
}

impl DidUrl {
    /// Splits a DID or DID URL into its components
    ///
    /// Only the general shape is checked here; use [`is_valid_did`] and
    /// [`is_valid_did_url`] for full validation.
    pub fn parse(identifier: &str) -> Result<Self, MalformedDidUrl> {
        let rest = identifier.strip_prefix("did:").ok_or(MalformedDidUrl)?;

        // More than one `#` is never a legal fragment split
        let (rest, fragment) = match rest.matches('#').count() {
            0 => (rest, None),
            1 => rest
                .split_once('#')
                .map(|(r, f)| (r, Some(f.to_string())))
                .ok_or(MalformedDidUrl)?,
            _ => return Err(MalformedDidUrl),
        };

        let (rest, query) = match rest.split_once('?') {
            Some((r, q)) => (r, Some(q.to_string())),
            None => (rest, None),
        };

        let (did, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(rest[idx..].to_string())),
            None => (rest, None),
        };

        let (method, method_specific_id) = did.split_once(':').ok_or(MalformedDidUrl)?;
        if method.is_empty() || !method.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return Err(MalformedDidUrl);
        }

        let parts: Vec<&str> = method_specific_id.split(':').collect();
        let (namespace, id) = match parts.as_slice() {
            [id] => ("", *id),
            [namespace, id] => (*namespace, *id),
            _ => return Err(MalformedDidUrl),
        };

        if namespace.is_empty() && parts.len() == 2 {
            return Err(MalformedDidUrl);
        }
        if !namespace.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MalformedDidUrl);
        }
        if id.is_empty() || !id.chars().all(is_id_char) {
            return Err(MalformedDidUrl);
        }

        Ok(Self {
            method: method.to_string(),
            namespace: namespace.to_string(),
            id: id.to_string(),
            path: path.filter(|p| !p.is_empty()),
            query: query.filter(|q| !q.is_empty()),
            fragment: fragment.filter(|f| !f.is_empty()),
        })
    }

    /// The bare DID, without path, query or fragment
    pub fn did(&self) -> String {
        if self.namespace.is_empty() {
            format!("did:{}:{}", self.method, self.id)
        } else {
            format!("did:{}:{}:{}", self.method, self.namespace, self.id)
        }
    }

    /// True when any of path, query or fragment is present
    pub fn is_dereferenceable(&self) -> bool {
        self.path.is_some() || self.query.is_some() || self.fragment.is_some()
    }
}

impl fmt::Display for DidUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.did())?;
        if let Some(path) = &self.path {
            write!(f, "{path}")?;
        }
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// Marker returned when an identifier cannot be decomposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedDidUrl;

impl fmt::Display for MalformedDidUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("identifier is not a DID URL")
    }
}

impl std::error::Error for MalformedDidUrl {}

/// Method name of an identifier, or an empty string when there is none
pub fn method_of(identifier: &str) -> &str {
    identifier
        .strip_prefix("did:")
        .and_then(|rest| rest.split(':').next())
        .unwrap_or("")
}

/// Checks a bare DID: syntax, unique id format and namespace membership
///
/// An empty `namespaces` slice accepts any namespace.
pub fn is_valid_did(identifier: &str, namespaces: &[String]) -> bool {
    match DidUrl::parse(identifier) {
        Ok(did_url) => !did_url.is_dereferenceable() && has_valid_did(&did_url, namespaces),
        Err(_) => false,
    }
}

/// Checks a DID URL: the DID part plus the syntax of path, query and fragment
pub fn is_valid_did_url(identifier: &str, namespaces: &[String]) -> bool {
    let Ok(did_url) = DidUrl::parse(identifier) else {
        return false;
    };

    has_valid_did(&did_url, namespaces)
        && did_url.path.as_deref().map_or(true, |p| is_valid_component(p, false))
        && did_url.query.as_deref().map_or(true, |q| is_valid_component(q, true))
        && did_url.fragment.as_deref().map_or(true, |f| is_valid_component(f, true))
}

/// A unique id is a hyphenated UUID or base58 of 16 bytes
pub fn is_valid_unique_id(id: &str) -> bool {
    if id.len() == 36 && Uuid::parse_str(id).is_ok() {
        return true;
    }
    matches!(id.from_base58(), Ok(bytes) if bytes.len() == UNIQUE_ID_LEN)
}

fn has_valid_did(did_url: &DidUrl, namespaces: &[String]) -> bool {
    let namespace_ok = namespaces.is_empty()
        || did_url.namespace.is_empty()
        || namespaces.iter().any(|ns| ns == &did_url.namespace);
    namespace_ok && is_valid_unique_id(&did_url.id)
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

/// RFC 3986 `pchar` plus `/`, and `?` for queries and fragments
fn is_valid_component(component: &str, allow_question: bool) -> bool {
    let bytes = component.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            '%' => {
                let valid = bytes.len() > i + 2
                    && (bytes[i + 1] as char).is_ascii_hexdigit()
                    && (bytes[i + 2] as char).is_ascii_hexdigit();
                if !valid {
                    return false;
                }
                i += 3;
                continue;
            }
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '.' | '_' | '~' => {}
            '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=' => {}
            ':' | '@' | '/' => {}
            '?' if allow_question => {}
            _ => return false,
        }
        i += 1;
    }
    true
}
