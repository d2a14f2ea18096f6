//! Tree handles and document references
//!
//! A tree handle names a provider-exposed directory subtree:
//! `tree://<authority>/<tree-id>`. A document reference addresses one
//! document inside a granted tree: `doc://<authority>/<tree-id>/<document-id>`.
//! Identifier segments are percent-encoded, so any id (including ids that
//! contain `/`) maps to exactly one string form.

use crate::TreeGrantError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

pub const TREE_SCHEME: &str = "tree";
pub const DOCUMENT_SCHEME: &str = "doc";

/// Parsed tree handle. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeHandle {
    authority: String,
    tree_id: String,
}

impl TreeHandle {
    /// Build a handle from already-decoded parts
    pub fn new(authority: &str, tree_id: &str) -> crate::Result<Self> {
        let display = format!("{}://{}/{}", TREE_SCHEME, authority, encode_segment(tree_id));
        validate_authority(&display, authority)?;
        if tree_id.is_empty() {
            return Err(TreeGrantError::malformed_handle(&display, "empty tree id"));
        }
        Ok(Self {
            authority: authority.to_string(),
            tree_id: tree_id.to_string(),
        })
    }

    /// Parse a handle string (`HandleCodec.parse`)
    pub fn parse(input: &str) -> crate::Result<Self> {
        let rest = strip_scheme(input, TREE_SCHEME)?;
        let (authority, tree) = rest
            .split_once('/')
            .ok_or_else(|| TreeGrantError::malformed_handle(input, "missing tree id"))?;
        validate_authority(input, authority)?;
        if tree.contains('/') {
            return Err(TreeGrantError::malformed_handle(
                input,
                "tree id must be a single segment",
            ));
        }
        let tree_id = decode_segment(input, tree, "tree id")?;
        Ok(Self {
            authority: authority.to_string(),
            tree_id,
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Decoded id of the tree root document
    pub fn tree_id(&self) -> &str {
        &self.tree_id
    }
}

impl Display for TreeHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}://{}/{}",
            TREE_SCHEME,
            self.authority,
            encode_segment(&self.tree_id)
        )
    }
}

impl FromStr for TreeHandle {
    type Err = TreeGrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Fully addressable reference to one document within a granted tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    authority: String,
    tree_id: String,
    document_id: String,
}

impl DocumentRef {
    /// Reference for `document_id` reached through `tree`
    pub fn new(tree: &TreeHandle, document_id: &str) -> Self {
        Self {
            authority: tree.authority.clone(),
            tree_id: tree.tree_id.clone(),
            document_id: document_id.to_string(),
        }
    }

    pub fn parse(input: &str) -> crate::Result<Self> {
        let rest = strip_scheme(input, DOCUMENT_SCHEME)?;
        let mut parts = rest.split('/');
        let authority = parts.next().unwrap_or_default();
        validate_authority(input, authority)?;
        let (Some(tree), Some(doc), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(TreeGrantError::malformed_handle(
                input,
                "expected doc://<authority>/<tree-id>/<document-id>",
            ));
        };
        Ok(Self {
            authority: authority.to_string(),
            tree_id: decode_segment(input, tree, "tree id")?,
            document_id: decode_segment(input, doc, "document id")?,
        })
    }

    /// The tree this reference was derived through
    pub fn tree(&self) -> TreeHandle {
        TreeHandle {
            authority: self.authority.clone(),
            tree_id: self.tree_id.clone(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }
}

impl Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}://{}/{}/{}",
            DOCUMENT_SCHEME,
            self.authority,
            encode_segment(&self.tree_id),
            encode_segment(&self.document_id)
        )
    }
}

impl FromStr for DocumentRef {
    type Err = TreeGrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Handles travel as their string form in JSON (grant store, HTTP bodies)
impl Serialize for TreeHandle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TreeHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TreeHandle::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Percent-encode one identifier segment
pub(crate) fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn strip_scheme<'a>(input: &'a str, scheme: &str) -> crate::Result<&'a str> {
    if input
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(TreeGrantError::malformed_handle(
            input,
            "contains whitespace or control characters",
        ));
    }
    input
        .strip_prefix(scheme)
        .and_then(|rest| rest.strip_prefix("://"))
        .ok_or_else(|| {
            TreeGrantError::malformed_handle(input, format!("expected {}:// scheme", scheme))
        })
}

fn validate_authority(input: &str, authority: &str) -> crate::Result<()> {
    if authority.is_empty() {
        return Err(TreeGrantError::malformed_handle(input, "empty authority"));
    }
    if !authority
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(TreeGrantError::malformed_handle(
            input,
            format!("invalid authority {:?}", authority),
        ));
    }
    Ok(())
}

fn decode_segment(input: &str, segment: &str, what: &str) -> crate::Result<String> {
    let bytes = segment.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'%' {
            continue;
        }
        let escape = bytes.get(i + 1..i + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(TreeGrantError::malformed_handle(
                input,
                format!("invalid percent-encoding in {}", what),
            ));
        }
    }
    let decoded = urlencoding::decode(segment).map_err(|e| {
        TreeGrantError::malformed_handle(input, format!("invalid encoding in {}: {}", what, e))
    })?;
    if decoded.is_empty() {
        return Err(TreeGrantError::malformed_handle(
            input,
            format!("empty {}", what),
        ));
    }
    Ok(decoded.into_owned())
}
