use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

/// The four entity kinds, in the order they must be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Organization,
    OrganizationApiKey,
    Project,
    ProjectApiKey,
}

impl ResourceKind {
    /// Parents before children.
    pub const APPLY_ORDER: [ResourceKind; 4] = [
        Self::Organization,
        Self::OrganizationApiKey,
        Self::Project,
        Self::ProjectApiKey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::OrganizationApiKey => "organization_api_key",
            Self::Project => "project",
            Self::ProjectApiKey => "project_api_key",
        }
    }

    /// Attributes recorded in state for this kind, the ones a reference may name.
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            Self::Organization => &["id", "name", "metadata"],
            Self::OrganizationApiKey => &["id", "organization_id", "public_key", "secret_key"],
            Self::Project => &[
                "id",
                "name",
                "retention_days",
                "metadata",
                "organization_public_key",
                "organization_private_key",
            ],
            Self::ProjectApiKey => &[
                "id",
                "project_id",
                "public_key",
                "secret_key",
                "organization_public_key",
                "organization_private_key",
            ],
        }
    }

    /// Children before parents.
    pub fn destroy_order() -> impl Iterator<Item = ResourceKind> {
        Self::APPLY_ORDER.into_iter().rev()
    }

    /// True if `self` is applied strictly before `other`.
    pub fn precedes(&self, other: ResourceKind) -> bool {
        *self < other
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::APPLY_ORDER
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DocumentError::UnknownKind(s.to_string()))
    }
}

/// `<kind>.<name>`, the identity of a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    pub kind: ResourceKind,
    pub name: String,
}

impl Address {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

impl FromStr for Address {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once('.')
            .ok_or_else(|| DocumentError::InvalidAddress(s.to_string()))?;
        if name.is_empty() || name.contains('.') {
            return Err(DocumentError::InvalidAddress(s.to_string()));
        }
        Ok(Self::new(kind.parse()?, name))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
