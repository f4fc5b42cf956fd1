//! The desired-state document.
//!
//! ```toml
//! [organization.acme]
//! name = "Acme"
//!
//! [organization_api_key.main]
//! organization_id = "${organization.acme.id}"
//!
//! [project.web]
//! name = "P1"
//! retention_days = 30
//! organization_public_key = "${organization_api_key.main.public_key}"
//! organization_private_key = "${organization_api_key.main.secret_key}"
//! ```
//!
//! A reference must be the whole string value and may only point at a kind
//! that is applied before the referring one.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::address::{Address, ResourceKind};
use crate::error::DocumentError;

/// Stand-in for a value that only exists once an earlier resource is applied.
pub const UNKNOWN_VALUE: &str = "(known after apply)";

/// `${kind.name.attribute}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub target: Address,
    pub attribute: String,
}

impl Reference {
    /// Parse a whole-value reference. `Ok(None)` for plain strings.
    fn parse(address: &Address, raw: &str) -> Result<Option<Self>, DocumentError> {
        let invalid = || DocumentError::InvalidReference {
            address: address.clone(),
            reference: raw.to_string(),
        };

        let Some(inner) = raw.strip_prefix("${") else {
            return if raw.contains("${") {
                Err(invalid())
            } else {
                Ok(None)
            };
        };
        let inner = inner.strip_suffix('}').ok_or_else(invalid)?;
        let (target, attribute) = inner.rsplit_once('.').ok_or_else(invalid)?;
        if attribute.is_empty() {
            return Err(invalid());
        }
        let target: Address = target.parse().map_err(|_| invalid())?;

        Ok(Some(Self {
            target,
            attribute: attribute.to_string(),
        }))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.target, self.attribute)
    }
}

/// Outcome of looking up a referenced attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Known(Value),
    /// The target will only have a value after it is created or replaced.
    Unknown,
    Missing,
}

/// A resource body with its references substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub config: Value,
    /// Attributes whose value is [`UNKNOWN_VALUE`].
    pub unknown: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    resources: BTreeMap<Address, toml::Table>,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let raw = std::fs::read_to_string(path).map_err(|error| DocumentError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, DocumentError> {
        let root: toml::Table = toml::from_str(raw)?;
        let mut resources = BTreeMap::new();

        for (kind, entries) in root {
            let kind: ResourceKind = kind.parse()?;
            let toml::Value::Table(entries) = entries else {
                return Err(DocumentError::InvalidAddress(kind.to_string()));
            };
            for (name, body) in entries {
                if name.is_empty() || name.contains('.') {
                    return Err(DocumentError::InvalidAddress(format!("{kind}.{name}")));
                }
                let address = Address::new(kind, name);
                let toml::Value::Table(body) = body else {
                    return Err(DocumentError::NotATable { address });
                };
                resources.insert(address, body);
            }
        }

        let document = Self { resources };
        document.validate()?;
        Ok(document)
    }

    /// Check that every reference is well formed and points at an attribute
    /// of a declared resource of an earlier kind.
    pub fn validate(&self) -> Result<(), DocumentError> {
        for (address, body) in &self.resources {
            for reference in references(address, body)? {
                if !reference
                    .target
                    .kind
                    .attributes()
                    .contains(&reference.attribute.as_str())
                {
                    return Err(DocumentError::InvalidReference {
                        address: address.clone(),
                        reference: reference.to_string(),
                    });
                }
                if !self.resources.contains_key(&reference.target) {
                    return Err(DocumentError::UndeclaredReference {
                        address: address.clone(),
                        target: reference.target,
                    });
                }
                if !reference.target.kind.precedes(address.kind) {
                    return Err(DocumentError::ForwardReference {
                        address: address.clone(),
                        target: reference.target,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.resources.contains_key(address)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.resources.keys()
    }

    pub fn addresses_of(&self, kind: ResourceKind) -> impl Iterator<Item = &Address> {
        self.resources.keys().filter(move |a| a.kind == kind)
    }

    /// Substitute the references of `address` through `lookup` and return the
    /// body as JSON, ready to be decoded into the kind's configuration.
    pub fn resolve<F>(&self, address: &Address, lookup: F) -> Result<Resolved, DocumentError>
    where
        F: Fn(&Address, &str) -> Lookup,
    {
        let body = self
            .resources
            .get(address)
            .ok_or_else(|| DocumentError::InvalidAddress(address.to_string()))?;

        let mut config = serde_json::Map::new();
        let mut unknown = Vec::new();
        for (key, value) in body {
            let value = match value {
                toml::Value::String(raw) => match Reference::parse(address, raw)? {
                    Some(reference) => match lookup(&reference.target, &reference.attribute) {
                        Lookup::Known(value) => value,
                        Lookup::Unknown => {
                            unknown.push(key.clone());
                            Value::String(UNKNOWN_VALUE.to_string())
                        }
                        Lookup::Missing => {
                            return Err(DocumentError::UnresolvedReference {
                                address: address.clone(),
                                target: reference.target,
                                attribute: reference.attribute,
                            });
                        }
                    },
                    None => Value::String(raw.clone()),
                },
                other => toml_to_json(other),
            };
            config.insert(key.clone(), value);
        }

        Ok(Resolved {
            config: Value::Object(config),
            unknown,
        })
    }
}

fn references(address: &Address, body: &toml::Table) -> Result<Vec<Reference>, DocumentError> {
    let mut found = Vec::new();
    for value in body.values() {
        if let toml::Value::String(raw) = value
            && let Some(reference) = Reference::parse(address, raw)?
        {
            found.push(reference);
        }
    }
    Ok(found)
}

fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => Value::from(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
[organization.acme]
name = "Acme"
metadata = { tier = "gold" }

[organization_api_key.main]
organization_id = "${organization.acme.id}"

[project.web]
name = "P1"
retention_days = 30
organization_public_key = "${organization_api_key.main.public_key}"
organization_private_key = "${organization_api_key.main.secret_key}"
"#;

    fn address(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn parses_tables_by_kind() {
        let doc = Document::from_toml_str(SAMPLE).unwrap();
        assert_eq!(doc.len(), 3);
        assert!(doc.contains(&address("organization.acme")));
        assert_eq!(doc.addresses_of(ResourceKind::Project).count(), 1);
        let web = address("project.web");
        assert_eq!(
            references(&web, &doc.resources[&web]).unwrap(),
            vec![
                Reference {
                    target: address("organization_api_key.main"),
                    attribute: "secret_key".into(),
                },
                Reference {
                    target: address("organization_api_key.main"),
                    attribute: "public_key".into(),
                },
            ]
        );
    }

    #[test]
    fn resolves_known_references() {
        let doc = Document::from_toml_str(SAMPLE).unwrap();
        let resolved = doc
            .resolve(&address("project.web"), |_, attr| {
                Lookup::Known(json!(format!("{attr}-1")))
            })
            .unwrap();

        assert!(resolved.unknown.is_empty());
        assert_eq!(
            resolved.config,
            json!({
                "name": "P1",
                "retention_days": 30,
                "organization_public_key": "public_key-1",
                "organization_private_key": "secret_key-1",
            })
        );
    }

    #[test]
    fn unknown_references_are_marked() {
        let doc = Document::from_toml_str(SAMPLE).unwrap();
        let resolved = doc
            .resolve(&address("organization_api_key.main"), |_, _| Lookup::Unknown)
            .unwrap();

        assert_eq!(resolved.unknown, vec!["organization_id".to_string()]);
        assert_eq!(resolved.config["organization_id"], json!(UNKNOWN_VALUE));
    }

    #[test]
    fn missing_reference_targets_fail_to_resolve() {
        let doc = Document::from_toml_str(SAMPLE).unwrap();
        let err = doc
            .resolve(&address("organization_api_key.main"), |_, _| Lookup::Missing)
            .unwrap_err();

        assert!(matches!(
            err,
            DocumentError::UnresolvedReference { attribute, .. } if attribute == "id"
        ));
    }

    #[test]
    fn forward_references_are_rejected() {
        let err = Document::from_toml_str(
            r#"
[organization.acme]
name = "${project.web.id}"

[project.web]
name = "P1"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::ForwardReference { .. }));
    }

    #[test]
    fn references_to_undeclared_resources_are_rejected() {
        let err = Document::from_toml_str(
            r#"
[organization_api_key.main]
organization_id = "${organization.other.id}"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::UndeclaredReference { .. }));
    }

    #[test]
    fn references_to_unrecorded_attributes_are_rejected() {
        let err = Document::from_toml_str(
            r#"
[organization.acme]
name = "Acme"

[organization_api_key.main]
organization_id = "${organization.acme.idd}"
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::InvalidReference { reference, .. }
                if reference == "${organization.acme.idd}"
        ));
    }

    #[test]
    fn every_recorded_attribute_can_be_referenced() {
        let doc = Document::from_toml_str(
            r#"
[organization.acme]
name = "Acme"

[organization_api_key.main]
organization_id = "${organization.acme.id}"

[project.web]
name = "${organization.acme.name}"
organization_public_key = "${organization_api_key.main.public_key}"
organization_private_key = "${organization_api_key.main.secret_key}"

[project_api_key.web]
project_id = "${project.web.id}"
organization_public_key = "${project.web.organization_public_key}"
organization_private_key = "${project.web.organization_private_key}"
"#,
        )
        .unwrap();
        assert_eq!(doc.len(), 4);
    }

    #[test]
    fn partial_interpolation_is_rejected() {
        let err = Document::from_toml_str(
            r#"
[organization.acme]
name = "Acme"

[organization_api_key.main]
organization_id = "prefix-${organization.acme.id}"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidReference { .. }));
    }

    #[test]
    fn unknown_kinds_and_bodies_are_rejected() {
        assert!(matches!(
            Document::from_toml_str("[dataset.main]\nname = \"x\"\n"),
            Err(DocumentError::UnknownKind(kind)) if kind == "dataset"
        ));
        assert!(matches!(
            Document::from_toml_str("[organization]\nacme = \"x\"\n"),
            Err(DocumentError::NotATable { .. })
        ));
        assert!(matches!(
            Document::from_toml_str("not = [valid"),
            Err(DocumentError::Parse(_))
        ));
    }
}
