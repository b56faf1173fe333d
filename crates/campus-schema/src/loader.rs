//! Schema loading and validation

use crate::model::{
    AttributeKind, AttributeSpec, CollectionSpec, IndexSpec, PermissionRule, SchemaDefinition,
};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Default maximum length for string attributes when the source omits
/// `size`.
const DEFAULT_STRING_SIZE: usize = 255;

/// Errors raised while loading a schema. All of these are structural
/// problems in the source; nothing here touches the network.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema file could not be read.
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    /// The schema source is not valid JSON of the expected shape.
    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),

    /// An index references an attribute its collection never declares.
    #[error("index '{index}' in collection '{collection}' references unknown attribute '{attribute}'")]
    UnknownIndexAttribute {
        /// Collection id.
        collection: String,
        /// Index key.
        index: String,
        /// The missing attribute key.
        attribute: String,
    },

    /// An enum attribute with no options can never hold a value.
    #[error("enum attribute '{attribute}' in collection '{collection}' has no options")]
    EmptyEnum {
        /// Collection id.
        collection: String,
        /// Attribute key.
        attribute: String,
    },

    /// Two attributes in one collection share a key.
    #[error("duplicate attribute key '{attribute}' in collection '{collection}'")]
    DuplicateAttribute {
        /// Collection id.
        collection: String,
        /// The repeated key.
        attribute: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    collection: RawCollection,
    #[serde(default)]
    attributes: Vec<RawAttribute>,
    #[serde(default)]
    indexes: Vec<RawIndex>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCollection {
    id: String,
    name: String,
    permissions: Option<Vec<PermissionRule>>,
    #[serde(default)]
    document_security: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttribute {
    key: String,
    #[serde(rename = "type")]
    attr_type: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    array: bool,
    size: Option<usize>,
    min: Option<f64>,
    max: Option<f64>,
    default: Option<serde_json::Value>,
    format: Option<String>,
    options: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIndex {
    key: String,
    #[serde(rename = "type", default = "default_index_type")]
    index_type: String,
    attributes: Vec<String>,
    #[serde(default)]
    orders: Vec<String>,
}

fn default_index_type() -> String {
    "key".to_string()
}

impl SchemaDefinition {
    /// Load and validate a schema from a JSON string.
    pub fn from_json(source: &str) -> Result<Self, SchemaError> {
        let entries: Vec<RawEntry> = serde_json::from_str(source)?;
        let mut collections = Vec::with_capacity(entries.len());
        for entry in entries {
            collections.push(resolve_collection(entry)?);
        }
        Ok(Self { collections })
    }

    /// Load and validate a schema from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    /// The bundled campus schema provisioned for every tenant.
    pub fn campus_default() -> Result<Self, SchemaError> {
        Self::from_json(include_str!("../assets/campus.json"))
    }
}

fn resolve_collection(entry: RawEntry) -> Result<CollectionSpec, SchemaError> {
    let id = entry.collection.id;
    let mut attributes = Vec::with_capacity(entry.attributes.len());
    for raw in entry.attributes {
        if attributes.iter().any(|a: &AttributeSpec| a.key == raw.key) {
            return Err(SchemaError::DuplicateAttribute {
                collection: id.clone(),
                attribute: raw.key,
            });
        }
        attributes.push(resolve_attribute(&id, raw)?);
    }

    let mut indexes = Vec::with_capacity(entry.indexes.len());
    for raw in entry.indexes {
        for reference in &raw.attributes {
            if !attributes.iter().any(|a| &a.key == reference) {
                return Err(SchemaError::UnknownIndexAttribute {
                    collection: id.clone(),
                    index: raw.key,
                    attribute: reference.clone(),
                });
            }
        }
        indexes.push(IndexSpec {
            key: raw.key,
            index_type: raw.index_type,
            attributes: raw.attributes,
            orders: raw.orders,
        });
    }

    Ok(CollectionSpec {
        id,
        name: entry.collection.name,
        permissions: entry.collection.permissions,
        document_security: entry.collection.document_security,
        attributes,
        indexes,
    })
}

fn resolve_attribute(collection: &str, raw: RawAttribute) -> Result<AttributeSpec, SchemaError> {
    let default_str = || raw.default.as_ref().and_then(|v| v.as_str()).map(String::from);

    let kind = match raw.attr_type.as_str() {
        "string" => match raw.format.as_deref() {
            Some("enum") => {
                let options = raw.options.clone().unwrap_or_default();
                if options.is_empty() {
                    return Err(SchemaError::EmptyEnum {
                        collection: collection.to_string(),
                        attribute: raw.key,
                    });
                }
                AttributeKind::Enum {
                    options,
                    default: default_str(),
                }
            }
            Some("email") => AttributeKind::Email {
                default: default_str(),
            },
            Some("url") => AttributeKind::Url {
                default: default_str(),
            },
            Some("ip") => AttributeKind::Ip {
                default: default_str(),
            },
            None => AttributeKind::PlainString {
                size: raw.size.unwrap_or(DEFAULT_STRING_SIZE),
                default: default_str(),
            },
            Some(other) => {
                tracing::warn!(
                    collection,
                    attribute = %raw.key,
                    format = other,
                    "unknown string format, provisioning as plain string"
                );
                AttributeKind::PlainString {
                    size: raw.size.unwrap_or(DEFAULT_STRING_SIZE),
                    default: default_str(),
                }
            }
        },
        "integer" => AttributeKind::Integer {
            min: raw.min.map(|v| v as i64),
            max: raw.max.map(|v| v as i64),
            default: raw.default.as_ref().and_then(|v| v.as_i64()),
        },
        "double" | "float" => AttributeKind::Float {
            min: raw.min,
            max: raw.max,
            default: raw.default.as_ref().and_then(|v| v.as_f64()),
        },
        "boolean" => AttributeKind::Boolean {
            default: raw.default.as_ref().and_then(|v| v.as_bool()),
        },
        "datetime" => AttributeKind::Datetime {
            default: default_str(),
        },
        other => {
            tracing::warn!(
                collection,
                attribute = %raw.key,
                attr_type = other,
                "unknown attribute type, provisioning as plain string"
            );
            AttributeKind::PlainString {
                size: raw.size.unwrap_or(DEFAULT_STRING_SIZE),
                default: default_str(),
            }
        }
    };

    Ok(AttributeSpec {
        key: raw.key,
        kind,
        required: raw.required,
        array: raw.array,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"[
        {
            "collection": {
                "id": "students",
                "name": "Students",
                "permissions": [{"label": "admin", "actions": ["read", "create", "update", "delete"]}],
                "documentSecurity": true
            },
            "attributes": [
                {"key": "fullName", "type": "string", "size": 128, "required": true},
                {"key": "email", "type": "string", "format": "email", "required": true},
                {"key": "grade", "type": "integer", "min": 1, "max": 12},
                {"key": "enrolled", "type": "boolean", "default": true}
            ],
            "indexes": [
                {"key": "idx_email", "type": "unique", "attributes": ["email"]}
            ]
        }
    ]"#;

    #[test]
    fn test_loads_and_resolves_kinds() {
        let schema = SchemaDefinition::from_json(MINIMAL).unwrap();
        assert_eq!(schema.collections.len(), 1);
        let coll = &schema.collections[0];
        assert_eq!(coll.id, "students");
        assert!(coll.document_security);
        assert_eq!(coll.attributes.len(), 4);
        assert_eq!(
            coll.attributes[0].kind,
            AttributeKind::PlainString {
                size: 128,
                default: None
            }
        );
        assert_eq!(coll.attributes[1].kind, AttributeKind::Email { default: None });
        assert_eq!(
            coll.attributes[2].kind,
            AttributeKind::Integer {
                min: Some(1),
                max: Some(12),
                default: None
            }
        );
        assert_eq!(
            coll.attributes[3].kind,
            AttributeKind::Boolean {
                default: Some(true)
            }
        );
        assert_eq!(coll.indexes[0].index_type, "unique");
    }

    #[test]
    fn test_index_with_unknown_attribute_fails() {
        let source = r#"[
            {
                "collection": {"id": "c", "name": "C"},
                "attributes": [{"key": "a", "type": "string"}],
                "indexes": [{"key": "idx", "attributes": ["missing"]}]
            }
        ]"#;
        let err = SchemaDefinition::from_json(source).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownIndexAttribute { ref attribute, .. } if attribute == "missing"));
    }

    #[test]
    fn test_unknown_type_degrades_to_string() {
        let source = r#"[
            {
                "collection": {"id": "c", "name": "C"},
                "attributes": [{"key": "weird", "type": "geopoint"}]
            }
        ]"#;
        let schema = SchemaDefinition::from_json(source).unwrap();
        assert_eq!(
            schema.collections[0].attributes[0].kind,
            AttributeKind::PlainString {
                size: 255,
                default: None
            }
        );
    }

    #[test]
    fn test_empty_enum_fails() {
        let source = r#"[
            {
                "collection": {"id": "c", "name": "C"},
                "attributes": [{"key": "status", "type": "string", "format": "enum", "options": []}]
            }
        ]"#;
        let err = SchemaDefinition::from_json(source).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyEnum { .. }));
    }

    #[test]
    fn test_duplicate_attribute_fails() {
        let source = r#"[
            {
                "collection": {"id": "c", "name": "C"},
                "attributes": [
                    {"key": "a", "type": "string"},
                    {"key": "a", "type": "integer"}
                ]
            }
        ]"#;
        let err = SchemaDefinition::from_json(source).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateAttribute { .. }));
    }

    #[test]
    fn test_missing_permissions_field_stays_none() {
        let source = r#"[{"collection": {"id": "c", "name": "C"}}]"#;
        let schema = SchemaDefinition::from_json(source).unwrap();
        assert!(schema.collections[0].permissions.is_none());
    }

    #[test]
    fn test_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let schema = SchemaDefinition::from_file(file.path()).unwrap();
        assert_eq!(schema.collections.len(), 1);
    }

    #[test]
    fn test_missing_file_fails() {
        let err = SchemaDefinition::from_file("/nonexistent/schema.json").unwrap_err();
        assert!(matches!(err, SchemaError::Io(_)));
    }

    #[test]
    fn test_bundled_campus_schema_is_valid() {
        let schema = SchemaDefinition::campus_default().unwrap();
        assert!(!schema.collections.is_empty());
        assert!(schema.attribute_count() > 0);
        assert!(schema.index_count() > 0);
    }
}
