//! Package file shape and the normalized records derived from it.

use crate::error::{IconifyError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Package-level metadata, derived once per load and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    pub package: String,
    pub prefix: String,
    #[serde(default)]
    pub info: Map<String, Value>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub last_modified: Option<i64>,
    #[serde(default)]
    pub suffixes: Vec<String>,
}

/// One renderable icon. Dimensions fall back to the owning package's.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconRecord {
    pub package: String,
    pub icon: String,
    pub body: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// An icon as stored in the package file. Only `body` and the optional
/// dimension overrides are consumed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconEntry {
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl IconEntry {
    pub(crate) fn to_record(&self, name: &str, meta: &PackageMetadata) -> IconRecord {
        IconRecord {
            package: meta.package.clone(),
            icon: name.to_string(),
            body: self.body.clone(),
            width: self.width.or(meta.width),
            height: self.height.or(meta.height),
        }
    }
}

/// Decoded package file. Unknown fields (`categories`, `aliases`, ...) are
/// ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPackage {
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    info: Map<String, Value>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    last_modified: Option<i64>,
    #[serde(default, deserialize_with = "suffix_names")]
    suffixes: Vec<String>,
    #[serde(default)]
    pub(crate) icons: BTreeMap<String, IconEntry>,
}

impl RawPackage {
    pub(crate) fn decode(package: &str, path: &Path, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| IconifyError::Decode {
            package: package.to_string(),
            path: path.to_path_buf(),
            source,
        })
    }

    /// Metadata for `package`; the prefix defaults to the package name.
    pub(crate) fn metadata(&self, package: &str) -> PackageMetadata {
        PackageMetadata {
            package: package.to_string(),
            prefix: self
                .prefix
                .clone()
                .filter(|prefix| !prefix.is_empty())
                .unwrap_or_else(|| package.to_string()),
            info: self.info.clone(),
            width: self.width,
            height: self.height,
            last_modified: self.last_modified,
            suffixes: self.suffixes.clone(),
        }
    }
}

// Icon sets publish suffixes either as a list or as a {suffix: label} map.
fn suffix_names<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Suffixes {
        List(Vec<String>),
        Labeled(BTreeMap<String, Value>),
        Missing(()),
    }

    Ok(match Suffixes::deserialize(deserializer)? {
        Suffixes::List(list) => list,
        Suffixes::Labeled(map) => map.into_keys().collect(),
        Suffixes::Missing(()) => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Result<RawPackage> {
        let bytes = serde_json::to_vec(&value).unwrap();
        RawPackage::decode("si", Path::new("si.json"), &bytes)
    }

    #[test]
    fn metadata_defaults_when_fields_absent() {
        let raw = decode(json!({"icons": {}})).unwrap();
        let meta = raw.metadata("si");
        assert_eq!(meta.prefix, "si");
        assert_eq!(meta.width, None);
        assert_eq!(meta.height, None);
        assert!(meta.info.is_empty());
        assert!(meta.suffixes.is_empty());
        assert_eq!(meta.last_modified, None);
    }

    #[test]
    fn metadata_reads_optional_fields() {
        let raw = decode(json!({
            "prefix": "simple-icons",
            "info": {"name": "Simple Icons"},
            "width": 24,
            "height": 24,
            "lastModified": 1700000000,
            "suffixes": {"": "Regular", "outline": "Outline"},
            "categories": {"Brands": ["github"]},
            "icons": {"github": {"body": "<path/>"}}
        }))
        .unwrap();
        let meta = raw.metadata("si");
        assert_eq!(meta.prefix, "simple-icons");
        assert_eq!(meta.width, Some(24));
        assert_eq!(meta.last_modified, Some(1_700_000_000));
        assert_eq!(meta.suffixes, vec!["".to_string(), "outline".to_string()]);
        assert_eq!(meta.info.get("name"), Some(&json!("Simple Icons")));
    }

    #[test]
    fn suffix_list_is_accepted() {
        let raw = decode(json!({"suffixes": ["solid", "outline"], "icons": {}})).unwrap();
        assert_eq!(raw.metadata("si").suffixes, vec!["solid", "outline"]);
    }

    #[test]
    fn icon_inherits_package_dimensions_unless_overridden() {
        let raw = decode(json!({
            "width": 24,
            "height": 24,
            "icons": {
                "home": {"body": "<path/>"},
                "wide": {"body": "<rect/>", "width": 32}
            }
        }))
        .unwrap();
        let meta = raw.metadata("si");
        let home = raw.icons["home"].to_record("home", &meta);
        assert_eq!((home.width, home.height), (Some(24), Some(24)));
        let wide = raw.icons["wide"].to_record("wide", &meta);
        assert_eq!((wide.width, wide.height), (Some(32), Some(24)));
        assert_eq!(wide.package, "si");
        assert_eq!(wide.icon, "wide");
    }

    #[test]
    fn malformed_content_is_a_decode_error() {
        let err = RawPackage::decode("si", Path::new("si.json"), b"not json").unwrap_err();
        assert!(matches!(err, IconifyError::Decode { ref package, .. } if package == "si"));

        let err = decode(json!({"icons": {"home": {"body": 5}}})).unwrap_err();
        assert!(matches!(err, IconifyError::Decode { .. }));
    }
}
