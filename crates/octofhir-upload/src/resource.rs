//! Terminology resource classification.
//!
//! Only the four terminology resource types take part in an upload. Anything
//! else (other FHIR resources, non-JSON files, JSON without a `resourceType`)
//! is excluded silently: exclusion is routine filtering, not a failure.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminology resource types, ordered by upload tier.
///
/// The ordering is a dependency ordering: ValueSets reference CodeSystems and
/// ConceptMaps reference both, so a lower tier must be fully uploaded before
/// the next one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    NamingSystem,
    CodeSystem,
    ValueSet,
    ConceptMap,
}

impl ResourceKind {
    /// All kinds in upload order.
    pub const UPLOAD_ORDER: [ResourceKind; 4] = [
        ResourceKind::NamingSystem,
        ResourceKind::CodeSystem,
        ResourceKind::ValueSet,
        ResourceKind::ConceptMap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NamingSystem => "NamingSystem",
            Self::CodeSystem => "CodeSystem",
            Self::ValueSet => "ValueSet",
            Self::ConceptMap => "ConceptMap",
        }
    }

    /// Upload tier, 0 is uploaded first.
    pub fn tier(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NamingSystem" => Ok(Self::NamingSystem),
            "CodeSystem" => Ok(Self::CodeSystem),
            "ValueSet" => Ok(Self::ValueSet),
            "ConceptMap" => Ok(Self::ConceptMap),
            _ => Err(()),
        }
    }
}

/// A terminology resource queued for upload.
#[derive(Debug, Clone)]
pub struct Resource {
    pub kind: ResourceKind,
    pub id: Option<String>,
    pub canonical_url: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    /// Exact text as read from disk. Edits replace it wholesale.
    pub content: String,
    pub source_path: PathBuf,
}

impl Resource {
    /// Short human-readable label used in logs and reports.
    pub fn label(&self) -> String {
        let name = self
            .name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("<unnamed>");
        match &self.version {
            Some(version) => format!("{} {name} (version {version})", self.kind),
            None => format!("{} {name}", self.kind),
        }
    }

    /// File name of the source, used for patch artifact naming.
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    /// Set the logical id, rewriting the JSON content to carry it.
    pub fn assign_id(&mut self, id: &str) -> serde_json::Result<()> {
        let mut json: Value = serde_json::from_str(&self.content)?;
        if let Some(obj) = json.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
        self.content = serde_json::to_string_pretty(&json)?;
        self.id = Some(id.to_string());
        Ok(())
    }

    /// Replace the content after an operator edit, refreshing derived fields.
    ///
    /// The kind is kept even if the edit changed `resourceType`; the resource
    /// stays in the bucket it was queued in.
    pub fn replace_content(&mut self, content: String) -> serde_json::Result<()> {
        let json: Value = serde_json::from_str(&content)?;
        self.id = string_field(&json, "id");
        self.canonical_url = string_field(&json, "url");
        self.name = string_field(&json, "name");
        self.version = string_field(&json, "version");
        self.content = content;
        Ok(())
    }
}

/// Result of classifying one document.
#[derive(Debug, Clone)]
pub enum Classification {
    Resource(Resource),
    Excluded,
}

impl Classification {
    pub fn into_resource(self) -> Option<Resource> {
        match self {
            Self::Resource(r) => Some(r),
            Self::Excluded => None,
        }
    }
}

/// Classify a document by its `resourceType` discriminator.
pub fn classify(source_path: impl Into<PathBuf>, text: &str) -> Classification {
    let Ok(json) = serde_json::from_str::<Value>(text) else {
        return Classification::Excluded;
    };
    let Some(kind) = json
        .get("resourceType")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<ResourceKind>().ok())
    else {
        return Classification::Excluded;
    };

    Classification::Resource(Resource {
        kind,
        id: string_field(&json, "id"),
        canonical_url: string_field(&json, "url"),
        name: string_field(&json, "name"),
        version: string_field(&json, "version"),
        content: text.to_string(),
        source_path: source_path.into(),
    })
}

/// Read candidate files and keep the terminology resources, in input order.
///
/// Files that cannot be read as UTF-8 text are skipped with a warning.
pub fn load_resources<P: AsRef<Path>>(paths: &[P]) -> Vec<Resource> {
    let mut resources = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping file that could not be read as UTF-8 text");
                continue;
            }
        };
        match classify(path, &text) {
            Classification::Resource(resource) => {
                tracing::info!(path = %path.display(), "Queued {}", resource.label());
                resources.push(resource);
            }
            Classification::Excluded => {
                tracing::debug!(path = %path.display(), "Not a terminology resource, excluded");
            }
        }
    }
    resources
}

fn string_field(json: &Value, key: &str) -> Option<String> {
    json.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn test_classify_code_system() {
        let text = json!({
            "resourceType": "CodeSystem",
            "id": "cs-1",
            "url": "http://example.org/cs",
            "name": "Example",
            "version": "1.0.0"
        })
        .to_string();

        let resource = classify("cs.json", &text).into_resource().unwrap();
        assert_eq!(resource.kind, ResourceKind::CodeSystem);
        assert_eq!(resource.id.as_deref(), Some("cs-1"));
        assert_eq!(resource.canonical_url.as_deref(), Some("http://example.org/cs"));
        assert_eq!(resource.content, text);
        assert_eq!(resource.label(), "CodeSystem Example (version 1.0.0)");
    }

    #[test]
    fn test_classify_excludes_other_documents() {
        assert!(matches!(
            classify("p.json", r#"{"resourceType":"Patient"}"#),
            Classification::Excluded
        ));
        assert!(matches!(
            classify("x.json", r#"{"name":"no type"}"#),
            Classification::Excluded
        ));
        assert!(matches!(
            classify("x.xml", "<CodeSystem/>"),
            Classification::Excluded
        ));
        assert!(matches!(
            classify("x.json", r#"{"resourceType": 42}"#),
            Classification::Excluded
        ));
    }

    #[test]
    fn test_kind_upload_order() {
        let mut kinds = vec![
            ResourceKind::ConceptMap,
            ResourceKind::ValueSet,
            ResourceKind::NamingSystem,
            ResourceKind::CodeSystem,
        ];
        kinds.sort();
        assert_eq!(kinds, ResourceKind::UPLOAD_ORDER.to_vec());
        assert_eq!(ResourceKind::NamingSystem.tier(), 0);
        assert_eq!(ResourceKind::ConceptMap.tier(), 3);
    }

    #[test]
    fn test_assign_id_rewrites_content() {
        let mut resource = classify("vs.json", r#"{"resourceType":"ValueSet","name":"VS"}"#)
            .into_resource()
            .unwrap();
        resource.assign_id("my-vs").unwrap();

        assert_eq!(resource.id.as_deref(), Some("my-vs"));
        let json: Value = serde_json::from_str(&resource.content).unwrap();
        assert_json_eq!(json, json!({"resourceType": "ValueSet", "name": "VS", "id": "my-vs"}));
    }

    #[test]
    fn test_replace_content_refreshes_fields() {
        let mut resource = classify("cm.json", r#"{"resourceType":"ConceptMap","id":"a"}"#)
            .into_resource()
            .unwrap();
        resource
            .replace_content(r#"{"resourceType":"ConceptMap","id":"b","name":"Map"}"#.into())
            .unwrap();
        assert_eq!(resource.id.as_deref(), Some("b"));
        assert_eq!(resource.name.as_deref(), Some("Map"));

        assert!(resource.replace_content("not json".into()).is_err());
        assert_eq!(resource.id.as_deref(), Some("b"));
    }

    #[test]
    fn test_load_resources_skips_unreadable_and_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let ns = dir.path().join("ns.json");
        let patient = dir.path().join("patient.json");
        let binary = dir.path().join("blob.bin");
        fs::write(&ns, r#"{"resourceType":"NamingSystem","name":"NS"}"#).unwrap();
        fs::write(&patient, r#"{"resourceType":"Patient"}"#).unwrap();
        fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();

        let resources = load_resources(&[ns.clone(), patient, binary, dir.path().join("missing.json")]);
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].source_path, ns);
    }
}
