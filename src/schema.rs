//! Label and relationship-type inference from file names and label maps.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

pub const NODE_SUFFIX: &str = "_nodes";
pub const RELATIONSHIP_SUFFIX: &str = "_relationships";

/// Node label -> (primary, secondary) label pair.
pub type DualLabelMap = HashMap<String, (String, String)>;

/// Lower-cased relationship type -> (start label, end label).
pub type RelLabelMap = HashMap<String, (String, String)>;

/// Labels applied to every node of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSpec {
    Single(String),
    Dual { primary: String, secondary: String },
}

impl LabelSpec {
    pub fn labels(&self) -> Vec<&str> {
        match self {
            LabelSpec::Single(label) => vec![label.as_str()],
            LabelSpec::Dual { primary, secondary } => vec![primary.as_str(), secondary.as_str()],
        }
    }
}

/// Relationship type plus its optional endpoint label constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipTypeSpec {
    pub rel_type: String,
    pub endpoints: Option<(String, String)>,
}

fn ordering_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r"^\d+_").expect("static regex"))
}

fn stem_without(name: &str, suffix: &str) -> String {
    let name = ordering_prefix().replace(name, "");
    let stem = Path::new(&*name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.strip_suffix(suffix) {
        Some(base) => base.to_string(),
        None => stem,
    }
}

/// `01_Person_nodes.csv` -> `Person`.
pub fn label_from_filename(name: &str) -> String {
    stem_without(name, NODE_SUFFIX)
}

/// `Purchased_relationships.csv` -> `Purchased`.
pub fn rel_type_from_filename(name: &str) -> String {
    stem_without(name, RELATIONSHIP_SUFFIX)
}

pub fn resolve_node_labels(label: &str, dual_labels: &DualLabelMap) -> LabelSpec {
    match dual_labels.get(label) {
        Some((primary, secondary)) => LabelSpec::Dual {
            primary: primary.clone(),
            secondary: secondary.clone(),
        },
        None => LabelSpec::Single(label.to_string()),
    }
}

/// Looks up `rel_type` case-insensitively. `None` means endpoints are
/// matched by id alone.
pub fn resolve_relationship_endpoints(
    rel_type: &str,
    rel_labels: &RelLabelMap,
) -> Option<(String, String)> {
    rel_labels.get(&rel_type.to_lowercase()).cloned()
}

pub fn resolve_relationship_type(rel_type: &str, rel_labels: &RelLabelMap) -> RelationshipTypeSpec {
    RelationshipTypeSpec {
        rel_type: rel_type.to_string(),
        endpoints: resolve_relationship_endpoints(rel_type, rel_labels),
    }
}
