//! Cypher statement templates.
//!
//! Labels and relationship types are the only values formatted into query
//! text and they go through [`sanitize_identifier`] first. Row data is always
//! bound as a parameter.

use serde_json::{Map, Value};

use crate::error::ImportError;
use crate::schema::LabelSpec;

/// Query text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Map<String, Value>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Map::new(),
        }
    }

    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }
}

/// Settings forwarded to `apoc.periodic.iterate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterateOptions {
    pub batch_size: usize,
    pub parallel: bool,
}

impl Default for IterateOptions {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            parallel: true,
        }
    }
}

/// Make a name safe to splice into Cypher as a label or type.
///
/// Anything outside `[A-Za-z0-9_]` becomes `_` and a leading digit gets a `_`
/// prefix. Names with no alphanumeric characters are rejected.
pub fn sanitize_identifier(raw: &str) -> Result<String, ImportError> {
    if !raw.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(ImportError::InvalidIdentifier(raw.to_string()));
    }
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    Ok(out)
}

/// Query text built once per file and bound to each batch or chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
    param: &'static str,
}

impl Template {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bind(&self, rows: Value) -> Statement {
        Statement::new(self.text.clone()).param(self.param, rows)
    }
}

/// `UNWIND $nodes AS node MERGE (n:Label {id: node.id}) SET n += node`
///
/// A dual label spec puts both labels on the merge pattern so they are
/// applied together under the same `id` key.
pub fn node_merge(labels: &LabelSpec) -> Result<Template, ImportError> {
    let label_text = labels
        .labels()
        .into_iter()
        .map(sanitize_identifier)
        .collect::<Result<Vec<_>, _>>()?
        .join(":");

    let text = format!(
        "UNWIND $nodes AS node \
         MERGE (n:{} {{id: node.id}}) \
         SET n += node",
        label_text
    );
    Ok(Template {
        text,
        param: "nodes",
    })
}

/// Bulk relationship merge handed to `apoc.periodic.iterate`.
///
/// The relationship type is upper-cased. Without endpoint labels both ends
/// are matched by `id` alone.
pub fn relationship_merge(
    rel_type: &str,
    endpoints: Option<(&str, &str)>,
    options: IterateOptions,
) -> Result<Template, ImportError> {
    let rel_type = sanitize_identifier(&rel_type.to_uppercase())?;
    let (start, end) = match endpoints {
        Some((start, end)) => (
            format!(":{}", sanitize_identifier(start)?),
            format!(":{}", sanitize_identifier(end)?),
        ),
        None => (String::new(), String::new()),
    };

    let text = format!(
        "CALL apoc.periodic.iterate(\
         \"UNWIND $rels AS rel RETURN rel\", \
         \"MATCH (a{start} {{id: rel.start_id}}) \
         MATCH (b{end} {{id: rel.end_id}}) \
         MERGE (a)-[r:{rel_type}]->(b) \
         SET r += rel.props\", \
         {{params: {{rels: $rels}}, batchSize: {batch}, parallel: {parallel}}})",
        start = start,
        end = end,
        rel_type = rel_type,
        batch = options.batch_size,
        parallel = options.parallel,
    );
    Ok(Template {
        text,
        param: "rels",
    })
}

/// Split a script into its non-blank `;`-separated statements.
pub fn split_script(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_keeps_safe_names() {
        assert_eq!(sanitize_identifier("Person").unwrap(), "Person");
        assert_eq!(sanitize_identifier("WORKS_AT").unwrap(), "WORKS_AT");
    }

    #[test]
    fn sanitize_rewrites_unsafe_characters() {
        assert_eq!(sanitize_identifier("Big Thing").unwrap(), "Big_Thing");
        assert_eq!(sanitize_identifier("a`) DETACH DELETE (x").unwrap(), "a___DETACH_DELETE__x");
        assert_eq!(sanitize_identifier("2fa").unwrap(), "_2fa");
        assert!(sanitize_identifier("").is_err());
        assert!(sanitize_identifier("__").is_err());
    }

    #[test]
    fn single_label_merge() {
        let stmt = node_merge(&LabelSpec::Single("Person".into()))
            .unwrap()
            .bind(json!([{"id": "1"}]));
        assert!(stmt.text.contains("MERGE (n:Person {id: node.id})"));
        assert!(stmt.text.contains("SET n += node"));
        assert_eq!(stmt.params["nodes"], json!([{"id": "1"}]));
    }

    #[test]
    fn dual_label_merge_uses_one_key() {
        let labels = LabelSpec::Dual {
            primary: "Person".into(),
            secondary: "Employee".into(),
        };
        let template = node_merge(&labels).unwrap();
        assert!(template.text().contains("MERGE (n:Person:Employee {id: node.id})"));
    }

    #[test]
    fn relationship_merge_with_labels() {
        let stmt = relationship_merge(
            "Purchased",
            Some(("Customer", "Product")),
            IterateOptions::default(),
        )
        .unwrap()
        .bind(json!([]));

        assert!(stmt.text.starts_with("CALL apoc.periodic.iterate("));
        assert!(stmt.text.contains("MATCH (a:Customer {id: rel.start_id})"));
        assert!(stmt.text.contains("MATCH (b:Product {id: rel.end_id})"));
        assert!(stmt.text.contains("MERGE (a)-[r:PURCHASED]->(b)"));
        assert!(stmt.text.contains("batchSize: 10000, parallel: true"));
        assert!(stmt.params.contains_key("rels"));
    }

    #[test]
    fn relationship_merge_without_labels() {
        let opts = IterateOptions {
            batch_size: 500,
            parallel: false,
        };
        let stmt = relationship_merge("knows", None, opts).unwrap().bind(json!([]));

        assert!(stmt.text.contains("MATCH (a {id: rel.start_id})"));
        assert!(stmt.text.contains("MATCH (b {id: rel.end_id})"));
        assert!(stmt.text.contains("[r:KNOWS]"));
        assert!(stmt.text.contains("batchSize: 500, parallel: false"));
    }

    #[test]
    fn unusable_label_is_rejected() {
        assert!(node_merge(&LabelSpec::Single("".into())).is_err());
        assert!(relationship_merge("-", None, IterateOptions::default()).is_err());
    }

    #[test]
    fn script_splitting_drops_blanks() {
        let script = "CREATE INDEX a IF NOT EXISTS FOR (n:A) ON (n.id);\n\n ;\nRETURN 1;  ";
        assert_eq!(
            split_script(script),
            vec![
                "CREATE INDEX a IF NOT EXISTS FOR (n:A) ON (n.id)".to_string(),
                "RETURN 1".to_string()
            ]
        );
        assert!(split_script(" ; ;\n").is_empty());
    }
}
