//! CSV parsing and row -> record extraction.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;
use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ImportError;
use crate::ident::{self, SENTINELS};

/// One CSV row, columns in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Parsed contents of one CSV file.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
}

/// Read a CSV file with a header row. Every cell is kept as a string and
/// short rows are padded with empty strings.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<CsvTable, ImportError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_err = |source: csv::Error| ImportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(RawRecord::new(fields));
    }

    info!("  Read {} rows from {:?}", rows.len(), path);
    Ok(CsvTable { headers, rows })
}

/// Normalized node property map; always carries a non-empty `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NodeRecord(pub Map<String, Value>);

impl NodeRecord {
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }
}

/// Normalized node records of one file plus what had to be synthesized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeExtraction {
    pub records: Vec<NodeRecord>,
    /// The file has no `id` column; every record got a synthesized id.
    pub id_column_missing: bool,
    /// Rows whose `id` was blank or a placeholder after cleaning.
    pub ids_replaced: usize,
}

impl NodeExtraction {
    /// Records whose id was generated rather than read from the file.
    pub fn synthesized(&self) -> usize {
        if self.id_column_missing {
            self.records.len()
        } else {
            self.ids_replaced
        }
    }
}

/// Turn the rows of a node file into normalized records.
///
/// `source` only names the file in log output.
pub fn extract_nodes(table: &CsvTable, source: &str) -> NodeExtraction {
    let id_column_missing = !table.headers.iter().any(|h| h == "id");
    if id_column_missing && !table.rows.is_empty() {
        warn!("⚠️ '{}' missing id -> generated UUIDs.", source);
    }

    let mut ids_replaced = 0usize;
    let records = table
        .rows
        .iter()
        .map(|row| {
            let mut props: Map<String, Value> = row
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect();

            ident::clean_id_fields(&mut props);
            if props.get("id").and_then(Value::as_str).is_none() {
                if !id_column_missing {
                    ids_replaced += 1;
                }
                props.insert("id".to_string(), Value::String(ident::synthesize()));
            }
            NodeRecord(props)
        })
        .collect();

    if ids_replaced > 0 {
        warn!(
            "⚠️ {} null IDs in '{}' -> replaced with UUIDs. Re-running will mint different ids for these rows.",
            ids_replaced, source
        );
    }
    NodeExtraction {
        records,
        id_column_missing,
        ids_replaced,
    }
}

/// Column positions used as relationship endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointColumns {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

/// Pick the start and end id columns from a header list.
///
/// A header is a start candidate when it contains `start` or `source` and
/// `id`, an end candidate when it contains `end` or `target` and `id`
/// (case-insensitive). A header claimed as start is not considered for end.
/// When several headers match a role the first one in column order wins;
/// that tie-break is incidental, not something callers should rely on.
pub fn classify_endpoint_columns<S: AsRef<str>>(headers: &[S]) -> EndpointColumns {
    let mut cols = EndpointColumns::default();
    for (i, header) in headers.iter().enumerate() {
        let k = header.as_ref().to_lowercase();
        if !k.contains("id") {
            continue;
        }
        if k.contains("start") || k.contains("source") {
            cols.start.get_or_insert(i);
        } else if k.contains("end") || k.contains("target") {
            cols.end.get_or_insert(i);
        }
    }
    cols
}

/// Cleaned `(start_id, end_id)` of a relationship row.
pub fn extract_ids(row: &RawRecord) -> (Option<String>, Option<String>) {
    let cols = classify_endpoint_columns(&row.headers()[..]);
    let value_at = |idx: Option<usize>| {
        idx.and_then(|i| row.fields.get(i))
            .and_then(|(_, v)| ident::clean(v))
    };
    (value_at(cols.start), value_at(cols.end))
}

/// Relationship properties: every non-id, non-`type` column with a real value.
pub fn extract_properties(row: &RawRecord) -> BTreeMap<String, String> {
    row.iter()
        .filter(|(k, v)| {
            let k = k.to_lowercase();
            !k.contains("id") && k != "type" && !SENTINELS.contains(v)
        })
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipDescriptor {
    pub start_id: String,
    pub end_id: String,
    pub props: BTreeMap<String, String>,
}

/// Valid descriptors plus the number of rows dropped for a missing endpoint.
pub fn extract_relationships(table: &CsvTable) -> (Vec<RelationshipDescriptor>, usize) {
    let mut skipped = 0;
    let mut descriptors = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        match extract_ids(row) {
            (Some(start_id), Some(end_id)) => descriptors.push(RelationshipDescriptor {
                start_id,
                end_id,
                props: extract_properties(row),
            }),
            _ => skipped += 1,
        }
    }
    (descriptors, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn table(headers: &[&str], rows: &[&[&str]]) -> CsvTable {
        CsvTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| headers.iter().copied().zip(r.iter().copied()).collect())
                .collect(),
        }
    }

    #[test]
    fn missing_id_column_gets_distinct_ids() {
        let t = table(&["name"], &[&["a"], &["b"], &["c"]]);
        let out = extract_nodes(&t, "Person_nodes.csv");

        assert!(out.id_column_missing);
        assert_eq!(out.ids_replaced, 0);
        let ids: HashSet<&str> = out.records.iter().filter_map(|n| n.id()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| !id.is_empty()));
    }

    #[test]
    fn blank_ids_are_replaced_and_others_cleaned() {
        let t = table(
            &["id", "name", "manager_id"],
            &[&["1.0", "a", "nan"], &["  ", "b", "3"], &["None", "c", "4.0"]],
        );
        let out = extract_nodes(&t, "Person_nodes.csv");
        let nodes = &out.records;

        assert!(!out.id_column_missing);
        assert_eq!(out.ids_replaced, 2);
        assert_eq!(nodes[0].id(), Some("1"));
        assert_eq!(nodes[0].0["manager_id"], Value::Null);
        assert!(!nodes[1].id().unwrap().is_empty());
        assert_ne!(nodes[1].id(), nodes[2].id());
        assert_eq!(nodes[2].0["manager_id"], Value::String("4".into()));
        assert_eq!(nodes[1].0["name"], Value::String("b".into()));
    }

    #[test]
    fn ids_that_clean_to_nothing_are_replaced() {
        let t = table(
            &["id", "name"],
            &[&["nan.0", "a"], &[".0", "b"], &["None.0", "c"], &["7.0", "d"]],
        );
        let out = extract_nodes(&t, "Person_nodes.csv");

        assert_eq!(out.ids_replaced, 3);
        for node in &out.records {
            let id = node.id().expect("string id");
            assert!(!id.is_empty());
        }
        assert_eq!(out.records[3].id(), Some("7"));
        let ids: HashSet<&str> = out.records.iter().filter_map(|n| n.id()).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn source_target_row() {
        let row: RawRecord = [("SourceID", "A"), ("TargetID", "B"), ("weight", "5")]
            .into_iter()
            .collect();

        assert_eq!(extract_ids(&row), (Some("A".into()), Some("B".into())));
        let props = extract_properties(&row);
        assert_eq!(props.len(), 1);
        assert_eq!(props["weight"], "5");
    }

    #[test]
    fn properties_skip_type_ids_and_sentinels() {
        let row: RawRecord = [
            ("start_id", "1"),
            ("end_id", "2"),
            ("Type", "KNOWS"),
            ("since", "2020"),
            ("note", ""),
            ("score", "nan"),
            ("label", "None"),
        ]
        .into_iter()
        .collect();

        let props = extract_properties(&row);
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["since"]);
    }

    #[test]
    fn first_matching_column_wins() {
        let cols = classify_endpoint_columns(&["start_id", "source_id", "end_id", "target_id"]);
        assert_eq!(cols, EndpointColumns { start: Some(0), end: Some(2) });
    }

    #[test]
    fn unrelated_headers_classify_to_nothing() {
        let cols = classify_endpoint_columns(&["from", "to", "weight"]);
        assert_eq!(cols, EndpointColumns::default());
        let cols = classify_endpoint_columns::<&str>(&[]);
        assert_eq!(cols, EndpointColumns::default());
    }

    #[test]
    fn rows_without_endpoints_are_skipped() {
        let t = table(
            &["source_id", "target_id", "since"],
            &[&["1", "2", "x"], &["", "2", "y"], &["3.0", "4", ""]],
        );
        let (rels, skipped) = extract_relationships(&t);

        assert_eq!(skipped, 1);
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[1].start_id, "3");
        assert!(rels[1].props.is_empty());

        let t = table(&["from", "to"], &[&["1", "2"]]);
        let (rels, skipped) = extract_relationships(&t);
        assert!(rels.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn read_csv_keeps_strings_and_pads_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Person_nodes.csv");
        std::fs::write(&path, "id,zip,name\n1,00123,Ann\n2,,\n3\n").unwrap();

        let t = read_csv(&path).unwrap();
        assert_eq!(t.headers, vec!["id", "zip", "name"]);
        assert_eq!(t.rows.len(), 3);
        assert_eq!(t.rows[0].get("zip"), Some("00123"));
        assert_eq!(t.rows[1].get("name"), Some(""));
        assert_eq!(t.rows[2].get("zip"), Some(""));
    }
}
