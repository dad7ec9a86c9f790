//! Relationship inference between resources.
//!
//! Resources don't record which other resources they read from. We guess
//! by looking for string values that appear both in one resource's inputs
//! and another resource's outputs, restricted to values that look like
//! references: ARNs, generated ids and URLs.
//!
//! This is a heuristic. Two unrelated resources that happen to carry the
//! same generated id are reported as related, and references in any other
//! shape are missed.

use crate::edge::{DependencyEdge, Heuristic, Relationship};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use stackscope_core::Resource;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

static OPAQUE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-[A-Za-z0-9]{7}$").expect("opaque id pattern is valid"));

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(http|https)://[^ "]+$"#).expect("url pattern is valid"));

impl Heuristic {
    /// All heuristics, in the order matches are reported.
    pub const ALL: [Heuristic; 3] = [Heuristic::Arn, Heuristic::OpaqueId, Heuristic::Url];

    /// Whether an input value is a candidate reference under this heuristic.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Heuristic::Arn => value.starts_with("arn:"),
            Heuristic::OpaqueId => OPAQUE_ID.is_match(value),
            Heuristic::Url => URL.is_match(value),
        }
    }
}

/// Infers dependency edges for every ordered pair of resources.
///
/// One edge per `(consumer, provider)` pair with at least one match, in
/// input order. Each input is classified once and looked up in an index of
/// output values, so the cost grows with the number of keys and matches
/// rather than with the number of resource pairs.
pub fn infer_dependencies<R: Borrow<Resource>>(resources: &[R]) -> Vec<DependencyEdge> {
    // Only the first record for each id takes part.
    let mut seen = HashSet::with_capacity(resources.len());
    let records: Vec<&Resource> = resources
        .iter()
        .map(<R as Borrow<Resource>>::borrow)
        .filter(|&r| seen.insert(r.id.as_str()))
        .collect();

    let index = OutputIndex::new(&records);
    let mut dependencies = Vec::new();

    for (i, source) in records.iter().enumerate() {
        let mut by_target: BTreeMap<usize, Vec<Relationship>> = BTreeMap::new();

        for (heuristic, input_key, value) in candidates(&source.inputs) {
            for &(j, output_key) in index.lookup(value) {
                if j == i {
                    continue;
                }
                by_target.entry(j).or_default().push(Relationship {
                    input: input_key.to_string(),
                    output: output_key.to_string(),
                    value: value.to_string(),
                    heuristic,
                });
            }
        }

        for (j, matches) in by_target {
            dependencies.push(DependencyEdge {
                from: source.id.clone(),
                to: records[j].id.clone(),
                matches,
            });
        }
    }

    debug!(
        "Inferred {} dependencies across {} resources",
        dependencies.len(),
        records.len()
    );

    dependencies
}

/// String output values mapped to the `(record, key)` pairs carrying them,
/// in record order then key order.
struct OutputIndex<'a> {
    values: HashMap<&'a str, Vec<(usize, &'a str)>>,
}

impl<'a> OutputIndex<'a> {
    fn new(records: &[&'a Resource]) -> Self {
        let mut values: HashMap<&str, Vec<(usize, &str)>> = HashMap::new();
        for (j, &record) in records.iter().enumerate() {
            for (key, value) in &record.outputs {
                if let Value::String(value) = value {
                    values.entry(value.as_str()).or_default().push((j, key.as_str()));
                }
            }
        }
        Self { values }
    }

    fn lookup(&self, value: &str) -> &[(usize, &'a str)] {
        self.values.get(value).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Inputs that look like references, grouped by heuristic.
///
/// A value accepted by two heuristics is listed once for each.
fn candidates(inputs: &Map<String, Value>) -> Vec<(Heuristic, &str, &str)> {
    let mut found = Vec::new();
    for heuristic in Heuristic::ALL {
        for (key, value) in inputs {
            if let Value::String(value) = value {
                if heuristic.accepts(value) {
                    found.push((heuristic, key.as_str(), value.as_str()));
                }
            }
        }
    }
    found
}
