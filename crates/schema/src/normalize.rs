//! `allOf` flattening with local `$ref` resolution.
//!
//! A node carrying `allOf` is rewritten into a single object: its own keys first, then every
//! fragment merged in order. `properties` are unioned, `required` lists are concatenated and
//! de-duplicated, any other key is overwritten by the later fragment.
//!
//! Only `#/definitions/<name>` pointers are resolved, and only against the definitions passed in
//! by the caller. A `$ref` that cannot be resolved is kept verbatim in the output's `allOf` list
//! so the reference is never lost. A definition that (transitively) composes itself is treated
//! as unresolvable at the point where it would recurse.

use serde_json::{Map, Value};
use std::collections::HashSet;

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const ALL_OF: &str = "allOf";
const REF: &str = "$ref";

/// Normalize an API detail document using its own top-level `definitions` as the `$ref` context.
#[must_use]
pub fn normalize_detail(detail: &Value) -> Value {
    let definitions = detail.get("definitions").and_then(Value::as_object);
    normalize(detail, definitions)
}

/// Normalize `node`, resolving `$ref`s against `definitions` (if any).
#[must_use]
pub fn normalize(node: &Value, definitions: Option<&Map<String, Value>>) -> Value {
    Normalizer {
        definitions,
        expanding: Vec::new(),
    }
    .node(node)
}

struct Normalizer<'a> {
    definitions: Option<&'a Map<String, Value>>,
    /// Definition names currently being expanded (cycle guard).
    expanding: Vec<&'a str>,
}

impl<'a> Normalizer<'a> {
    fn node(&mut self, node: &Value) -> Value {
        match node {
            Value::Object(map) => match map.get(ALL_OF) {
                Some(Value::Array(fragments)) => Value::Object(self.compose(map, fragments)),
                _ => Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), self.node(v)))
                        .collect(),
                ),
            },
            Value::Array(items) => Value::Array(items.iter().map(|v| self.node(v)).collect()),
            scalar => scalar.clone(),
        }
    }

    fn compose(&mut self, map: &Map<String, Value>, fragments: &[Value]) -> Map<String, Value> {
        let mut acc = Map::new();
        for (key, value) in map {
            if key != ALL_OF {
                acc.insert(key.clone(), self.node(value));
            }
        }

        for fragment in fragments {
            self.apply_fragment(&mut acc, fragment);
        }

        dedup_required(&mut acc);
        acc
    }

    fn apply_fragment(&mut self, acc: &mut Map<String, Value>, fragment: &Value) {
        // Fragments are objects by grammar; anything else carries nothing to merge.
        let Value::Object(obj) = fragment else {
            return;
        };

        if let Some(reference) = obj.get(REF) {
            match reference.as_str().and_then(|r| self.lookup(r)) {
                Some((name, definition)) => {
                    self.expanding.push(name);
                    self.apply_fragment(acc, definition);
                    self.expanding.pop();
                }
                None => {
                    tracing::debug!(reference = %reference, "keeping unresolved $ref");
                    push_all_of(acc, fragment.clone());
                }
            }
            return;
        }

        if let Value::Object(inline) = self.node(fragment) {
            merge_into(acc, inline);
        }
    }

    fn lookup(&self, reference: &str) -> Option<(&'a str, &'a Value)> {
        let name = reference.strip_prefix(DEFINITIONS_PREFIX)?;
        if self.expanding.iter().any(|n| *n == name) {
            return None;
        }
        let (key, definition) = self.definitions?.get_key_value(name)?;
        Some((key.as_str(), definition))
    }
}

fn merge_into(acc: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        let value = match acc.get_mut(&key) {
            Some(existing) => match combine(&key, existing, value) {
                Some(replacement) => replacement,
                None => continue,
            },
            None => value,
        };
        acc.insert(key, value);
    }
}

/// Fold `incoming` into `existing` for additive keys; hand it back when it should overwrite.
fn combine(key: &str, existing: &mut Value, incoming: Value) -> Option<Value> {
    match (key, existing, incoming) {
        ("properties", Value::Object(current), Value::Object(extra)) => {
            current.extend(extra);
            None
        }
        ("required" | ALL_OF, Value::Array(current), Value::Array(extra)) => {
            current.extend(extra);
            None
        }
        (_, _, incoming) => Some(incoming),
    }
}

fn push_all_of(acc: &mut Map<String, Value>, fragment: Value) {
    match acc.get_mut(ALL_OF) {
        Some(Value::Array(items)) => items.push(fragment),
        _ => {
            acc.insert(ALL_OF.to_string(), Value::Array(vec![fragment]));
        }
    }
}

fn dedup_required(acc: &mut Map<String, Value>) {
    if let Some(Value::Array(items)) = acc.get_mut("required") {
        let mut seen = HashSet::new();
        items.retain(|v| seen.insert(v.to_string()));
    }
}
