//! The incremental merger: path-lifting and deep-merging GraphQL
//! incremental-delivery payloads into a running accumulator.

use serde_json::{Map, Value};

use crate::types::{IncrementalPayload, PathSegment};

/// Lift `data` so that it resides at `path` within a freshly built tree.
///
/// `path` segments alternate (in practice) between object keys and array
/// indices; a numeric segment builds an array of the right length with
/// [`Value::Null`] filler, a string segment builds an object. An empty path
/// returns `data` unchanged.
pub fn build_data_object_by_path(path: &[PathSegment], data: Value) -> Value {
    let mut iter = path.iter().rev();
    let Some(last) = iter.next() else {
        return data;
    };

    let mut current = wrap(last, data);
    for segment in iter {
        current = wrap(segment, current);
    }
    current
}

fn wrap(segment: &PathSegment, value: Value) -> Value {
    match segment {
        PathSegment::Key(key) => {
            let mut map = Map::new();
            map.insert(key.clone(), value);
            Value::Object(map)
        }
        PathSegment::Index(index) => {
            let mut array = vec![Value::Null; index + 1];
            array[*index] = value;
            Value::Array(array)
        }
    }
}

/// Deep-merge `incoming` into `base` in place: objects combine key-by-key,
/// arrays combine index-wise (so a later chunk targeting `[0].name` enriches
/// the existing `[0]` object rather than replacing the array), and scalars
/// are overwritten.
pub fn build_combined_data_object(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, incoming_value) in incoming_map {
                match base_map.get_mut(&key) {
                    Some(existing) => build_combined_data_object(existing, incoming_value),
                    None => {
                        base_map.insert(key, incoming_value);
                    }
                }
            }
        }
        (Value::Array(base_arr), Value::Array(incoming_arr)) => {
            for (index, incoming_value) in incoming_arr.into_iter().enumerate() {
                if index < base_arr.len() {
                    build_combined_data_object(&mut base_arr[index], incoming_value);
                } else {
                    base_arr.push(incoming_value);
                }
            }
        }
        (base_slot, incoming_value) => {
            *base_slot = incoming_value;
        }
    }
}

/// The running state of one incremental-delivery stream. Owned exclusively by the stream's generator; never shared.
#[derive(Debug, Default, Clone)]
pub struct Accumulator {
    /// The merged data tree, structurally append-only.
    pub combined_data: Value,
    /// The most recent non-null extensions object seen.
    pub extensions: Option<Value>,
    /// The `hasNext` field of the last successfully processed payload.
    pub has_next: bool,
    /// GraphQL error objects collected across all payloads so far.
    pub errors: Vec<Value>,
}

impl Accumulator {
    /// A fresh accumulator with an empty object as its data tree.
    pub fn new() -> Self {
        Self {
            combined_data: Value::Object(Map::new()),
            extensions: None,
            has_next: false,
            errors: Vec::new(),
        }
    }

    /// Whether `combined_data` is still structurally empty (no keys merged in yet).
    pub fn data_is_empty(&self) -> bool {
        matches!(&self.combined_data, Value::Object(map) if map.is_empty())
    }

    /// Fold one batch of parsed [`IncrementalPayload`]s into this accumulator.
    /// Returns the non-empty `errors` collected from this batch, if any (it
    /// is left to the caller to decide how to fail the stream).
    pub fn merge_batch(&mut self, payloads: Vec<IncrementalPayload>) -> Vec<Value> {
        let mut batch_errors = Vec::new();

        for payload in payloads {
            let effective_data = match (payload.data, payload.path) {
                (Some(data), Some(path)) => build_data_object_by_path(&path, data),
                (Some(data), None) => data,
                (None, _) => Value::Object(Map::new()),
            };

            build_combined_data_object(&mut self.combined_data, effective_data);

            if let Some(extensions) = payload.extensions {
                if !is_null_or_empty(&extensions) {
                    self.extensions = Some(extensions);
                }
            }

            if let Some(errors) = payload.errors {
                if !errors.is_empty() {
                    batch_errors.extend(errors);
                }
            }

            self.has_next = payload.has_next;
        }

        self.errors.extend(batch_errors.iter().cloned());
        batch_errors
    }
}

fn is_null_or_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
