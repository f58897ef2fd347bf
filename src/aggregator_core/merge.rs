//! Type-directed merge of two object trees that share a key
//!
//! Combine policy, per field of the incoming object:
//!
//! ```text
//! absent in accumulator        → insert incoming value
//! old numeric, new not         → keep old (numeric-sticky)
//! old non-numeric, kinds differ → new replaces old
//! both objects                 → recurse
//! both arrays                  → old ++ new
//! same scalar kind             → new replaces old
//! both numeric                 → sum (see add_numbers)
//! ```

use super::value::{Object, Value};
use std::fmt;

/// Same as the JSON decoder's recursion limit. The decoder rejects deeper input
/// outright, so `TooDeep` only fires for engines built with a lower
/// `with_max_depth` or for trees assembled in code.
pub const DEFAULT_MAX_MERGE_DEPTH: usize = 128;

/// A field that could not be merged. The accumulator keeps its previous value for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    TooDeep {
        field: String,
        depth: usize,
        max_depth: usize,
    },
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::TooDeep {
                field,
                depth,
                max_depth,
            } => write!(
                f,
                "field '{}' nests {} levels deep (max {}), left unchanged",
                field, depth, max_depth
            ),
        }
    }
}

impl std::error::Error for MergeError {}

#[derive(Debug, Clone, Copy)]
pub struct MergeEngine {
    max_depth: usize,
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeEngine {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_MERGE_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Fold `incoming` into `accumulator` in place.
    ///
    /// Returns the fields that were rejected; every other field has been applied.
    pub fn merge(&self, accumulator: &mut Object, incoming: Object) -> Vec<MergeError> {
        let mut errors = Vec::new();

        for (field, new) in incoming {
            let Some(old) = accumulator.get_mut(&field) else {
                accumulator.insert(field, new);
                continue;
            };

            // Depth is checked up front so a rejected field is never half-merged
            if let (Value::Object(_), Value::Object(_)) = (&*old, &new) {
                let depth = new.depth();
                if depth > self.max_depth {
                    errors.push(MergeError::TooDeep {
                        field,
                        depth,
                        max_depth: self.max_depth,
                    });
                    continue;
                }
            }

            self.combine(&field, old, new);
        }

        errors
    }

    /// Apply the combine policy to one field that exists on both sides
    pub fn combine(&self, field: &str, old: &mut Value, new: Value) {
        match (old.is_numeric(), new.is_numeric()) {
            (true, true) => {
                *old = add_numbers(old, &new);
            }
            (true, false) => {
                log::debug!(
                    "Dropping {} for numeric field '{}'",
                    new.type_name(),
                    field
                );
            }
            (false, _) => {
                if old.kind() != new.kind() {
                    *old = new;
                    return;
                }

                match (old, new) {
                    (Value::Object(old_map), Value::Object(new_map)) => {
                        for (name, value) in new_map {
                            match old_map.get_mut(&name) {
                                Some(slot) => self.combine(&name, slot, value),
                                None => {
                                    old_map.insert(name, value);
                                }
                            }
                        }
                    }
                    (Value::Array(old_items), Value::Array(new_items)) => {
                        old_items.extend(new_items);
                    }
                    (slot, new) => *slot = new,
                }
            }
        }
    }
}

/// Sum two numeric values.
///
/// Integers of the same signedness add in their own width with wraparound.
/// Mixed signedness reinterprets the unsigned side as `i64` (lossy above
/// `i64::MAX`). A float on either side makes the result a float.
/// Non-numeric operands count as zero; callers only pass numbers.
pub fn add_numbers(old: &Value, new: &Value) -> Value {
    match (old, new) {
        (Value::SignedInt(a), Value::SignedInt(b)) => Value::SignedInt(a.wrapping_add(*b)),
        (Value::UnsignedInt(a), Value::UnsignedInt(b)) => Value::UnsignedInt(a.wrapping_add(*b)),
        (Value::UnsignedInt(u), Value::SignedInt(s)) | (Value::SignedInt(s), Value::UnsignedInt(u)) => {
            Value::SignedInt((*u as i64).wrapping_add(*s))
        }
        _ => Value::Float(old.as_f64().unwrap_or(0.0) + new.as_f64().unwrap_or(0.0)),
    }
}
