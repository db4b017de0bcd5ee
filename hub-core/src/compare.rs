//! Generic value comparison over entity records.
//!
//! [`ValueComparator`] works on the JSON [`Record`] form of any entity and
//! uses the entity's [`FieldDescriptor`] list to decide how each field is
//! copied. It never needs per-type code beyond that list.
//!
//! - [`ValueComparator::clone`] - independent structural snapshot
//! - [`ValueComparator::diff`] - names of top-level scalar fields that differ
//! - [`ValueComparator::equals`] - deep equality ignoring `id` and exclusions
//! - [`ValueComparator::apply_into`] - descriptor-driven copy onto a target

use hub_types::{Entity, FieldDescriptor, FieldKind, Record};
use serde_json::Value;

use crate::date::coerce_date;

/// Name of the identity field, which is never diffed or compared.
pub const ID_FIELD: &str = "id";

/// Descriptor-driven comparison engine for one entity shape.
#[derive(Debug, Clone, Copy)]
pub struct ValueComparator {
    fields: &'static [FieldDescriptor],
}

impl ValueComparator {
    /// Comparator for an explicit field list.
    pub const fn new(fields: &'static [FieldDescriptor]) -> Self {
        Self { fields }
    }

    /// Comparator for entity type `T`.
    pub const fn for_entity<T: Entity>() -> Self {
        Self::new(T::FIELDS)
    }

    /// The field descriptors this comparator uses.
    pub fn fields(&self) -> &'static [FieldDescriptor] {
        self.fields
    }

    /// Deep copy of `record`, `id` included.
    #[allow(clippy::should_implement_trait)]
    pub fn clone(&self, record: &Record) -> Record {
        record.clone()
    }

    /// Field names present in both records whose top-level scalar values differ.
    ///
    /// `id` is never reported. A field holding an object or an array on either
    /// side is skipped: only scalar drift is detected. Names come back in the
    /// key order of `other`.
    pub fn diff(&self, current: &Record, other: &Record) -> Vec<String> {
        other
            .iter()
            .filter(|(key, _)| key.as_str() != ID_FIELD)
            .filter_map(|(key, theirs)| {
                let ours = current.get(key)?;
                if is_composite(ours) || is_composite(theirs) {
                    return None;
                }
                (!json_eq(ours, theirs)).then(|| key.clone())
            })
            .collect()
    }

    /// Deep structural equality after removing `id` and every name in `exclude`.
    pub fn equals(&self, a: &Record, b: &Record, exclude: &[&str]) -> bool {
        let strip = |record: &Record| -> Record {
            record
                .iter()
                .filter(|(key, _)| key.as_str() != ID_FIELD && !exclude.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        };
        let (a, b) = (strip(a), strip(b));
        a.len() == b.len()
            && a
                .iter()
                .all(|(key, value)| b.get(key).is_some_and(|other| json_eq(value, other)))
    }

    /// Copy every field present on both `target` and `source` into `target`.
    ///
    /// Date fields are coerced (unparseable values become `null`), nested
    /// entities are copied recursively with their own descriptors, sequences
    /// are replaced by a deep copy, and everything else is assigned by value.
    /// Fields missing from `target` are ignored, so the target's shape never
    /// grows.
    pub fn apply_into(&self, target: &mut Record, source: &Record) {
        apply_fields(self.fields, target, source);
    }
}

fn apply_fields(fields: &[FieldDescriptor], target: &mut Record, source: &Record) {
    for (key, incoming) in source {
        let Some(slot) = target.get_mut(key) else {
            continue;
        };

        let kind = if key == ID_FIELD {
            FieldKind::Scalar
        } else {
            FieldDescriptor::kind_of(fields, key)
        };

        match kind {
            FieldKind::Date => *slot = coerce_date(incoming),
            FieldKind::Nested(nested_fields) => match (slot, incoming) {
                (Value::Object(existing), Value::Object(update)) => {
                    apply_fields(nested_fields, existing, update);
                }
                // A populated nested entity ignores non-object updates.
                (Value::Object(_), _) => {}
                (slot, _) => *slot = incoming.clone(),
            },
            FieldKind::Sequence | FieldKind::Scalar => *slot = incoming.clone(),
        }
    }
}

fn is_composite(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// JSON equality that treats `10` and `10.0` as the same number.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}
