//! Field descriptors.
//!
//! Every entity type declares how its top-level fields behave when values
//! are copied, compared or coerced. The comparator engine in `hub-core`
//! consumes these lists instead of guessing from field names.

/// How a single field is treated by copy and comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain value, assigned as-is.
    Scalar,
    /// Date value carried as an ISO-like string, coerced on copy.
    Date,
    /// Nested entity held by value, copied recursively with its own fields.
    Nested(&'static [FieldDescriptor]),
    /// Ordered sequence, replaced by a deep copy on copy.
    Sequence,
}

/// Name and kind of one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as it appears in the JSON representation.
    pub name: &'static str,
    /// Copy and comparison semantics.
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// A scalar field.
    pub const fn scalar(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Scalar,
        }
    }

    /// A date field.
    pub const fn date(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Date,
        }
    }

    /// A nested entity field described by `fields`.
    pub const fn nested(name: &'static str, fields: &'static [FieldDescriptor]) -> Self {
        Self {
            name,
            kind: FieldKind::Nested(fields),
        }
    }

    /// A sequence field.
    pub const fn sequence(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Sequence,
        }
    }

    /// Look up the kind of `name` in `fields`, defaulting to [`FieldKind::Scalar`].
    pub fn kind_of(fields: &[FieldDescriptor], name: &str) -> FieldKind {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.kind)
            .unwrap_or(FieldKind::Scalar)
    }
}
