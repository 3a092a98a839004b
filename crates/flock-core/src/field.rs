//! Per-particle field definitions.

/// Storage class of a per-particle field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// One [`Real`](crate::Real) value per particle.
    Real,
    /// One `i64` value per particle.
    Int,
}

impl FieldKind {
    /// Bytes occupied by one value of this kind on the wire.
    pub fn wire_size(self) -> usize {
        8
    }
}

/// Definition of a field registered on a particle pool.
///
/// Fields are identified by label. Registration order is preserved and
/// determines both column order in the pool and record layout on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDef {
    /// Unique label, e.g. `"x"` or `"weight"`.
    pub label: String,
    /// Storage class.
    pub kind: FieldKind,
}

impl FieldDef {
    /// A real-valued field.
    pub fn real(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: FieldKind::Real,
        }
    }

    /// An integer-valued field.
    pub fn int(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: FieldKind::Int,
        }
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.label.is_empty() {
            return Err("field label must not be empty".into());
        }
        if self.label.chars().any(char::is_whitespace) {
            return Err(format!(
                "field label '{}' must not contain whitespace",
                self.label
            ));
        }
        Ok(())
    }
}
