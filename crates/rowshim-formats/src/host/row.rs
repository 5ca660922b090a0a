//! Host rows.

use super::HostValue;

/// An ordered row of optional host values, aligned with a schema's fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostRow {
    values: Vec<Option<HostValue>>,
}

impl HostRow {
    /// Creates a row from values in field order.
    #[must_use]
    pub fn new(values: Vec<Option<HostValue>>) -> Self {
        Self { values }
    }

    /// Creates an empty row with room for `n` values.
    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        Self {
            values: Vec::with_capacity(n),
        }
    }

    /// Appends a value.
    pub fn push(&mut self, value: Option<HostValue>) {
        self.values.push(value);
    }

    /// Returns the value at `idx`, or `None` if absent or out of range.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&HostValue> {
        self.values.get(idx).and_then(Option::as_ref)
    }

    /// Number of values (present or absent).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the row has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns all values in field order.
    #[must_use]
    pub fn values(&self) -> &[Option<HostValue>] {
        &self.values
    }

    /// Consumes the row.
    #[must_use]
    pub fn into_values(self) -> Vec<Option<HostValue>> {
        self.values
    }
}

impl From<Vec<Option<HostValue>>> for HostRow {
    fn from(values: Vec<Option<HostValue>>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<Option<HostValue>> for HostRow {
    fn from_iter<I: IntoIterator<Item = Option<HostValue>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
