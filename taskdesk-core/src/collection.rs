//! Insertion-ordered record arena addressed by identifier
//!
//! Records are looked up by id rather than held by reference, so the
//! relationship layer can reach the opposite side of a link without aliasing
//! the caller's records. Serialized as a plain JSON array.

use serde::{Deserialize, Serialize};

use crate::ids::{next_id, Identified, RecordId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T> {
    records: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: Identified> Collection<T> {
    /// Creates an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    /// Gets a record by ID (first match in insertion order)
    pub fn get(&self, id: RecordId) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Gets a mutable reference to a record by ID
    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut T> {
        self.records.iter_mut().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.iter().any(|r| r.id() == id)
    }

    /// Identifiers in insertion order
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(Identified::id).collect()
    }

    /// Identifier the next inserted record must use; `None` when exhausted
    pub fn next_id(&self) -> Option<RecordId> {
        next_id(&self.records)
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.records.iter_mut()
    }

    pub(crate) fn push(&mut self, record: T) {
        self.records.push(record);
    }

    /// Removes the record with this ID, keeping the order of the rest
    pub(crate) fn remove(&mut self, id: RecordId) -> Option<T> {
        let pos = self.records.iter().position(|r| r.id() == id)?;
        Some(self.records.remove(pos))
    }
}

impl<T> AsRef<[T]> for Collection<T> {
    fn as_ref(&self) -> &[T] {
        &self.records
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(records: Vec<T>) -> Self {
        Self { records }
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: RecordId,
        label: String,
    }

    impl Identified for Row {
        fn id(&self) -> RecordId {
            self.id
        }
    }

    fn row(id: RecordId, label: &str) -> Row {
        Row {
            id,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_get_returns_first_match() {
        let rows = Collection::from(vec![row(2, "a"), row(2, "b"), row(3, "c")]);
        assert_eq!(rows.get(2).unwrap().label, "a");
        assert!(rows.get(9).is_none());
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut rows = Collection::from(vec![row(1, "a"), row(2, "b"), row(3, "c")]);
        let removed = rows.remove(2).unwrap();
        assert_eq!(removed.label, "b");
        assert_eq!(rows.ids(), vec![1, 3]);
        assert!(rows.remove(2).is_none());
    }

    #[test]
    fn test_next_id_after_removal() {
        let mut rows = Collection::from(vec![row(1, "a"), row(4, "b")]);
        rows.remove(1);
        assert_eq!(rows.next_id(), Some(5));
    }

    #[test]
    fn test_serializes_as_array() {
        let rows = Collection::from(vec![row(1, "a")]);
        let json = serde_json::to_string(&rows).unwrap();
        assert_eq!(json, r#"[{"id":1,"label":"a"}]"#);

        let back: Collection<Row> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rows);
    }
}
