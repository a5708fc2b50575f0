//! Lookup and text filtering over record collections
//!
//! Exact lookups are case-sensitive and return the first match in insertion
//! order. Text filtering is a case-insensitive substring match over each
//! record's searchable fields and its stringified id.

use crate::ids::{Identified, RecordId};

/// A record with a display name (title, full name or group name)
pub trait Named {
    fn name(&self) -> &str;
}

/// A record that can be matched by free-text search
pub trait Searchable: Identified {
    /// Text fields matched by [`filter`], in addition to the id
    fn search_fields(&self) -> Vec<&str>;
}

/// Finds a record by ID
pub fn find_by_id<T: Identified>(records: &[T], id: RecordId) -> Option<&T> {
    records.iter().find(|r| r.id() == id)
}

/// Finds a record by exact, case-sensitive display name
pub fn find_by_name<'a, T: Named>(records: &'a [T], name: &str) -> Option<&'a T> {
    records.iter().find(|r| r.name() == name)
}

/// Resolves ids to display names, skipping ids with no record behind them
pub fn names_for_ids<'a, T: Identified + Named>(
    ids: &[RecordId],
    records: &'a [T],
) -> Vec<&'a str> {
    ids.iter()
        .filter_map(|id| find_by_id(records, *id))
        .map(Named::name)
        .collect()
}

/// Resolves display names to ids
///
/// Every record whose name matches is included, in name order, without
/// repeats. Unknown names are skipped.
pub fn ids_for_names<T, S>(names: &[S], records: &[T]) -> Vec<RecordId>
where
    T: Identified + Named,
    S: AsRef<str>,
{
    let mut ids = Vec::new();
    for name in names {
        for record in records.iter().filter(|r| r.name() == name.as_ref()) {
            if !ids.contains(&record.id()) {
                ids.push(record.id());
            }
        }
    }
    ids
}

/// Returns true when the query is blank, meaning "no filter"
pub fn is_blank_query(query: &str) -> bool {
    query.trim().is_empty()
}

/// Case-insensitive substring match over search fields and the id
pub fn matches_query<T: Searchable>(record: &T, query: &str) -> bool {
    let needle = query.to_lowercase();
    record
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
        || record.id().to_string().contains(&needle)
}

/// Filters records by free text. A blank query returns every record.
pub fn filter<'a, T: Searchable>(records: &'a [T], query: &str) -> Vec<&'a T> {
    if is_blank_query(query) {
        return records.iter().collect();
    }
    records.iter().filter(|r| matches_query(*r, query)).collect()
}

/// The result set currently shown to the user
///
/// A query that matches nothing leaves the previous result set in place
/// instead of clearing it. A blank query shows the full collection again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchView {
    ids: Vec<RecordId>,
    query: String,
}

impl SearchView {
    /// A view showing every record
    pub fn new<T: Identified>(records: &[T]) -> Self {
        Self {
            ids: records.iter().map(Identified::id).collect(),
            query: String::new(),
        }
    }

    /// Applies a new query
    ///
    /// Returns false when the query matched nothing and the previous result
    /// set was kept.
    pub fn update<T: Searchable>(&mut self, records: &[T], query: &str) -> bool {
        if is_blank_query(query) {
            self.reset(records);
            return true;
        }
        let matched: Vec<RecordId> = filter(records, query).iter().map(|r| r.id()).collect();
        if matched.is_empty() {
            return false;
        }
        self.ids = matched;
        self.query = query.to_string();
        true
    }

    /// Clears the query and shows everything
    pub fn reset<T: Identified>(&mut self, records: &[T]) {
        *self = Self::new(records);
    }

    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    /// Query that produced the current result set
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Records of the current result set; ids deleted since are skipped
    pub fn resolve<'a, T: Identified>(&self, records: &'a [T]) -> Vec<&'a T> {
        self.ids
            .iter()
            .filter_map(|id| find_by_id(records, *id))
            .collect()
    }
}
