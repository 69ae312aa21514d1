//! Categorical encoding of raw user and restaurant identifiers.
//!
//! Each namespace maps identifiers to a contiguous range `0..cardinality`,
//! assigned in first-appearance order. Tables are built once and never
//! mutated afterwards.

use crate::error::{FactorizationError, Result};
use data_loader::RatingRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Which identifier space an id or index belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    User,
    Item,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::User => write!(f, "user"),
            Namespace::Item => write!(f, "item"),
        }
    }
}

/// A rating record resolved to dense indices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub user: usize,
    pub item: usize,
    pub rating: f64,
}

/// Bidirectional id <-> index mapping for one namespace.
///
/// Serialized as the ordered list of ids; the reverse map is rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct IdentifierTable {
    ids: Vec<String>,
    index: HashMap<String, usize>,
}

impl IdentifierTable {
    /// Index of `id`, assigning the next free one on first sight
    fn intern(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(id.to_string());
        self.index.insert(id.to_string(), idx);
        idx
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Raw id for a dense index
    pub fn id(&self, idx: usize) -> Option<&str> {
        self.ids.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in index order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl TryFrom<Vec<String>> for IdentifierTable {
    type Error = String;

    fn try_from(ids: Vec<String>) -> std::result::Result<Self, Self::Error> {
        let mut index = HashMap::with_capacity(ids.len());
        for (idx, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), idx).is_some() {
                return Err(format!("duplicate identifier '{}'", id));
            }
        }
        Ok(Self { ids, index })
    }
}

impl From<IdentifierTable> for Vec<String> {
    fn from(table: IdentifierTable) -> Self {
        table.ids
    }
}

/// User and restaurant identifier tables built from one corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderTable {
    users: IdentifierTable,
    items: IdentifierTable,
}

/// Reason a record cannot be encoded, if any
fn record_problem(record: &RatingRecord) -> Option<String> {
    if record.user_id.trim().is_empty() {
        return Some("empty user id".to_string());
    }
    if record.item_id.trim().is_empty() {
        return Some("empty item id".to_string());
    }
    if !record.rating.is_finite() {
        return Some(format!("non-finite rating {}", record.rating));
    }
    None
}

impl EncoderTable {
    /// Scan every record once and assign dense indices in first-seen order.
    ///
    /// Fails on the first empty identifier or non-finite rating without
    /// returning a partial table.
    pub fn build(records: &[RatingRecord]) -> Result<Self> {
        let mut table = EncoderTable::default();
        for (index, record) in records.iter().enumerate() {
            if let Some(reason) = record_problem(record) {
                return Err(FactorizationError::InvalidRecord { index, reason });
            }
            table.users.intern(&record.user_id);
            table.items.intern(&record.item_id);
        }
        Ok(table)
    }

    /// Rebuild a table from previously exported id lists
    pub fn from_parts(users: IdentifierTable, items: IdentifierTable) -> Self {
        Self { users, items }
    }

    pub fn encode(&self, id: &str, namespace: Namespace) -> Result<usize> {
        self.table(namespace)
            .get(id)
            .ok_or_else(|| FactorizationError::UnknownIdentifier {
                namespace,
                id: id.to_string(),
            })
    }

    /// Validate and resolve one record; `index` labels errors
    pub fn encode_record(&self, index: usize, record: &RatingRecord) -> Result<Observation> {
        if let Some(reason) = record_problem(record) {
            return Err(FactorizationError::InvalidRecord { index, reason });
        }
        Ok(Observation {
            user: self.encode(&record.user_id, Namespace::User)?,
            item: self.encode(&record.item_id, Namespace::Item)?,
            rating: record.rating,
        })
    }

    /// Resolve a whole slice of records, stopping at the first failure
    pub fn encode_all(&self, records: &[RatingRecord]) -> Result<Vec<Observation>> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| self.encode_record(index, record))
            .collect()
    }

    pub fn table(&self, namespace: Namespace) -> &IdentifierTable {
        match namespace {
            Namespace::User => &self.users,
            Namespace::Item => &self.items,
        }
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn user_id(&self, idx: usize) -> Option<&str> {
        self.users.id(idx)
    }

    pub fn item_id(&self, idx: usize) -> Option<&str> {
        self.items.id(idx)
    }
}
