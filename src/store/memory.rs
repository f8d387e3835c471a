//! In-memory document store.
//!
//! Backs the test suite and embedded callers with the same contract a
//! remote partitioned store offers: per-partition maps of loose documents
//! with equality/range filtering and ordered retrieval.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::StoreConfig;

use super::{
    Direction, DocumentStore, FieldFilter, FieldValue, FilterOp, Partition, RawDocument,
    StoreError, StoreQuery,
};

type Fields = HashMap<String, FieldValue>;

pub struct MemoryStore {
    config: StoreConfig,
    /// Partition path → document id → fields.
    partitions: RwLock<HashMap<String, HashMap<String, Fields>>>,
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            partitions: RwLock::new(HashMap::new()),
        }
    }

    fn matches(fields: &Fields, filters: &[FieldFilter]) -> bool {
        filters.iter().all(|filter| match fields.get(&filter.field) {
            None => false,
            Some(value) => match filter.op {
                FilterOp::Eq => *value == filter.value,
                // A value that does not compare with the bound (shape
                // mismatch) is excluded, not an error.
                FilterOp::Gte => value
                    .compare(&filter.value)
                    .is_some_and(|o| o != Ordering::Less),
                FilterOp::Lte => value
                    .compare(&filter.value)
                    .is_some_and(|o| o != Ordering::Greater),
            },
        })
    }

    fn sort(docs: &mut [RawDocument], field: &str, direction: Direction) {
        docs.sort_by(|a, b| {
            let ordered = match (a.fields.get(field), b.fields.get(field)) {
                (Some(x), Some(y)) => {
                    let o = x.compare(y).unwrap_or(Ordering::Equal);
                    match direction {
                        Direction::Ascending => o,
                        Direction::Descending => o.reverse(),
                    }
                }
                // Documents without the order field sort last either way.
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            // Id tie-break keeps repeated queries deterministic.
            ordered.then_with(|| a.id.cmp(&b.id))
        });
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn run_query(&self, query: &StoreQuery) -> Result<Vec<RawDocument>, StoreError> {
        let partitions = self
            .partitions
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;

        let mut docs: Vec<RawDocument> = partitions
            .get(&query.partition.path(&self.config))
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| Self::matches(fields, &query.filters))
                    .map(|(id, fields)| RawDocument {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        match &query.order_by {
            Some(order) => Self::sort(&mut docs, &order.field, order.direction),
            None => docs.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        Ok(docs)
    }

    async fn get(
        &self,
        partition: &Partition,
        id: &str,
    ) -> Result<Option<RawDocument>, StoreError> {
        let partitions = self
            .partitions
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;

        Ok(partitions
            .get(&partition.path(&self.config))
            .and_then(|docs| docs.get(id))
            .map(|fields| RawDocument {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn insert(
        &self,
        partition: &Partition,
        fields: Fields,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut partitions = self
            .partitions
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;

        partitions
            .entry(partition.path(&self.config))
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn upsert(
        &self,
        partition: &Partition,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let mut partitions = self
            .partitions
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;

        partitions
            .entry(partition.path(&self.config))
            .or_default()
            .entry(id.to_string())
            .or_default()
            .extend(fields);
        Ok(())
    }

    async fn update(
        &self,
        partition: &Partition,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let path = partition.path(&self.config);
        let mut partitions = self
            .partitions
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;

        let existing = partitions
            .get_mut(&path)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                path: path.clone(),
                id: id.to_string(),
            })?;
        existing.extend(fields);
        Ok(())
    }
}
