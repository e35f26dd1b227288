//! Hash tables keyed by quantized triplet measurements.

use crate::hashing::grid::GridCell;
use crate::template::TemplateId;
use std::collections::BTreeMap;

/// Selects one table: the triplet's anchor cell and the normal bin measured
/// at that anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub cell: GridCell,
    pub normal_bin: u8,
}

/// Selects one bucket inside a table.
///
/// `d12`/`d13` are the depth-difference bins of the two partners relative
/// to the anchor, `normals` packs the partner normal bins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripletKey {
    pub d12: u8,
    pub d13: u8,
    pub normals: u8,
}

/// Buckets of template ids, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HashTable {
    buckets: BTreeMap<TripletKey, Vec<TemplateId>>,
}

impl HashTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `template` to the bucket of `key`. A template is stored at
    /// most once per bucket.
    pub fn insert(&mut self, key: TripletKey, template: TemplateId) {
        let bucket = self.buckets.entry(key).or_default();
        if !bucket.contains(&template) {
            bucket.push(template);
        }
    }

    pub fn bucket(&self, key: &TripletKey) -> Option<&[TemplateId]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&TripletKey, &[TemplateId])> {
        self.buckets.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total stored template ids over all buckets.
    pub fn entry_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{HashTable, TripletKey};
    use crate::template::TemplateId;

    #[test]
    fn buckets_keep_insertion_order_without_duplicates() {
        let key = TripletKey {
            d12: 1,
            d13: 2,
            normals: 10,
        };
        let mut table = HashTable::new();
        table.insert(key, TemplateId(4));
        table.insert(key, TemplateId(1));
        table.insert(key, TemplateId(4));
        assert_eq!(table.bucket(&key), Some(&[TemplateId(4), TemplateId(1)][..]));
        assert_eq!(table.len(), 1);
        assert_eq!(table.entry_count(), 2);
    }
}
