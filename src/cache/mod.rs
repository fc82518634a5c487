//! Pending input cache: raw, unconverted editor input keyed by cell position.
//!
//! Entries only exist while the user is typing. Because keys embed positions, every
//! structural edit that moves rows, columns, or group slots must relocate or purge them.
use ahash::AHashMap;

mod key;

pub use key::{CacheKey, CellAddress, KeySuffix, ParseKeyError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingInputCache {
    entries: AHashMap<CacheKey, String>,
}

impl PendingInputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: CacheKey, raw: impl Into<String>) {
        self.entries.insert(key, raw.into());
    }

    pub fn delete(&mut self, key: &CacheKey) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries sorted by key, for stable output.
    pub fn entries(&self) -> Vec<(&CacheKey, &str)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(k, v)| (k, v.as_str()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Moves every entry whose row satisfies `predicate` by `delta` rows.
    ///
    /// Entries are processed in descending row order for positive deltas and ascending
    /// order for negative ones, so a relocated entry never lands on one that has not
    /// moved yet. Suffix keys carry their row, so they move together with their base key.
    /// An entry that would move above row 0 is dropped.
    pub fn reindex_on_row_shift(&mut self, predicate: impl Fn(usize) -> bool, delta: isize) {
        let mut moving: Vec<(CacheKey, String)> = self
            .entries
            .iter()
            .filter(|(key, _)| predicate(key.row()))
            .map(|(key, raw)| (key.clone(), raw.clone()))
            .collect();
        if delta > 0 {
            moving.sort_by(|a, b| b.0.row().cmp(&a.0.row()));
        } else {
            moving.sort_by_key(|(key, _)| key.row());
        }

        for (key, raw) in moving {
            self.entries.remove(&key);
            let Some(target) = key.row().checked_add_signed(delta) else {
                tracing::warn!(key = %key, "dropping pending input shifted above the first row");
                continue;
            };
            let mut moved = key;
            moved.set_row(target);
            self.entries.insert(moved, raw);
        }
    }

    /// Shifts rows `>= start` by `delta`.
    pub fn shift_rows_from(&mut self, start: usize, delta: isize) {
        self.reindex_on_row_shift(|row| row >= start, delta);
    }

    /// Purges the entries of `index` and closes the gap it leaves.
    pub fn remove_row(&mut self, index: usize) {
        self.entries.retain(|key, _| key.row() != index);
        self.reindex_on_row_shift(|row| row > index, -1);
    }

    /// Relocates the entries of a row moved from `from` to `to`, shifting the rows between.
    pub fn move_row(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let moved: Vec<(CacheKey, String)> = self
            .entries
            .iter()
            .filter(|(key, _)| key.row() == from)
            .map(|(key, raw)| (key.clone(), raw.clone()))
            .collect();
        self.entries.retain(|key, _| key.row() != from);
        if from < to {
            self.reindex_on_row_shift(|row| row > from && row <= to, -1);
        } else {
            self.reindex_on_row_shift(|row| row >= to && row < from, 1);
        }
        for (mut key, raw) in moved {
            key.set_row(to);
            self.entries.insert(key, raw);
        }
    }

    /// Drops every entry for one condition cell, suffix variants included.
    pub fn purge_cell(&mut self, row: usize, column: usize, inner: usize) {
        let target = CellAddress::Condition { row, column, inner };
        self.entries.retain(|key, _| key.address != target);
    }

    /// Drops every condition entry of `column` in any row, optionally limited to one slot.
    pub fn purge_column(&mut self, column: usize, inner: Option<usize>) {
        self.entries.retain(|key, _| match key.address {
            CellAddress::Condition {
                column: c,
                inner: i,
                ..
            } => c != column || inner.is_some_and(|slot| slot != i),
            CellAddress::Result { .. } => true,
        });
    }

    /// Drops every entry of the result field `key`, in every row.
    pub fn purge_result_key(&mut self, result_key: &str) {
        self.entries.retain(|key, _| {
            !matches!(&key.address, CellAddress::Result { key: k, .. } if k == result_key)
        });
    }

    /// Moves condition entries whose column satisfies `predicate` by `delta` columns.
    pub fn reindex_on_column_shift(&mut self, predicate: impl Fn(usize) -> bool, delta: isize) {
        self.remap(|address| match address {
            CellAddress::Condition { row, column, inner } if predicate(*column) => column
                .checked_add_signed(delta)
                .map(|column| CellAddress::Condition {
                    row: *row,
                    column,
                    inner: *inner,
                }),
            _ => Some(address.clone()),
        });
    }

    /// Moves group slot entries of `column` whose slot satisfies `predicate` by `delta`.
    pub fn reindex_on_slot_shift(
        &mut self,
        column: usize,
        predicate: impl Fn(usize) -> bool,
        delta: isize,
    ) {
        self.remap(|address| match address {
            CellAddress::Condition {
                row,
                column: c,
                inner,
            } if *c == column && predicate(*inner) => {
                inner
                    .checked_add_signed(delta)
                    .map(|inner| CellAddress::Condition {
                        row: *row,
                        column,
                        inner,
                    })
            }
            _ => Some(address.clone()),
        });
    }

    /// Re-keys every entry of result field `from` to `to`.
    pub fn rename_result_key(&mut self, from: &str, to: &str) {
        self.remap(|address| match address {
            CellAddress::Result { row, key } if key == from => Some(CellAddress::Result {
                row: *row,
                key: to.to_string(),
            }),
            _ => Some(address.clone()),
        });
    }

    /// Copies the condition entries of row `from` that satisfy `filter` into row `to`.
    pub fn copy_row(&mut self, from: usize, to: usize, filter: impl Fn(&CacheKey) -> bool) {
        let copies: Vec<(CacheKey, String)> = self
            .entries
            .iter()
            .filter(|(key, _)| key.row() == from && filter(key))
            .map(|(key, raw)| {
                let mut copy = key.clone();
                copy.set_row(to);
                (copy, raw.clone())
            })
            .collect();
        self.entries.extend(copies);
    }

    /// Rebuilds the map with every address passed through `f`; `None` drops the entry.
    fn remap(&mut self, f: impl Fn(&CellAddress) -> Option<CellAddress>) {
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .filter_map(|(key, raw)| {
                f(&key.address).map(|address| {
                    (
                        CacheKey {
                            address,
                            suffix: key.suffix,
                        },
                        raw,
                    )
                })
            })
            .collect();
    }
}
