//! Run-based storage for glyph and text data
//!
//! All runs share one flat item array. A run is a contiguous slice of it
//! owned by one data. Removing a run only marks it unused, the item array
//! keeps its size until [`RunStore::compact`] rewrites it. Owners refer to
//! runs by index, which stays stable until compaction.

use crate::layer::DataHandle;

/// Offset of a run that no longer belongs to any data
pub(crate) const UNUSED_RUN: u32 = u32::MAX;

/// A contiguous slice of the item array
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Run {
    pub offset: u32,
    pub count: u32,
    pub data: DataHandle,
}

impl Run {
    pub fn is_unused(&self) -> bool {
        self.offset == UNUSED_RUN
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RunStore<T> {
    items: Vec<T>,
    runs: Vec<Run>,
    unused_count: u32,
}

impl<T: Copy> RunStore<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            runs: Vec::new(),
            unused_count: 0,
        }
    }

    /// Total number of items including ones in unused runs
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Total number of runs including unused ones
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn has_unused(&self) -> bool {
        self.unused_count != 0
    }

    pub fn run(&self, index: u32) -> &Run {
        &self.runs[index as usize]
    }

    pub fn items(&self, index: u32) -> &[T] {
        let run = &self.runs[index as usize];
        debug_assert!(!run.is_unused(), "run {index} is unused");
        &self.items[run.offset as usize..(run.offset + run.count) as usize]
    }

    /// Append a new run at the end
    pub fn push(&mut self, data: DataHandle, items: &[T]) -> u32 {
        let offset = self.items.len() as u32;
        self.items.extend_from_slice(items);
        self.push_run(offset, items.len() as u32, data)
    }

    /// Append a copy of an existing run's items as a new run
    ///
    /// The source items are copied from within the same array, so the copy
    /// stays valid even when the array reallocates while growing.
    pub fn push_from_run(&mut self, data: DataHandle, source: u32) -> u32 {
        let run = self.runs[source as usize];
        debug_assert!(!run.is_unused(), "run {source} is unused");
        let offset = self.items.len() as u32;
        self.items
            .extend_from_within(run.offset as usize..(run.offset + run.count) as usize);
        self.push_run(offset, run.count, data)
    }

    /// Replace the contents of a run
    ///
    /// If the run is the last one in the array it's resized in place and
    /// keeps its index, otherwise it's marked unused and the new contents
    /// are appended as a new run. Returns the index of the run holding the
    /// new contents.
    pub fn replace(&mut self, index: u32, items: &[T]) -> u32 {
        let run = self.runs[index as usize];
        debug_assert!(!run.is_unused(), "run {index} is unused");
        if (run.offset + run.count) as usize == self.items.len()
            && index as usize + 1 == self.runs.len()
        {
            self.items.truncate(run.offset as usize);
            self.items.extend_from_slice(items);
            self.runs[index as usize].count = items.len() as u32;
            return index;
        }

        self.mark_unused(index);
        self.push(run.data, items)
    }

    /// Mark a run as no longer used. Its items stay until compaction.
    pub fn mark_unused(&mut self, index: u32) {
        let run = &mut self.runs[index as usize];
        debug_assert!(!run.is_unused(), "run {index} is already unused");
        run.offset = UNUSED_RUN;
        self.unused_count += 1;
    }

    /// Drop unused runs and their items
    ///
    /// Used runs keep their relative order and get packed at the front of
    /// the item array. `reassign` is called with the owner and the new
    /// index of every run that survived.
    pub fn compact(&mut self, mut reassign: impl FnMut(DataHandle, u32)) {
        let used_items: usize = self
            .runs
            .iter()
            .filter(|run| !run.is_unused())
            .map(|run| run.count as usize)
            .sum();

        let mut items = Vec::with_capacity(used_items);
        let mut runs = Vec::with_capacity(self.runs.len() - self.unused_count as usize);
        for run in self.runs.iter().filter(|run| !run.is_unused()) {
            let offset = items.len() as u32;
            items.extend_from_slice(
                &self.items[run.offset as usize..(run.offset + run.count) as usize],
            );
            reassign(run.data, runs.len() as u32);
            runs.push(Run { offset, ..*run });
        }

        tracing::debug!(
            "Compacted runs: {} -> {}, items: {} -> {}",
            self.runs.len(),
            runs.len(),
            self.items.len(),
            items.len()
        );

        self.items = items;
        self.runs = runs;
        self.unused_count = 0;
    }

    fn push_run(&mut self, offset: u32, count: u32, data: DataHandle) -> u32 {
        self.runs.push(Run {
            offset,
            count,
            data,
        });
        self.runs.len() as u32 - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn handles(count: usize) -> Vec<DataHandle> {
        let mut map: SlotMap<DataHandle, ()> = SlotMap::with_key();
        (0..count).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_push_and_read() {
        let data = handles(2);
        let mut store: RunStore<u8> = RunStore::new();
        let a = store.push(data[0], b"hello");
        let b = store.push(data[1], b"world!");
        assert_eq!((a, b), (0, 1));
        assert_eq!(store.items(a), b"hello");
        assert_eq!(store.items(b), b"world!");
        assert_eq!(store.item_count(), 11);
    }

    #[test]
    fn test_replace_last_run_in_place() {
        let data = handles(2);
        let mut store: RunStore<u8> = RunStore::new();
        store.push(data[0], b"abc");
        let last = store.push(data[1], b"defg");

        assert_eq!(store.replace(last, b"xy"), last);
        assert_eq!(store.items(last), b"xy");
        assert_eq!(store.item_count(), 5);
        assert!(!store.has_unused());

        assert_eq!(store.replace(last, b"longer text"), last);
        assert_eq!(store.items(last), b"longer text");
        assert_eq!(store.item_count(), 14);
    }

    #[test]
    fn test_replace_middle_run_appends() {
        let data = handles(2);
        let mut store: RunStore<u8> = RunStore::new();
        let first = store.push(data[0], b"abc");
        store.push(data[1], b"defg");

        let replaced = store.replace(first, b"z");
        assert_eq!(replaced, 2);
        assert!(store.run(first).is_unused());
        assert_eq!(store.run(replaced).data, data[0]);
        assert_eq!(store.items(replaced), b"z");
        assert!(store.has_unused());
    }

    #[test]
    fn test_push_from_own_run_while_growing() {
        let data = handles(2);
        let mut store: RunStore<u8> = RunStore::new();
        let source = store.push(data[0], b"copy me");
        // Repeated self-copies force the item array to reallocate
        let mut last = source;
        for _ in 0..16 {
            last = store.push_from_run(data[1], last);
        }
        assert_eq!(store.items(last), b"copy me");
        assert_eq!(store.items(source), b"copy me");
    }

    #[test]
    fn test_compact_keeps_order_and_reassigns() {
        let data = handles(3);
        let mut store: RunStore<u8> = RunStore::new();
        let a = store.push(data[0], b"aa");
        let b = store.push(data[1], b"bbb");
        let c = store.push(data[2], b"c");
        assert_eq!((a, b, c), (0, 1, 2));

        store.mark_unused(b);
        assert!(store.has_unused());
        assert_eq!(store.item_count(), 6);

        let mut reassigned = Vec::new();
        store.compact(|data, index| reassigned.push((data, index)));

        assert_eq!(reassigned, vec![(data[0], 0), (data[2], 1)]);
        assert_eq!(store.run_count(), 2);
        assert_eq!(store.item_count(), 3);
        assert_eq!(store.items(0), b"aa");
        assert_eq!(store.items(1), b"c");
        assert_eq!(store.run(1).data, data[2]);
        assert!(!store.has_unused());
    }
}
