//! Record-id batching for bulk export/import.
//!
//! Large record sets are exported one bounded batch at a time so a
//! single request never exceeds server-side time and memory limits.

use std::collections::HashSet;

use crate::error::Result;
use crate::validate;

/// Lazy partition of an ordered record-id universe into consecutive
/// batches of at most `batch_size` ids.
///
/// Batches cover the universe exactly once, in its order, with no
/// overlap and no gaps; the last batch may be smaller. Each batch is
/// materialized only when the iterator is advanced, and iteration is
/// consuming: once a batch has been yielded the sequence cannot be
/// restarted.
///
/// # Example
///
/// ```
/// use redcapi::RecordIdBatches;
///
/// let ids: Vec<String> = (1..=10).map(|n| n.to_string()).collect();
/// let batches: Vec<Vec<String>> = RecordIdBatches::new(ids, 3).unwrap().collect();
/// assert_eq!(batches.len(), 4);
/// assert_eq!(batches[0], ["1", "2", "3"]);
/// assert_eq!(batches[3], ["10"]);
/// ```
#[derive(Debug, Clone)]
pub struct RecordIdBatches {
    ids: Vec<String>,
    batch_size: usize,
    next: usize,
}

impl RecordIdBatches {
    /// Plan batches over `ids`.
    ///
    /// The batch size is validated before any batch exists: an invalid
    /// size produces an error and zero batches, never partial planning.
    pub fn new(ids: Vec<String>, batch_size: usize) -> Result<Self> {
        let batch_size = validate::batch_size(batch_size)?;
        Ok(Self {
            ids,
            batch_size,
            next: 0,
        })
    }

    /// Number of batches not yet yielded.
    pub fn remaining(&self) -> usize {
        (self.ids.len() - self.next).div_ceil(self.batch_size)
    }

    /// The batch size batches are bounded by.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Iterator for RecordIdBatches {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.ids.len() {
            return None;
        }
        let end = usize::min(self.next + self.batch_size, self.ids.len());
        let batch = self.ids[self.next..end].to_vec();
        self.next = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RecordIdBatches {}

/// Drop duplicate ids, keeping the first occurrence and the original
/// order. Longitudinal exports repeat the record id once per event, so
/// the id listing must be collapsed before batching.
pub(crate) fn dedup_in_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Concatenate per-batch exports of a row/column format, keeping only
/// the first batch's header line.
///
/// Every part after the first has everything up to and including its
/// first line terminator removed. The result is byte-for-byte identical
/// to a single-request export of the same id set. Non-tabular formats
/// are not stitched this way; their batches concatenate as independent
/// documents.
pub fn stitch_tabular<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (index, part) in parts.into_iter().enumerate() {
        let part = part.as_ref();
        if index == 0 {
            out.push_str(part);
        } else {
            out.push_str(strip_header(part));
        }
    }
    out
}

fn strip_header(part: &str) -> &str {
    match part.find('\n') {
        Some(position) => &part[position + 1..],
        // A part with no line terminator is all header.
        None => "",
    }
}
