//! Bucket partitioning of a primitive queue.

use crate::options::Bucket;

/// Scratch index array grouping element indices by [`Bucket`].
///
/// Holds `4 × total` slots, one contiguous quarter per bucket, so any split
/// of the elements fits without a counting pre-pass. Reused across frames.
#[derive(Debug, Default, Clone)]
pub struct BucketPartition {
    indices: Vec<u32>,
    stride: usize,
    counts: [usize; Bucket::COUNT],
}

impl BucketPartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition `total` elements given each one's bucket, or `None` for
    /// elements excluded from the pass.
    pub fn build<I>(total: usize, buckets: I) -> Self
    where
        I: IntoIterator<Item = Option<Bucket>>,
    {
        let mut partition = Self::new();
        partition.rebuild(total, buckets);
        partition
    }

    /// Like [`build`](Self::build), reusing this partition's storage.
    ///
    /// # Panics
    ///
    /// Panics if `buckets` yields more than `total` items.
    pub fn rebuild<I>(&mut self, total: usize, buckets: I)
    where
        I: IntoIterator<Item = Option<Bucket>>,
    {
        self.indices.clear();
        self.indices.resize(Bucket::COUNT * total, 0);
        self.stride = total;
        self.counts = [0; Bucket::COUNT];

        for (index, bucket) in buckets.into_iter().enumerate() {
            assert!(index < total, "more elements than the partition was sized for");
            let Some(bucket) = bucket else {
                continue;
            };
            let b = bucket.index();
            self.indices[b * self.stride + self.counts[b]] = index as u32;
            self.counts[b] += 1;
        }
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        self.counts[bucket.index()]
    }

    pub fn counts(&self) -> [usize; Bucket::COUNT] {
        self.counts
    }

    /// Elements placed in any bucket.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Largest bucket size; the instance capacity a pass needs.
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Element indices in `bucket`, in ascending order.
    pub fn indices(&self, bucket: Bucket) -> &[u32] {
        let start = bucket.index() * self.stride;
        &self.indices[start..start + self.count(bucket)]
    }
}
