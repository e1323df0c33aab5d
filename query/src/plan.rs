//! Turning a filter into index scans and intersecting their results.

use common::{DbResult, MessageId, SmsFilter};
use hashbrown::HashSet;
use indexing::keys::{self, KeyRange};
use indexing::IndexName;
use libmdbx::{NoWriteMap, Transaction, TransactionKind};

/// Result set a scan feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Timestamp range. Defines the order of the final result.
    Time,
    Delivery,
    /// Union of sender and receiver matches across all numbers.
    Numbers,
}

/// One index range scan.
#[derive(Debug, Clone)]
pub struct Scan {
    pub bucket: Bucket,
    pub index: IndexName,
    pub range: KeyRange,
    pub reverse: bool,
}

impl Scan {
    pub fn run<K: TransactionKind>(
        &self,
        txn: &Transaction<'_, K, NoWriteMap>,
    ) -> DbResult<Vec<MessageId>> {
        indexing::scan_keys(txn, self.index, &self.range, self.reverse)
    }
}

/// Scans needed to answer one search.
///
/// The timestamp scan always runs and always comes first. Delivery and
/// number scans are only planned when the filter constrains them.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    scans: Vec<Scan>,
}

impl ScanPlan {
    pub fn new(filter: &SmsFilter, reverse: bool) -> DbResult<Self> {
        let (start, end) = filter.timestamp_bounds();
        let mut scans = vec![Scan {
            bucket: Bucket::Time,
            index: IndexName::Timestamp,
            range: KeyRange::timestamps(start, end),
            reverse,
        }];

        if let Some(delivery) = filter.delivery {
            scans.push(Scan {
                bucket: Bucket::Delivery,
                index: IndexName::Delivery,
                range: KeyRange::only(&keys::encode_str(delivery.as_str())?),
                reverse: false,
            });
        }

        // Empty and absent both leave the dimension out.
        for number in filter.applied_numbers().unwrap_or_default() {
            let value = keys::encode_str(number)?;
            for index in [IndexName::Sender, IndexName::Receiver] {
                scans.push(Scan {
                    bucket: Bucket::Numbers,
                    index,
                    range: KeyRange::only(&value),
                    reverse: false,
                });
            }
        }

        Ok(Self { scans })
    }

    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    fn applies(&self, bucket: Bucket) -> bool {
        self.scans.iter().any(|scan| scan.bucket == bucket)
    }

    /// Distinct buckets of the plan, in plan order. Never more than three,
    /// however many numbers the filter names.
    pub fn buckets(&self) -> Vec<Bucket> {
        let mut buckets = Vec::with_capacity(3);
        for scan in &self.scans {
            if !buckets.contains(&scan.bucket) {
                buckets.push(scan.bucket);
            }
        }
        buckets
    }

    /// Runs the scans feeding `bucket` in `txn`. Each result carries the
    /// position of its scan in the plan.
    pub fn run_bucket<K: TransactionKind>(
        &self,
        txn: &Transaction<'_, K, NoWriteMap>,
        bucket: Bucket,
    ) -> DbResult<Vec<(usize, Vec<MessageId>)>> {
        self.scans
            .iter()
            .enumerate()
            .filter(|(_, scan)| scan.bucket == bucket)
            .map(|(i, scan)| Ok((i, scan.run(txn)?)))
            .collect()
    }

    /// Runs every scan in `txn`, in plan order.
    pub fn run_all<K: TransactionKind>(
        &self,
        txn: &Transaction<'_, K, NoWriteMap>,
    ) -> DbResult<Vec<Vec<MessageId>>> {
        self.scans.iter().map(|scan| scan.run(txn)).collect()
    }

    /// Intersects scan results given in plan order. The result keeps the
    /// order of the timestamp scan.
    pub fn combine(&self, results: Vec<Vec<MessageId>>) -> Vec<MessageId> {
        let mut time = Vec::new();
        let mut delivery = HashSet::new();
        let mut numbers = HashSet::new();

        for (scan, ids) in self.scans.iter().zip(results) {
            match scan.bucket {
                Bucket::Time => time = ids,
                Bucket::Delivery => delivery.extend(ids),
                Bucket::Numbers => numbers.extend(ids),
            }
        }

        intersect(
            time,
            self.applies(Bucket::Numbers).then_some(&numbers),
            self.applies(Bucket::Delivery).then_some(&delivery),
        )
    }
}

/// Keeps the ids of `ordered` present in every applied set, without
/// reordering them.
pub fn intersect(
    ordered: Vec<MessageId>,
    numbers: Option<&HashSet<MessageId>>,
    delivery: Option<&HashSet<MessageId>>,
) -> Vec<MessageId> {
    ordered
        .into_iter()
        .filter(|id| numbers.map_or(true, |set| set.contains(id)))
        .filter(|id| delivery.map_or(true, |set| set.contains(id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Delivery;

    #[test]
    fn test_unconstrained_filter_plans_one_scan() {
        let plan = ScanPlan::new(&SmsFilter::default(), false).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.scans()[0].bucket, Bucket::Time);
    }

    #[test]
    fn test_empty_numbers_plan_like_absent() {
        let empty = ScanPlan::new(&SmsFilter::default().with_numbers(Vec::<String>::new()), false)
            .unwrap();
        assert_eq!(empty.len(), 1);
        assert!(!empty.applies(Bucket::Numbers));
    }

    #[test]
    fn test_full_filter_plan() {
        let filter = SmsFilter::default()
            .with_delivery(Delivery::Sent)
            .with_numbers(["+1", "+2"]);
        let plan = ScanPlan::new(&filter, true).unwrap();

        assert_eq!(plan.len(), 6);
        assert!(plan.scans()[0].reverse);
        assert!(plan.scans()[1..].iter().all(|scan| !scan.reverse));
        assert_eq!(
            plan.scans()
                .iter()
                .filter(|scan| scan.bucket == Bucket::Numbers)
                .count(),
            4
        );
    }

    #[test]
    fn test_many_numbers_share_one_bucket() {
        let numbers: Vec<String> = (0..300).map(|i| format!("+1{:04}", i)).collect();
        let filter = SmsFilter::default()
            .with_delivery(Delivery::Sent)
            .with_numbers(numbers);
        let plan = ScanPlan::new(&filter, false).unwrap();

        assert_eq!(plan.len(), 602);
        assert_eq!(
            plan.buckets(),
            vec![Bucket::Time, Bucket::Delivery, Bucket::Numbers]
        );
    }

    #[test]
    fn test_buckets_of_unconstrained_plan() {
        let plan = ScanPlan::new(&SmsFilter::default(), true).unwrap();
        assert_eq!(plan.buckets(), vec![Bucket::Time]);
    }

    #[test]
    fn test_combine_keeps_time_order() {
        let filter = SmsFilter::default()
            .with_delivery(Delivery::Received)
            .with_numbers(["+1"]);
        let plan = ScanPlan::new(&filter, true).unwrap();

        let results = vec![
            vec![9, 7, 5, 3, 1], // time, descending
            vec![1, 3, 9],       // delivery
            vec![3, 5, 9],       // sender
            vec![1],             // receiver
        ];
        assert_eq!(plan.combine(results), vec![9, 3, 1]);
    }

    #[test]
    fn test_applied_but_empty_bucket_matches_nothing() {
        let plan = ScanPlan::new(&SmsFilter::default().with_numbers(["+9"]), false).unwrap();
        assert!(plan.combine(vec![vec![1, 2], vec![], vec![]]).is_empty());
    }

    #[test]
    fn test_intersect_without_sets_is_identity() {
        assert_eq!(intersect(vec![3, 1, 2], None, None), vec![3, 1, 2]);
    }
}
