//! Filtered search over the message store.
//!
//! A search turns an [`SmsFilter`] into a [`ScanPlan`]: one timestamp range
//! scan plus exact-match scans for the delivery direction and every phone
//! number. Scan results are buffered in memory and intersected, with the
//! timestamp scan deciding the order of the result.
//!
//! # Snapshots
//!
//! All scans of one search must see the same data. With parallel scans
//! enabled each filter dimension ([`Bucket`]) runs on its own blocking task
//! and read transaction, so a search holds at most three readers however
//! many numbers it names. The transaction ids are compared afterwards; if a
//! write committed between them the plan is run again inside a single read
//! transaction.

pub mod plan;

pub use plan::{Bucket, Scan, ScanPlan};

use common::{DbError, DbResult, MessageId, SmsFilter};
use std::sync::Arc;
use storage::SmsEngine;

/// Runs filtered searches against one engine.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    engine: Arc<SmsEngine>,
    parallel: bool,
}

impl QueryEngine {
    /// Uses the engine's `parallel_scans` setting.
    pub fn new(engine: Arc<SmsEngine>) -> Self {
        let parallel = engine.config().parallel_scans;
        Self { engine, parallel }
    }

    pub fn with_parallel_scans(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Ids of the messages matching `filter`, ordered by timestamp, newest
    /// first when `reverse` is set. An empty result is not an error.
    pub async fn search(&self, filter: &SmsFilter, reverse: bool) -> DbResult<Vec<MessageId>> {
        tracing::debug!(
            "Search: start={:?} end={:?} delivery={:?} numbers={:?} reverse={}",
            filter.start_date,
            filter.end_date,
            filter.delivery,
            filter.applied_numbers(),
            reverse
        );

        let plan = Arc::new(ScanPlan::new(filter, reverse)?);
        let results = if self.parallel && plan.buckets().len() > 1 {
            match self.scan_parallel(&plan).await? {
                Some(results) => results,
                None => {
                    tracing::warn!("Scans saw different snapshots, rerunning in one transaction");
                    self.scan_sequential(Arc::clone(&plan)).await?
                }
            }
        } else {
            self.scan_sequential(Arc::clone(&plan)).await?
        };

        let ids = plan.combine(results);
        tracing::debug!("Search matched {} messages", ids.len());
        Ok(ids)
    }

    /// Runs the scans of each bucket on their own blocking task. Returns
    /// `None` when the tasks did not all read the same snapshot.
    async fn scan_parallel(&self, plan: &Arc<ScanPlan>) -> DbResult<Option<Vec<Vec<MessageId>>>> {
        let tasks = plan.buckets().into_iter().map(|bucket| {
            let engine = Arc::clone(&self.engine);
            let plan = Arc::clone(plan);
            tokio::task::spawn_blocking(move || {
                engine.read(|txn| Ok((txn.id(), plan.run_bucket(txn, bucket)?)))
            })
        });

        let joined = futures::future::try_join_all(tasks)
            .await
            .map_err(|e| DbError::Internal(format!("Scan task join error: {}", e)))?;
        let scanned = joined.into_iter().collect::<DbResult<Vec<_>>>()?;

        let snapshot = scanned.first().map(|(txn_id, _)| *txn_id);
        if scanned.iter().any(|(txn_id, _)| Some(*txn_id) != snapshot) {
            return Ok(None);
        }

        let mut results = vec![Vec::new(); plan.len()];
        for (position, ids) in scanned.into_iter().flat_map(|(_, ids)| ids) {
            results[position] = ids;
        }
        Ok(Some(results))
    }

    async fn scan_sequential(&self, plan: Arc<ScanPlan>) -> DbResult<Vec<Vec<MessageId>>> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || engine.read(|txn| plan.run_all(txn)))
            .await
            .map_err(|e| DbError::Internal(format!("Scan task join error: {}", e)))?
    }
}
