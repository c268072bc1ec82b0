//! Batch-level statistics over analyzed rows
//!
//! [`StatisticsAggregator`] is a pure fold over a slice of
//! [`ReconciliationResult`]s: fee totals, waiver and auto-link counts, and a
//! histogram of billable days bucketed by the policy's escalation tiers.
//! Nothing is refetched or recomputed; the slice is summarized as-is.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::engine::ReconciliationResult;
use crate::fees::FeePolicy;
use crate::matching::SuggestedAction;
use crate::types::RowStatus;

/// One bucket of the billable-day histogram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBucket {
    /// Human-readable day range, e.g. "30-59 days"
    pub label: String,
    /// Rows whose billable days fall in this range
    pub rows: usize,
}

/// Aggregate view of one analyzed batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    /// Rows in the summarized slice
    pub total_rows: usize,
    /// Rows carrying a positive final fee
    pub rows_with_fees: usize,
    /// Rows whose fee has been waived
    pub waived_rows: usize,
    /// Rows whose best match qualified for auto-linking
    pub auto_link_rows: usize,
    /// Sum of positive final fees
    pub total_fee_amount: BigDecimal,
    /// Mean positive fee; `None` when no row carries a fee
    pub average_fee: Option<BigDecimal>,
    /// Smallest positive fee
    pub min_fee: Option<BigDecimal>,
    /// Largest positive fee
    pub max_fee: Option<BigDecimal>,
    /// Billable-day distribution bucketed by the policy's tier thresholds
    pub billable_day_histogram: Vec<HistogramBucket>,
}

/// Summarizes analyzed batches against a policy's tier layout
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    thresholds: Vec<u32>,
}

impl StatisticsAggregator {
    /// Snapshot the policy's tier thresholds for bucketing
    pub fn new(policy: &FeePolicy) -> Self {
        Self {
            thresholds: policy.tier_thresholds(),
        }
    }

    /// Fold a slice of results into batch statistics
    pub fn summarize(&self, results: &[ReconciliationResult]) -> BatchStatistics {
        let mut buckets: Vec<HistogramBucket> = bucket_labels(&self.thresholds)
            .into_iter()
            .map(|label| HistogramBucket { label, rows: 0 })
            .collect();

        let mut rows_with_fees = 0usize;
        let mut waived_rows = 0usize;
        let mut auto_link_rows = 0usize;
        let mut total_fee_amount = BigDecimal::from(0);
        let mut min_fee: Option<BigDecimal> = None;
        let mut max_fee: Option<BigDecimal> = None;

        for result in results {
            if result.status == RowStatus::Waived {
                waived_rows += 1;
            }
            if result
                .best_match
                .as_ref()
                .is_some_and(|best| best.action == SuggestedAction::AutoLink)
            {
                auto_link_rows += 1;
            }

            if let Some(fee) = &result.fee {
                let bucket = self
                    .thresholds
                    .iter()
                    .take_while(|threshold| fee.billable_days >= **threshold)
                    .count();
                buckets[bucket].rows += 1;

                if fee.has_fee() {
                    rows_with_fees += 1;
                    total_fee_amount = &total_fee_amount + &fee.final_fee;
                    if min_fee.as_ref().map_or(true, |min| &fee.final_fee < min) {
                        min_fee = Some(fee.final_fee.clone());
                    }
                    if max_fee.as_ref().map_or(true, |max| &fee.final_fee > max) {
                        max_fee = Some(fee.final_fee.clone());
                    }
                }
            }
        }

        let average_fee = if rows_with_fees > 0 {
            Some(&total_fee_amount / BigDecimal::from(rows_with_fees as u64))
        } else {
            None
        };

        BatchStatistics {
            total_rows: results.len(),
            rows_with_fees,
            waived_rows,
            auto_link_rows,
            total_fee_amount,
            average_fee,
            min_fee,
            max_fee,
            billable_day_histogram: buckets,
        }
    }
}

fn bucket_labels(thresholds: &[u32]) -> Vec<String> {
    if thresholds.is_empty() {
        return vec!["0+ days".to_string()];
    }
    let mut labels = vec![format!("under {} days", thresholds[0])];
    for window in thresholds.windows(2) {
        labels.push(format!("{}-{} days", window[0], window[1] - 1));
    }
    labels.push(format!("{}+ days", thresholds[thresholds.len() - 1]));
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::{FeeCalculation, FeeRequest};
    use crate::matching::{CriterionScores, MatchCandidate};
    use crate::parser::ParsedDescription;
    use chrono::{Duration, NaiveDate};
    use uuid::Uuid;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn row_overdue_by(total_days: i64, policy: &FeePolicy) -> ReconciliationResult {
        let due = date(2024, 1, 1);
        let fee = FeeCalculation::calculate(
            &FeeRequest::new(due, BigDecimal::from(900)).settled_on(due + Duration::days(total_days)),
            policy,
        );
        ReconciliationResult {
            payment_id: Uuid::new_v4(),
            payment_number: None,
            description: String::new(),
            amount: BigDecimal::from(900),
            parsed: ParsedDescription::default(),
            candidates: Vec::new(),
            best_match: None,
            fee: Some(fee),
            actions: Vec::new(),
            status: RowStatus::Pending,
            waiver: None,
        }
    }

    fn row_without_fee() -> ReconciliationResult {
        ReconciliationResult {
            payment_id: Uuid::new_v4(),
            payment_number: None,
            description: String::new(),
            amount: BigDecimal::from(100),
            parsed: ParsedDescription::default(),
            candidates: Vec::new(),
            best_match: None,
            fee: None,
            actions: Vec::new(),
            status: RowStatus::Pending,
            waiver: None,
        }
    }

    #[test]
    fn test_histogram_buckets_follow_tier_thresholds() {
        let policy = FeePolicy::default();
        let aggregator = StatisticsAggregator::new(&policy);

        // Billable days 5, 45, 75 and 100 after the 7-day grace period
        let results = vec![
            row_overdue_by(12, &policy),
            row_overdue_by(52, &policy),
            row_overdue_by(82, &policy),
            row_overdue_by(107, &policy),
            row_without_fee(),
        ];

        let stats = aggregator.summarize(&results);

        assert_eq!(stats.total_rows, 5);
        assert_eq!(stats.rows_with_fees, 4);
        let labels: Vec<&str> = stats
            .billable_day_histogram
            .iter()
            .map(|bucket| bucket.label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["under 30 days", "30-59 days", "60-89 days", "90+ days"]
        );
        let counts: Vec<usize> = stats
            .billable_day_histogram
            .iter()
            .map(|bucket| bucket.rows)
            .collect();
        assert_eq!(counts, vec![1, 1, 1, 1]);

        // Fees: 600, then 5400, 10800 and 18000 all capped at 3000
        assert_eq!(stats.total_fee_amount, BigDecimal::from(9600));
        assert_eq!(stats.average_fee, Some(BigDecimal::from(2400)));
        assert_eq!(stats.min_fee, Some(BigDecimal::from(600)));
        assert_eq!(stats.max_fee, Some(BigDecimal::from(3000)));
    }

    #[test]
    fn test_empty_slice_summarizes_to_zeroes() {
        let policy = FeePolicy::default();
        let stats = StatisticsAggregator::new(&policy).summarize(&[]);

        assert_eq!(stats.total_rows, 0);
        assert_eq!(stats.rows_with_fees, 0);
        assert_eq!(stats.total_fee_amount, BigDecimal::from(0));
        assert_eq!(stats.average_fee, None);
        assert!(stats
            .billable_day_histogram
            .iter()
            .all(|bucket| bucket.rows == 0));
    }

    #[test]
    fn test_waived_and_auto_link_counts() {
        let policy = FeePolicy::default();
        let aggregator = StatisticsAggregator::new(&policy);

        let mut waived = row_overdue_by(20, &policy);
        waived.fee = waived.fee.map(|fee| fee.with_waiver("Goodwill".to_string()));
        waived.status = RowStatus::Waived;

        let mut auto_linked = row_overdue_by(12, &policy);
        auto_linked.best_match = Some(MatchCandidate {
            contract_id: Uuid::new_v4(),
            contract_number: "4521".to_string(),
            scores: CriterionScores::default(),
            total_score: 140,
            action: SuggestedAction::AutoLink,
            reasons: Vec::new(),
        });

        let stats = aggregator.summarize(&[waived, auto_linked]);

        assert_eq!(stats.waived_rows, 1);
        assert_eq!(stats.auto_link_rows, 1);
        // The waived fee no longer counts toward totals
        assert_eq!(stats.rows_with_fees, 1);
        assert_eq!(stats.total_fee_amount, BigDecimal::from(600));
    }

    #[test]
    fn test_policy_without_tiers_uses_single_bucket() {
        let policy = FeePolicy::new(BigDecimal::from(10), 0);
        let stats = StatisticsAggregator::new(&policy).summarize(&[row_overdue_by(40, &policy)]);

        assert_eq!(stats.billable_day_histogram.len(), 1);
        assert_eq!(stats.billable_day_histogram[0].label, "0+ days");
        assert_eq!(stats.billable_day_histogram[0].rows, 1);
    }
}
