//! Late-fee calculation engine
//!
//! [`FeeCalculation::calculate`] turns a [`FeeRequest`] and a [`FeePolicy`]
//! into a full fee breakdown: overdue days, billable days after grace, the
//! gross fee, tier escalation, the cap, and the final amount. Calculation
//! never fails; requests that accrue nothing come back as a zero breakdown
//! that still reports the day counts.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::policy::FeePolicy;

/// Inputs for a single fee calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRequest {
    /// When the payment was due
    pub due_date: NaiveDate,
    /// When the payment settled; `None` means still unpaid, assessed as of
    /// the current date
    pub settlement_date: Option<NaiveDate>,
    /// Amount the fee is assessed against
    pub base_amount: BigDecimal,
    /// Whether the fee is waived up front
    pub waived: bool,
    /// Reason recorded for an up-front waiver
    pub waiver_reason: Option<String>,
}

impl FeeRequest {
    pub fn new(due_date: NaiveDate, base_amount: BigDecimal) -> Self {
        Self {
            due_date,
            settlement_date: None,
            base_amount,
            waived: false,
            waiver_reason: None,
        }
    }

    pub fn settled_on(mut self, date: NaiveDate) -> Self {
        self.settlement_date = Some(date);
        self
    }

    pub fn waived_because(mut self, reason: String) -> Self {
        self.waived = true;
        self.waiver_reason = Some(reason);
        self
    }
}

/// Full late-fee breakdown for one payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeCalculation {
    /// Calendar days between due date and settlement, floored at zero
    pub days_overdue: u32,
    /// Grace period applied, copied from the policy
    pub grace_period_days: u32,
    /// Days that actually accrue fees after the grace period
    pub billable_days: u32,
    /// Per-day rate applied, copied from the policy
    pub daily_rate: BigDecimal,
    /// Amount the fee was assessed against
    pub base_amount: BigDecimal,
    /// Daily rate times billable days, before escalation
    pub gross_fee: BigDecimal,
    /// Escalation multiplier selected for the billable day count
    pub tier_multiplier: BigDecimal,
    /// Gross fee after escalation
    pub escalated_fee: BigDecimal,
    /// Escalated fee after the policy cap
    pub capped_fee: BigDecimal,
    /// Amount actually charged
    pub final_fee: BigDecimal,
    /// Whether the fee was waived
    pub waived: bool,
    /// Reason recorded with the waiver
    pub waiver_reason: Option<String>,
}

impl FeeCalculation {
    /// Calculate the fee for a request under a policy
    ///
    /// An unsettled request is assessed as of today. Day spans that end
    /// before the due date clamp to zero rather than going negative, and a
    /// waived request short-circuits to a zero fee while still reporting
    /// how many days were overdue.
    pub fn calculate(request: &FeeRequest, policy: &FeePolicy) -> Self {
        let settled = request
            .settlement_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let days_overdue = (settled - request.due_date).num_days().max(0) as u32;
        let billable_days = days_overdue.saturating_sub(policy.grace_period_days);

        if billable_days == 0 || request.waived {
            return Self::zeroed(request, policy, days_overdue, billable_days);
        }

        let gross_fee = &policy.daily_rate * BigDecimal::from(billable_days);
        let tier_multiplier = policy.multiplier_for(billable_days);
        let escalated_fee = &gross_fee * &tier_multiplier;
        let capped_fee = match &policy.max_fee {
            Some(cap) if &escalated_fee > cap => cap.clone(),
            _ => escalated_fee.clone(),
        };

        Self {
            days_overdue,
            grace_period_days: policy.grace_period_days,
            billable_days,
            daily_rate: policy.daily_rate.clone(),
            base_amount: request.base_amount.clone(),
            gross_fee,
            tier_multiplier,
            escalated_fee,
            final_fee: capped_fee.clone(),
            capped_fee,
            waived: false,
            waiver_reason: None,
        }
    }

    fn zeroed(
        request: &FeeRequest,
        policy: &FeePolicy,
        days_overdue: u32,
        billable_days: u32,
    ) -> Self {
        Self {
            days_overdue,
            grace_period_days: policy.grace_period_days,
            billable_days,
            daily_rate: policy.daily_rate.clone(),
            base_amount: request.base_amount.clone(),
            gross_fee: BigDecimal::from(0),
            tier_multiplier: BigDecimal::from(1),
            escalated_fee: BigDecimal::from(0),
            capped_fee: BigDecimal::from(0),
            final_fee: BigDecimal::from(0),
            waived: request.waived,
            waiver_reason: request.waiver_reason.clone(),
        }
    }

    /// Zero out the fee while keeping the day counts for the record
    pub fn with_waiver(mut self, reason: String) -> Self {
        self.gross_fee = BigDecimal::from(0);
        self.escalated_fee = BigDecimal::from(0);
        self.capped_fee = BigDecimal::from(0);
        self.final_fee = BigDecimal::from(0);
        self.waived = true;
        self.waiver_reason = Some(reason);
        self
    }

    /// Whether anything is actually owed
    pub fn has_fee(&self) -> bool {
        self.final_fee > BigDecimal::from(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_grace_period_boundary() {
        let policy = FeePolicy::default();
        let due = date(2024, 3, 5);

        let inside = FeeCalculation::calculate(
            &FeeRequest::new(due, BigDecimal::from(900)).settled_on(date(2024, 3, 12)),
            &policy,
        );
        assert_eq!(inside.days_overdue, 7);
        assert_eq!(inside.billable_days, 0);
        assert_eq!(inside.final_fee, BigDecimal::from(0));
        assert!(!inside.has_fee());

        let outside = FeeCalculation::calculate(
            &FeeRequest::new(due, BigDecimal::from(900)).settled_on(date(2024, 3, 13)),
            &policy,
        );
        assert_eq!(outside.days_overdue, 8);
        assert_eq!(outside.billable_days, 1);
        assert_eq!(outside.final_fee, BigDecimal::from(120));
    }

    #[test]
    fn test_cap_limits_escalated_fee() {
        let policy = FeePolicy::default();
        let due = date(2024, 1, 1);
        let calc = FeeCalculation::calculate(
            &FeeRequest::new(due, BigDecimal::from(900)).settled_on(due + Duration::days(107)),
            &policy,
        );

        assert_eq!(calc.billable_days, 100);
        assert_eq!(calc.gross_fee, BigDecimal::from(12000));
        assert_eq!(calc.escalated_fee, BigDecimal::from(18000));
        assert_eq!(calc.capped_fee, BigDecimal::from(3000));
        assert_eq!(calc.final_fee, BigDecimal::from(3000));
    }

    #[test]
    fn test_tier_escalation_without_cap() {
        let uncapped = FeePolicy {
            max_fee: None,
            ..FeePolicy::default()
        };
        let due = date(2024, 1, 1);
        let calc = FeeCalculation::calculate(
            &FeeRequest::new(due, BigDecimal::from(900)).settled_on(due + Duration::days(82)),
            &uncapped,
        );

        assert_eq!(calc.billable_days, 75);
        assert_eq!(
            calc.tier_multiplier,
            BigDecimal::from(12) / BigDecimal::from(10)
        );
        assert_eq!(calc.gross_fee, BigDecimal::from(9000));
        assert_eq!(calc.final_fee, BigDecimal::from(10800));
    }

    #[test]
    fn test_waived_request_short_circuits() {
        let policy = FeePolicy::default();
        let due = date(2024, 1, 1);
        let calc = FeeCalculation::calculate(
            &FeeRequest::new(due, BigDecimal::from(900))
                .settled_on(due + Duration::days(60))
                .waived_because("Maintenance dispute".to_string()),
            &policy,
        );

        assert!(calc.waived);
        assert_eq!(calc.days_overdue, 60);
        assert_eq!(calc.billable_days, 53);
        assert_eq!(calc.final_fee, BigDecimal::from(0));

        // Waiving an already-zero fee changes nothing but the reason
        let waived_again = calc.with_waiver("Second review".to_string());
        assert!(waived_again.waived);
        assert_eq!(waived_again.final_fee, BigDecimal::from(0));
        assert_eq!(waived_again.days_overdue, 60);
        assert_eq!(waived_again.waiver_reason.as_deref(), Some("Second review"));
    }

    #[test]
    fn test_settlement_before_due_date_clamps_to_zero() {
        let policy = FeePolicy::default();
        let calc = FeeCalculation::calculate(
            &FeeRequest::new(date(2024, 3, 5), BigDecimal::from(900))
                .settled_on(date(2024, 3, 1)),
            &policy,
        );
        assert_eq!(calc.days_overdue, 0);
        assert_eq!(calc.billable_days, 0);
        assert_eq!(calc.final_fee, BigDecimal::from(0));
    }

    #[test]
    fn test_unsettled_future_due_date_accrues_nothing() {
        let policy = FeePolicy::default();
        let due = Utc::now().date_naive() + Duration::days(30);
        let calc = FeeCalculation::calculate(&FeeRequest::new(due, BigDecimal::from(900)), &policy);
        assert_eq!(calc.days_overdue, 0);
        assert_eq!(calc.final_fee, BigDecimal::from(0));
    }

    #[test]
    fn test_zero_breakdown_keeps_policy_context() {
        let policy = FeePolicy::default();
        let due = date(2024, 3, 5);
        let calc = FeeCalculation::calculate(
            &FeeRequest::new(due, BigDecimal::from(900)).settled_on(date(2024, 3, 10)),
            &policy,
        );
        assert_eq!(calc.days_overdue, 5);
        assert_eq!(calc.grace_period_days, 7);
        assert_eq!(calc.tier_multiplier, BigDecimal::from(1));
        assert_eq!(calc.daily_rate, BigDecimal::from(120));
    }
}
