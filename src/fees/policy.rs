//! Late-fee policy configuration
//!
//! A [`FeePolicy`] is tenant-scoped configuration: the per-day rate, the
//! grace period, an optional cap, escalation tiers keyed by billable days,
//! and the rules governing waivers. Policies are plain data so they can be
//! loaded from storage and validated before a batch runs.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{EngineError, EngineResult};

/// Escalation step applied once enough billable days accumulate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationTier {
    /// Billable days at which this tier starts to apply
    pub threshold_days: u32,
    /// Multiplier applied to the gross fee while this tier is in effect
    pub multiplier: BigDecimal,
}

impl EscalationTier {
    pub fn new(threshold_days: u32, multiplier: BigDecimal) -> Self {
        Self {
            threshold_days,
            multiplier,
        }
    }
}

/// Rules governing who may waive a fee and up to what amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaiverRules {
    /// Largest fee that can be waived without naming an approver
    pub max_auto_waivable: BigDecimal,
    /// Whether fees above the auto limit need an approver at all
    pub requires_approval: bool,
    /// Free-form descriptions of situations where waivers are expected,
    /// recorded for audit context rather than enforced
    pub auto_conditions: Vec<String>,
}

impl Default for WaiverRules {
    fn default() -> Self {
        Self {
            max_auto_waivable: BigDecimal::from(500),
            requires_approval: true,
            auto_conditions: Vec::new(),
        }
    }
}

/// Tenant-level late-fee policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeePolicy {
    /// Fee accrued per billable day
    pub daily_rate: BigDecimal,
    /// Days past due before any fee accrues
    pub grace_period_days: u32,
    /// Upper bound on the final fee; `None` leaves the fee uncapped
    pub max_fee: Option<BigDecimal>,
    /// Escalation tiers; the highest threshold at or below the billable
    /// day count wins
    pub tiers: Vec<EscalationTier>,
    /// Waiver rules for this tenant
    pub waiver: WaiverRules,
    /// Inactive policies refuse to run batches
    pub active: bool,
}

impl FeePolicy {
    /// Create a policy with no cap and no escalation tiers
    pub fn new(daily_rate: BigDecimal, grace_period_days: u32) -> Self {
        Self {
            daily_rate,
            grace_period_days,
            max_fee: None,
            tiers: Vec::new(),
            waiver: WaiverRules::default(),
            active: true,
        }
    }

    pub fn max_fee(mut self, cap: BigDecimal) -> Self {
        self.max_fee = Some(cap);
        self
    }

    pub fn tier(mut self, tier: EscalationTier) -> Self {
        self.tiers.push(tier);
        self
    }

    pub fn waiver_rules(mut self, rules: WaiverRules) -> Self {
        self.waiver = rules;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Multiplier for a billable day count
    ///
    /// Picks the tier with the largest threshold at or below the count.
    /// With no qualifying tier the multiplier is 1.
    pub fn multiplier_for(&self, billable_days: u32) -> BigDecimal {
        self.tiers
            .iter()
            .filter(|tier| tier.threshold_days <= billable_days)
            .max_by_key(|tier| tier.threshold_days)
            .map(|tier| tier.multiplier.clone())
            .unwrap_or_else(|| BigDecimal::from(1))
    }

    /// Distinct tier thresholds in ascending order
    pub fn tier_thresholds(&self) -> Vec<u32> {
        let mut thresholds: Vec<u32> = self.tiers.iter().map(|tier| tier.threshold_days).collect();
        thresholds.sort_unstable();
        thresholds.dedup();
        thresholds
    }

    /// Validate that the policy is internally consistent
    pub fn validate(&self) -> EngineResult<()> {
        if self.daily_rate < BigDecimal::from(0) {
            return Err(EngineError::Configuration(format!(
                "Daily rate cannot be negative: {}",
                self.daily_rate
            )));
        }

        if let Some(cap) = &self.max_fee {
            if cap < &BigDecimal::from(0) {
                return Err(EngineError::Configuration(format!(
                    "Maximum fee cannot be negative: {}",
                    cap
                )));
            }
        }

        let mut seen_thresholds = HashSet::new();
        for tier in &self.tiers {
            if tier.multiplier <= BigDecimal::from(0) {
                return Err(EngineError::Configuration(format!(
                    "Tier multiplier at {} days must be positive: {}",
                    tier.threshold_days, tier.multiplier
                )));
            }
            if !seen_thresholds.insert(tier.threshold_days) {
                return Err(EngineError::Configuration(format!(
                    "Duplicate escalation tier at {} days",
                    tier.threshold_days
                )));
            }
        }

        if self.waiver.max_auto_waivable < BigDecimal::from(0) {
            return Err(EngineError::Configuration(format!(
                "Auto-waivable limit cannot be negative: {}",
                self.waiver.max_auto_waivable
            )));
        }

        Ok(())
    }
}

impl Default for FeePolicy {
    /// Standard policy: 120 per day after a 7-day grace period, capped at
    /// 3000, escalating at 30, 60 and 90 billable days
    fn default() -> Self {
        FeePolicy::new(BigDecimal::from(120), 7)
            .max_fee(BigDecimal::from(3000))
            .tier(EscalationTier::new(30, BigDecimal::from(1)))
            .tier(EscalationTier::new(
                60,
                BigDecimal::from(12) / BigDecimal::from(10),
            ))
            .tier(EscalationTier::new(
                90,
                BigDecimal::from(15) / BigDecimal::from(10),
            ))
    }
}
