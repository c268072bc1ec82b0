//! Contract candidate matching and ranking
//!
//! Takes a [`ParsedDescription`] and the tenant's contracts and produces a
//! ranked list of [`MatchCandidate`]s. Each candidate carries a per-criterion
//! score breakdown, a total on a 0-140 scale, and a [`SuggestedAction`]
//! derived from fixed thresholds. Contracts that match no criterion are
//! omitted entirely rather than ranked at zero.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parser::ParsedDescription;
use crate::types::{BillingPeriod, Contract};

/// Points awarded when the parsed contract number appears in a contract
const CONTRACT_NUMBER_POINTS: u32 = 40;
/// Points awarded when the parsed agreement number appears in a contract
const AGREEMENT_NUMBER_POINTS: u32 = 35;
/// Points awarded when the customer hint matches the contract holder
const CUSTOMER_NAME_POINTS: u32 = 25;
/// Points awarded when the payment amount is within 10% of the monthly amount
const AMOUNT_POINTS: u32 = 20;
/// Points awarded when the referenced billing month overlaps the contract term
const PERIOD_POINTS: u32 = 15;
/// Points awarded to any contract that matched at least one other criterion
const BASELINE_POINTS: u32 = 5;

/// Per-criterion score breakdown for one candidate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub contract_number: u32,
    pub agreement_number: u32,
    pub customer_name: u32,
    pub amount: u32,
    pub period: u32,
    pub baseline: u32,
}

impl CriterionScores {
    /// Sum of all criterion points
    pub fn total(&self) -> u32 {
        self.contract_number
            + self.agreement_number
            + self.customer_name
            + self.amount
            + self.period
            + self.baseline
    }
}

/// What the engine suggests doing with a candidate at a given score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestedAction {
    /// Score 80 or above: link the payment without review
    AutoLink,
    /// Score 60-79: likely correct, surface for confirmation
    HighConfidence,
    /// Score 30-59: plausible, needs a human decision
    ManualReview,
    /// Score below 30: not a usable match
    Reject,
}

impl SuggestedAction {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 80 => SuggestedAction::AutoLink,
            s if s >= 60 => SuggestedAction::HighConfidence,
            s if s >= 30 => SuggestedAction::ManualReview,
            _ => SuggestedAction::Reject,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestedAction::AutoLink => "auto_link",
            SuggestedAction::HighConfidence => "high_confidence",
            SuggestedAction::ManualReview => "manual_review",
            SuggestedAction::Reject => "reject",
        }
    }
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One scored contract candidate for a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Identifier of the candidate contract
    pub contract_id: Uuid,
    /// Contract number, repeated here so results are readable without a lookup
    pub contract_number: String,
    /// Per-criterion breakdown
    pub scores: CriterionScores,
    /// Sum of the breakdown, at most 140
    pub total_score: u32,
    /// Action suggested for this score
    pub action: SuggestedAction,
    /// Human-readable notes on which criteria matched and why
    pub reasons: Vec<String>,
}

/// Scores parsed payment descriptions against contracts
#[derive(Debug, Clone, Default)]
pub struct ContractMatcher;

impl ContractMatcher {
    pub fn new() -> Self {
        ContractMatcher
    }

    /// Score every contract against the parsed description and rank the hits
    ///
    /// Contracts scoring zero are dropped. The rest are ordered by total
    /// score descending; ties break by contract number, then by contract id,
    /// so equal inputs always rank the same way.
    pub fn rank_candidates(
        &self,
        parsed: &ParsedDescription,
        contracts: &[Contract],
    ) -> Vec<MatchCandidate> {
        let mut candidates: Vec<MatchCandidate> = contracts
            .iter()
            .filter_map(|contract| self.score_contract(parsed, contract))
            .collect();

        candidates.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.contract_number.cmp(&b.contract_number))
                .then_with(|| a.contract_id.cmp(&b.contract_id))
        });

        candidates
    }

    fn score_contract(
        &self,
        parsed: &ParsedDescription,
        contract: &Contract,
    ) -> Option<MatchCandidate> {
        let mut scores = CriterionScores::default();
        let mut reasons = Vec::new();

        if let Some(number) = &parsed.contract_number {
            if contract.contract_number.contains(number.as_str()) {
                scores.contract_number = CONTRACT_NUMBER_POINTS;
                reasons.push(format!(
                    "Contract number {} found in {}",
                    number, contract.contract_number
                ));
            }
        }

        if let (Some(number), Some(agreement)) =
            (&parsed.agreement_number, &contract.agreement_number)
        {
            if agreement.contains(number.as_str()) {
                scores.agreement_number = AGREEMENT_NUMBER_POINTS;
                reasons.push(format!("Agreement number {} found in {}", number, agreement));
            }
        }

        if let Some(hint) = &parsed.customer_hint {
            if customer_matches(hint, &contract.customer_name) {
                scores.customer_name = CUSTOMER_NAME_POINTS;
                reasons.push(format!("Customer name matches {}", contract.customer_name));
            }
        }

        if let Some(amount) = &parsed.amount {
            if amount_within_tolerance(amount, &contract.monthly_amount) {
                scores.amount = AMOUNT_POINTS;
                reasons.push(format!(
                    "Amount {} within 10% of monthly {}",
                    amount, contract.monthly_amount
                ));
            }
        }

        if let Some(period) = &parsed.period {
            if period_overlaps_term(period, contract) {
                scores.period = PERIOD_POINTS;
                reasons.push(format!("Billing period {} falls in the contract term", period));
            }
        }

        // Baseline points never stand alone; a contract that matched nothing
        // else is not a candidate at all.
        if scores.total() == 0 {
            return None;
        }
        scores.baseline = BASELINE_POINTS;
        reasons.push("Eligible contract for this tenant".to_string());

        let total_score = scores.total();
        Some(MatchCandidate {
            contract_id: contract.id,
            contract_number: contract.contract_number.clone(),
            scores,
            total_score,
            action: SuggestedAction::from_score(total_score),
            reasons,
        })
    }
}

/// True when the hint appears inside the customer name or both share the
/// same leading word, case-insensitively
fn customer_matches(hint: &str, customer_name: &str) -> bool {
    let hint = hint.to_lowercase();
    let name = customer_name.to_lowercase();
    if name.contains(&hint) {
        return true;
    }
    match (hint.split_whitespace().next(), name.split_whitespace().next()) {
        (Some(first_hint), Some(first_name)) => first_hint == first_name,
        _ => false,
    }
}

/// True when the payment amount differs from the monthly amount by at most
/// 10% of the monthly amount. Contracts with a non-positive monthly amount
/// never match on amount.
fn amount_within_tolerance(amount: &BigDecimal, monthly: &BigDecimal) -> bool {
    if monthly <= &BigDecimal::from(0) {
        return false;
    }
    let tolerance = (monthly * BigDecimal::from(10)) / BigDecimal::from(100);
    (monthly - amount).abs() <= tolerance
}

/// True when the billing month intersects the contract term. Contracts
/// without an end date are treated as open-ended.
fn period_overlaps_term(period: &BillingPeriod, contract: &Contract) -> bool {
    let (first, last) = match (period.first_day(), period.last_day()) {
        (Some(first), Some(last)) => (first, last),
        _ => return false,
    };
    if last < contract.start_date {
        return false;
    }
    match contract.end_date {
        Some(end) => first <= end,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::DescriptionParser;
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn acme_contract(tenant_id: Uuid) -> Contract {
        Contract::new(
            tenant_id,
            "4521".to_string(),
            "Acme Holdings".to_string(),
            BigDecimal::from(900),
            date(2023, 6, 1),
        )
        .agreement_number("55123456".to_string())
    }

    #[test]
    fn test_full_match_scores_140_and_auto_links() {
        let tenant_id = Uuid::new_v4();
        let contract = acme_contract(tenant_id);
        let parser = DescriptionParser::with_customer_names(vec!["Acme Holdings".to_string()]);
        let parsed = parser
            .parse("Rent contract 4521 agreement 55123456 Acme Holdings March 2024")
            .with_amount(BigDecimal::from(900));

        let matcher = ContractMatcher::new();
        let candidates = matcher.rank_candidates(&parsed, &[contract]);

        assert_eq!(candidates.len(), 1);
        let best = &candidates[0];
        assert_eq!(best.total_score, 140);
        assert_eq!(best.action, SuggestedAction::AutoLink);
        assert_eq!(best.scores.contract_number, 40);
        assert_eq!(best.scores.agreement_number, 35);
        assert_eq!(best.scores.customer_name, 25);
        assert_eq!(best.scores.amount, 20);
        assert_eq!(best.scores.period, 15);
        assert_eq!(best.scores.baseline, 5);
    }

    #[test]
    fn test_zero_score_contracts_are_omitted() {
        let tenant_id = Uuid::new_v4();
        let unrelated = Contract::new(
            tenant_id,
            "9999".to_string(),
            "Globex".to_string(),
            BigDecimal::from(5000),
            date(2023, 1, 1),
        );
        // No period in the text, so the open-ended term cannot score either
        let parsed = DescriptionParser::new().parse("Rent payment contract 4521");

        let candidates = ContractMatcher::new().rank_candidates(&parsed, &[unrelated]);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_baseline_points_require_another_criterion() {
        let tenant_id = Uuid::new_v4();
        // Period overlaps, so this contract scores 15 + 5; a second contract
        // with no overlapping criterion at all must not appear with a bare 5.
        let overlapping = acme_contract(tenant_id);
        let expired = Contract::new(
            tenant_id,
            "7777".to_string(),
            "Initech".to_string(),
            BigDecimal::from(50000),
            date(2010, 1, 1),
        )
        .ends_on(date(2011, 1, 1));

        let parsed = DescriptionParser::new().parse("Payment for March 2024");
        let candidates =
            ContractMatcher::new().rank_candidates(&parsed, &[overlapping, expired]);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].contract_number, "4521");
        assert_eq!(candidates[0].total_score, 20);
        assert_eq!(candidates[0].action, SuggestedAction::Reject);
    }

    #[test]
    fn test_amount_tolerance_boundary_is_inclusive() {
        let monthly = BigDecimal::from(1000);
        assert!(amount_within_tolerance(&BigDecimal::from(900), &monthly));
        assert!(amount_within_tolerance(&BigDecimal::from(1100), &monthly));
        assert!(!amount_within_tolerance(&BigDecimal::from(899), &monthly));
        assert!(!amount_within_tolerance(&BigDecimal::from(0), &BigDecimal::from(0)));
    }

    #[test]
    fn test_period_outside_term_scores_nothing() {
        let tenant_id = Uuid::new_v4();
        let contract = acme_contract(tenant_id).ends_on(date(2024, 1, 31));
        let parsed = DescriptionParser::new().parse("contract 4521 March 2024");

        let candidates = ContractMatcher::new().rank_candidates(&parsed, &[contract]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].scores.period, 0);
        assert_eq!(candidates[0].scores.contract_number, 40);
    }

    #[test]
    fn test_equal_scores_rank_by_contract_number() {
        let tenant_id = Uuid::new_v4();
        let first = Contract::new(
            tenant_id,
            "1200-B".to_string(),
            "Acme".to_string(),
            BigDecimal::from(700),
            date(2023, 1, 1),
        );
        let second = Contract::new(
            tenant_id,
            "1200-A".to_string(),
            "Acme".to_string(),
            BigDecimal::from(700),
            date(2023, 1, 1),
        );

        let parsed = DescriptionParser::new()
            .parse("payment ref X1 contract 1200")
            .with_amount(BigDecimal::from(700));
        let candidates = ContractMatcher::new().rank_candidates(&parsed, &[first, second]);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].total_score, candidates[1].total_score);
        assert_eq!(candidates[0].contract_number, "1200-A");
        assert_eq!(candidates[1].contract_number, "1200-B");
    }

    #[test]
    fn test_customer_leading_token_match() {
        assert!(customer_matches("acme holdings", "Acme Holdings LLC"));
        assert!(customer_matches("acme trading", "ACME Logistics"));
        assert!(!customer_matches("globex corp", "Acme Holdings"));
    }
}
