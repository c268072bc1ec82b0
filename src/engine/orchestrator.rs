//! Batch reconciliation orchestrator
//!
//! [`ReconciliationEngine`] ties the parser, matcher and fee calculator
//! together for one tenant. A batch run has two phases: `analyze_batch`
//! computes everything without touching storage, then `apply_selected`
//! pushes a reviewed subset of rows through a [`SettlementWriter`],
//! fail-soft per item. Waivers and overdue assessment hang off the same
//! engine so every mutation goes through one policy gate.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fees::{FeeCalculation, FeePolicy, FeeRequest};
use crate::matching::{ContractMatcher, MatchCandidate, SuggestedAction};
use crate::parser::{DescriptionParser, ParsedDescription};
use crate::traits::{
    InvoiceLine, OverdueUpdate, ReconciliationStorage, SettlementInvoice, SettlementWriter,
    WaiverAudit,
};
use crate::types::*;
use crate::utils::validation::{validate_positive_amount, validate_waiver_reason};

/// Follow-up suggested for one analyzed row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedAction {
    /// Best match scored high enough to link without review
    CreateSettlementInvoice,
    /// A positive late fee should be invoiced
    CreateLateFeeInvoice,
    /// Candidates exist but need a human decision
    ReviewCandidates,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::CreateSettlementInvoice => "create_settlement_invoice",
            RecommendedAction::CreateLateFeeInvoice => "create_late_fee_invoice",
            RecommendedAction::ReviewCandidates => "review_candidates",
        }
    }
}

impl std::fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of analyzing a single payment row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Payment row this result describes
    pub payment_id: Uuid,
    /// Payment number, carried over for reporting
    pub payment_number: Option<String>,
    /// Original free-text description
    pub description: String,
    /// Payment amount
    pub amount: BigDecimal,
    /// Structured fields extracted from the description
    pub parsed: ParsedDescription,
    /// Ranked contract candidates; empty when nothing matched
    pub candidates: Vec<MatchCandidate>,
    /// Top-ranked candidate, when any matched
    pub best_match: Option<MatchCandidate>,
    /// Late-fee breakdown; `None` when no fee could be assessed
    pub fee: Option<FeeCalculation>,
    /// Suggested follow-ups for this row
    pub actions: Vec<RecommendedAction>,
    /// Lifecycle state of the row
    pub status: RowStatus,
    /// Waiver stamp, once the fee has been waived
    pub waiver: Option<WaiverRecord>,
}

impl ReconciliationResult {
    /// Confirm external payment of an applied row
    pub fn mark_paid(&mut self) -> EngineResult<()> {
        if !self.status.can_transition_to(RowStatus::Paid) {
            return Err(EngineError::Policy(format!(
                "Cannot mark a {} payment as paid",
                self.status
            )));
        }
        self.status = RowStatus::Paid;
        Ok(())
    }
}

/// Tenant-scoped reconciliation engine
pub struct ReconciliationEngine {
    tenant_id: Uuid,
    parser: DescriptionParser,
    matcher: ContractMatcher,
}

impl ReconciliationEngine {
    /// Create an engine scoped to one tenant with the standard parser
    pub fn for_tenant(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            parser: DescriptionParser::new(),
            matcher: ContractMatcher::new(),
        }
    }

    /// Replace the parser, e.g. with one that knows the tenant's customers
    pub fn with_parser(mut self, parser: DescriptionParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    /// Analyze a batch of payment rows against the tenant's contracts
    ///
    /// Pure computation: parsing, matching and fee math happen here, no
    /// writes. Raises `Configuration` for an inactive or invalid policy and
    /// for rows outside the engine's tenant; everything else degrades the
    /// affected row instead of failing the batch.
    pub fn analyze_batch(
        &self,
        payments: &[PaymentRecord],
        contracts: &[Contract],
        policy: &FeePolicy,
    ) -> EngineResult<Vec<ReconciliationResult>> {
        self.ensure_policy(policy)?;
        self.ensure_tenant_scope(payments, contracts)?;

        tracing::info!(
            tenant_id = %self.tenant_id,
            payments = payments.len(),
            contracts = contracts.len(),
            "Analyzing reconciliation batch"
        );

        Ok(payments
            .iter()
            .map(|payment| self.analyze_row(payment, contracts, policy))
            .collect())
    }

    /// Analyze one payment row; never fails
    pub fn analyze_row(
        &self,
        payment: &PaymentRecord,
        contracts: &[Contract],
        policy: &FeePolicy,
    ) -> ReconciliationResult {
        let mut parsed = self
            .parser
            .parse(&payment.description)
            .with_amount(payment.amount.clone());

        // Explicit references on the row fill gaps the text did not cover;
        // they do not raise parse confidence.
        if parsed.contract_number.is_none() {
            parsed.contract_number = payment.contract_reference.clone();
        }
        if parsed.agreement_number.is_none() {
            parsed.agreement_number = payment.agreement_reference.clone();
        }

        let candidates = self.matcher.rank_candidates(&parsed, contracts);
        let best_match = candidates.first().cloned();
        let fee = self.row_fee(payment, best_match.as_ref(), policy);
        let actions = recommended_actions(best_match.as_ref(), fee.as_ref());

        ReconciliationResult {
            payment_id: payment.id,
            payment_number: payment.payment_number.clone(),
            description: payment.description.clone(),
            amount: payment.amount.clone(),
            parsed,
            candidates,
            best_match,
            fee,
            actions,
            status: RowStatus::Pending,
            waiver: None,
        }
    }

    /// Bulk-load the tenant's rows through the read seam and analyze them
    ///
    /// Falls back to the default policy when the tenant has none stored.
    pub async fn analyze_from_storage<S: ReconciliationStorage>(
        &self,
        storage: &S,
    ) -> EngineResult<Vec<ReconciliationResult>> {
        let contracts = storage.load_contracts(self.tenant_id).await?;
        let payments = storage.load_unreconciled_payments(self.tenant_id).await?;
        let policy = storage
            .load_fee_policy(self.tenant_id)
            .await?
            .unwrap_or_default();

        self.analyze_batch(&payments, &contracts, &policy)
    }

    /// Apply a reviewed subset of rows through the write collaborator
    ///
    /// Sequential and fail-soft: a collaborator failure marks that row
    /// failed and the loop continues. Rows that are not `Pending`, or have
    /// no best match, are counted as skipped. Never raises; the mutated
    /// rows come back inside the report.
    pub async fn apply_selected<W: SettlementWriter>(
        &self,
        mut results: Vec<ReconciliationResult>,
        writer: &mut W,
    ) -> BatchReport {
        let mut report = BatchReport::new(results.len());

        for row in results.iter_mut() {
            if row.status != RowStatus::Pending {
                report.record_skip();
                continue;
            }
            let best = match row.best_match.clone() {
                Some(best) => best,
                None => {
                    report.record_skip();
                    continue;
                }
            };

            match self.apply_row(row, &best, writer).await {
                Ok(()) => {
                    row.status = RowStatus::Applied;
                    report.record_success(row.fee.as_ref().map(|fee| &fee.final_fee));
                }
                Err(err) => {
                    tracing::warn!(
                        payment_id = %row.payment_id,
                        error = %err,
                        "Apply failed for payment, continuing batch"
                    );
                    report.record_failure(row.payment_id, &err);
                }
            }
        }

        tracing::info!(
            tenant_id = %self.tenant_id,
            successful = report.successful,
            failed = report.failed,
            skipped = report.skipped,
            "Applied reconciliation batch"
        );

        report.results = results;
        report
    }

    async fn apply_row<W: SettlementWriter>(
        &self,
        row: &ReconciliationResult,
        best: &MatchCandidate,
        writer: &mut W,
    ) -> EngineResult<()> {
        let invoice = build_invoice(row, best);
        writer.create_invoice(&invoice).await?;

        let (late_fee_delta, days_overdue) = match &row.fee {
            Some(fee) => (fee.final_fee.clone(), fee.days_overdue),
            None => (BigDecimal::from(0), 0),
        };
        let status = if late_fee_delta > BigDecimal::from(0) {
            ContractStatus::Overdue
        } else {
            ContractStatus::Active
        };
        let update = OverdueUpdate {
            contract_id: best.contract_id,
            late_fee_delta,
            days_overdue,
            status,
        };
        writer.update_contract_overdue(&update).await?;

        Ok(())
    }

    /// Waive the fee on a row under the policy's waiver rules
    ///
    /// Without an approver the waiver is rejected when the policy requires
    /// approval or the fee exceeds the auto-waivable limit. On success the
    /// fee is zeroed (day counts kept for the record), the row moves to
    /// `Waived` and a [`WaiverRecord`] is stamped.
    pub fn waive(
        &self,
        result: &mut ReconciliationResult,
        policy: &FeePolicy,
        reason: &str,
        approver: Option<&str>,
    ) -> EngineResult<()> {
        validate_waiver_reason(reason)?;

        if !result.status.can_transition_to(RowStatus::Waived) {
            return Err(EngineError::Policy(format!(
                "Cannot waive a payment in {} status",
                result.status
            )));
        }

        let fee_amount = result
            .fee
            .as_ref()
            .map(|fee| fee.final_fee.clone())
            .unwrap_or_else(|| BigDecimal::from(0));

        if approver.is_none() {
            if policy.waiver.requires_approval {
                return Err(EngineError::Policy(
                    "Waiver requires an approver under this policy".to_string(),
                ));
            }
            if fee_amount > policy.waiver.max_auto_waivable {
                return Err(EngineError::Policy(format!(
                    "Fee {} exceeds the auto-waivable limit {}",
                    fee_amount, policy.waiver.max_auto_waivable
                )));
            }
        }

        if let Some(fee) = result.fee.take() {
            result.fee = Some(fee.with_waiver(reason.to_string()));
        }
        result.status = RowStatus::Waived;
        result.waiver = Some(WaiverRecord {
            reason: reason.to_string(),
            approver_id: approver.map(String::from),
            waived_at: Utc::now().naive_utc(),
        });
        result
            .actions
            .retain(|action| *action != RecommendedAction::CreateLateFeeInvoice);

        tracing::info!(
            payment_id = %result.payment_id,
            amount_waived = %fee_amount,
            "Waived late fee"
        );

        Ok(())
    }

    /// Waive and append the decision to the collaborator's audit trail
    pub async fn waive_and_record<W: SettlementWriter>(
        &self,
        result: &mut ReconciliationResult,
        policy: &FeePolicy,
        reason: &str,
        approver: Option<&str>,
        writer: &mut W,
    ) -> EngineResult<()> {
        let amount_waived = result
            .fee
            .as_ref()
            .map(|fee| fee.final_fee.clone())
            .unwrap_or_else(|| BigDecimal::from(0));

        self.waive(result, policy, reason, approver)?;

        let audit = WaiverAudit {
            payment_id: result.payment_id,
            contract_id: result.best_match.as_ref().map(|best| best.contract_id),
            amount_waived,
            reason: reason.to_string(),
            approver_id: approver.map(String::from),
            waived_at: result
                .waiver
                .as_ref()
                .map(|waiver| waiver.waived_at)
                .unwrap_or_else(|| Utc::now().naive_utc()),
        };
        writer.record_waiver(&audit).await?;

        Ok(())
    }

    /// Assess the tenant's contracts for overdue risk as of a date
    ///
    /// A contract qualifies when it is chargeable, its next due date lies
    /// before `as_of`, and it carries a positive outstanding balance. The
    /// fee is assessed against that balance and the result tagged with a
    /// [`RiskLevel`], most overdue first.
    pub fn assess_overdue(
        &self,
        contracts: &[Contract],
        policy: &FeePolicy,
        as_of: NaiveDate,
    ) -> EngineResult<Vec<OverdueAssessment>> {
        self.ensure_policy(policy)?;
        self.ensure_tenant_scope(&[], contracts)?;

        let mut assessments: Vec<OverdueAssessment> = contracts
            .iter()
            .filter_map(|contract| {
                if !contract.status.is_chargeable() {
                    return None;
                }
                let due_date = contract.next_due_date?;
                if due_date >= as_of || contract.balance_due <= BigDecimal::from(0) {
                    return None;
                }

                let request =
                    FeeRequest::new(due_date, contract.balance_due.clone()).settled_on(as_of);
                let fee = FeeCalculation::calculate(&request, policy);
                Some(OverdueAssessment {
                    contract_id: contract.id,
                    contract_number: contract.contract_number.clone(),
                    customer_name: contract.customer_name.clone(),
                    due_date,
                    days_overdue: fee.days_overdue,
                    risk: RiskLevel::from_days_overdue(fee.days_overdue),
                    fee,
                })
            })
            .collect();

        assessments.sort_by(|a, b| {
            b.days_overdue
                .cmp(&a.days_overdue)
                .then_with(|| a.contract_number.cmp(&b.contract_number))
        });

        Ok(assessments)
    }

    fn ensure_policy(&self, policy: &FeePolicy) -> EngineResult<()> {
        if !policy.active {
            return Err(EngineError::Configuration(
                "Fee policy is inactive".to_string(),
            ));
        }
        policy.validate()
    }

    fn ensure_tenant_scope(
        &self,
        payments: &[PaymentRecord],
        contracts: &[Contract],
    ) -> EngineResult<()> {
        if let Some(payment) = payments
            .iter()
            .find(|payment| payment.tenant_id != self.tenant_id)
        {
            return Err(EngineError::Configuration(format!(
                "Payment {} belongs to tenant {}, engine is scoped to {}",
                payment.id, payment.tenant_id, self.tenant_id
            )));
        }
        if let Some(contract) = contracts
            .iter()
            .find(|contract| contract.tenant_id != self.tenant_id)
        {
            return Err(EngineError::Configuration(format!(
                "Contract {} belongs to tenant {}, engine is scoped to {}",
                contract.contract_number, contract.tenant_id, self.tenant_id
            )));
        }
        Ok(())
    }

    fn row_fee(
        &self,
        payment: &PaymentRecord,
        best: Option<&MatchCandidate>,
        policy: &FeePolicy,
    ) -> Option<FeeCalculation> {
        best?;
        let due_date = payment.due_date?;

        if let Err(err) = validate_positive_amount(&payment.amount) {
            tracing::warn!(
                payment_id = %payment.id,
                error = %err,
                "Skipping fee assessment for payment"
            );
            return None;
        }

        let mut request = FeeRequest::new(due_date, payment.amount.clone());
        if let Some(paid_on) = payment.payment_date {
            request = request.settled_on(paid_on);
        }
        Some(FeeCalculation::calculate(&request, policy))
    }
}

fn recommended_actions(
    best: Option<&MatchCandidate>,
    fee: Option<&FeeCalculation>,
) -> Vec<RecommendedAction> {
    let mut actions = Vec::new();
    if let Some(best) = best {
        match best.action {
            SuggestedAction::AutoLink => actions.push(RecommendedAction::CreateSettlementInvoice),
            SuggestedAction::HighConfidence | SuggestedAction::ManualReview => {
                actions.push(RecommendedAction::ReviewCandidates)
            }
            SuggestedAction::Reject => {}
        }
    }
    if let Some(fee) = fee {
        if fee.has_fee() {
            actions.push(RecommendedAction::CreateLateFeeInvoice);
        }
    }
    actions
}

/// Build the invoice payload for an applied row. The line items always sum
/// to the invoice amount.
fn build_invoice(row: &ReconciliationResult, best: &MatchCandidate) -> SettlementInvoice {
    let payment_label = row
        .payment_number
        .clone()
        .unwrap_or_else(|| row.payment_id.to_string());

    match &row.fee {
        Some(fee) if fee.has_fee() => {
            let mut line_items = vec![InvoiceLine {
                description: format!(
                    "{} billable days at {} per day",
                    fee.billable_days, fee.daily_rate
                ),
                amount: fee.gross_fee.clone(),
            }];
            if fee.tier_multiplier != BigDecimal::from(1) {
                line_items.push(InvoiceLine {
                    description: format!("Tier escalation x{}", fee.tier_multiplier),
                    amount: &fee.escalated_fee - &fee.gross_fee,
                });
            }
            if fee.capped_fee < fee.escalated_fee {
                line_items.push(InvoiceLine {
                    description: "Fee cap adjustment".to_string(),
                    amount: &fee.capped_fee - &fee.escalated_fee,
                });
            }
            SettlementInvoice {
                contract_id: best.contract_id,
                payment_id: row.payment_id,
                amount: fee.final_fee.clone(),
                description: format!(
                    "Late fee for payment {} on contract {}",
                    payment_label, best.contract_number
                ),
                line_items,
            }
        }
        _ => SettlementInvoice {
            contract_id: best.contract_id,
            payment_id: row.payment_id,
            amount: BigDecimal::from(0),
            description: format!(
                "Settlement of payment {} against contract {}",
                payment_label, best.contract_number
            ),
            line_items: vec![InvoiceLine {
                description: format!("Linked to contract {}", best.contract_number),
                amount: BigDecimal::from(0),
            }],
        },
    }
}

/// Aggregate outcome of applying a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Rows handed to the apply call
    pub total: usize,
    /// Rows the loop examined
    pub processed: usize,
    /// Rows applied end to end
    pub successful: usize,
    /// Rows where a collaborator write failed
    pub failed: usize,
    /// Rows not in an applicable state, or without a best match
    pub skipped: usize,
    /// Successful rows that carried a positive fee
    pub fees_applied: usize,
    /// Sum of fees across successful rows
    pub total_fee_amount: BigDecimal,
    /// One entry per failure, each naming the payment id
    pub errors: Vec<String>,
    /// The rows, with statuses updated by the apply
    pub results: Vec<ReconciliationResult>,
}

impl BatchReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            successful: 0,
            failed: 0,
            skipped: 0,
            fees_applied: 0,
            total_fee_amount: BigDecimal::from(0),
            errors: Vec::new(),
            results: Vec::new(),
        }
    }

    fn record_success(&mut self, fee_amount: Option<&BigDecimal>) {
        self.processed += 1;
        self.successful += 1;
        if let Some(amount) = fee_amount {
            if amount > &BigDecimal::from(0) {
                self.fees_applied += 1;
                self.total_fee_amount = &self.total_fee_amount + amount;
            }
        }
    }

    fn record_skip(&mut self) {
        self.processed += 1;
        self.skipped += 1;
    }

    fn record_failure(&mut self, payment_id: Uuid, error: &EngineError) {
        self.processed += 1;
        self.failed += 1;
        self.errors.push(format!("Payment {}: {}", payment_id, error));
    }

    /// True when no row failed
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Overdue risk snapshot for one contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueAssessment {
    pub contract_id: Uuid,
    pub contract_number: String,
    pub customer_name: String,
    /// Due date the assessment is measured from
    pub due_date: NaiveDate,
    pub days_overdue: u32,
    /// Escalation ladder position for the day count
    pub risk: RiskLevel,
    /// Fee accrued against the outstanding balance as of the assessment date
    pub fee: FeeCalculation,
}
