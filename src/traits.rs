//! Traits for collaborator abstraction
//!
//! The engine never talks to a database or an invoicing system directly.
//! Reads come in through [`ReconciliationStorage`] and writes go out through
//! [`SettlementWriter`], so any backend (PostgreSQL, a REST service,
//! in-memory fixtures) can be plugged in by implementing these traits.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fees::FeePolicy;
use crate::types::*;

/// Tenant-scoped bulk reads consumed by the engine
///
/// Contracts and payment rows are loaded once per batch, before analysis
/// starts; the engine performs no per-row lookups.
#[async_trait]
pub trait ReconciliationStorage: Send + Sync {
    /// Load every candidate contract for the tenant
    async fn load_contracts(&self, tenant_id: Uuid) -> EngineResult<Vec<Contract>>;

    /// Load payment rows that have not been linked to a contract yet
    async fn load_unreconciled_payments(&self, tenant_id: Uuid) -> EngineResult<Vec<PaymentRecord>>;

    /// Load the tenant's fee policy; `None` means the engine applies its
    /// documented defaults
    async fn load_fee_policy(&self, tenant_id: Uuid) -> EngineResult<Option<FeePolicy>>;
}

/// Writes performed on behalf of the engine during bulk apply
///
/// Each method is expected to be atomic at the collaborator boundary; the
/// engine does not wrap items in a cross-item transaction.
#[async_trait]
pub trait SettlementWriter: Send + Sync {
    /// Create a fee or settlement invoice, returning its id
    async fn create_invoice(&mut self, invoice: &SettlementInvoice) -> EngineResult<Uuid>;

    /// Update a contract's aggregate overdue fields
    async fn update_contract_overdue(&mut self, update: &OverdueUpdate) -> EngineResult<()>;

    /// Append a waiver decision to the audit trail
    async fn record_waiver(&mut self, audit: &WaiverAudit) -> EngineResult<()>;
}

/// One line of a settlement or fee invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub amount: BigDecimal,
}

/// Invoice payload handed to the write collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementInvoice {
    /// Contract the invoice is raised against
    pub contract_id: Uuid,
    /// Payment row that triggered the invoice
    pub payment_id: Uuid,
    /// Final fee amount; zero for a plain settlement link
    pub amount: BigDecimal,
    /// Human-readable invoice description
    pub description: String,
    /// Breakdown lines summing to `amount`
    pub line_items: Vec<InvoiceLine>,
}

/// Aggregate overdue fields pushed onto a contract after an apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueUpdate {
    pub contract_id: Uuid,
    /// Late fee amount added by this apply; the collaborator accumulates it
    pub late_fee_delta: BigDecimal,
    /// Days overdue observed for the applied row
    pub days_overdue: u32,
    /// Lifecycle state the contract should move to
    pub status: ContractStatus,
}

/// Audit trail entry for a granted waiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaiverAudit {
    /// Payment row whose fee was waived
    pub payment_id: Uuid,
    /// Matched contract, when one was identified
    pub contract_id: Option<Uuid>,
    /// Fee amount forgiven by the waiver
    pub amount_waived: BigDecimal,
    pub reason: String,
    pub approver_id: Option<String>,
    pub waived_at: NaiveDateTime,
}
