//! Core types and data structures for the reconciliation engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle states of a contract in the tenant's portfolio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractStatus {
    /// Drafted but not yet signed; never matched or charged
    Draft,
    /// Signed and running
    Active,
    /// Running with unpaid fees or missed due dates
    Overdue,
    /// Past its end date
    Expired,
    /// Terminated before its end date
    Cancelled,
}

impl ContractStatus {
    /// Whether contracts in this state can accrue late fees
    pub fn is_chargeable(&self) -> bool {
        matches!(self, ContractStatus::Active | ContractStatus::Overdue)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "draft",
            ContractStatus::Active => "active",
            ContractStatus::Overdue => "overdue",
            ContractStatus::Expired => "expired",
            ContractStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment classification derived from description keywords
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentKind {
    /// Periodic rent installment
    Rent,
    /// Penalty for a late settlement
    LateFee,
    /// Up-front payment or deposit
    Advance,
    /// No keyword group matched
    #[default]
    Other,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Rent => "rent",
            PaymentKind::LateFee => "late_fee",
            PaymentKind::Advance => "advance",
            PaymentKind::Other => "other",
        }
    }
}

impl std::fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pattern tags recorded when an extractor matches its field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldTag {
    ContractNumber,
    AgreementNumber,
    CustomerName,
    Period,
    PaymentType,
    LateFeeAmount,
    DaysOverdue,
    Reference,
}

/// Status of one analyzed payment row
///
/// Transitions are one-way: `Pending → Applied` on a successful apply,
/// `Pending → Waived` on an explicit waiver, `Applied → Paid` when the
/// collaborator confirms settlement. Reversal is an external administrative
/// action, never performed by this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowStatus {
    Pending,
    Applied,
    Waived,
    Paid,
}

impl RowStatus {
    /// Check whether the state machine permits moving to `next`
    pub fn can_transition_to(&self, next: RowStatus) -> bool {
        matches!(
            (self, next),
            (RowStatus::Pending, RowStatus::Applied)
                | (RowStatus::Pending, RowStatus::Waived)
                | (RowStatus::Applied, RowStatus::Paid)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Pending => "pending",
            RowStatus::Applied => "applied",
            RowStatus::Waived => "waived",
            RowStatus::Paid => "paid",
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Escalation urgency for an overdue contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// 1-6 days overdue
    Low,
    /// 7-14 days overdue
    Medium,
    /// 15-29 days overdue
    High,
    /// 30 or more days overdue
    Critical,
}

impl RiskLevel {
    /// Classify an overdue span into an escalation level
    pub fn from_days_overdue(days: u32) -> Self {
        match days {
            0..=6 => RiskLevel::Low,
            7..=14 => RiskLevel::Medium,
            15..=29 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A billing month referenced by a payment description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub year: i32,
    /// 1-based calendar month
    pub month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// First calendar day of the period, if the month is valid
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Last calendar day of the period, if the month is valid
    pub fn last_day(&self) -> Option<NaiveDate> {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// An unreconciled payment row pulled from the tenant's payment ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Unique identifier for the payment
    pub id: Uuid,
    /// Tenant the payment belongs to
    pub tenant_id: Uuid,
    /// Human-facing payment number, if the source system assigned one
    pub payment_number: Option<String>,
    /// Free-text memo entered at capture time; the parser's only input
    pub description: String,
    /// Amount of the payment
    pub amount: BigDecimal,
    /// Date the payment was due
    pub due_date: Option<NaiveDate>,
    /// Date the payment actually settled
    pub payment_date: Option<NaiveDate>,
    /// Explicit contract reference carried by the source row, if any
    pub contract_reference: Option<String>,
    /// Explicit agreement reference carried by the source row, if any
    pub agreement_reference: Option<String>,
    /// When the row was captured
    pub created_at: NaiveDateTime,
}

impl PaymentRecord {
    /// Create a new payment record with a generated id
    pub fn new(tenant_id: Uuid, description: String, amount: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            payment_number: None,
            description,
            amount,
            due_date: None,
            payment_date: None,
            contract_reference: None,
            agreement_reference: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn payment_number(mut self, number: String) -> Self {
        self.payment_number = Some(number);
        self
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn paid_on(mut self, date: NaiveDate) -> Self {
        self.payment_date = Some(date);
        self
    }

    pub fn contract_reference(mut self, reference: String) -> Self {
        self.contract_reference = Some(reference);
        self
    }

    pub fn agreement_reference(mut self, reference: String) -> Self {
        self.agreement_reference = Some(reference);
        self
    }
}

/// A candidate contract loaded from the tenant's portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Unique identifier for the contract
    pub id: Uuid,
    /// Tenant the contract belongs to
    pub tenant_id: Uuid,
    /// Human-facing contract number
    pub contract_number: String,
    /// Agreement number from the upstream registration system, if any
    pub agreement_number: Option<String>,
    /// Customer display name
    pub customer_name: String,
    /// Monthly base amount owed under the contract
    pub monthly_amount: BigDecimal,
    /// Start of the contract term
    pub start_date: NaiveDate,
    /// End of the contract term; open-ended when absent
    pub end_date: Option<NaiveDate>,
    /// Next installment due date, if one is scheduled
    pub next_due_date: Option<NaiveDate>,
    /// Outstanding balance currently owed
    pub balance_due: BigDecimal,
    /// Accumulated late fees charged so far
    pub late_fee_amount: BigDecimal,
    /// Days overdue as of the last aggregate update
    pub days_overdue: u32,
    /// Current lifecycle state
    pub status: ContractStatus,
    /// When the contract was created
    pub created_at: NaiveDateTime,
    /// When the contract was last updated
    pub updated_at: NaiveDateTime,
}

impl Contract {
    /// Create a new active contract with a generated id
    pub fn new(
        tenant_id: Uuid,
        contract_number: String,
        customer_name: String,
        monthly_amount: BigDecimal,
        start_date: NaiveDate,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            contract_number,
            agreement_number: None,
            customer_name,
            monthly_amount,
            start_date,
            end_date: None,
            next_due_date: None,
            balance_due: BigDecimal::from(0),
            late_fee_amount: BigDecimal::from(0),
            days_overdue: 0,
            status: ContractStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn agreement_number(mut self, number: String) -> Self {
        self.agreement_number = Some(number);
        self
    }

    pub fn ends_on(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn next_due_on(mut self, date: NaiveDate) -> Self {
        self.next_due_date = Some(date);
        self
    }

    pub fn balance_due(mut self, amount: BigDecimal) -> Self {
        self.balance_due = amount;
        self
    }

    pub fn status(mut self, status: ContractStatus) -> Self {
        self.status = status;
        self
    }
}

/// Audit stamp recorded on a waived reconciliation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaiverRecord {
    /// Why the fee was waived
    pub reason: String,
    /// Who approved the waiver, when approval was involved
    pub approver_id: Option<String>,
    /// When the waiver was granted
    pub waived_at: NaiveDateTime,
}

/// Errors that can occur in the reconciliation engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Policy error: {0}")]
    Policy(String),
    #[error("External write failed: {0}")]
    ExternalWrite(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
