//! In-memory backend implementation for testing
//!
//! Implements both engine seams over `Arc<RwLock<..>>` maps: the read side
//! ([`ReconciliationStorage`]) and the write side ([`SettlementWriter`]).
//! A per-contract failure set can be injected to exercise the engine's
//! fail-soft apply path.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::fees::FeePolicy;
use crate::traits::*;
use crate::types::*;

/// In-memory backend for testing and development
///
/// Clones share the underlying maps, so one instance can serve the read
/// seam while a clone acts as the write collaborator.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    contracts: Arc<RwLock<HashMap<Uuid, Contract>>>,
    payments: Arc<RwLock<HashMap<Uuid, PaymentRecord>>>,
    policies: Arc<RwLock<HashMap<Uuid, FeePolicy>>>,
    invoices: Arc<RwLock<Vec<(Uuid, SettlementInvoice)>>>,
    contract_updates: Arc<RwLock<Vec<OverdueUpdate>>>,
    waivers: Arc<RwLock<Vec<WaiverAudit>>>,
    failing_contracts: Arc<RwLock<HashSet<Uuid>>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self {
            contracts: Arc::new(RwLock::new(HashMap::new())),
            payments: Arc::new(RwLock::new(HashMap::new())),
            policies: Arc::new(RwLock::new(HashMap::new())),
            invoices: Arc::new(RwLock::new(Vec::new())),
            contract_updates: Arc::new(RwLock::new(Vec::new())),
            waivers: Arc::new(RwLock::new(Vec::new())),
            failing_contracts: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn seed_contract(&self, contract: Contract) {
        self.contracts
            .write()
            .unwrap()
            .insert(contract.id, contract);
    }

    pub fn seed_payment(&self, payment: PaymentRecord) {
        self.payments.write().unwrap().insert(payment.id, payment);
    }

    pub fn set_policy(&self, tenant_id: Uuid, policy: FeePolicy) {
        self.policies.write().unwrap().insert(tenant_id, policy);
    }

    /// Make every write touching this contract fail with `ExternalWrite`
    pub fn fail_writes_for(&self, contract_id: Uuid) {
        self.failing_contracts.write().unwrap().insert(contract_id);
    }

    /// Invoices recorded so far, in write order
    pub fn invoices(&self) -> Vec<SettlementInvoice> {
        self.invoices
            .read()
            .unwrap()
            .iter()
            .map(|(_, invoice)| invoice.clone())
            .collect()
    }

    /// Overdue updates recorded so far, in write order
    pub fn contract_updates(&self) -> Vec<OverdueUpdate> {
        self.contract_updates.read().unwrap().clone()
    }

    /// Waiver audit entries recorded so far, in write order
    pub fn waivers(&self) -> Vec<WaiverAudit> {
        self.waivers.read().unwrap().clone()
    }

    /// Current state of a seeded contract
    pub fn contract(&self, contract_id: Uuid) -> Option<Contract> {
        self.contracts.read().unwrap().get(&contract_id).cloned()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.contracts.write().unwrap().clear();
        self.payments.write().unwrap().clear();
        self.policies.write().unwrap().clear();
        self.invoices.write().unwrap().clear();
        self.contract_updates.write().unwrap().clear();
        self.waivers.write().unwrap().clear();
        self.failing_contracts.write().unwrap().clear();
    }

    fn ensure_writable(&self, contract_id: Uuid) -> EngineResult<()> {
        if self.failing_contracts.read().unwrap().contains(&contract_id) {
            return Err(EngineError::ExternalWrite(format!(
                "Write rejected for contract {}",
                contract_id
            )));
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReconciliationStorage for MemoryBackend {
    async fn load_contracts(&self, tenant_id: Uuid) -> EngineResult<Vec<Contract>> {
        let contracts = self.contracts.read().unwrap();
        let mut filtered: Vec<Contract> = contracts
            .values()
            .filter(|contract| contract.tenant_id == tenant_id)
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.contract_number.cmp(&b.contract_number));
        Ok(filtered)
    }

    async fn load_unreconciled_payments(
        &self,
        tenant_id: Uuid,
    ) -> EngineResult<Vec<PaymentRecord>> {
        let payments = self.payments.read().unwrap();
        let mut filtered: Vec<PaymentRecord> = payments
            .values()
            .filter(|payment| payment.tenant_id == tenant_id)
            .cloned()
            .collect();
        // Deterministic batch order regardless of map iteration
        filtered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(filtered)
    }

    async fn load_fee_policy(&self, tenant_id: Uuid) -> EngineResult<Option<FeePolicy>> {
        Ok(self.policies.read().unwrap().get(&tenant_id).cloned())
    }
}

#[async_trait]
impl SettlementWriter for MemoryBackend {
    async fn create_invoice(&mut self, invoice: &SettlementInvoice) -> EngineResult<Uuid> {
        self.ensure_writable(invoice.contract_id)?;

        let invoice_id = Uuid::new_v4();
        self.invoices
            .write()
            .unwrap()
            .push((invoice_id, invoice.clone()));
        Ok(invoice_id)
    }

    async fn update_contract_overdue(&mut self, update: &OverdueUpdate) -> EngineResult<()> {
        self.ensure_writable(update.contract_id)?;

        let mut contracts = self.contracts.write().unwrap();
        let contract = contracts.get_mut(&update.contract_id).ok_or_else(|| {
            EngineError::Storage(format!("Contract {} not found", update.contract_id))
        })?;

        contract.late_fee_amount = &contract.late_fee_amount + &update.late_fee_delta;
        contract.days_overdue = update.days_overdue;
        contract.status = update.status;
        contract.updated_at = Utc::now().naive_utc();
        drop(contracts);

        self.contract_updates.write().unwrap().push(update.clone());
        Ok(())
    }

    async fn record_waiver(&mut self, audit: &WaiverAudit) -> EngineResult<()> {
        self.waivers.write().unwrap().push(audit.clone());
        Ok(())
    }
}
