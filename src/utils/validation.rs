//! Validation utilities

use bigdecimal::BigDecimal;

use crate::types::{EngineError, EngineResult};

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> EngineResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(EngineError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a waiver reason is usable for the audit trail
pub fn validate_waiver_reason(reason: &str) -> EngineResult<()> {
    if reason.trim().is_empty() {
        return Err(EngineError::Policy(
            "Waiver reason cannot be empty".to_string(),
        ));
    }

    if reason.len() > 500 {
        return Err(EngineError::Policy(
            "Waiver reason cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}
