//! Tiered late-fee policies and calculation

pub mod calculator;
pub mod policy;

pub use calculator::{FeeCalculation, FeeRequest};
pub use policy::{EscalationTier, FeePolicy, WaiverRules};
