//! # Reconciliation Core
//!
//! A payment reconciliation library providing free-text description parsing,
//! contract candidate matching, and tiered late-fee calculation.
//!
//! ## Features
//!
//! - **Description parsing**: Bilingual (English/Arabic) keyword extraction with confidence scoring
//! - **Contract matching**: Multi-criteria candidate ranking with explainable score breakdowns
//! - **Late fees**: Grace periods, tier escalation, caps, and policy-gated waivers
//! - **Batch orchestration**: Analyze-then-apply workflow with fail-soft per-item writes
//! - **Overdue assessment**: Portfolio risk ladder from Low to Critical
//! - **Storage abstraction**: Database-agnostic design with trait-based collaborators
//!
//! ## Quick Start
//!
//! ```rust
//! use reconciliation_core::DescriptionParser;
//!
//! let parser = DescriptionParser::new();
//! let parsed = parser.parse("Rent payment contract #4521 for March 2024");
//!
//! assert_eq!(parsed.contract_number.as_deref(), Some("4521"));
//! assert!(parsed.confidence > 0);
//! ```

pub mod engine;
pub mod fees;
pub mod matching;
pub mod parser;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use engine::*;
pub use fees::*;
pub use matching::*;
pub use parser::{DescriptionParser, ParsedDescription};
pub use traits::*;
pub use types::*;
