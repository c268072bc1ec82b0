//! Free-text payment description parsing
//!
//! Payment memos arrive as unstructured text ("Rent payment contract #4521
//! for March 2024, ref REF9981"). The parser runs a fixed, ordered catalog
//! of [`FieldExtractor`]s over the text and folds their hits into a
//! [`ParsedDescription`] with a 0-100 confidence score. Parsing never fails:
//! garbage in means confidence 0 out.

pub mod extractors;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{BillingPeriod, FieldTag, PaymentKind};

pub use extractors::{
    AgreementNumberExtractor, ContractNumberExtractor, CustomerNameExtractor, DaysOverdueExtractor,
    ExtractedField, FieldExtractor, LateFeeAmountExtractor, PaymentTypeExtractor, PeriodExtractor,
    ReferenceExtractor,
};

/// Bonus added once at least three distinct fields matched
const BONUS_THREE_FIELDS: u32 = 10;
/// Further bonus once at least five distinct fields matched
const BONUS_FIVE_FIELDS: u32 = 15;

/// Structured extraction from one payment description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDescription {
    /// Contract number referenced in the text
    pub contract_number: Option<String>,
    /// Agreement number referenced in the text
    pub agreement_number: Option<String>,
    /// Customer name hint, normalized to the dictionary form
    pub customer_hint: Option<String>,
    /// Billing month referenced in the text
    pub period: Option<BillingPeriod>,
    /// Payment classification; [`PaymentKind::Other`] when no group matched
    pub payment_kind: PaymentKind,
    /// Fee amount mentioned next to a late-fee keyword
    pub late_fee_hint: Option<BigDecimal>,
    /// Day count mentioned in an overdue phrase
    pub days_overdue_hint: Option<u32>,
    /// Reference token from the text
    pub reference: Option<String>,
    /// Payment amount carried over from the source row, not extracted
    pub amount: Option<BigDecimal>,
    /// 0-100 estimate of parse correctness
    pub confidence: u8,
    /// Tags of the fields that matched, in catalog order
    pub matched_fields: Vec<FieldTag>,
}

impl ParsedDescription {
    /// Attach the payment row's amount so matchers can score against it
    pub fn with_amount(mut self, amount: BigDecimal) -> Self {
        self.amount = Some(amount);
        self
    }

    fn absorb(&mut self, field: ExtractedField) {
        let tag = field.tag();
        match field {
            ExtractedField::ContractNumber(number) => self.contract_number = Some(number),
            ExtractedField::AgreementNumber(number) => self.agreement_number = Some(number),
            ExtractedField::CustomerName(name) => self.customer_hint = Some(name),
            ExtractedField::Period(period) => self.period = Some(period),
            ExtractedField::PaymentType(kind) => self.payment_kind = kind,
            ExtractedField::LateFeeAmount(amount) => self.late_fee_hint = Some(amount),
            ExtractedField::DaysOverdue(days) => self.days_overdue_hint = Some(days),
            ExtractedField::Reference(token) => self.reference = Some(token),
        }
        self.matched_fields.push(tag);
    }
}

/// Parser running the extractor catalog over payment descriptions
pub struct DescriptionParser {
    extractors: Vec<Box<dyn FieldExtractor>>,
}

impl DescriptionParser {
    /// Create a parser with the standard catalog and no customer dictionary
    pub fn new() -> Self {
        Self::with_customer_names(Vec::new())
    }

    /// Create a parser whose customer-name extractor knows the given names
    pub fn with_customer_names(names: Vec<String>) -> Self {
        let extractors: Vec<Box<dyn FieldExtractor>> = vec![
            Box::new(ContractNumberExtractor),
            Box::new(AgreementNumberExtractor),
            Box::new(CustomerNameExtractor::new(names)),
            Box::new(PeriodExtractor),
            Box::new(PaymentTypeExtractor),
            Box::new(LateFeeAmountExtractor),
            Box::new(DaysOverdueExtractor),
            Box::new(ReferenceExtractor),
        ];
        Self { extractors }
    }

    /// Create a parser with a custom extractor catalog
    pub fn with_extractors(extractors: Vec<Box<dyn FieldExtractor>>) -> Self {
        Self { extractors }
    }

    /// Parse a payment description into structured fields
    ///
    /// Never fails. Empty or unrecognizable text yields an empty result with
    /// confidence 0. Each extractor contributes at most one field; distinct
    /// field counts of 3 and 5 earn confidence bonuses; the total is clamped
    /// to 100.
    pub fn parse(&self, text: &str) -> ParsedDescription {
        let mut parsed = ParsedDescription::default();
        if text.trim().is_empty() {
            return parsed;
        }

        let mut points: u32 = 0;
        for extractor in &self.extractors {
            if let Some(field) = extractor.extract(text) {
                if parsed.matched_fields.contains(&field.tag()) {
                    continue;
                }
                points += u32::from(field.confidence_points());
                parsed.absorb(field);
            }
        }

        let distinct = parsed.matched_fields.len();
        if distinct >= 3 {
            points += BONUS_THREE_FIELDS;
        }
        if distinct >= 5 {
            points += BONUS_FIVE_FIELDS;
        }

        parsed.confidence = points.min(100) as u8;
        parsed
    }
}

impl Default for DescriptionParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_rent_payment_description() {
        let parser = DescriptionParser::new();
        let parsed = parser.parse("Rent payment contract #4521 for March 2024, ref REF9981");

        assert_eq!(parsed.contract_number.as_deref(), Some("4521"));
        assert_eq!(parsed.payment_kind, PaymentKind::Rent);
        assert_eq!(parsed.period, Some(BillingPeriod::new(2024, 3)));
        assert_eq!(parsed.reference.as_deref(), Some("REF9981"));
        assert_eq!(parsed.matched_fields.len(), 4);
        // 25 + 15 + 25 + 10 field points, plus the three-field bonus
        assert_eq!(parsed.confidence, 85);
    }

    #[test]
    fn test_parse_empty_and_garbage_text() {
        let parser = DescriptionParser::new();

        let empty = parser.parse("");
        assert_eq!(empty.confidence, 0);
        assert!(empty.matched_fields.is_empty());
        assert_eq!(empty.payment_kind, PaymentKind::Other);

        let garbage = parser.parse("zzz qqq 777777777777");
        assert_eq!(garbage.confidence, 0);
        assert!(garbage.contract_number.is_none());
    }

    #[test]
    fn test_confidence_clamped_at_exactly_100() {
        let parser = DescriptionParser::with_customer_names(vec!["Acme Holdings".to_string()]);
        let parsed = parser.parse(
            "Rent contract 4521 agreement 55123456 Acme Holdings March 2024 \
             late fee 250 15 days overdue ref LF-2024",
        );

        assert_eq!(parsed.matched_fields.len(), 8);
        assert_eq!(parsed.confidence, 100);
        assert_eq!(parsed.contract_number.as_deref(), Some("4521"));
        assert_eq!(parsed.agreement_number.as_deref(), Some("55123456"));
        assert_eq!(parsed.customer_hint.as_deref(), Some("acme holdings"));
        assert_eq!(parsed.days_overdue_hint, Some(15));
    }

    #[test]
    fn test_parse_arabic_description() {
        let parser = DescriptionParser::new();
        let parsed = parser.parse("دفعة إيجار عقد 88 شهر مارس 2024");

        assert_eq!(parsed.contract_number.as_deref(), Some("88"));
        assert_eq!(parsed.payment_kind, PaymentKind::Rent);
        assert_eq!(parsed.period, Some(BillingPeriod::new(2024, 3)));
        // 25 + 25 + 15 field points, plus the three-field bonus
        assert_eq!(parsed.confidence, 75);
    }

    #[test]
    fn test_parse_late_fee_hints() {
        let parser = DescriptionParser::new();
        let parsed = parser.parse("Late fee of 250.500 charged, 12 days late");

        assert_eq!(parsed.payment_kind, PaymentKind::LateFee);
        assert_eq!(
            parsed.late_fee_hint,
            Some(BigDecimal::from_str("250.500").unwrap())
        );
        assert_eq!(parsed.days_overdue_hint, Some(12));
        // 25 + 20 + 15 field points, plus the three-field bonus
        assert_eq!(parsed.confidence, 70);
    }

    #[test]
    fn test_first_match_per_field_wins() {
        let parser = DescriptionParser::new();
        let parsed = parser.parse("contract 111 superseding contract 222");
        assert_eq!(parsed.contract_number.as_deref(), Some("111"));
    }

    #[test]
    fn test_confidence_monotone_in_matched_fields() {
        let parser = DescriptionParser::new();
        let one = parser.parse("contract 4521");
        let two = parser.parse("rent contract 4521");
        let three = parser.parse("rent contract 4521 ref A1");
        assert!(one.confidence < two.confidence);
        assert!(two.confidence < three.confidence);
    }

    #[test]
    fn test_amount_is_carried_not_extracted() {
        let parser = DescriptionParser::new();
        let parsed = parser.parse("rent contract 4521 for 900 dinars");
        assert_eq!(parsed.amount, None);

        let with_amount = parsed.with_amount(BigDecimal::from(900));
        assert_eq!(with_amount.amount, Some(BigDecimal::from(900)));
    }
}
