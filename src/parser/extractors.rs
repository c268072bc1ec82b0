//! Field extractors for payment description text
//!
//! Each extractor owns one field and one set of patterns. Descriptions are
//! written in English or Arabic, so the keyword catalogs carry both
//! languages. Matching is case-insensitive but captures keep the original
//! casing of the text.

use bigdecimal::BigDecimal;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

use crate::types::{BillingPeriod, FieldTag, PaymentKind};

/// A field pulled out of a payment description
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedField {
    ContractNumber(String),
    AgreementNumber(String),
    CustomerName(String),
    Period(BillingPeriod),
    PaymentType(PaymentKind),
    LateFeeAmount(BigDecimal),
    DaysOverdue(u32),
    Reference(String),
}

impl ExtractedField {
    /// Tag recorded in the parsed result's matched-pattern list
    pub fn tag(&self) -> FieldTag {
        match self {
            ExtractedField::ContractNumber(_) => FieldTag::ContractNumber,
            ExtractedField::AgreementNumber(_) => FieldTag::AgreementNumber,
            ExtractedField::CustomerName(_) => FieldTag::CustomerName,
            ExtractedField::Period(_) => FieldTag::Period,
            ExtractedField::PaymentType(_) => FieldTag::PaymentType,
            ExtractedField::LateFeeAmount(_) => FieldTag::LateFeeAmount,
            ExtractedField::DaysOverdue(_) => FieldTag::DaysOverdue,
            ExtractedField::Reference(_) => FieldTag::Reference,
        }
    }

    /// Confidence points this field contributes to the parse score
    pub fn confidence_points(&self) -> u8 {
        match self {
            ExtractedField::ContractNumber(_) => 25,
            ExtractedField::AgreementNumber(_) => 30,
            ExtractedField::CustomerName(_) => 20,
            ExtractedField::Period(_) => 15,
            ExtractedField::PaymentType(PaymentKind::Rent) => 25,
            ExtractedField::PaymentType(PaymentKind::LateFee) => 25,
            ExtractedField::PaymentType(PaymentKind::Advance) => 20,
            ExtractedField::PaymentType(PaymentKind::Other) => 0,
            ExtractedField::LateFeeAmount(_) => 20,
            ExtractedField::DaysOverdue(_) => 15,
            ExtractedField::Reference(_) => 10,
        }
    }
}

/// One pluggable extraction step of the description parser
///
/// Implementations must be pure and side-effect free; the parser runs a
/// fixed catalog of them in order and takes at most one field from each.
pub trait FieldExtractor: Send + Sync {
    /// The field this extractor is responsible for
    fn field(&self) -> FieldTag;

    /// Extract the field from the description, if present
    fn extract(&self, text: &str) -> Option<ExtractedField>;
}

// 1-6 digit token next to a contract keyword, keyword on either side.
static CONTRACT_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:contract|agreement|rent|عقد|اتفاقية|ايجار|إيجار)\b(?:\s*(?:no|number|num)\.?)?[\s#:.]*([0-9]{1,6})(?:[^0-9]|$)",
    )
    .unwrap()
});

static NUMBER_BEFORE_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9])([0-9]{1,6})\s*(?:rent|contract|عقد|إيجار|ايجار|رنت)\b").unwrap()
});

/// Extracts the contract number referenced by the description
pub struct ContractNumberExtractor;

impl FieldExtractor for ContractNumberExtractor {
    fn field(&self) -> FieldTag {
        FieldTag::ContractNumber
    }

    fn extract(&self, text: &str) -> Option<ExtractedField> {
        let captures = CONTRACT_KEYWORD_RE
            .captures(text)
            .or_else(|| NUMBER_BEFORE_KEYWORD_RE.captures(text))?;
        let number = captures.get(1)?.as_str().to_string();
        Some(ExtractedField::ContractNumber(number))
    }
}

// Agreement registrations carry 7+ digit numbers; shorter tokens belong to
// the contract-number extractor.
static AGREEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:agreement|lto|اتفاقية)(?:\s*(?:no|number|num)\.?)?[\s#:.]*([0-9]{7,})")
        .unwrap()
});

/// Extracts the upstream agreement number
pub struct AgreementNumberExtractor;

impl FieldExtractor for AgreementNumberExtractor {
    fn field(&self) -> FieldTag {
        FieldTag::AgreementNumber
    }

    fn extract(&self, text: &str) -> Option<ExtractedField> {
        let captures = AGREEMENT_RE.captures(text)?;
        let number = captures.get(1)?.as_str().to_string();
        Some(ExtractedField::AgreementNumber(number))
    }
}

/// Matches known customer names as substrings of the description
///
/// The dictionary is supplied by the caller, usually from the tenant's
/// customer registry; with an empty dictionary this extractor never matches.
pub struct CustomerNameExtractor {
    names: Vec<String>,
}

impl CustomerNameExtractor {
    pub fn new(names: Vec<String>) -> Self {
        let names = names
            .into_iter()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }
}

impl FieldExtractor for CustomerNameExtractor {
    fn field(&self) -> FieldTag {
        FieldTag::CustomerName
    }

    fn extract(&self, text: &str) -> Option<ExtractedField> {
        let lowered = text.to_lowercase();
        self.names
            .iter()
            .find(|name| lowered.contains(name.as_str()))
            .map(|name| ExtractedField::CustomerName(name.clone()))
    }
}

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec|يناير|فبراير|مارس|أبريل|ابريل|مايو|يونيو|يوليو|أغسطس|اغسطس|سبتمبر|أكتوبر|اكتوبر|نوفمبر|ديسمبر)\.?\s+([0-9]{4})\b",
    )
    .unwrap()
});

fn month_number(name: &str) -> Option<u32> {
    match name {
        "january" | "jan" | "يناير" => Some(1),
        "february" | "feb" | "فبراير" => Some(2),
        "march" | "mar" | "مارس" => Some(3),
        "april" | "apr" | "أبريل" | "ابريل" => Some(4),
        "may" | "مايو" => Some(5),
        "june" | "jun" | "يونيو" => Some(6),
        "july" | "jul" | "يوليو" => Some(7),
        "august" | "aug" | "أغسطس" | "اغسطس" => Some(8),
        "september" | "sept" | "sep" | "سبتمبر" => Some(9),
        "october" | "oct" | "أكتوبر" | "اكتوبر" => Some(10),
        "november" | "nov" | "نوفمبر" => Some(11),
        "december" | "dec" | "ديسمبر" => Some(12),
        _ => None,
    }
}

/// Extracts the billing period from a month-name plus 4-digit year
pub struct PeriodExtractor;

impl FieldExtractor for PeriodExtractor {
    fn field(&self) -> FieldTag {
        FieldTag::Period
    }

    fn extract(&self, text: &str) -> Option<ExtractedField> {
        let captures = PERIOD_RE.captures(text)?;
        let month = month_number(&captures.get(1)?.as_str().to_lowercase())?;
        let year = captures.get(2)?.as_str().parse::<i32>().ok()?;
        Some(ExtractedField::Period(BillingPeriod::new(year, month)))
    }
}

static RENT_KEYWORDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:rental|rent|إيجار|ايجار|رنت)\b").unwrap());

static LATE_FEE_KEYWORDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:late\s*fees?|late\s*fines?|penalt(?:y|ies)|غرامة|غرامات)\b").unwrap()
});

static ADVANCE_KEYWORDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:advance|deposit|مقدم|مقدمة|عربون)\b").unwrap());

/// Classifies the payment into exactly one kind by keyword group
///
/// Groups are checked in a fixed order (rent, then late fee, then advance);
/// the first group with a hit decides. No hit means [`PaymentKind::Other`]
/// and no extracted field.
pub struct PaymentTypeExtractor;

impl FieldExtractor for PaymentTypeExtractor {
    fn field(&self) -> FieldTag {
        FieldTag::PaymentType
    }

    fn extract(&self, text: &str) -> Option<ExtractedField> {
        if RENT_KEYWORDS_RE.is_match(text) {
            Some(ExtractedField::PaymentType(PaymentKind::Rent))
        } else if LATE_FEE_KEYWORDS_RE.is_match(text) {
            Some(ExtractedField::PaymentType(PaymentKind::LateFee))
        } else if ADVANCE_KEYWORDS_RE.is_match(text) {
            Some(ExtractedField::PaymentType(PaymentKind::Advance))
        } else {
            None
        }
    }
}

static LATE_FEE_AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:late\s*fees?|late\s*fines?|penalt(?:y|ies)|غرامة(?:\s*(?:ال)?تأخير)?)\b\s*(?:of|amount|بمبلغ|قدرها)?[\s:]*([0-9]+(?:\.[0-9]+)?)",
    )
    .unwrap()
});

/// Extracts a fee amount that follows a late-fee keyword
pub struct LateFeeAmountExtractor;

impl FieldExtractor for LateFeeAmountExtractor {
    fn field(&self) -> FieldTag {
        FieldTag::LateFeeAmount
    }

    fn extract(&self, text: &str) -> Option<ExtractedField> {
        let captures = LATE_FEE_AMOUNT_RE.captures(text)?;
        let amount = BigDecimal::from_str(captures.get(1)?.as_str()).ok()?;
        Some(ExtractedField::LateFeeAmount(amount))
    }
}

static DAYS_OVERDUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b([0-9]{1,4})\s*(?:days?|يوم|أيام|ايام)\s*(?:overdue|late|delay(?:ed)?|متأخرة?|تأخير)\b",
    )
    .unwrap()
});

static DAYS_OVERDUE_ARABIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"متأخرة?\s*([0-9]{1,4})\s*(?:يوم|أيام|ايام)").unwrap());

/// Extracts a day count from an overdue/late phrase
pub struct DaysOverdueExtractor;

impl FieldExtractor for DaysOverdueExtractor {
    fn field(&self) -> FieldTag {
        FieldTag::DaysOverdue
    }

    fn extract(&self, text: &str) -> Option<ExtractedField> {
        let captures = DAYS_OVERDUE_RE
            .captures(text)
            .or_else(|| DAYS_OVERDUE_ARABIC_RE.captures(text))?;
        let days = captures.get(1)?.as_str().parse::<u32>().ok()?;
        Some(ExtractedField::DaysOverdue(days))
    }
}

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:reference|ref|مرجع)\b[\s#:.]*([A-Za-z0-9][A-Za-z0-9\-/]*)").unwrap()
});

/// Extracts a reference token following a ref/reference keyword
pub struct ReferenceExtractor;

impl FieldExtractor for ReferenceExtractor {
    fn field(&self) -> FieldTag {
        FieldTag::Reference
    }

    fn extract(&self, text: &str) -> Option<ExtractedField> {
        let captures = REFERENCE_RE.captures(text)?;
        let token = captures.get(1)?.as_str().to_string();
        Some(ExtractedField::Reference(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_number_near_keyword() {
        let extracted = ContractNumberExtractor.extract("Payment for contract #4521 received");
        assert_eq!(
            extracted,
            Some(ExtractedField::ContractNumber("4521".to_string()))
        );
    }

    #[test]
    fn test_contract_number_before_keyword() {
        let extracted = ContractNumberExtractor.extract("4521 rent for the month");
        assert_eq!(
            extracted,
            Some(ExtractedField::ContractNumber("4521".to_string()))
        );
    }

    #[test]
    fn test_contract_number_rejects_long_tokens() {
        // 7+ digit tokens are agreement numbers, not contract numbers
        assert_eq!(ContractNumberExtractor.extract("contract 1234567"), None);
    }

    #[test]
    fn test_agreement_number_requires_seven_digits() {
        assert_eq!(AgreementNumberExtractor.extract("agreement 4521"), None);
        assert_eq!(
            AgreementNumberExtractor.extract("agreement no. 55123456"),
            Some(ExtractedField::AgreementNumber("55123456".to_string()))
        );
    }

    #[test]
    fn test_agreement_number_lto_prefix() {
        assert_eq!(
            AgreementNumberExtractor.extract("LTO9912345 settlement"),
            Some(ExtractedField::AgreementNumber("9912345".to_string()))
        );
    }

    #[test]
    fn test_period_arabic_month() {
        assert_eq!(
            PeriodExtractor.extract("دفعة شهر مارس 2024"),
            Some(ExtractedField::Period(BillingPeriod::new(2024, 3)))
        );
    }

    #[test]
    fn test_payment_type_group_order() {
        // rent wins over late fee when both keyword groups appear
        assert_eq!(
            PaymentTypeExtractor.extract("late fee on rent for unit 7"),
            Some(ExtractedField::PaymentType(PaymentKind::Rent))
        );
        assert_eq!(
            PaymentTypeExtractor.extract("penalty charge"),
            Some(ExtractedField::PaymentType(PaymentKind::LateFee))
        );
        assert_eq!(
            PaymentTypeExtractor.extract("security deposit"),
            Some(ExtractedField::PaymentType(PaymentKind::Advance))
        );
        assert_eq!(PaymentTypeExtractor.extract("miscellaneous charge"), None);
    }

    #[test]
    fn test_days_overdue_arabic_order() {
        assert_eq!(
            DaysOverdueExtractor.extract("الدفعة متأخرة 15 يوم"),
            Some(ExtractedField::DaysOverdue(15))
        );
    }

    #[test]
    fn test_reference_ignores_similar_words() {
        assert_eq!(ReferenceExtractor.extract("refund of 50"), None);
        assert_eq!(
            ReferenceExtractor.extract("wire ref REF9981"),
            Some(ExtractedField::Reference("REF9981".to_string()))
        );
    }
}
