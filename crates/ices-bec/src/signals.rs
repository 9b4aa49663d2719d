//! Regex-only content-signal scan. Zero-cost relative to the NLP step and
//! run unconditionally, since its weights feed directly (undampened) into
//! the composite risk score regardless of whether a classifier is available.

use std::sync::OnceLock;

use regex::Regex;

const URGENCY_PHRASES: &[&str] = &[
    "urgent",
    "immediately",
    "as soon as possible",
    "asap",
    "right away",
    "time sensitive",
    "time-sensitive",
    "act now",
    "before end of day",
    "deadline",
    "expires today",
    "final notice",
    "last chance",
    "respond immediately",
    "without delay",
    "critical priority",
    "emergency",
];

const PAYMENT_PHRASES: &[&str] = &[
    "wire transfer",
    "bank transfer",
    "outstanding balance",
    "remit payment",
    "account number",
    "routing number",
    "swift code",
    "iban",
    "payment details",
    "update banking information",
    "update payment information",
    "direct deposit",
    "funds transfer",
    "purchase order",
    "gift card",
    "invoice attached",
];

const CREDENTIAL_PHRASES: &[&str] = &[
    "verify your account",
    "confirm your identity",
    "login credentials",
    "reset your password",
    "click here to sign in",
    "account suspended",
    "security alert",
    "unusual sign-in activity",
    "two-factor",
    "verification code",
    "update your credentials",
    "confirm your password",
];

const PII_PHRASES: &[&str] = &[
    "social security number",
    "date of birth",
    "passport number",
    "driver's license",
    "tax id",
    "employee id",
    "home address",
    "bank account number",
    "credit card number",
    "personal information",
    "mother's maiden name",
];

const FORMAL_MARKERS: &[&str] =
    &["please find attached", "kind regards", "sincerely", "dear sir", "dear madam", "to whom it may concern", "best regards", "yours faithfully", "respectfully"];

const INFORMAL_MARKERS: &[&str] = &[
    "hey", "hi there", "thanks!", "cheers", "lol", "btw", "gonna", "wanna", "yeah", "omg", "haha", "no worries", "catch you later", "asap!!",
];

fn count_hits(text: &str, phrases: &[&str]) -> usize {
    let lower = text.to_ascii_lowercase();
    phrases.iter().filter(|p| lower.contains(*p)).count()
}

fn routing_pattern() -> &'static Regex {
    static P: OnceLock<Regex> = OnceLock::new();
    P.get_or_init(|| Regex::new(r"(?i)(?:routing|aba|transit)\D{0,15}(\d{9})").expect("static pattern compiles"))
}

fn account_pattern() -> &'static Regex {
    static P: OnceLock<Regex> = OnceLock::new();
    P.get_or_init(|| Regex::new(r"(?i)(?:account|acct)\D{0,15}(\d{8,17})").expect("static pattern compiles"))
}

fn bank_name_pattern() -> &'static Regex {
    static P: OnceLock<Regex> = OnceLock::new();
    P.get_or_init(|| Regex::new(r"(?i)bank[:\s]+([A-Z][A-Za-z\s&'.]{2,30})").expect("static pattern compiles"))
}

#[derive(Debug, Clone)]
pub struct ContentSignals {
    pub has_financial_entities: bool,
    pub has_payment_instructions: bool,
    pub has_urgency_language: bool,
    pub has_credential_request: bool,
    pub has_personal_info_request: bool,
    pub urgency_score: u32,
    pub formality_score: u32,
    pub financial_entities: Vec<String>,
}

#[must_use]
pub fn scan(text: &str) -> ContentSignals {
    let urgency_hits = count_hits(text, URGENCY_PHRASES);
    let payment_hits = count_hits(text, PAYMENT_PHRASES);
    let credential_hits = count_hits(text, CREDENTIAL_PHRASES);
    let pii_hits = count_hits(text, PII_PHRASES);

    let mut financial_entities: Vec<String> = Vec::new();
    financial_entities.extend(routing_pattern().captures_iter(text).map(|c| c[1].to_string()));
    financial_entities.extend(account_pattern().captures_iter(text).map(|c| c[1].to_string()));
    financial_entities.extend(bank_name_pattern().captures_iter(text).map(|c| c[1].trim().to_string()));

    let formal_hits = count_hits(text, FORMAL_MARKERS);
    let informal_hits = count_hits(text, INFORMAL_MARKERS);
    let formality_score = if formal_hits + informal_hits == 0 {
        50
    } else {
        ((formal_hits as f64 / (formal_hits + informal_hits) as f64) * 100.0).round() as u32
    };

    ContentSignals {
        has_financial_entities: !financial_entities.is_empty(),
        has_payment_instructions: payment_hits > 0,
        has_urgency_language: urgency_hits > 0,
        has_credential_request: credential_hits > 0,
        has_personal_info_request: pii_hits > 0,
        urgency_score: (urgency_hits * 20).min(100) as u32,
        formality_score,
        financial_entities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_score_caps_at_100() {
        let text = "urgent immediately asap right away time sensitive act now before end of day";
        let signals = scan(text);
        assert_eq!(signals.urgency_score, 100);
        assert!(signals.has_urgency_language);
    }

    #[test]
    fn extracts_routing_and_account_numbers() {
        let text = "Please use routing number 123456789 and account number 00123456789";
        let signals = scan(text);
        assert!(signals.has_financial_entities);
        assert!(signals.financial_entities.iter().any(|e| e == "123456789"));
    }

    #[test]
    fn neutral_formality_when_no_markers_present() {
        let signals = scan("The quarterly numbers are attached for review.");
        assert_eq!(signals.formality_score, 50);
    }

    #[test]
    fn formal_markers_push_score_high() {
        let signals = scan("Dear Sir, please find attached the report. Kind regards, Sincerely, Best regards.");
        assert!(signals.formality_score > 50);
    }
}
