use super::expense::NewExpense;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A positive monetary amount entered by the user.
///
/// Keeps the scale the user typed, so `150.50` stays `150.50` when it is
/// written into the handoff URI.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidAmount)
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !is_plain_decimal(trimmed) {
            return Err(ValidationError::InvalidAmount);
        }
        let value = Decimal::from_str(trimmed).map_err(|_| ValidationError::InvalidAmount)?;
        Self::new(value)
    }
}

/// Digits with at most one fractional part, as typed into a numeric field.
/// `Decimal::from_str` alone would also take underscores and exponents.
fn is_plain_decimal(s: &str) -> bool {
    let digits = s.strip_prefix('+').unwrap_or(s);
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    match digits.split_once('.') {
        Some((whole, fraction)) => all_digits(whole) && all_digits(fraction),
        None => all_digits(digits),
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Amount is compulsory and must be a positive number")]
    InvalidAmount,
    #[error("Please select a tag")]
    MissingTag,
}

/// Every check that failed for one submission of the details form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe(.issues))]
pub struct ValidationFailure {
    issues: Vec<ValidationError>,
}

fn describe(issues: &[ValidationError]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationFailure {
    pub fn issues(&self) -> &[ValidationError] {
        &self.issues
    }

    pub fn contains(&self, issue: ValidationError) -> bool {
        self.issues.contains(&issue)
    }
}

/// The payment the user is about to make, held until confirmed or discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub raw_payload: String,
    pub amount: Amount,
    pub note: String,
    pub tag: String,
}

/// A validated payment plus the deep link that hands it to the payment app.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    pub payment: PendingPayment,
    pub handoff_uri: String,
}

/// Validates the details form and builds the handoff request.
#[derive(Debug, Default, Clone, Copy)]
pub struct PaymentIntentBuilder;

impl PaymentIntentBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Amount and tag are checked independently; when both are wrong the
    /// failure lists both.
    pub fn build(
        &self,
        payload: &str,
        amount: &str,
        tag: Option<&str>,
        note: &str,
    ) -> Result<PaymentIntent, ValidationFailure> {
        let (amount, tag) = validate_fields(amount, tag)?;
        let handoff_uri = handoff_uri(payload, &amount, note);
        Ok(PaymentIntent {
            payment: PendingPayment {
                raw_payload: payload.to_string(),
                amount,
                note: note.trim().to_string(),
                tag: tag.to_string(),
            },
            handoff_uri,
        })
    }
}

fn validate_fields<'a>(
    amount: &str,
    tag: Option<&'a str>,
) -> Result<(Amount, &'a str), ValidationFailure> {
    let mut issues = Vec::new();

    let amount = match amount.parse::<Amount>() {
        Ok(amount) => Some(amount),
        Err(issue) => {
            issues.push(issue);
            None
        }
    };

    let tag = match tag.map(str::trim) {
        Some(tag) if !tag.is_empty() => Some(tag),
        _ => {
            issues.push(ValidationError::MissingTag);
            None
        }
    };

    match (amount, tag) {
        (Some(amount), Some(tag)) => Ok((amount, tag)),
        _ => Err(ValidationFailure { issues }),
    }
}

/// Validates the manual-entry form into an expense dated `date`.
///
/// Same checks as the scan form; the note is stored trimmed.
pub fn manual_expense(
    amount: &str,
    tag: Option<&str>,
    note: &str,
    date: DateTime<Utc>,
) -> Result<NewExpense, ValidationFailure> {
    let (amount, tag) = validate_fields(amount, tag)?;
    Ok(NewExpense {
        amount: amount.value(),
        note: note.trim().to_string(),
        tag: tag.to_string(),
        date,
    })
}

/// Appends `am` then `tn` to the scanned payload, keeping its own parameters.
pub fn handoff_uri(payload: &str, amount: &Amount, note: &str) -> String {
    let separator = if payload.ends_with('?') || payload.ends_with('&') {
        ""
    } else if payload.contains('?') {
        "&"
    } else {
        "?"
    };
    format!(
        "{payload}{separator}am={amount}&tn={}",
        urlencoding::encode(note)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert_eq!(Amount::new(dec!(0.0)), Err(ValidationError::InvalidAmount));
        assert_eq!(Amount::new(dec!(-1.0)), Err(ValidationError::InvalidAmount));
    }

    #[test]
    fn test_amount_parsing() {
        assert_eq!("150".parse::<Amount>().unwrap().value(), dec!(150));
        assert_eq!(" 12.5 ".parse::<Amount>().unwrap().value(), dec!(12.5));
        assert_eq!("150.50".parse::<Amount>().unwrap().to_string(), "150.50");
        assert_eq!("+7".parse::<Amount>().unwrap().value(), dec!(7));
        for bad in [
            "", "  ", "0", "0.00", "-3", "abc", "1,000", "12abc", "1__0", "1_000", "1e3", "1E2",
            ".5", "5.", "1.2.3", "++1", "١٢",
        ] {
            assert_eq!(
                bad.parse::<Amount>(),
                Err(ValidationError::InvalidAmount),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn test_build_appends_amount_and_empty_note() {
        let intent = PaymentIntentBuilder::new()
            .build("upi://pay?pa=x@bank", "150", Some("Food"), "")
            .unwrap();
        assert_eq!(intent.handoff_uri, "upi://pay?pa=x@bank&am=150&tn=");
        assert_eq!(intent.payment.amount.value(), dec!(150));
        assert_eq!(intent.payment.tag, "Food");
        assert_eq!(intent.payment.note, "");
    }

    #[test]
    fn test_build_encodes_note_and_keeps_existing_params() {
        let intent = PaymentIntentBuilder::new()
            .build(
                "upi://pay?pa=shop@bank&pn=Corner%20Shop&cu=INR",
                "99.90",
                Some("Shopping"),
                " milk & eggs ",
            )
            .unwrap();
        assert_eq!(
            intent.handoff_uri,
            "upi://pay?pa=shop@bank&pn=Corner%20Shop&cu=INR&am=99.90&tn=%20milk%20%26%20eggs%20"
        );
        assert_eq!(intent.payment.note, "milk & eggs");
    }

    #[test]
    fn test_note_reserved_marks_are_percent_encoded() {
        let amount: Amount = "5".parse().unwrap();
        assert_eq!(
            handoff_uri("upi://pay?pa=x", &amount, "tea (2)!*'"),
            "upi://pay?pa=x&am=5&tn=tea%20%282%29%21%2A%27"
        );
    }

    #[test]
    fn test_manual_expense() {
        let date = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let expense = manual_expense(" 42.50 ", Some("Health"), "  pharmacy ", date).unwrap();
        assert_eq!(expense.amount, dec!(42.50));
        assert_eq!(expense.tag, "Health");
        assert_eq!(expense.note, "pharmacy");
        assert_eq!(expense.date, date);

        let failure = manual_expense("1e3", None, "", date).unwrap_err();
        assert_eq!(
            failure.issues(),
            &[ValidationError::InvalidAmount, ValidationError::MissingTag]
        );
    }

    #[test]
    fn test_build_without_query_component() {
        let amount: Amount = "5".parse().unwrap();
        assert_eq!(handoff_uri("upi://pay", &amount, "x"), "upi://pay?am=5&tn=x");
        assert_eq!(handoff_uri("upi://pay?", &amount, ""), "upi://pay?am=5&tn=");
    }

    #[test]
    fn test_build_reports_each_failed_check() {
        let builder = PaymentIntentBuilder::new();

        let err = builder.build("upi://pay?pa=x", "0", Some("Food"), "").unwrap_err();
        assert_eq!(err.issues(), &[ValidationError::InvalidAmount]);

        let err = builder.build("upi://pay?pa=x", "10", None, "").unwrap_err();
        assert_eq!(err.issues(), &[ValidationError::MissingTag]);

        let err = builder.build("upi://pay?pa=x", "10", Some("  "), "").unwrap_err();
        assert_eq!(err.issues(), &[ValidationError::MissingTag]);

        let err = builder.build("upi://pay?pa=x", "", None, "").unwrap_err();
        assert!(err.contains(ValidationError::InvalidAmount));
        assert!(err.contains(ValidationError::MissingTag));
    }

    #[test]
    fn test_build_succeeds_iff_positive_amount_and_tag() {
        let builder = PaymentIntentBuilder::new();
        let amounts = ["-1", "0", "0.01", "1", "abc", "250.75"];
        let tags = [None, Some("Food"), Some("")];
        for amount in amounts {
            for tag in tags {
                let valid_amount = amount.parse::<Amount>().is_ok();
                let valid_tag = tag.is_some_and(|t| !t.is_empty());
                let result = builder.build("upi://pay?pa=x", amount, tag, "n");
                assert_eq!(result.is_ok(), valid_amount && valid_tag, "{amount:?} {tag:?}");
                if let Err(failure) = result {
                    assert_eq!(failure.contains(ValidationError::InvalidAmount), !valid_amount);
                    assert_eq!(failure.contains(ValidationError::MissingTag), !valid_tag);
                }
            }
        }
    }
}
