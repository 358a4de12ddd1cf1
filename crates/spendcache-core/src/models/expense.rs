use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Date-only representation used on the wire.
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    // Older records may lack an owner; an empty id means "unknown"
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(with = "wire::amount")]
    pub amount: BigDecimal,
    #[serde(with = "wire::date")]
    pub date: NaiveDate,
    #[serde(rename = "createdAt", with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /expenses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewExpense {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub title: String,
    #[serde(with = "wire::amount")]
    pub amount: BigDecimal,
    #[serde(with = "wire::date")]
    pub date: NaiveDate,
    #[serde(rename = "createdAt", with = "wire::timestamp")]
    pub created_at: DateTime<Utc>,
}

/// User-entered fields for a new expense, checked before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub title: String,
    pub amount: BigDecimal,
    pub date: NaiveDate,
}

impl ExpenseDraft {
    pub fn new(
        title: impl Into<String>,
        amount: BigDecimal,
        date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if !fits_wire_number(&amount) {
            return Err(ValidationError::InvalidAmount(amount.to_string()));
        }
        Ok(Self { title, amount, date })
    }

    /// Build a draft from raw form input.
    pub fn parse(title: &str, amount: &str, date: &str) -> Result<Self, ValidationError> {
        let amount =
            parse_amount(amount).ok_or_else(|| ValidationError::InvalidAmount(amount.to_string()))?;
        let date = parse_wire_date(date.trim())
            .ok_or_else(|| ValidationError::InvalidDate(date.to_string()))?;
        Self::new(title, amount, date)
    }

    pub fn into_new_expense(self, user_id: &str, created_at: DateTime<Utc>) -> NewExpense {
        NewExpense {
            user_id: user_id.to_string(),
            title: self.title,
            amount: self.amount,
            date: self.date,
            created_at,
        }
    }
}

/// Parse a decimal amount. Rejects empty, non-numeric and non-finite input.
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    BigDecimal::from_str(trimmed)
        .ok()
        .filter(|amount| amount.to_f64().is_some_and(f64::is_finite))
}

/// Amounts are posted as JSON numbers (`f64`); only values that survive
/// that conversion unchanged can be submitted.
fn fits_wire_number(amount: &BigDecimal) -> bool {
    amount
        .to_f64()
        .filter(|value| value.is_finite())
        .and_then(|value| BigDecimal::from_str(&value.to_string()).ok())
        .is_some_and(|back| back == *amount)
}

/// Parse a date as sent by the store: either `YYYY-MM-DD` or a full
/// RFC 3339 timestamp, whose UTC calendar day is taken.
pub fn parse_wire_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, WIRE_DATE_FORMAT) {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range exists only when both bounds are given; a lone bound means no filtering.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Some(Self::new(start, end)),
            _ => None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Keep the expenses dated inside `range`, preserving order.
pub fn filter_by_date(expenses: &[Expense], range: Option<DateRange>) -> Vec<Expense> {
    match range {
        Some(range) => expenses
            .iter()
            .filter(|e| range.contains(e.date))
            .cloned()
            .collect(),
        None => expenses.to_vec(),
    }
}

pub fn total_amount(expenses: &[Expense]) -> BigDecimal {
    expenses
        .iter()
        .fold(BigDecimal::from(0), |sum, e| sum + &e.amount)
}

/// Serde adapters that coerce the loosely typed JSON the store returns.
mod wire {
    use super::*;
    use serde::de::Error as _;
    use serde::{Deserializer, Serializer};
    use serde_json::Value;

    pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!(
                "expected string or number id, got {}",
                other
            ))),
        }
    }

    /// Amounts go out as JSON numbers, so the serialized value is the
    /// nearest `f64`. Drafts reject amounts that would change in transit.
    pub mod amount {
        use super::*;
        use serde::ser::Error as _;

        pub fn serialize<S>(amount: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let number: serde_json::Number = amount
                .to_string()
                .parse()
                .map_err(|e| S::Error::custom(format!("amount {} not representable: {}", amount, e)))?;
            number.serialize(serializer)
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = match Value::deserialize(deserializer)? {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s,
                other => {
                    return Err(D::Error::custom(format!("expected numeric amount, got {}", other)))
                }
            };
            parse_amount(&raw).ok_or_else(|| D::Error::custom(format!("invalid amount: {}", raw)))
        }
    }

    pub mod date {
        use super::*;

        pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_str(&date.format(WIRE_DATE_FORMAT))
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = String::deserialize(deserializer)?;
            parse_wire_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw)))
        }
    }

    pub mod timestamp {
        use super::*;
        use chrono::SecondsFormat;

        pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = String::deserialize(deserializer)?;
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| D::Error::custom(format!("invalid timestamp {}: {}", raw, e)))
        }
    }
}
