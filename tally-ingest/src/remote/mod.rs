//! Remote document-understanding collaborator.
//!
//! The service answers with loosely typed entities: a `type` string, the
//! matched `mentionText`, and sometimes a structured `normalizedValue`. The
//! wire shapes are deserialized leniently and then folded into [`Entity`],
//! a closed union over the types this crate consumes. Anything else lands
//! in `Unrecognized` and is ignored downstream.

pub mod document_ai;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tally_core::money::from_units_nanos;

use crate::error::RemoteError;

pub use document_ai::DocumentAiClient;

/// MIME type sent with every statement extraction.
pub const PDF_MIME_TYPE: &str = "application/pdf";

#[async_trait]
pub trait RemoteExtractor: Send + Sync {
    /// Processor identifier reported in telemetry.
    fn processor_id(&self) -> Option<String>;

    async fn extract(&self, bytes: &[u8], document_type: &str) -> Result<RemoteDocument, RemoteError>;
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProcessResponse {
    #[serde(default)]
    pub document: RawDocument,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entities: Vec<RawEntity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntity {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub mention_text: Option<String>,
    #[serde(default)]
    pub normalized_value: Option<RawNormalizedValue>,
    #[serde(default)]
    pub properties: Vec<RawEntity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNormalizedValue {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub money_value: Option<RawMoney>,
    #[serde(default)]
    pub date_value: Option<RawDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMoney {
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub units: Option<Units>,
    #[serde(default)]
    pub nanos: Option<i32>,
}

/// int64 fields arrive as JSON strings from the REST surface, as numbers
/// from some client libraries.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Units {
    Int(i64),
    Str(String),
}

impl Units {
    fn value(&self) -> Option<i64> {
        match self {
            Units::Int(v) => Some(*v),
            Units::Str(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDate {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub day: Option<u32>,
}

// ---------------------------------------------------------------------------
// Typed view
// ---------------------------------------------------------------------------

/// A single value as the service reported it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteValue {
    pub mention: Option<String>,
    pub money: Option<Decimal>,
    /// Structured date, possibly yearless.
    pub date: Option<PartialDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialDate {
    pub year: Option<i32>,
    pub month: u32,
    pub day: u32,
}

impl PartialDate {
    pub fn resolve(&self, fallback_year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year.unwrap_or(fallback_year), self.month, self.day)
    }
}

impl RemoteValue {
    fn from_raw(raw: &RawEntity) -> Self {
        let normalized = raw.normalized_value.as_ref();
        let money = normalized.and_then(|n| n.money_value.as_ref()).and_then(|m| {
            let units = match &m.units {
                Some(u) => u.value()?,
                None => 0,
            };
            Some(from_units_nanos(units, m.nanos.unwrap_or(0)))
        });
        let date = normalized.and_then(|n| n.date_value.as_ref()).and_then(|d| {
            Some(PartialDate {
                year: d.year.filter(|y| *y > 0),
                month: d.month.filter(|m| *m > 0)?,
                day: d.day.filter(|d| *d > 0)?,
            })
        });
        let mention = raw
            .mention_text
            .clone()
            .or_else(|| normalized.and_then(|n| n.text.clone()))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self { mention, money, date }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableProperty {
    Deposit(RemoteValue),
    DepositDate(RemoteValue),
    DepositDescription(RemoteValue),
    Withdrawal(RemoteValue),
    WithdrawalDate(RemoteValue),
    WithdrawalDescription(RemoteValue),
    Unrecognized(String),
}

impl From<&RawEntity> for TableProperty {
    fn from(raw: &RawEntity) -> Self {
        let value = RemoteValue::from_raw(raw);
        match raw.kind.as_str() {
            "table_item/transaction_deposit" => Self::Deposit(value),
            "table_item/transaction_deposit_date" => Self::DepositDate(value),
            "table_item/transaction_deposit_description" => Self::DepositDescription(value),
            "table_item/transaction_withdrawal" => Self::Withdrawal(value),
            "table_item/transaction_withdrawal_date" => Self::WithdrawalDate(value),
            "table_item/transaction_withdrawal_description" => Self::WithdrawalDescription(value),
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    TableItem(Vec<TableProperty>),
    StartingBalance(RemoteValue),
    EndingBalance(RemoteValue),
    StatementStartDate(RemoteValue),
    StatementEndDate(RemoteValue),
    AccountNumber(RemoteValue),
    Unrecognized(String),
}

impl From<&RawEntity> for Entity {
    fn from(raw: &RawEntity) -> Self {
        match raw.kind.as_str() {
            "table_item" => Self::TableItem(raw.properties.iter().map(TableProperty::from).collect()),
            "starting_balance" => Self::StartingBalance(RemoteValue::from_raw(raw)),
            "ending_balance" => Self::EndingBalance(RemoteValue::from_raw(raw)),
            "statement_start_date" => Self::StatementStartDate(RemoteValue::from_raw(raw)),
            "statement_end_date" => Self::StatementEndDate(RemoteValue::from_raw(raw)),
            "account_number" => Self::AccountNumber(RemoteValue::from_raw(raw)),
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

/// What a remote extraction produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteDocument {
    pub text: String,
    pub entities: Vec<Entity>,
}

impl RemoteDocument {
    pub fn from_raw(raw: &RawDocument) -> Self {
        Self {
            text: raw.text.clone(),
            entities: raw.entities.iter().map(Entity::from).collect(),
        }
    }

    /// Parse a `:process` response body.
    pub fn from_response_json(body: &str) -> Result<Self, RemoteError> {
        let raw: RawProcessResponse =
            serde_json::from_str(body).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Self::from_raw(&raw.document))
    }

    /// Entities of any type, recognized or not.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
      "document": {
        "text": "Statement",
        "entities": [
          { "type": "account_number", "mentionText": "1234-5678" },
          { "type": "statement_end_date", "mentionText": "July 31, 2022",
            "normalizedValue": { "dateValue": { "year": 2022, "month": 7, "day": 31 } } },
          { "type": "table_item", "properties": [
              { "type": "table_item/transaction_withdrawal_date", "mentionText": "07/05" },
              { "type": "table_item/transaction_withdrawal_description", "mentionText": "STARBUCKS" },
              { "type": "table_item/transaction_withdrawal", "mentionText": "5.75",
                "normalizedValue": { "moneyValue": { "currencyCode": "USD", "units": "5", "nanos": 750000000 } } },
              { "type": "table_item/running_balance", "mentionText": "100.00" }
          ] },
          { "type": "client_address", "mentionText": "123 Main St" }
        ]
      }
    }"#;

    #[test]
    fn test_response_folds_into_tagged_union() {
        let doc = RemoteDocument::from_response_json(RESPONSE).unwrap();
        assert_eq!(doc.entity_count(), 4);
        assert!(matches!(&doc.entities[3], Entity::Unrecognized(t) if t == "client_address"));

        let Entity::TableItem(props) = &doc.entities[2] else {
            panic!("expected table item");
        };
        assert_eq!(props.len(), 4);
        let Some(TableProperty::Withdrawal(v)) = props.get(2) else {
            panic!("expected withdrawal");
        };
        assert_eq!(v.money, Some("5.75".parse().unwrap()));
        assert!(matches!(&props[3], TableProperty::Unrecognized(_)));

        let Entity::StatementEndDate(end) = &doc.entities[1] else {
            panic!("expected end date");
        };
        assert_eq!(end.date.unwrap().resolve(1999), NaiveDate::from_ymd_opt(2022, 7, 31));
    }

    #[test]
    fn test_units_accept_numbers_and_strings() {
        let json = r#"{ "type": "ending_balance", "normalizedValue": { "moneyValue": { "units": -12, "nanos": -500000000 } } }"#;
        let raw: RawEntity = serde_json::from_str(json).unwrap();
        let Entity::EndingBalance(v) = Entity::from(&raw) else {
            panic!("expected ending balance");
        };
        assert_eq!(v.money, Some("-12.5".parse().unwrap()));
    }

    #[test]
    fn test_bad_body_is_decode_error() {
        let err = RemoteDocument::from_response_json("not json").unwrap_err();
        assert!(matches!(err, RemoteError::Decode(_)));
    }
}
