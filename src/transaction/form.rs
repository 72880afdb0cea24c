//! The JSON body for submitting a transaction and its validation.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    Error,
    transaction::{NewTransaction, Transaction, TransactionType},
};

/// The JSON body for creating a transaction.
///
/// Every field is optional here so that a missing field can be reported by
/// name instead of as a generic deserialization failure.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TransactionForm {
    /// Text detailing the transaction.
    pub description: Option<String>,
    /// The value of the transaction. Only the magnitude is used, the sign
    /// comes from `transaction_type`.
    pub amount: Option<AmountInput>,
    /// Either "income" or "expense".
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// What the money was earned or spent on.
    pub category: Option<String>,
}

/// An amount as sent by a client, either a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// e.g. `12.5`
    Number(serde_json::Number),
    /// e.g. `"12.5"`
    Text(String),
}

impl AmountInput {
    fn as_text(&self) -> String {
        match self {
            AmountInput::Number(number) => number.to_string(),
            AmountInput::Text(text) => text.trim().to_owned(),
        }
    }

    /// Parse the amount as a decimal.
    ///
    /// Both plain (`"12.50"`) and scientific (`"1.25e1"`) notation are accepted.
    ///
    /// # Errors
    /// Returns a [Error::MissingField] for an empty string and a
    /// [Error::InvalidAmount] for anything that is not a number.
    pub fn parse(&self) -> Result<Decimal, Error> {
        let text = self.as_text();

        if text.is_empty() {
            return Err(Error::MissingField("amount"));
        }

        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| Error::InvalidAmount(text))
    }
}

impl TransactionForm {
    /// Check that every field is present and well formed.
    ///
    /// The returned transaction has a negative amount for expenses and a
    /// positive amount for income, regardless of the sign the client sent.
    /// Zero amounts are allowed.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::MissingField] if a field is absent, null or blank,
    /// - [Error::InvalidAmount] if the amount is not a number,
    /// - or [Error::InvalidTransactionType] if the type is not "income" or "expense".
    pub fn validate(self) -> Result<NewTransaction, Error> {
        let description = required_text(self.description, "description")?;
        let amount = self.amount.ok_or(Error::MissingField("amount"))?;
        let transaction_type = required_text(self.transaction_type, "type")?;
        let category = required_text(self.category, "category")?;

        let amount = amount.parse()?;
        let transaction_type = TransactionType::from_str(&transaction_type)?;

        Ok(Transaction::build(
            &description,
            amount,
            transaction_type,
            &category,
        ))
    }
}

fn required_text(value: Option<String>, field_name: &'static str) -> Result<String, Error> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(Error::MissingField(field_name)),
    }
}
