//! The module contains `Settlement` struct and its persistence model.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    Currency, EngineError, Money, Participant, ResultEngine,
    util::{from_json, model_currency, to_json},
};

/// How a debt was paid back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Upi,
    #[serde(rename = "paypal")]
    PayPal,
    #[serde(rename = "bank")]
    BankTransfer,
    Cash,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Upi,
        PaymentMethod::PayPal,
        PaymentMethod::BankTransfer,
        PaymentMethod::Cash,
    ];

    /// Stable identifier used in storage and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upi => "upi",
            Self::PayPal => "paypal",
            Self::BankTransfer => "bank",
            Self::Cash => "cash",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upi => "UPI",
            Self::PayPal => "PayPal",
            Self::BankTransfer => "Bank Transfer",
            Self::Cash => "Cash",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        PaymentMethod::ALL
            .into_iter()
            .find(|method| {
                method.as_str().eq_ignore_ascii_case(value)
                    || method.label().eq_ignore_ascii_case(value)
            })
            .ok_or_else(|| EngineError::InvalidName(format!("unknown payment method: {value}")))
    }
}

impl FromStr for PaymentMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::try_from(s)
    }
}

/// A completed payment from one participant to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: i64,
    pub from: Participant,
    pub to: Participant,
    pub amount: Money,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub settled_at: DateTime<Utc>,
    pub related_expenses: Vec<i64>,
}

impl Settlement {
    #[must_use]
    pub fn involves(&self, participant: &str) -> bool {
        self.from.as_str() == participant || self.to.as_str() == participant
    }
}

/// Input of [`Engine::create_settlement`](crate::Engine::create_settlement).
///
/// `method` is optional so that a form left without a selection is rejected
/// with [`EngineError::MissingMethod`] instead of defaulting silently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSettlement {
    pub from: Participant,
    pub to: Participant,
    pub amount: Money,
    pub currency: Currency,
    pub method: Option<PaymentMethod>,
    pub related_expenses: Vec<i64>,
}

impl NewSettlement {
    pub(crate) fn validate(&self) -> ResultEngine<PaymentMethod> {
        let method = self.method.ok_or(EngineError::MissingMethod)?;
        if !self.amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "settlement amount must be > 0, got {}",
                self.amount
            )));
        }
        if self.from == self.to {
            return Err(EngineError::InvalidName(format!(
                "{} cannot pay themselves",
                self.from
            )));
        }
        Ok(method)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub from_user: String,
    pub to_user: String,
    pub amount_minor: i64,
    pub currency: String,
    pub method: String,
    pub settled_at: DateTimeUtc,
    pub related_expenses: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn new_row(
        new: &NewSettlement,
        method: PaymentMethod,
        settled_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        Ok(Self {
            id: ActiveValue::NotSet,
            from_user: ActiveValue::Set(new.from.to_string()),
            to_user: ActiveValue::Set(new.to.to_string()),
            amount_minor: ActiveValue::Set(new.amount.minor()),
            currency: ActiveValue::Set(new.currency.code().to_string()),
            method: ActiveValue::Set(method.as_str().to_string()),
            settled_at: ActiveValue::Set(settled_at),
            related_expenses: ActiveValue::Set(to_json(
                &new.related_expenses,
                "related expenses",
            )?),
        })
    }
}

impl TryFrom<Model> for Settlement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let corrupted = |what: &str| {
            EngineError::Corrupted(format!("settlement {} has an invalid {what}", model.id))
        };
        Ok(Self {
            id: model.id,
            from: Participant::new(&model.from_user).map_err(|_| corrupted("payer"))?,
            to: Participant::new(&model.to_user).map_err(|_| corrupted("payee"))?,
            amount: Money::new(model.amount_minor),
            currency: model_currency(&model.currency)?,
            method: PaymentMethod::try_from(model.method.as_str())
                .map_err(|_| corrupted("payment method"))?,
            settled_at: model.settled_at,
            related_expenses: from_json(&model.related_expenses, "related expenses")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_settlement(method: Option<PaymentMethod>, minor: i64) -> NewSettlement {
        NewSettlement {
            from: Participant::new("Bob").unwrap(),
            to: Participant::primary(),
            amount: Money::new(minor),
            currency: Currency::Inr,
            method,
            related_expenses: vec![],
        }
    }

    #[test]
    fn method_is_required() {
        let err = new_settlement(None, 100).validate().unwrap_err();
        assert_eq!(err, EngineError::MissingMethod);
    }

    #[test]
    fn amount_must_be_positive() {
        let err = new_settlement(Some(PaymentMethod::Cash), 0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn method_parses_id_and_label() {
        assert_eq!(
            PaymentMethod::try_from("bank").unwrap(),
            PaymentMethod::BankTransfer
        );
        assert_eq!(
            "Bank Transfer".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::BankTransfer
        );
        assert_eq!("UPI".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }
}
