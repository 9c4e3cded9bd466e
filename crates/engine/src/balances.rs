//! Pairwise balances.
//!
//! A [`Balance`] tracks what one participant (`with_user`) owes another
//! (`user_id`):
//! - positive amount = `with_user` owes `user_id`
//! - negative amount = `user_id` owes `with_user`
//!
//! When the primary participant is part of a pair it is always stored as
//! `user_id`, so every figure shown to the user reads "positive = owed to
//! you". Settling sets the amount to zero and keeps the row.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    Currency, EngineError, Money, Participant,
    util::model_currency,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub id: i64,
    pub user_id: Participant,
    pub with_user: Participant,
    pub amount: Money,
    pub currency: Currency,
    pub last_updated: DateTime<Utc>,
}

impl Balance {
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.amount.is_zero()
    }

    /// `true` when the pair is `(user_id, with_user)` in either orientation.
    #[must_use]
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.user_id.as_str() == a && self.with_user.as_str() == b)
            || (self.user_id.as_str() == b && self.with_user.as_str() == a)
    }

    /// The participant who has to pay and the one who gets paid, or `None`
    /// when nothing is owed.
    #[must_use]
    pub fn debtor_and_creditor(&self) -> Option<(&Participant, &Participant)> {
        if self.amount.is_negative() {
            Some((&self.user_id, &self.with_user))
        } else if self.amount.is_positive() {
            Some((&self.with_user, &self.user_id))
        } else {
            None
        }
    }
}

/// Dashboard figures of the primary participant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub you_owe: Money,
    pub owed_to_you: Money,
    pub net_balance: Money,
}

impl BalanceSummary {
    /// Sums the entries held by the primary participant; pairs between two
    /// other participants do not concern the user and are skipped.
    #[must_use]
    pub fn from_balances(balances: &[Balance]) -> Self {
        let (you_owe, owed_to_you) = balances
            .iter()
            .filter(|balance| balance.user_id.is_primary())
            .fold((Money::ZERO, Money::ZERO), |(owe, owed), balance| {
                if balance.amount.is_negative() {
                    (owe + balance.amount.abs(), owed)
                } else {
                    (owe, owed + balance.amount)
                }
            });
        Self {
            you_owe,
            owed_to_you,
            net_balance: owed_to_you - you_owe,
        }
    }
}

/// A signed change to apply to the pair `(user_id, with_user)`, already
/// oriented so that the primary participant is `user_id` when involved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BalanceDelta {
    pub(crate) user_id: Participant,
    pub(crate) with_user: Participant,
    pub(crate) amount: Money,
}

impl BalanceDelta {
    /// `amount` positive = `with_user` owes `user_id` more.
    pub(crate) fn new(user_id: &Participant, with_user: &Participant, amount: Money) -> Self {
        if with_user.is_primary() && !user_id.is_primary() {
            Self {
                user_id: with_user.clone(),
                with_user: user_id.clone(),
                amount: -amount,
            }
        } else {
            Self {
                user_id: user_id.clone(),
                with_user: with_user.clone(),
                amount,
            }
        }
    }

    /// `debtor` owes `creditor` `amount` more.
    pub(crate) fn debt(creditor: &Participant, debtor: &Participant, amount: Money) -> Self {
        Self::new(creditor, debtor, amount)
    }

    /// Same change expressed on the reversed pair.
    pub(crate) fn reversed(&self) -> Self {
        Self {
            user_id: self.with_user.clone(),
            with_user: self.user_id.clone(),
            amount: -self.amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub with_user: String,
    pub amount_minor: i64,
    pub currency: String,
    pub last_updated: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn new_row(
        delta: &BalanceDelta,
        currency: Currency,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActiveValue::NotSet,
            user_id: ActiveValue::Set(delta.user_id.to_string()),
            with_user: ActiveValue::Set(delta.with_user.to_string()),
            amount_minor: ActiveValue::Set(delta.amount.minor()),
            currency: ActiveValue::Set(currency.code().to_string()),
            last_updated: ActiveValue::Set(last_updated),
        }
    }
}

impl TryFrom<Model> for Balance {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let corrupted =
            |_| EngineError::Corrupted(format!("balance {} has an invalid participant", model.id));
        Ok(Self {
            id: model.id,
            user_id: Participant::new(&model.user_id).map_err(corrupted)?,
            with_user: Participant::new(&model.with_user).map_err(corrupted)?,
            amount: Money::new(model.amount_minor),
            currency: model_currency(&model.currency)?,
            last_updated: model.last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn p(name: &str) -> Participant {
        Participant::new(name).unwrap()
    }

    fn balance(user_id: &str, with_user: &str, minor: i64) -> Balance {
        Balance {
            id: 0,
            user_id: p(user_id),
            with_user: p(with_user),
            amount: Money::new(minor),
            currency: Currency::Inr,
            last_updated: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    #[test]
    fn summary_splits_debts_and_credits() {
        let summary = BalanceSummary::from_balances(&[
            balance("You", "Alice", 5000),
            balance("You", "Bob", -2000),
            balance("You", "Carol", 0),
            balance("Alice", "Bob", 9900),
        ]);
        assert_eq!(summary.owed_to_you, Money::new(5000));
        assert_eq!(summary.you_owe, Money::new(2000));
        assert_eq!(summary.net_balance, Money::new(3000));
    }

    #[test]
    fn debt_owed_by_primary_is_stored_from_primary_side() {
        let delta = BalanceDelta::debt(&p("Alice"), &p("You"), Money::new(1000));
        assert_eq!(delta.user_id, p("You"));
        assert_eq!(delta.with_user, p("Alice"));
        assert_eq!(delta.amount, Money::new(-1000));
    }

    #[test]
    fn debt_owed_to_primary_is_positive() {
        let delta = BalanceDelta::debt(&p("You"), &p("Alice"), Money::new(1000));
        assert_eq!(delta.user_id, p("You"));
        assert_eq!(delta.with_user, p("Alice"));
        assert_eq!(delta.amount, Money::new(1000));
    }

    #[test]
    fn debtor_and_creditor_follow_sign() {
        let owed = balance("You", "Bob", 15000);
        let (debtor, creditor) = owed.debtor_and_creditor().unwrap();
        assert_eq!((debtor.as_str(), creditor.as_str()), ("Bob", "You"));

        let owing = balance("You", "Bob", -15000);
        let (debtor, creditor) = owing.debtor_and_creditor().unwrap();
        assert_eq!((debtor.as_str(), creditor.as_str()), ("You", "Bob"));

        assert!(balance("You", "Bob", 0).debtor_and_creditor().is_none());
    }
}
