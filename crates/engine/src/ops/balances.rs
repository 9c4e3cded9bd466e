use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    Balance, BalanceSummary, Currency, EngineError, Money, Participant, PendingSettlements,
    ResultEngine, Splits,
    balances::{self, BalanceDelta},
};

use super::{Engine, with_tx};

/// Looks up the entry of a pair, whatever its stored orientation.
pub(super) async fn find_pair<C: ConnectionTrait>(
    conn: &C,
    user_id: &Participant,
    with_user: &Participant,
) -> ResultEngine<Option<balances::Model>> {
    let direct = balances::Entity::find()
        .filter(balances::Column::UserId.eq(user_id.as_str()))
        .filter(balances::Column::WithUser.eq(with_user.as_str()))
        .one(conn)
        .await?;
    if direct.is_some() {
        return Ok(direct);
    }
    Ok(balances::Entity::find()
        .filter(balances::Column::UserId.eq(with_user.as_str()))
        .filter(balances::Column::WithUser.eq(user_id.as_str()))
        .one(conn)
        .await?)
}

/// Adds `delta` to the matching entry, creating it when the pair is new.
pub(super) async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    delta: &BalanceDelta,
    currency: Currency,
    now: DateTime<Utc>,
) -> ResultEngine<Balance> {
    let Some(model) = find_pair(conn, &delta.user_id, &delta.with_user).await? else {
        let model = balances::ActiveModel::new_row(delta, currency, now)
            .insert(conn)
            .await?;
        return Balance::try_from(model);
    };

    let delta = if model.user_id == delta.user_id.as_str() {
        delta.clone()
    } else {
        delta.reversed()
    };

    let current = Money::new(model.amount_minor);
    if !current.is_zero() && model.currency != currency.code() {
        return Err(EngineError::CurrencyMismatch(format!(
            "balance between {} and {} is in {}, got {}",
            model.user_id, model.with_user, model.currency, currency
        )));
    }
    let amount = current.checked_add(delta.amount).ok_or_else(|| {
        EngineError::InvalidAmount(format!(
            "balance between {} and {} overflows",
            model.user_id, model.with_user
        ))
    })?;

    let active = balances::ActiveModel {
        id: ActiveValue::Unchanged(model.id),
        amount_minor: ActiveValue::Set(amount.minor()),
        currency: ActiveValue::Set(currency.code().to_string()),
        last_updated: ActiveValue::Set(now),
        ..Default::default()
    };
    Balance::try_from(active.update(conn).await?)
}

/// Books what every non-payer owes the payer for one expense.
pub(super) async fn record_split_in<C: ConnectionTrait>(
    conn: &C,
    payer: &Participant,
    splits: &Splits,
    currency: Currency,
    now: DateTime<Utc>,
) -> ResultEngine<Vec<Balance>> {
    let mut touched = Vec::new();
    for (participant, share) in splits.iter() {
        if participant == payer || share.is_zero() {
            continue;
        }
        let delta = BalanceDelta::debt(payer, participant, share);
        touched.push(apply_delta(conn, &delta, currency, now).await?);
    }
    Ok(touched)
}

impl Engine {
    /// Every ledger entry, settled ones included.
    pub async fn balances(&self) -> ResultEngine<Vec<Balance>> {
        balances::Entity::find()
            .order_by_asc(balances::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Balance::try_from)
            .collect()
    }

    pub async fn balance(&self, id: i64) -> ResultEngine<Balance> {
        let model = balances::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("balance {id}")))?;
        Balance::try_from(model)
    }

    /// The entry of a pair in its stored orientation, if any.
    pub async fn balance_between(
        &self,
        user_id: &Participant,
        with_user: &Participant,
    ) -> ResultEngine<Option<Balance>> {
        find_pair(&self.database, user_id, with_user)
            .await?
            .map(Balance::try_from)
            .transpose()
    }

    /// What you owe, what is owed to you and the difference.
    pub async fn balance_summary(&self) -> ResultEngine<BalanceSummary> {
        Ok(BalanceSummary::from_balances(&self.balances().await?))
    }

    /// Count and total of the money still owed to you.
    pub async fn pending_settlements(&self) -> ResultEngine<PendingSettlements> {
        Ok(PendingSettlements::from_balances(&self.balances().await?))
    }

    /// Updates the ledger after `payer` covered an expense split as `splits`.
    ///
    /// Each participant other than the payer now owes the payer its share
    /// more. Returns the entries that changed.
    pub async fn record_split(
        &self,
        payer: &Participant,
        splits: &Splits,
        currency: Currency,
    ) -> ResultEngine<Vec<Balance>> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let touched = record_split_in(&db_tx, payer, splits, currency, now).await?;
            tracing::debug!(payer = %payer, entries = touched.len(), "split recorded");
            Ok(touched)
        })
    }

    /// Adds `delta` to the pair: positive means `with_user` owes `user_id`
    /// more.
    pub async fn adjust_balance(
        &self,
        user_id: &Participant,
        with_user: &Participant,
        delta: Money,
        currency: Currency,
    ) -> ResultEngine<Balance> {
        if user_id == with_user {
            return Err(EngineError::InvalidName(format!(
                "{user_id} cannot owe themselves"
            )));
        }
        let now = self.now();
        let delta = BalanceDelta::new(user_id, with_user, delta);
        with_tx!(self, |db_tx| {
            let balance = apply_delta(&db_tx, &delta, currency, now).await?;
            tracing::debug!(
                user_id = %balance.user_id,
                with_user = %balance.with_user,
                amount = %balance.amount,
                "balance adjusted"
            );
            Ok(balance)
        })
    }

    /// Resets the pair to zero and returns it, or `None` when the two never
    /// shared an expense. Settling twice is harmless.
    pub async fn settle(
        &self,
        user_id: &Participant,
        with_user: &Participant,
    ) -> ResultEngine<Option<Balance>> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let Some(model) = find_pair(&db_tx, user_id, with_user).await? else {
                return Ok(None);
            };
            let balance = zero_balance(&db_tx, model.id, now).await?;
            tracing::debug!(user_id = %user_id, with_user = %with_user, "balance settled");
            Ok(Some(balance))
        })
    }
}

pub(super) async fn zero_balance<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    now: DateTime<Utc>,
) -> ResultEngine<Balance> {
    let active = balances::ActiveModel {
        id: ActiveValue::Unchanged(id),
        amount_minor: ActiveValue::Set(0),
        last_updated: ActiveValue::Set(now),
        ..Default::default()
    };
    Balance::try_from(active.update(conn).await?)
}
