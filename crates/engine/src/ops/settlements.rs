use sea_orm::{Condition, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    Balance, EngineError, NewSettlement, Participant, PaymentMethod, ResultEngine, Settlement,
    settlements,
};

use super::{
    Engine,
    balances::{find_pair, zero_balance},
    with_tx,
};

impl Engine {
    /// Records a payment without touching the ledger.
    pub async fn create_settlement(&self, new: NewSettlement) -> ResultEngine<Settlement> {
        let method = new.validate().inspect_err(|err| {
            tracing::warn!(%err, "settlement rejected");
        })?;
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = settlements::ActiveModel::new_row(&new, method, now)?
                .insert(&db_tx)
                .await?;
            tracing::debug!(
                id = model.id,
                from = %new.from,
                to = %new.to,
                amount = %new.amount,
                "settlement recorded"
            );
            Settlement::try_from(model)
        })
    }

    /// Pays off the pair of `balance` in full.
    ///
    /// The amount is read again inside the transaction, so a stale `balance`
    /// cannot settle the wrong figure. The debtor follows the sign: a negative
    /// amount means `user_id` pays. The settlement is stored and the entry
    /// zeroed in the same transaction.
    pub async fn settle_payment(
        &self,
        balance: &Balance,
        method: Option<PaymentMethod>,
        related_expenses: Vec<i64>,
    ) -> ResultEngine<Settlement> {
        let method = method.ok_or(EngineError::MissingMethod)?;
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = find_pair(&db_tx, &balance.user_id, &balance.with_user)
                .await?
                .ok_or_else(|| {
                    EngineError::NotFound(format!(
                        "balance between {} and {}",
                        balance.user_id, balance.with_user
                    ))
                })?;
            let current = Balance::try_from(model)?;
            let Some((debtor, creditor)) = current.debtor_and_creditor() else {
                return Err(EngineError::InvalidAmount(format!(
                    "nothing is owed between {} and {}",
                    current.user_id, current.with_user
                )));
            };

            let new = NewSettlement {
                from: debtor.clone(),
                to: creditor.clone(),
                amount: current.amount.abs(),
                currency: current.currency,
                method: Some(method),
                related_expenses,
            };
            let model = settlements::ActiveModel::new_row(&new, method, now)?
                .insert(&db_tx)
                .await?;
            zero_balance(&db_tx, current.id, now).await?;
            tracing::debug!(
                id = model.id,
                from = %new.from,
                to = %new.to,
                amount = %new.amount,
                method = method.as_str(),
                "balance paid off"
            );
            Settlement::try_from(model)
        })
    }

    /// All settlements, newest first.
    pub async fn settlements(&self) -> ResultEngine<Vec<Settlement>> {
        settlements::Entity::find()
            .order_by_desc(settlements::Column::SettledAt)
            .order_by_desc(settlements::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Settlement::try_from)
            .collect()
    }

    /// Settlements where `participant` paid or got paid, newest first.
    pub async fn settlements_by_user(
        &self,
        participant: &Participant,
    ) -> ResultEngine<Vec<Settlement>> {
        settlements::Entity::find()
            .filter(
                Condition::any()
                    .add(settlements::Column::FromUser.eq(participant.as_str()))
                    .add(settlements::Column::ToUser.eq(participant.as_str())),
            )
            .order_by_desc(settlements::Column::SettledAt)
            .order_by_desc(settlements::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Settlement::try_from)
            .collect()
    }
}
