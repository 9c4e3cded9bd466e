use std::collections::BTreeMap;

use chrono::Days;
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait, prelude::*};

use crate::{
    AddExpenseCmd, Category, Collaborator, DailyTotal, EngineError, Expense, ExpenseDraft,
    ExpenseFilter, ExpensePatch, Money, ResultEngine, allocate, category_totals,
    collaborator_frequency, daily_totals, expenses,
};

use super::{
    Engine,
    balances::record_split_in,
    groups::{require_group, touch_group_in},
    with_tx,
};

pub(super) async fn require_expense<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> ResultEngine<expenses::Model> {
    expenses::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("expense {id}")))
}

fn newest_first() -> Select<expenses::Entity> {
    expenses::Entity::find()
        .order_by_desc(expenses::Column::CreatedAt)
        .order_by_desc(expenses::Column::Id)
}

fn into_expenses(models: Vec<expenses::Model>) -> ResultEngine<Vec<Expense>> {
    models.into_iter().map(Expense::try_from).collect()
}

impl Engine {
    /// Stores an already split expense. The ledger is left untouched; see
    /// [`Engine::add_expense`] for the full flow.
    pub async fn create_expense(&self, draft: ExpenseDraft) -> ResultEngine<Expense> {
        let draft = draft.validate().inspect_err(|err| {
            tracing::warn!(%err, "expense rejected");
        })?;
        let created_at = self.now();
        with_tx!(self, |db_tx| {
            if let Some(group_id) = draft.group_id {
                require_group(&db_tx, group_id).await?;
            }
            let model = expenses::ActiveModel::new_row(&draft, created_at)?
                .insert(&db_tx)
                .await?;
            tracing::debug!(id = model.id, amount = %draft.amount, "expense created");
            Expense::try_from(model)
        })
    }

    /// Splits, stores and books an expense in one transaction.
    ///
    /// The payer is always part of the split. When the expense belongs to a
    /// group, the group is marked as used.
    pub async fn add_expense(&self, cmd: AddExpenseCmd) -> ResultEngine<Expense> {
        let mut participants = cmd.participants.clone();
        if !participants.contains(&cmd.paid_by) {
            participants.push(cmd.paid_by.clone());
        }
        let splits = allocate(cmd.amount, &participants, &cmd.method).inspect_err(|err| {
            tracing::warn!(method = cmd.method.name(), %err, "split rejected");
        })?;

        let draft = ExpenseDraft {
            description: cmd.description.clone(),
            amount: cmd.amount,
            currency: cmd.currency,
            paid_by: cmd.paid_by.clone(),
            category: cmd.category,
            group_id: cmd.group_id,
            items: cmd.line_items(splits.participants().cloned().collect()),
            splits,
        }
        .validate()?;

        let now = self.now();
        with_tx!(self, |db_tx| {
            if let Some(group_id) = draft.group_id {
                require_group(&db_tx, group_id).await?;
                touch_group_in(&db_tx, group_id, now).await?;
            }
            let model = expenses::ActiveModel::new_row(&draft, now)?
                .insert(&db_tx)
                .await?;
            record_split_in(&db_tx, &draft.paid_by, &draft.splits, draft.currency, now).await?;
            tracing::debug!(
                id = model.id,
                amount = %draft.amount,
                method = cmd.method.name(),
                "expense added"
            );
            Expense::try_from(model)
        })
    }

    pub async fn expense(&self, id: i64) -> ResultEngine<Expense> {
        Expense::try_from(require_expense(&self.database, id).await?)
    }

    /// Applies `patch`. Balances already booked for the expense are kept as
    /// they are.
    pub async fn update_expense(&self, id: i64, patch: ExpensePatch) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let mut expense = Expense::try_from(require_expense(&db_tx, id).await?)?;
            if let Some(Some(group_id)) = patch.group_id {
                require_group(&db_tx, group_id).await?;
            }
            expense.apply_patch(patch)?;
            let active = expenses::ActiveModel::try_from(&expense)?;
            let model = active.update(&db_tx).await?;
            tracing::debug!(id, "expense updated");
            Expense::try_from(model)
        })
    }

    pub async fn delete_expense(&self, id: i64) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let result = expenses::Entity::delete_by_id(id).exec(&db_tx).await?;
            if result.rows_affected == 0 {
                return Err(EngineError::NotFound(format!("expense {id}")));
            }
            tracing::debug!(id, "expense deleted");
            Ok(())
        })
    }

    /// All expenses in insertion order.
    pub async fn list_expenses(&self) -> ResultEngine<Vec<Expense>> {
        into_expenses(
            expenses::Entity::find()
                .order_by_asc(expenses::Column::Id)
                .all(&self.database)
                .await?,
        )
    }

    /// The `limit` newest expenses.
    pub async fn recent_expenses(&self, limit: u64) -> ResultEngine<Vec<Expense>> {
        into_expenses(
            newest_first()
                .limit(limit)
                .all(&self.database)
                .await?,
        )
    }

    /// Expenses of a group, newest first.
    pub async fn expenses_by_group(&self, group_id: i64) -> ResultEngine<Vec<Expense>> {
        into_expenses(
            newest_first()
                .filter(expenses::Column::GroupId.eq(group_id))
                .all(&self.database)
                .await?,
        )
    }

    pub async fn mark_expense_settled(&self, id: i64) -> ResultEngine<Expense> {
        self.update_expense(
            id,
            ExpensePatch {
                settled: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    /// History search, newest first.
    pub async fn search_expenses(&self, filter: &ExpenseFilter) -> ResultEngine<Vec<Expense>> {
        let mut found = into_expenses(newest_first().all(&self.database).await?)?;
        found.retain(|expense| filter.matches(expense));
        Ok(found)
    }

    pub async fn category_totals(&self) -> ResultEngine<BTreeMap<Category, Money>> {
        Ok(category_totals(&self.list_expenses().await?))
    }

    /// Spending per day over the last `days` days, today included.
    pub async fn daily_totals(&self, days: u32) -> ResultEngine<Vec<DailyTotal>> {
        let today = self.now().date_naive();
        let Some(since) = today
            .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        else {
            return Ok(Vec::new());
        };
        let window = into_expenses(
            expenses::Entity::find()
                .filter(expenses::Column::CreatedAt.gte(since.and_utc()))
                .all(&self.database)
                .await?,
        )?;
        Ok(daily_totals(&window, today, days))
    }

    pub async fn collaborator_frequency(&self) -> ResultEngine<Vec<Collaborator>> {
        Ok(collaborator_frequency(&self.list_expenses().await?))
    }
}
