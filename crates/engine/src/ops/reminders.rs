use sea_orm::{QueryOrder, TransactionTrait, prelude::*};

use crate::{PendingSettlements, ResultEngine, SentReminder, reminders};

use super::{Engine, with_tx};

impl Engine {
    /// The most recently delivered reminder, if any.
    pub async fn last_reminder(&self) -> ResultEngine<Option<SentReminder>> {
        reminders::Entity::find()
            .order_by_desc(reminders::Column::SentAt)
            .order_by_desc(reminders::Column::Id)
            .one(&self.database)
            .await?
            .map(SentReminder::try_from)
            .transpose()
    }

    /// Logs that a reminder carrying `pending` was delivered now.
    pub async fn record_reminder(
        &self,
        pending: &PendingSettlements,
    ) -> ResultEngine<SentReminder> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = reminders::ActiveModel::new_row(pending, now)?
                .insert(&db_tx)
                .await?;
            tracing::debug!(id = model.id, count = pending.count, "reminder logged");
            SentReminder::try_from(model)
        })
    }
}
