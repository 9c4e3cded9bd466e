use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, Group, GroupPatch, NewGroup, ResultEngine, expenses,
    groups::{self, normalize_group_name, normalize_members},
};

use super::{Engine, with_tx};

pub(super) async fn require_group<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> ResultEngine<groups::Model> {
    groups::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("group {id}")))
}

pub(super) async fn touch_group_in<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    now: DateTime<Utc>,
) -> ResultEngine<groups::Model> {
    let active = groups::ActiveModel {
        id: ActiveValue::Unchanged(id),
        last_used: ActiveValue::Set(now),
        ..Default::default()
    };
    Ok(active.update(conn).await?)
}

impl Engine {
    /// Creates a group; `You` is added to the members when missing.
    pub async fn create_group(&self, new: NewGroup) -> ResultEngine<Group> {
        let name = normalize_group_name(&new.name)?;
        let members = normalize_members(new.members);
        let now = self.now();
        with_tx!(self, |db_tx| {
            let mut group = Group {
                id: 0,
                name,
                members,
                currency: new.currency,
                last_used: now,
            };
            let mut active = groups::ActiveModel::try_from(&group)?;
            active.id = ActiveValue::NotSet;
            let model = active.insert(&db_tx).await?;
            group.id = model.id;
            tracing::debug!(id = group.id, name = %group.name, "group created");
            Ok(group)
        })
    }

    pub async fn group(&self, id: i64) -> ResultEngine<Group> {
        Group::try_from(require_group(&self.database, id).await?)
    }

    /// All groups, most recently used first.
    pub async fn groups(&self) -> ResultEngine<Vec<Group>> {
        groups::Entity::find()
            .order_by_desc(groups::Column::LastUsed)
            .order_by_asc(groups::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Group::try_from)
            .collect()
    }

    pub async fn update_group(&self, id: i64, patch: GroupPatch) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let mut group = Group::try_from(require_group(&db_tx, id).await?)?;
            if let Some(name) = patch.name {
                group.name = normalize_group_name(&name)?;
            }
            if let Some(members) = patch.members {
                group.members = normalize_members(members);
            }
            if let Some(currency) = patch.currency {
                group.currency = currency;
            }
            groups::ActiveModel::try_from(&group)?
                .update(&db_tx)
                .await?;
            tracing::debug!(id, "group updated");
            Ok(group)
        })
    }

    /// Removes the group. Its expenses are kept and detached from it.
    pub async fn delete_group(&self, id: i64) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let result = groups::Entity::delete_by_id(id).exec(&db_tx).await?;
            if result.rows_affected == 0 {
                return Err(EngineError::NotFound(format!("group {id}")));
            }
            expenses::Entity::update_many()
                .col_expr(expenses::Column::GroupId, Expr::value(Option::<i64>::None))
                .filter(expenses::Column::GroupId.eq(id))
                .exec(&db_tx)
                .await?;
            tracing::debug!(id, "group deleted");
            Ok(())
        })
    }

    /// Marks the group as used now, moving it to the top of [`Engine::groups`].
    pub async fn touch_group(&self, id: i64) -> ResultEngine<Group> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            require_group(&db_tx, id).await?;
            let model = touch_group_in(&db_tx, id, now).await?;
            Group::try_from(model)
        })
    }
}
