//! The module contains `Group` struct and its persistence model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    Currency, EngineError, Participant, ResultEngine,
    util::{from_json, model_currency, normalize_required_text, to_json},
};

/// A named set of participants who usually split expenses together.
///
/// The member list is ordered and always contains the primary participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub members: Vec<Participant>,
    pub currency: Currency,
    pub last_used: DateTime<Utc>,
}

impl Group {
    #[must_use]
    pub fn has_member(&self, participant: &str) -> bool {
        self.members.iter().any(|member| member.as_str() == participant)
    }

    /// Members other than the primary participant.
    pub fn others(&self) -> impl Iterator<Item = &Participant> {
        self.members.iter().filter(|member| !member.is_primary())
    }
}

/// Input of [`Engine::create_group`](crate::Engine::create_group).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub members: Vec<Participant>,
    pub currency: Currency,
}

impl NewGroup {
    pub fn new(name: impl Into<String>, members: Vec<Participant>, currency: Currency) -> Self {
        Self {
            name: name.into(),
            members,
            currency,
        }
    }
}

/// Partial update of a group; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub members: Option<Vec<Participant>>,
    pub currency: Option<Currency>,
}

/// Primary participant first, then the given members without duplicates.
pub(crate) fn normalize_members(members: Vec<Participant>) -> Vec<Participant> {
    let mut normalized = vec![Participant::primary()];
    for member in members {
        if !normalized.contains(&member) {
            normalized.push(member);
        }
    }
    normalized
}

pub(crate) fn normalize_group_name(name: &str) -> ResultEngine<String> {
    normalize_required_text(name, "group name")
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub members: String,
    pub currency: String,
    pub last_used: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&Group> for ActiveModel {
    type Error = EngineError;

    fn try_from(value: &Group) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Unchanged(value.id),
            name: ActiveValue::Set(value.name.clone()),
            members: ActiveValue::Set(to_json(&value.members, "group members")?),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            last_used: ActiveValue::Set(value.last_used),
        })
    }
}

impl TryFrom<Model> for Group {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            members: from_json(&model.members, "group members")?,
            currency: model_currency(&model.currency)?,
            last_used: model.last_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str) -> Participant {
        Participant::new(name).unwrap()
    }

    #[test]
    fn members_always_start_with_primary() {
        let members = normalize_members(vec![p("Alice"), p("You"), p("Bob"), p("Alice")]);
        let names: Vec<&str> = members.iter().map(Participant::as_str).collect();
        assert_eq!(names, vec!["You", "Alice", "Bob"]);
    }

    #[test]
    fn group_name_must_not_be_empty() {
        assert!(normalize_group_name("  ").is_err());
        assert_eq!(normalize_group_name(" Trip ").unwrap(), "Trip");
    }
}
