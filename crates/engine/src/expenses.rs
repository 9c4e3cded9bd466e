//! The module contains `Expense` struct and its persistence model.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    Currency, EngineError, LineItem, Money, Participant, ResultEngine, Splits,
    util::{from_json, model_currency, normalize_required_text, to_json},
};

/// Spending category of an expense.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Category {
    Food,
    Transport,
    Entertainment,
    Shopping,
    Bills,
    Travel,
    Health,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Transport,
        Category::Entertainment,
        Category::Shopping,
        Category::Bills,
        Category::Travel,
        Category::Health,
        Category::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transport => "Transport",
            Self::Entertainment => "Entertainment",
            Self::Shopping => "Shopping",
            Self::Bills => "Bills",
            Self::Travel => "Travel",
            Self::Health => "Health",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Category {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| EngineError::InvalidName(format!("unknown category: {value}")))
    }
}

impl FromStr for Category {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::try_from(s)
    }
}

/// A logged expense.
///
/// `splits` holds what each participant owes for this expense; the payer's
/// own share is included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub description: String,
    pub amount: Money,
    pub currency: Currency,
    pub paid_by: Participant,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub settled: bool,
    pub group_id: Option<i64>,
    pub items: Vec<LineItem>,
    pub splits: Splits,
}

/// Input of [`Engine::create_expense`](crate::Engine::create_expense).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: Money,
    pub currency: Currency,
    pub paid_by: Participant,
    pub category: Option<Category>,
    pub group_id: Option<i64>,
    pub items: Vec<LineItem>,
    pub splits: Splits,
}

impl ExpenseDraft {
    /// Checks the draft and trims its description.
    pub(crate) fn validate(mut self) -> ResultEngine<Self> {
        self.description = normalize_required_text(&self.description, "expense description")?;
        if !self.amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "expense amount must be > 0, got {}",
                self.amount
            )));
        }
        self.splits.reconcile(self.amount)?;
        Ok(self)
    }
}

/// Partial update of an expense; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpensePatch {
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub currency: Option<Currency>,
    pub paid_by: Option<Participant>,
    pub category: Option<Category>,
    /// `Some(None)` detaches the expense from its group.
    pub group_id: Option<Option<i64>>,
    pub items: Option<Vec<LineItem>>,
    pub splits: Option<Splits>,
    pub settled: Option<bool>,
}

impl Expense {
    /// Merges `patch` into the expense, re-validating the split when the
    /// amount or the splits change.
    pub(crate) fn apply_patch(&mut self, patch: ExpensePatch) -> ResultEngine<()> {
        let reconcile = patch.amount.is_some() || patch.splits.is_some();

        if let Some(description) = patch.description {
            self.description = normalize_required_text(&description, "expense description")?;
        }
        if let Some(amount) = patch.amount {
            if !amount.is_positive() {
                return Err(EngineError::InvalidAmount(format!(
                    "expense amount must be > 0, got {amount}"
                )));
            }
            self.amount = amount;
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        if let Some(paid_by) = patch.paid_by {
            self.paid_by = paid_by;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(group_id) = patch.group_id {
            self.group_id = group_id;
        }
        if let Some(items) = patch.items {
            self.items = items;
        }
        if let Some(splits) = patch.splits {
            self.splits = splits;
        }
        if let Some(settled) = patch.settled {
            self.settled = settled;
        }

        if reconcile {
            self.splits.reconcile(self.amount)?;
        }
        Ok(())
    }

    /// Participants other than the primary one.
    pub fn collaborators(&self) -> impl Iterator<Item = &Participant> {
        self.splits
            .participants()
            .filter(|participant| !participant.is_primary())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub description: String,
    pub amount_minor: i64,
    pub currency: String,
    pub paid_by: String,
    pub category: String,
    pub created_at: DateTimeUtc,
    pub settled: bool,
    pub group_id: Option<i64>,
    pub items: String,
    pub splits: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// Active model for a new row; the id is assigned by the database.
    pub(crate) fn new_row(draft: &ExpenseDraft, created_at: DateTime<Utc>) -> ResultEngine<Self> {
        Ok(Self {
            id: ActiveValue::NotSet,
            description: ActiveValue::Set(draft.description.clone()),
            amount_minor: ActiveValue::Set(draft.amount.minor()),
            currency: ActiveValue::Set(draft.currency.code().to_string()),
            paid_by: ActiveValue::Set(draft.paid_by.to_string()),
            category: ActiveValue::Set(
                draft.category.unwrap_or_default().as_str().to_string(),
            ),
            created_at: ActiveValue::Set(created_at),
            settled: ActiveValue::Set(false),
            group_id: ActiveValue::Set(draft.group_id),
            items: ActiveValue::Set(to_json(&draft.items, "expense items")?),
            splits: ActiveValue::Set(to_json(&draft.splits, "expense splits")?),
        })
    }
}

impl TryFrom<&Expense> for ActiveModel {
    type Error = EngineError;

    fn try_from(value: &Expense) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Unchanged(value.id),
            description: ActiveValue::Set(value.description.clone()),
            amount_minor: ActiveValue::Set(value.amount.minor()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            paid_by: ActiveValue::Set(value.paid_by.to_string()),
            category: ActiveValue::Set(value.category.as_str().to_string()),
            created_at: ActiveValue::Set(value.created_at),
            settled: ActiveValue::Set(value.settled),
            group_id: ActiveValue::Set(value.group_id),
            items: ActiveValue::Set(to_json(&value.items, "expense items")?),
            splits: ActiveValue::Set(to_json(&value.splits, "expense splits")?),
        })
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            description: model.description,
            amount: Money::new(model.amount_minor),
            currency: model_currency(&model.currency)?,
            paid_by: Participant::new(&model.paid_by)
                .map_err(|_| EngineError::Corrupted(format!("expense {} has no payer", model.id)))?,
            category: Category::try_from(model.category.as_str()).map_err(|_| {
                EngineError::Corrupted(format!(
                    "expense {} has unknown category '{}'",
                    model.id, model.category
                ))
            })?,
            created_at: model.created_at,
            settled: model.settled,
            group_id: model.group_id,
            items: from_json(&model.items, "expense items")?,
            splits: from_json(&model.splits, "expense splits")?,
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

    fn expense() -> Expense {
        Expense {
            id: 1,
            description: "Dinner".to_string(),
            amount: Money::new(3000),
            currency: Currency::Inr,
            paid_by: p("You"),
            category: Category::Food,
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
            settled: false,
            group_id: None,
            items: Vec::new(),
            splits: [(p("You"), Money::new(1500)), (p("Alice"), Money::new(1500))]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!(Category::try_from("food").unwrap(), Category::Food);
        assert_eq!("  TRAVEL ".parse::<Category>().unwrap(), Category::Travel);
        assert!(Category::try_from("Groceries").is_err());
        assert_eq!(Category::default(), Category::Other);
    }

    #[test]
    fn patch_revalidates_splits_on_amount_change() {
        let mut expense = expense();
        let err = expense
            .apply_patch(ExpensePatch {
                amount: Some(Money::new(4000)),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::AllocationMismatch {
                difference: Money::new(1000)
            }
        );
    }

    #[test]
    fn patch_merges_fields() {
        let mut expense = expense();
        expense
            .apply_patch(ExpensePatch {
                description: Some("  Late dinner ".to_string()),
                category: Some(Category::Entertainment),
                group_id: Some(Some(3)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(expense.description, "Late dinner");
        assert_eq!(expense.category, Category::Entertainment);
        assert_eq!(expense.group_id, Some(3));
        assert_eq!(expense.amount, Money::new(3000));
    }

    #[test]
    fn unknown_category_column_is_corrupted() {
        let model = Model {
            id: 7,
            description: "Dinner".to_string(),
            amount_minor: 3000,
            currency: Currency::Inr.code().to_string(),
            paid_by: "You".to_string(),
            category: "Groceries".to_string(),
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
            settled: false,
            group_id: None,
            items: "[]".to_string(),
            splits: r#"{"You":3000}"#.to_string(),
        };
        assert!(matches!(
            Expense::try_from(model),
            Err(EngineError::Corrupted(_))
        ));
    }

    #[test]
    fn collaborators_skip_primary() {
        let expense = expense();
        let names: Vec<&str> = expense.collaborators().map(Participant::as_str).collect();
        assert_eq!(names, vec!["Alice"]);
    }
}
