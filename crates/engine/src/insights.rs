//! Aggregates over the expense history.
//!
//! Everything here is recomputed from the full expense list on each call.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Category, Expense, Money};

/// How many collaborators [`collaborator_frequency`] returns.
pub const COLLABORATOR_LIMIT: usize = 5;

/// Total spent per category. Categories without expenses are absent.
#[must_use]
pub fn category_totals(expenses: &[Expense]) -> BTreeMap<Category, Money> {
    let mut totals = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category).or_insert(Money::ZERO) += expense.amount;
    }
    totals
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: Money,
}

/// Spending of the `days` calendar days (UTC) ending on `today`, oldest
/// first. Days without expenses are reported with a zero total.
#[must_use]
pub fn daily_totals(expenses: &[Expense], today: NaiveDate, days: u32) -> Vec<DailyTotal> {
    let mut by_day: HashMap<NaiveDate, Money> = HashMap::new();
    for expense in expenses {
        *by_day
            .entry(expense.created_at.date_naive())
            .or_insert(Money::ZERO) += expense.amount;
    }

    (0..days)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(u64::from(back))))
        .map(|date| DailyTotal {
            date,
            total: by_day.get(&date).copied().unwrap_or(Money::ZERO),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub name: String,
    /// Number of expenses the participant appears in.
    pub count: usize,
}

/// The participants the user splits with most often.
#[must_use]
pub fn collaborator_frequency(expenses: &[Expense]) -> Vec<Collaborator> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for expense in expenses {
        for participant in expense.collaborators() {
            *counts.entry(participant.as_str()).or_default() += 1;
        }
    }

    let mut collaborators: Vec<Collaborator> = counts
        .into_iter()
        .map(|(name, count)| Collaborator {
            name: name.to_string(),
            count,
        })
        .collect();
    collaborators.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    collaborators.truncate(COLLABORATOR_LIMIT);
    collaborators
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseStatus {
    #[default]
    All,
    Settled,
    Pending,
}

/// History filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    /// Case-insensitive substring of the description or the payer.
    pub query: Option<String>,
    pub status: ExpenseStatus,
    pub category: Option<Category>,
}

impl ExpenseFilter {
    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: ExpenseStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn matches(&self, expense: &Expense) -> bool {
        let status = match self.status {
            ExpenseStatus::All => true,
            ExpenseStatus::Settled => expense.settled,
            ExpenseStatus::Pending => !expense.settled,
        };
        let category = self
            .category
            .is_none_or(|category| category == expense.category);
        let text = match self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|query| !query.is_empty())
        {
            Some(query) => {
                let query = query.to_lowercase();
                expense.description.to_lowercase().contains(&query)
                    || expense.paid_by.as_str().to_lowercase().contains(&query)
            }
            None => true,
        };
        status && category && text
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{Currency, Participant, Splits};

    fn expense(
        id: i64,
        description: &str,
        minor: i64,
        category: Category,
        day: u32,
        with: &[&str],
    ) -> Expense {
        let mut splits = Splits::new();
        splits.insert(Participant::primary(), Money::ZERO);
        for name in with {
            splits.insert(Participant::new(name).unwrap(), Money::ZERO);
        }
        Expense {
            id,
            description: description.to_string(),
            amount: Money::new(minor),
            currency: Currency::Inr,
            paid_by: Participant::primary(),
            category,
            created_at: Utc.with_ymd_and_hms(2026, 10, day, 18, 30, 0).unwrap(),
            settled: false,
            group_id: None,
            items: vec![],
            splits,
        }
    }

    #[test]
    fn category_totals_sum_per_category() {
        let expenses = [
            expense(1, "Lunch", 1000, Category::Food, 15, &[]),
            expense(2, "Dinner", 2500, Category::Food, 16, &[]),
            expense(3, "Cab", 700, Category::Transport, 16, &[]),
        ];
        let totals = category_totals(&expenses);
        assert_eq!(totals[&Category::Food], Money::new(3500));
        assert_eq!(totals[&Category::Transport], Money::new(700));
        assert!(!totals.contains_key(&Category::Bills));
    }

    #[test]
    fn daily_totals_are_zero_filled_oldest_first() {
        let expenses = [
            expense(1, "Lunch", 1000, Category::Food, 15, &[]),
            expense(2, "Dinner", 2500, Category::Food, 17, &[]),
            expense(3, "Cab", 700, Category::Transport, 17, &[]),
            expense(4, "Old", 9900, Category::Other, 1, &[]),
        ];
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let daily = daily_totals(&expenses, today, 3);

        let totals: Vec<(u32, i64)> = daily
            .iter()
            .map(|d| (chrono::Datelike::day(&d.date), d.total.minor()))
            .collect();
        assert_eq!(totals, vec![(15, 1000), (16, 0), (17, 3200)]);
        assert!(daily_totals(&expenses, today, 0).is_empty());
    }

    #[test]
    fn collaborators_ranked_by_count_then_name() {
        let expenses = [
            expense(1, "a", 100, Category::Food, 1, &["Zoe", "Bob"]),
            expense(2, "b", 100, Category::Food, 1, &["Zoe", "Amy"]),
            expense(3, "c", 100, Category::Food, 1, &["Bob", "Cid", "Dan", "Eve"]),
        ];
        let ranked: Vec<(String, usize)> = collaborator_frequency(&expenses)
            .into_iter()
            .map(|c| (c.name, c.count))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("Bob".to_string(), 2),
                ("Zoe".to_string(), 2),
                ("Amy".to_string(), 1),
                ("Cid".to_string(), 1),
                ("Dan".to_string(), 1),
            ]
        );
    }

    #[test]
    fn filter_combines_text_status_and_category() {
        let mut settled = expense(1, "Team dinner", 100, Category::Food, 1, &[]);
        settled.settled = true;
        let pending = expense(2, "Taxi", 100, Category::Transport, 1, &[]);

        let by_text = ExpenseFilter::default().query("DINNER");
        assert!(by_text.matches(&settled));
        assert!(!by_text.matches(&pending));

        let by_payer = ExpenseFilter::default().query("you");
        assert!(by_payer.matches(&pending));

        let pending_only = ExpenseFilter::default().status(ExpenseStatus::Pending);
        assert!(!pending_only.matches(&settled));
        assert!(pending_only.matches(&pending));

        let transport = ExpenseFilter::default().category(Category::Transport);
        assert!(transport.matches(&pending));
        assert!(!transport.matches(&settled));
    }
}
