//! Per-group rollups of the balance ledger.
//!
//! Balances are pairwise, not per group: a balance of the user counts toward
//! every group its counterpart (`with_user`) belongs to. Someone who shares
//! two groups with the user therefore shows up in both rollups with the full
//! amount. Debts between two other members are not the user's and never
//! count.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{Balance, Expense, Group, Money, Participant};

/// Rollup of the balances of one group's members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBalance {
    pub group_id: i64,
    pub name: String,
    pub member_count: usize,
    /// Signed sum: positive means the group owes you overall.
    pub total_balance: Money,
    pub positive_balances: Money,
    /// Magnitude of the negative balances.
    pub negative_balances: Money,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBalanceView {
    /// Only groups whose total is not exactly zero.
    #[default]
    NonZero,
    All,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupSortKey {
    #[default]
    Name,
    Balance,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Filter and ordering for [`group_balances`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupBalanceQuery {
    pub view: GroupBalanceView,
    pub sort: GroupSortKey,
    pub order: SortOrder,
    /// Case-insensitive substring of the group name.
    pub search: Option<String>,
}

impl GroupBalanceQuery {
    #[must_use]
    pub fn all() -> Self {
        Self {
            view: GroupBalanceView::All,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sort(mut self, sort: GroupSortKey, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    #[must_use]
    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }
}

fn rollup(group: &Group, balances: &[Balance]) -> GroupBalance {
    let mut rollup = GroupBalance {
        group_id: group.id,
        name: group.name.clone(),
        member_count: group.members.len(),
        total_balance: Money::ZERO,
        positive_balances: Money::ZERO,
        negative_balances: Money::ZERO,
    };
    for balance in balances
        .iter()
        .filter(|balance| {
            balance.user_id.is_primary() && group.has_member(balance.with_user.as_str())
        })
    {
        rollup.total_balance += balance.amount;
        if balance.amount.is_positive() {
            rollup.positive_balances += balance.amount;
        } else {
            rollup.negative_balances += balance.amount.abs();
        }
    }
    rollup
}

/// Aggregates `balances` per group, then filters and sorts the rollups.
#[must_use]
pub fn group_balances(
    groups: &[Group],
    balances: &[Balance],
    query: &GroupBalanceQuery,
) -> Vec<GroupBalance> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|needle| !needle.is_empty())
        .map(str::to_lowercase);

    let mut rollups: Vec<GroupBalance> = groups
        .iter()
        .filter(|group| match &needle {
            Some(needle) => group.name.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .map(|group| rollup(group, balances))
        .filter(|rollup| query.view == GroupBalanceView::All || !rollup.total_balance.is_zero())
        .collect();

    rollups.sort_by(|a, b| {
        let ordering = match query.sort {
            GroupSortKey::Name => a.name.cmp(&b.name),
            GroupSortKey::Balance => a.total_balance.cmp(&b.total_balance),
        };
        let ordering = match query.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.group_id.cmp(&b.group_id))
    });
    rollups
}

/// Balance of one group member toward the primary participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub member: Participant,
    /// Positive: the member owes you.
    pub balance: Money,
}

/// Everything shown on a group's page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDetail {
    pub group: Group,
    /// Newest first.
    pub expenses: Vec<Expense>,
    pub total_spent: Money,
    pub your_balance: Money,
    pub members: Vec<MemberBalance>,
}

/// Builds a [`GroupDetail`] out of the group's expenses and the ledger.
#[must_use]
pub fn group_detail(group: Group, mut expenses: Vec<Expense>, balances: &[Balance]) -> GroupDetail {
    expenses.retain(|expense| expense.group_id == Some(group.id));
    expenses.sort_by(|a, b| match b.created_at.cmp(&a.created_at) {
        Ordering::Equal => b.id.cmp(&a.id),
        ordering => ordering,
    });
    let total_spent = expenses.iter().map(|expense| expense.amount).sum();

    let members: Vec<MemberBalance> = group
        .others()
        .map(|member| MemberBalance {
            member: member.clone(),
            balance: balances
                .iter()
                .filter(|balance| balance.user_id.is_primary() && balance.with_user == *member)
                .map(|balance| balance.amount)
                .sum(),
        })
        .collect();
    let your_balance = members.iter().map(|member| member.balance).sum();

    GroupDetail {
        group,
        expenses,
        total_spent,
        your_balance,
        members,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::Currency;

    fn p(name: &str) -> Participant {
        Participant::new(name).unwrap()
    }

    fn group(id: i64, name: &str, members: &[&str]) -> Group {
        Group {
            id,
            name: name.to_string(),
            members: members.iter().map(|member| p(member)).collect(),
            currency: Currency::Inr,
            last_used: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    fn balance(with_user: &str, minor: i64) -> Balance {
        Balance {
            id: 0,
            user_id: Participant::primary(),
            with_user: p(with_user),
            amount: Money::new(minor),
            currency: Currency::Inr,
            last_updated: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    #[test]
    fn trip_group_totals_signed_balances() {
        let groups = [group(1, "Trip", &["You", "Alice", "Bob"])];
        let balances = [balance("Alice", 5000), balance("Bob", -2000)];

        let rollups = group_balances(&groups, &balances, &GroupBalanceQuery::default());

        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].total_balance, Money::new(3000));
        assert_eq!(rollups[0].positive_balances, Money::new(5000));
        assert_eq!(rollups[0].negative_balances, Money::new(2000));
    }

    #[test]
    fn balances_between_others_stay_out_of_rollups() {
        let groups = [group(1, "Trip", &["You", "Alice", "Bob"])];
        let mut between_others = balance("Bob", 10000);
        between_others.user_id = p("Alice");
        let balances = [between_others, balance("Alice", -10000)];

        let rollups = group_balances(&groups, &balances, &GroupBalanceQuery::default());

        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].total_balance, Money::new(-10000));
        assert_eq!(rollups[0].positive_balances, Money::ZERO);
        assert_eq!(rollups[0].negative_balances, Money::new(10000));
    }

    #[test]
    fn shared_member_counts_in_every_group() {
        let groups = [
            group(1, "Trip", &["You", "Alice"]),
            group(2, "Flat", &["You", "Alice"]),
        ];
        let balances = [balance("Alice", 1000)];

        let rollups = group_balances(&groups, &balances, &GroupBalanceQuery::default());

        assert_eq!(rollups.len(), 2);
        assert!(rollups.iter().all(|r| r.total_balance == Money::new(1000)));
    }

    #[test]
    fn zero_groups_hidden_unless_all_view() {
        let groups = [
            group(1, "Trip", &["You", "Alice"]),
            group(2, "Empty", &["You"]),
        ];
        let balances = [balance("Alice", 1000)];

        let default = group_balances(&groups, &balances, &GroupBalanceQuery::default());
        assert_eq!(default.len(), 1);

        let all = group_balances(&groups, &balances, &GroupBalanceQuery::all());
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn sorts_by_balance_descending_and_searches() {
        let groups = [
            group(1, "Alpha", &["You", "Alice"]),
            group(2, "Beta", &["You", "Bob"]),
            group(3, "Gamma trip", &["You", "Carol"]),
        ];
        let balances = [
            balance("Alice", 100),
            balance("Bob", 900),
            balance("Carol", -500),
        ];

        let query = GroupBalanceQuery::default().sort(GroupSortKey::Balance, SortOrder::Desc);
        let names: Vec<String> = group_balances(&groups, &balances, &query)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Beta", "Alpha", "Gamma trip"]);

        let query = GroupBalanceQuery::all().search("TRIP");
        let found = group_balances(&groups, &balances, &query);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].group_id, 3);
    }
}
