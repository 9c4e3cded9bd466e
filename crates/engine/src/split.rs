//! Split allocation.
//!
//! [`allocate`] turns an expense total, a participant set and a
//! [`SplitMethod`] into [`Splits`]. It is a pure function: it never touches
//! the database and the same input always yields the same output.
//!
//! All arithmetic is done in minor units. Rounding residue is never dropped:
//! it lands on the primary participant (or on the first assignee of a line
//! item), so an accepted split always reconciles with its total.

use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Money, Participant, Percent, ResultEngine, SPLIT_TOLERANCE, Splits,
};

/// How an expense total is divided.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SplitMethod {
    /// Everyone pays `total / n`.
    #[default]
    Equal,
    /// Explicit amount per participant ("itemized" amounts).
    Exact(Vec<(Participant, Money)>),
    /// Percentage per participant, summing to 100%.
    Percentage(Vec<(Participant, Percent)>),
    /// Each line item is shared equally among the participants assigned to it.
    Items(Vec<LineItem>),
}

impl SplitMethod {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Exact(_) => "itemized",
            Self::Percentage(_) => "percentage",
            Self::Items(_) => "items",
        }
    }
}

/// A line of a receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub assigned_to: Vec<Participant>,
}

impl LineItem {
    pub fn new(
        name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
        assigned_to: Vec<Participant>,
    ) -> Self {
        Self {
            name: name.into(),
            unit_price,
            quantity,
            assigned_to,
        }
    }

    /// `unit_price × quantity`.
    pub fn cost(&self) -> ResultEngine<Money> {
        self.unit_price
            .checked_mul(i64::from(self.quantity))
            .ok_or_else(|| EngineError::InvalidAmount(format!("item '{}' too large", self.name)))
    }
}

/// Computes the share of each participant.
///
/// The primary participant is always part of the result; names listed in
/// `participants` appear in the output even when their share is zero.
pub fn allocate(
    total: Money,
    participants: &[Participant],
    method: &SplitMethod,
) -> ResultEngine<Splits> {
    if !total.is_positive() {
        return Err(EngineError::InvalidAmount(format!(
            "total must be > 0, got {total}"
        )));
    }

    let mut splits: Splits = participant_set(participants)
        .into_iter()
        .map(|participant| (participant, Money::ZERO))
        .collect();

    match method {
        SplitMethod::Equal => allocate_equal(total, &mut splits),
        SplitMethod::Exact(amounts) => allocate_exact(total, amounts, &mut splits)?,
        SplitMethod::Percentage(percentages) => {
            allocate_percentage(total, percentages, &mut splits)?
        }
        SplitMethod::Items(items) => allocate_items(total, items, &mut splits)?,
    }

    Ok(splits)
}

/// Primary participant first, then `participants` in order, without
/// duplicates.
fn participant_set(participants: &[Participant]) -> Vec<Participant> {
    let mut set = vec![Participant::primary()];
    for participant in participants {
        if !set.contains(participant) {
            set.push(participant.clone());
        }
    }
    set
}

fn allocate_equal(total: Money, splits: &mut Splits) {
    let (share, remainder) = total.split_even(splits.len());
    let participants: Vec<Participant> = splits.participants().cloned().collect();
    for participant in participants {
        let amount = if participant.is_primary() {
            share + remainder
        } else {
            share
        };
        splits.insert(participant, amount);
    }
}

fn allocate_exact(
    total: Money,
    amounts: &[(Participant, Money)],
    splits: &mut Splits,
) -> ResultEngine<()> {
    let mut seen: Vec<&Participant> = Vec::with_capacity(amounts.len());
    for (participant, amount) in amounts {
        if amount.is_negative() {
            return Err(EngineError::InvalidSplit(format!(
                "amount for '{participant}' must not be negative"
            )));
        }
        if seen.contains(&participant) {
            return Err(EngineError::InvalidSplit(format!(
                "'{participant}' listed more than once"
            )));
        }
        seen.push(participant);
        splits.insert(participant.clone(), *amount);
    }

    let difference = total - splits.checked_total()?;
    if difference.abs() > SPLIT_TOLERANCE {
        tracing::warn!(%difference, "itemized split does not match total");
        return Err(EngineError::AllocationMismatch { difference });
    }
    Ok(())
}

fn allocate_percentage(
    total: Money,
    percentages: &[(Participant, Percent)],
    splits: &mut Splits,
) -> ResultEngine<()> {
    let mut seen: Vec<&Participant> = Vec::with_capacity(percentages.len());
    for (participant, percent) in percentages {
        if percent.hundredths() < 0 {
            return Err(EngineError::InvalidSplit(format!(
                "percentage for '{participant}' must not be negative"
            )));
        }
        if seen.contains(&participant) {
            return Err(EngineError::InvalidSplit(format!(
                "'{participant}' listed more than once"
            )));
        }
        seen.push(participant);
    }

    let allocated = percentages
        .iter()
        .try_fold(Percent::ZERO, |sum, (_, percent)| sum.checked_add(*percent))
        .ok_or_else(|| EngineError::InvalidAmount("percentages are too large".to_string()))?;
    let difference = Percent::HUNDRED - allocated;
    if difference.abs() > Percent::new(1) {
        tracing::warn!(%difference, "percentage split does not total 100%");
        return Err(EngineError::PercentageMismatch { difference });
    }

    for (participant, percent) in percentages {
        splits.insert(participant.clone(), total.percent_of(*percent));
    }

    // Only an exact 100% owes the whole total; otherwise the accepted
    // percentage drift stays visible in the shares.
    if difference == Percent::ZERO {
        let residue = total - splits.checked_total()?;
        if !residue.is_zero() {
            absorb_residue(splits, residue);
        }
    }
    Ok(())
}

/// Puts a rounding residue on the primary participant, or on the largest
/// share when that would make the primary share negative.
fn absorb_residue(splits: &mut Splits, residue: Money) {
    let primary = Participant::primary();
    if let Some(share) = splits.get_mut(primary.as_str())
        && !(*share + residue).is_negative()
    {
        *share += residue;
        return;
    }

    let largest = splits
        .iter()
        .max_by_key(|(_, amount)| *amount)
        .map(|(participant, _)| participant.clone());
    if let Some(participant) = largest
        && let Some(share) = splits.get_mut(participant.as_str())
    {
        *share += residue;
    }
}

fn allocate_items(total: Money, items: &[LineItem], splits: &mut Splits) -> ResultEngine<()> {
    if items.is_empty() {
        return Err(EngineError::InvalidSplit(
            "at least one item is required".to_string(),
        ));
    }

    for item in items {
        let cost = item.cost()?;
        if cost.is_negative() {
            return Err(EngineError::InvalidSplit(format!(
                "item '{}' must not have a negative price",
                item.name
            )));
        }
        let assignees = participant_list(&item.assigned_to);
        let Some(first) = assignees.first() else {
            return Err(EngineError::InvalidSplit(format!(
                "item '{}' has no assigned participant",
                item.name
            )));
        };
        let first = first.clone();

        let (share, remainder) = cost.split_even(assignees.len());
        for participant in assignees {
            let amount = if participant == first {
                share + remainder
            } else {
                share
            };
            let current = splits.get(participant.as_str()).unwrap_or(Money::ZERO);
            let updated = current.checked_add(amount).ok_or_else(|| {
                EngineError::InvalidAmount(format!("share of '{participant}' is too large"))
            })?;
            splits.insert(participant, updated);
        }
    }

    let difference = total - splits.checked_total()?;
    if difference.abs() > SPLIT_TOLERANCE {
        tracing::warn!(%difference, "line items do not match total");
        return Err(EngineError::AllocationMismatch { difference });
    }
    Ok(())
}

fn participant_list(participants: &[Participant]) -> Vec<Participant> {
    let mut list: Vec<Participant> = Vec::with_capacity(participants.len());
    for participant in participants {
        if !list.contains(participant) {
            list.push(participant.clone());
        }
    }
    list
}
