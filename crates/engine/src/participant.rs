//! Participants and typed split maps.

use std::{borrow::Borrow, collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine};

/// Name of the primary participant, the user running the application.
pub const PRIMARY_USER: &str = "You";

/// Largest gap tolerated between the sum of the splits and the expense total
/// (0.01 in the expense currency).
pub const SPLIT_TOLERANCE: Money = Money::new(1);

/// A named party of an expense split.
///
/// Names are trimmed and must not be empty; they are compared exactly.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Participant(String);

impl Participant {
    pub fn new(name: &str) -> ResultEngine<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidName(
                "participant name must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The primary participant ("You").
    #[must_use]
    pub fn primary() -> Self {
        Self(PRIMARY_USER.to_string())
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.0 == PRIMARY_USER
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Participant {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Participant {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Participant::new(&value)
    }
}

impl TryFrom<&str> for Participant {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Participant::new(value)
    }
}

impl From<Participant> for String {
    fn from(value: Participant) -> Self {
        value.0
    }
}

/// Owed amount per participant.
///
/// Keys are unique; a participant present with `Money::ZERO` is a valid,
/// explicit "owes nothing", distinct from an absent participant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Splits(BTreeMap<Participant, Money>);

impl Splits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the share of `participant`, returning the previous one.
    pub fn insert(&mut self, participant: Participant, amount: Money) -> Option<Money> {
        self.0.insert(participant, amount)
    }

    #[must_use]
    pub fn get(&self, participant: &str) -> Option<Money> {
        self.0.get(participant).copied()
    }

    #[must_use]
    pub fn contains(&self, participant: &str) -> bool {
        self.0.contains_key(participant)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Participant, Money)> {
        self.0.iter().map(|(participant, amount)| (participant, *amount))
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.0.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of every share.
    #[must_use]
    pub fn total(&self) -> Money {
        self.0.values().sum()
    }

    /// Sum of every share, failing with [`EngineError::InvalidAmount`]
    /// instead of overflowing.
    pub fn checked_total(&self) -> ResultEngine<Money> {
        self.0
            .values()
            .try_fold(Money::ZERO, |sum, amount| sum.checked_add(*amount))
            .ok_or_else(|| EngineError::InvalidAmount("split total is too large".to_string()))
    }

    pub(crate) fn get_mut(&mut self, participant: &str) -> Option<&mut Money> {
        self.0.get_mut(participant)
    }

    /// Checks the splits against an expense total.
    ///
    /// Shares must be non-negative and sum to `total` within
    /// [`SPLIT_TOLERANCE`].
    pub fn reconcile(&self, total: Money) -> ResultEngine<()> {
        if self.is_empty() {
            return Err(EngineError::InvalidSplit(
                "at least one participant is required".to_string(),
            ));
        }
        if let Some((participant, amount)) = self.iter().find(|(_, amount)| amount.is_negative())
        {
            return Err(EngineError::InvalidSplit(format!(
                "share of '{participant}' must not be negative, got {amount}"
            )));
        }
        let difference = total - self.checked_total()?;
        if difference.abs() > SPLIT_TOLERANCE {
            return Err(EngineError::AllocationMismatch { difference });
        }
        Ok(())
    }
}

impl FromIterator<(Participant, Money)> for Splits {
    fn from_iter<I: IntoIterator<Item = (Participant, Money)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Splits {
    type Item = (Participant, Money);
    type IntoIter = std::collections::btree_map::IntoIter<Participant, Money>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
