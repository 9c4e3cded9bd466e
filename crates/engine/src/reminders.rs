//! Settlement reminder policy.
//!
//! The engine only decides *whether* a reminder is due and what it says;
//! delivering it (desktop notification, chat message, ...) is up to the
//! caller.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{Balance, Currency, EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderFrequency {
    Daily,
    #[default]
    Weekly,
    BiWeekly,
    Monthly,
}

impl ReminderFrequency {
    #[must_use]
    pub fn interval(self) -> TimeDelta {
        match self {
            Self::Daily => TimeDelta::days(1),
            Self::Weekly => TimeDelta::days(7),
            Self::BiWeekly => TimeDelta::days(14),
            Self::Monthly => TimeDelta::days(30),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::BiWeekly => "bi-weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for ReminderFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderFrequency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "bi-weekly" | "biweekly" => Ok(Self::BiWeekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::InvalidName(format!(
                "unknown reminder frequency: {other}"
            ))),
        }
    }
}

/// A daily window during which no reminder is sent.
///
/// Both bounds are inclusive at minute precision. `start > end` means the
/// window wraps around midnight (e.g. 22:00 to 07:00).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    #[must_use]
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parses two `HH:MM` strings.
    pub fn parse(start: &str, end: &str) -> ResultEngine<Self> {
        let parse = |value: &str| {
            NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|err| {
                EngineError::InvalidName(format!("invalid quiet hours time '{value}': {err}"))
            })
        };
        Ok(Self::new(parse(start)?, parse(end)?))
    }

    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        let minute = |t: NaiveTime| t.hour() * 60 + t.minute();
        let (start, end, now) = (minute(self.start), minute(self.end), minute(time));
        if start <= end {
            (start..=end).contains(&now)
        } else {
            now >= start || now <= end
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPolicy {
    pub enabled: bool,
    pub frequency: ReminderFrequency,
    pub quiet_hours: Option<QuietHours>,
}

impl ReminderPolicy {
    /// Whether a reminder should go out at `now`.
    ///
    /// Quiet hours are evaluated in the time zone of `now`.
    pub fn should_notify<Tz: TimeZone>(
        &self,
        last_notified: Option<DateTime<Utc>>,
        now: &DateTime<Tz>,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(quiet) = self.quiet_hours
            && quiet.contains(now.time())
        {
            return false;
        }
        match last_notified {
            None => true,
            Some(last) => now.with_timezone(&Utc) - last >= self.frequency.interval(),
        }
    }

    /// When the next reminder becomes due; `now` if none was ever sent.
    #[must_use]
    pub fn next_notification_at(
        &self,
        last_notified: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        last_notified.map_or(now, |last| last + self.frequency.interval())
    }
}

/// Money other participants still owe the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSettlements {
    pub count: usize,
    pub total: Money,
}

impl PendingSettlements {
    #[must_use]
    pub fn from_balances(balances: &[Balance]) -> Self {
        balances
            .iter()
            .filter(|balance| balance.user_id.is_primary() && balance.amount.is_positive())
            .fold(Self::default(), |acc, balance| Self {
                count: acc.count + 1,
                total: acc.total + balance.amount,
            })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Reminder text, e.g. "You have 2 pending settlements totaling ₹70.00".
    #[must_use]
    pub fn message(&self, currency: Currency) -> String {
        let plural = if self.count == 1 { "" } else { "s" };
        format!(
            "You have {} pending settlement{plural} totaling {}",
            self.count,
            currency.format(self.total)
        )
    }
}

/// A reminder that was delivered, with the digest it carried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentReminder {
    pub id: i64,
    pub sent_at: DateTime<Utc>,
    pub pending: PendingSettlements,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reminder_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sent_at: DateTimeUtc,
    pub pending_count: i32,
    pub pending_total_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn new_row(
        pending: &PendingSettlements,
        sent_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let count = i32::try_from(pending.count).map_err(|_| {
            EngineError::InvalidAmount(format!("{} pending settlements", pending.count))
        })?;
        Ok(Self {
            id: ActiveValue::NotSet,
            sent_at: ActiveValue::Set(sent_at),
            pending_count: ActiveValue::Set(count),
            pending_total_minor: ActiveValue::Set(pending.total.minor()),
        })
    }
}

impl TryFrom<Model> for SentReminder {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let count = usize::try_from(model.pending_count).map_err(|_| {
            EngineError::Corrupted(format!("reminder {} has a negative count", model.id))
        })?;
        Ok(Self {
            id: model.id,
            sent_at: model.sent_at,
            pending: PendingSettlements {
                count,
                total: Money::new(model.pending_total_minor),
            },
        })
    }
}
