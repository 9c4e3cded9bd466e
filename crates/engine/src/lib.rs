//! Expense splitting engine.
//!
//! [`Engine`] logs shared expenses, divides them among participants
//! ([`allocate`]), keeps a pairwise [`Balance`] ledger and records
//! [`Settlement`]s. State lives in a `sea_orm` database; pure computations
//! (allocation, rollups, insights, reminder policy) are free functions usable
//! without one.

pub use balances::{Balance, BalanceSummary};
pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::AddExpenseCmd;
pub use currency::Currency;
pub use error::EngineError;
pub use expenses::{Category, Expense, ExpenseDraft, ExpensePatch};
pub use groups::{Group, GroupPatch, NewGroup};
pub use insights::{
    COLLABORATOR_LIMIT, Collaborator, DailyTotal, ExpenseFilter, ExpenseStatus, category_totals,
    collaborator_frequency, daily_totals,
};
pub use money::{Money, Percent};
pub use ops::{Engine, EngineBuilder};
pub use participant::{PRIMARY_USER, Participant, SPLIT_TOLERANCE, Splits};
pub use reminders::{
    PendingSettlements, QuietHours, ReminderFrequency, ReminderPolicy, SentReminder,
};
pub use settlements::{NewSettlement, PaymentMethod, Settlement};
pub use split::{LineItem, SplitMethod, allocate};
pub use summary::{
    GroupBalance, GroupBalanceQuery, GroupBalanceView, GroupDetail, GroupSortKey, MemberBalance,
    SortOrder, group_balances, group_detail,
};

mod balances;
mod clock;
mod commands;
mod currency;
mod error;
mod expenses;
mod groups;
mod insights;
mod money;
mod ops;
mod participant;
mod reminders;
mod settlements;
mod split;
mod summary;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
