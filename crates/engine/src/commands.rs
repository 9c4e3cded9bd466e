//! Command structs for engine operations.
//!
//! These types group the parameters of multi-step writes, keeping call sites
//! readable and avoiding long argument lists.

use crate::{Category, Currency, LineItem, Money, Participant, SplitMethod};

/// Allocate, store and book a new expense.
///
/// When no line item is given, the expense gets a single item named after
/// the description, worth the whole amount and assigned to every
/// participant.
#[derive(Clone, Debug)]
pub struct AddExpenseCmd {
    pub description: String,
    pub amount: Money,
    pub currency: Currency,
    pub paid_by: Participant,
    pub participants: Vec<Participant>,
    pub method: SplitMethod,
    pub category: Option<Category>,
    pub group_id: Option<i64>,
    pub items: Vec<LineItem>,
}

impl AddExpenseCmd {
    #[must_use]
    pub fn new(description: impl Into<String>, amount: Money, paid_by: Participant) -> Self {
        Self {
            description: description.into(),
            amount,
            currency: Currency::default(),
            paid_by,
            participants: Vec::new(),
            method: SplitMethod::Equal,
            category: None,
            group_id: None,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn participant(mut self, participant: Participant) -> Self {
        self.participants.push(participant);
        self
    }

    #[must_use]
    pub fn participants(mut self, participants: impl IntoIterator<Item = Participant>) -> Self {
        self.participants.extend(participants);
        self
    }

    #[must_use]
    pub fn method(mut self, method: SplitMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    #[must_use]
    pub fn item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    /// Line items to store: the explicit ones, those of an items split, or
    /// the default single item.
    pub(crate) fn line_items(&self, participants: Vec<Participant>) -> Vec<LineItem> {
        if !self.items.is_empty() {
            return self.items.clone();
        }
        if let SplitMethod::Items(items) = &self.method {
            return items.clone();
        }
        vec![LineItem::new(
            self.description.trim(),
            self.amount,
            1,
            participants,
        )]
    }
}
