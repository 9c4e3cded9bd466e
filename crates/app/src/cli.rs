//! Command line of `splitclear`.

use std::error::Error;

use chrono::{DateTime, Local, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{
    AddExpenseCmd, Balance, Category, Currency, Engine, Expense, ExpenseFilter, ExpenseStatus,
    GroupBalanceQuery, GroupBalanceView, GroupPatch, GroupSortKey, Money, NewGroup,
    LineItem, NewSettlement, Participant, PaymentMethod, Percent, SortOrder, SplitMethod,
};

use crate::settings::Settings;

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "splitclear")]
#[command(about = "Split shared expenses and keep track of who owes whom")]
pub struct Cli {
    /// Settings file; the `.toml` extension may be omitted.
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// SQLite file to use; `:memory:` for a throwaway database.
    #[arg(long, global = true, env = "SPLITCLEAR_DATABASE")]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage groups.
    Group(Group),
    /// Log and browse expenses.
    Expense(ExpenseArgs),
    /// Inspect and settle balances.
    Balance(BalanceArgs),
    /// Record payments.
    Settlement(SettlementArgs),
    /// Spending by category, per day and top collaborators.
    Insights {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Tell whether a settlement reminder is due, and log it when sent.
    Remind {
        /// When the last reminder went out (RFC 3339); defaults to the
        /// last one logged in the database.
        #[arg(long)]
        last: Option<DateTime<Utc>>,
    },
}

#[derive(Args, Debug)]
pub struct Group {
    #[command(subcommand)]
    command: GroupCommand,
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long = "member")]
        members: Vec<String>,
        #[arg(long)]
        currency: Option<Currency>,
    },
    List,
    Show {
        id: i64,
    },
    Rename {
        id: i64,
        name: String,
    },
    Delete {
        id: i64,
    },
    Touch {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct ExpenseArgs {
    #[command(subcommand)]
    command: ExpenseCommand,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SplitArg {
    Equal,
    Exact,
    Percent,
    Items,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    All,
    Settled,
    Pending,
}

impl From<StatusArg> for ExpenseStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::All => ExpenseStatus::All,
            StatusArg::Settled => ExpenseStatus::Settled,
            StatusArg::Pending => ExpenseStatus::Pending,
        }
    }
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    description: String,
    #[arg(long)]
    amount: Money,
    #[arg(long, default_value = engine::PRIMARY_USER)]
    paid_by: String,
    /// Other participants; "You" is always included.
    #[arg(long = "with")]
    with: Vec<String>,
    #[arg(long, value_enum, default_value_t = SplitArg::Equal)]
    split: SplitArg,
    /// `Name=value` pairs for exact or percent splits.
    #[arg(long = "share", value_parser = parse_share)]
    shares: Vec<(String, String)>,
    /// `Item=price[xQty][@Name,Name]` lines for an items split; an item
    /// without names is shared by every participant.
    #[arg(long = "item", value_parser = parse_item)]
    items: Vec<LineItem>,
    #[arg(long)]
    category: Option<Category>,
    #[arg(long)]
    group: Option<i64>,
    #[arg(long)]
    currency: Option<Currency>,
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    Add(AddArgs),
    List,
    Recent {
        #[arg(long, default_value_t = 5)]
        limit: u64,
    },
    Search {
        #[arg(long)]
        query: Option<String>,
        #[arg(long, value_enum, default_value_t = StatusArg::All)]
        status: StatusArg,
        #[arg(long)]
        category: Option<Category>,
    },
    Show {
        id: i64,
    },
    Delete {
        id: i64,
    },
    Settle {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct BalanceArgs {
    #[command(subcommand)]
    command: BalanceCommand,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    Name,
    Balance,
}

#[derive(Subcommand, Debug)]
enum BalanceCommand {
    List,
    Summary,
    /// Per-group rollup.
    Groups {
        /// Include groups whose balance is zero.
        #[arg(long)]
        all: bool,
        #[arg(long, value_enum, default_value_t = SortArg::Name)]
        sort: SortArg,
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        search: Option<String>,
    },
    /// Reset the balance with someone to zero without recording a payment.
    Settle {
        with: String,
    },
}

#[derive(Args, Debug)]
pub struct SettlementArgs {
    #[command(subcommand)]
    command: SettlementCommand,
}

#[derive(Subcommand, Debug)]
enum SettlementCommand {
    /// Pay off the whole balance with someone.
    Pay {
        with: String,
        #[arg(long)]
        method: Option<PaymentMethod>,
        #[arg(long = "expense")]
        expenses: Vec<i64>,
    },
    /// Record a payment without touching balances.
    Record {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: Money,
        #[arg(long)]
        method: Option<PaymentMethod>,
        #[arg(long)]
        currency: Option<Currency>,
    },
    List {
        #[arg(long)]
        user: Option<String>,
    },
}

fn parse_share(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected Name=value, got '{raw}'"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_item(raw: &str) -> Result<LineItem, String> {
    let (name, rest) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected Item=price, got '{raw}'"))?;
    let (price, assigned) = match rest.split_once('@') {
        Some((price, names)) => (price, names),
        None => (rest, ""),
    };
    let (price, quantity) = match price.split_once(['x', 'X']) {
        Some((price, quantity)) => (
            price,
            quantity
                .trim()
                .parse::<u32>()
                .map_err(|err| format!("invalid quantity '{quantity}': {err}"))?,
        ),
        None => (price, 1),
    };
    let unit_price = price.parse::<Money>().map_err(|err| err.to_string())?;
    let assigned_to = assigned
        .split(',')
        .filter(|name| !name.trim().is_empty())
        .map(|name| Participant::new(name).map_err(|err| err.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineItem::new(name.trim(), unit_price, quantity, assigned_to))
}

fn participant(name: &str) -> CliResult<Participant> {
    Ok(Participant::new(name)?)
}

fn participants(names: &[String]) -> CliResult<Vec<Participant>> {
    names.iter().map(|name| participant(name)).collect()
}

pub async fn run(engine: &Engine, settings: &Settings, command: Command) -> CliResult<()> {
    match command {
        Command::Group(Group { command }) => run_group(engine, settings, command).await,
        Command::Expense(ExpenseArgs { command }) => run_expense(engine, settings, command).await,
        Command::Balance(BalanceArgs { command }) => run_balance(engine, command).await,
        Command::Settlement(SettlementArgs { command }) => {
            run_settlement(engine, settings, command).await
        }
        Command::Insights { days } => run_insights(engine, settings, days).await,
        Command::Remind { last } => run_remind(engine, settings, last).await,
    }
}

async fn run_group(engine: &Engine, settings: &Settings, command: GroupCommand) -> CliResult<()> {
    match command {
        GroupCommand::Create {
            name,
            members,
            currency,
        } => {
            let group = engine
                .create_group(NewGroup::new(
                    name,
                    participants(&members)?,
                    currency.unwrap_or(settings.default_currency),
                ))
                .await?;
            println!("created group #{}: {}", group.id, group.name);
        }
        GroupCommand::List => {
            for group in engine.groups().await? {
                let members: Vec<&str> = group.members.iter().map(Participant::as_str).collect();
                println!(
                    "#{:<4} {:<20} {} [{}]",
                    group.id,
                    group.name,
                    group.currency,
                    members.join(", ")
                );
            }
        }
        GroupCommand::Show { id } => {
            let detail = engine.group_detail(id).await?;
            let currency = detail.group.currency;
            println!("{} ({} members)", detail.group.name, detail.group.members.len());
            println!("total spent:  {}", currency.format(detail.total_spent));
            println!("your balance: {}", currency.format(detail.your_balance));
            for member in &detail.members {
                println!("  {:<16} {}", member.member, currency.format(member.balance));
            }
            for expense in &detail.expenses {
                print_expense(expense);
            }
        }
        GroupCommand::Rename { id, name } => {
            let group = engine
                .update_group(
                    id,
                    GroupPatch {
                        name: Some(name),
                        ..Default::default()
                    },
                )
                .await?;
            println!("renamed group #{} to {}", group.id, group.name);
        }
        GroupCommand::Delete { id } => {
            engine.delete_group(id).await?;
            println!("deleted group #{id}");
        }
        GroupCommand::Touch { id } => {
            let group = engine.touch_group(id).await?;
            println!("group #{} last used {}", group.id, group.last_used);
        }
    }
    Ok(())
}

fn split_method(
    split: SplitArg,
    shares: &[(String, String)],
    items: &[LineItem],
    everyone: &[Participant],
) -> CliResult<SplitMethod> {
    let method = match split {
        SplitArg::Equal => SplitMethod::Equal,
        SplitArg::Exact => SplitMethod::Exact(
            shares
                .iter()
                .map(|(name, value)| Ok((participant(name)?, value.parse::<Money>()?)))
                .collect::<CliResult<_>>()?,
        ),
        SplitArg::Percent => SplitMethod::Percentage(
            shares
                .iter()
                .map(|(name, value)| Ok((participant(name)?, value.parse::<Percent>()?)))
                .collect::<CliResult<_>>()?,
        ),
        SplitArg::Items => SplitMethod::Items(
            items
                .iter()
                .cloned()
                .map(|mut item| {
                    if item.assigned_to.is_empty() {
                        item.assigned_to = everyone.to_vec();
                    }
                    item
                })
                .collect(),
        ),
    };
    Ok(method)
}

fn print_expense(expense: &Expense) {
    let status = if expense.settled { "settled" } else { "pending" };
    println!(
        "#{:<4} {} {:<24} {:>12} paid by {:<10} {:<13} {}",
        expense.id,
        expense.created_at.format("%Y-%m-%d"),
        expense.description,
        expense.currency.format(expense.amount),
        expense.paid_by,
        expense.category,
        status
    );
}

async fn run_expense(
    engine: &Engine,
    settings: &Settings,
    command: ExpenseCommand,
) -> CliResult<()> {
    match command {
        ExpenseCommand::Add(args) => {
            let paid_by = participant(&args.paid_by)?;
            let with = participants(&args.with)?;
            let mut everyone = vec![Participant::primary()];
            for name in with.iter().chain([&paid_by]) {
                if !everyone.contains(name) {
                    everyone.push(name.clone());
                }
            }
            let method = split_method(args.split, &args.shares, &args.items, &everyone)?;
            let mut cmd = AddExpenseCmd::new(args.description, args.amount, paid_by)
                .currency(args.currency.unwrap_or(settings.default_currency))
                .participants(with)
                .method(method);
            if let Some(category) = args.category {
                cmd = cmd.category(category);
            }
            if let Some(group) = args.group {
                cmd = cmd.group(group);
            }
            let expense = engine.add_expense(cmd).await?;
            print_expense(&expense);
            for (participant, share) in expense.splits.iter() {
                println!("  {:<16} {}", participant, expense.currency.format(share));
            }
        }
        ExpenseCommand::List => {
            for expense in engine.list_expenses().await? {
                print_expense(&expense);
            }
        }
        ExpenseCommand::Recent { limit } => {
            for expense in engine.recent_expenses(limit).await? {
                print_expense(&expense);
            }
        }
        ExpenseCommand::Search {
            query,
            status,
            category,
        } => {
            let filter = ExpenseFilter {
                query,
                status: status.into(),
                category,
            };
            for expense in engine.search_expenses(&filter).await? {
                print_expense(&expense);
            }
        }
        ExpenseCommand::Show { id } => {
            let expense = engine.expense(id).await?;
            print_expense(&expense);
            for item in &expense.items {
                let assigned: Vec<&str> =
                    item.assigned_to.iter().map(Participant::as_str).collect();
                println!(
                    "  item {} {} x{} [{}]",
                    item.name,
                    expense.currency.format(item.unit_price),
                    item.quantity,
                    assigned.join(", ")
                );
            }
            for (participant, share) in expense.splits.iter() {
                println!("  {:<16} {}", participant, expense.currency.format(share));
            }
        }
        ExpenseCommand::Delete { id } => {
            engine.delete_expense(id).await?;
            println!("deleted expense #{id}");
        }
        ExpenseCommand::Settle { id } => {
            let expense = engine.mark_expense_settled(id).await?;
            print_expense(&expense);
        }
    }
    Ok(())
}

fn print_balance(balance: &Balance) {
    let line = match balance.debtor_and_creditor() {
        Some((debtor, creditor)) => format!(
            "{debtor} owes {creditor} {}",
            balance.currency.format(balance.amount.abs())
        ),
        None => format!("{} and {} are settled up", balance.user_id, balance.with_user),
    };
    println!("#{:<4} {line}", balance.id);
}

async fn run_balance(engine: &Engine, command: BalanceCommand) -> CliResult<()> {
    match command {
        BalanceCommand::List => {
            for balance in engine.balances().await? {
                print_balance(&balance);
            }
        }
        BalanceCommand::Summary => {
            let summary = engine.balance_summary().await?;
            println!("owed to you: {}", summary.owed_to_you);
            println!("you owe:     {}", summary.you_owe);
            println!("net:         {}", summary.net_balance);
        }
        BalanceCommand::Groups {
            all,
            sort,
            desc,
            search,
        } => {
            let query = GroupBalanceQuery {
                view: if all {
                    GroupBalanceView::All
                } else {
                    GroupBalanceView::NonZero
                },
                sort: match sort {
                    SortArg::Name => GroupSortKey::Name,
                    SortArg::Balance => GroupSortKey::Balance,
                },
                order: if desc { SortOrder::Desc } else { SortOrder::Asc },
                search,
            };
            for rollup in engine.group_balances(&query).await? {
                println!(
                    "#{:<4} {:<20} {:>10} (+{} / -{})",
                    rollup.group_id,
                    rollup.name,
                    rollup.total_balance,
                    rollup.positive_balances,
                    rollup.negative_balances
                );
            }
        }
        BalanceCommand::Settle { with } => {
            match engine
                .settle(&Participant::primary(), &participant(&with)?)
                .await?
            {
                Some(balance) => print_balance(&balance),
                None => println!("no balance with {with}"),
            }
        }
    }
    Ok(())
}

async fn run_settlement(
    engine: &Engine,
    settings: &Settings,
    command: SettlementCommand,
) -> CliResult<()> {
    match command {
        SettlementCommand::Pay {
            with,
            method,
            expenses,
        } => {
            let with = participant(&with)?;
            let balance = engine
                .balance_between(&Participant::primary(), &with)
                .await?
                .ok_or_else(|| format!("no balance with {with}"))?;
            let settlement = engine.settle_payment(&balance, method, expenses).await?;
            println!(
                "{} paid {} {} via {}",
                settlement.from,
                settlement.to,
                settlement.currency.format(settlement.amount),
                settlement.method
            );
        }
        SettlementCommand::Record {
            from,
            to,
            amount,
            method,
            currency,
        } => {
            let settlement = engine
                .create_settlement(NewSettlement {
                    from: participant(&from)?,
                    to: participant(&to)?,
                    amount,
                    currency: currency.unwrap_or(settings.default_currency),
                    method,
                    related_expenses: Vec::new(),
                })
                .await?;
            println!("recorded settlement #{}", settlement.id);
        }
        SettlementCommand::List { user } => {
            let settlements = match user {
                Some(user) => engine.settlements_by_user(&participant(&user)?).await?,
                None => engine.settlements().await?,
            };
            for settlement in settlements {
                println!(
                    "#{:<4} {} {} -> {} {} ({})",
                    settlement.id,
                    settlement.settled_at.format("%Y-%m-%d"),
                    settlement.from,
                    settlement.to,
                    settlement.currency.format(settlement.amount),
                    settlement.method
                );
            }
        }
    }
    Ok(())
}

async fn run_insights(engine: &Engine, settings: &Settings, days: u32) -> CliResult<()> {
    let currency = settings.default_currency;

    println!("By category:");
    for (category, total) in engine.category_totals().await? {
        println!("  {:<14} {}", category, currency.format(total));
    }

    println!("Last {days} days:");
    for day in engine.daily_totals(days).await? {
        println!("  {} {}", day.date, currency.format(day.total));
    }

    println!("Top collaborators:");
    for collaborator in engine.collaborator_frequency().await? {
        println!("  {:<16} {}", collaborator.name, collaborator.count);
    }
    Ok(())
}

async fn run_remind(
    engine: &Engine,
    settings: &Settings,
    last: Option<DateTime<Utc>>,
) -> CliResult<()> {
    let policy = settings.reminders.policy()?;
    let now = Local::now();
    let pending = engine.pending_settlements().await?;
    let last = match last {
        Some(last) => Some(last),
        None => engine.last_reminder().await?.map(|sent| sent.sent_at),
    };

    if !policy.should_notify(last, &now) {
        let next = policy.next_notification_at(last, now.with_timezone(&Utc));
        tracing::debug!(enabled = policy.enabled, %next, "no reminder due");
        println!("no reminder due; next check after {}", next.with_timezone(&Local));
        return Ok(());
    }
    if pending.is_empty() {
        println!("nothing pending");
        return Ok(());
    }
    println!("{}", pending.message(settings.default_currency));
    let sent = engine.record_reminder(&pending).await?;
    tracing::info!(id = sent.id, count = pending.count, "reminder sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_needs_name_and_value() {
        assert_eq!(
            parse_share("Alice = 40").unwrap(),
            ("Alice".to_string(), "40".to_string())
        );
        assert!(parse_share("Alice").is_err());
    }

    #[test]
    fn exact_shares_become_amounts() {
        let shares = vec![
            ("You".to_string(), "40".to_string()),
            ("Alice".to_string(), "60".to_string()),
        ];
        let method = split_method(SplitArg::Exact, &shares, &[], &[]).unwrap();
        assert_eq!(
            method,
            SplitMethod::Exact(vec![
                (Participant::primary(), Money::new(4000)),
                (Participant::new("Alice").unwrap(), Money::new(6000)),
            ])
        );
        let bad = [("Bob".to_string(), "x".to_string())];
        assert!(split_method(SplitArg::Percent, &bad, &[], &[]).is_err());
    }

    #[test]
    fn items_parse_price_quantity_and_names() {
        let item = parse_item("Pizza = 12.50x2@Alice, Bob").unwrap();
        assert_eq!(item.name, "Pizza");
        assert_eq!(item.unit_price, Money::new(1250));
        assert_eq!(item.quantity, 2);
        assert_eq!(
            item.assigned_to,
            vec![
                Participant::new("Alice").unwrap(),
                Participant::new("Bob").unwrap()
            ]
        );
        assert!(parse_item("Pizza").is_err());
        assert!(parse_item("Pizza=1x-1").is_err());
    }

    #[test]
    fn unassigned_items_go_to_everyone() {
        let everyone = vec![Participant::primary(), Participant::new("Neha").unwrap()];
        let items = vec![
            parse_item("Wine=30").unwrap(),
            parse_item("Cake=10@Neha").unwrap(),
        ];
        let SplitMethod::Items(items) =
            split_method(SplitArg::Items, &[], &items, &everyone).unwrap()
        else {
            panic!("expected an items split");
        };
        assert_eq!(items[0].assigned_to, everyone);
        assert_eq!(items[1].assigned_to, vec![Participant::new("Neha").unwrap()]);
    }

    #[test]
    fn cli_parses_expense_add() {
        let cli = Cli::try_parse_from([
            "splitclear",
            "expense",
            "add",
            "--description",
            "Dinner",
            "--amount",
            "850",
            "--with",
            "Neha",
            "--with",
            "Samir",
        ])
        .unwrap();
        let Command::Expense(ExpenseArgs {
            command: ExpenseCommand::Add(args),
        }) = cli.command
        else {
            panic!("expected expense add");
        };
        assert_eq!(args.amount, Money::new(85000));
        assert_eq!(args.with, vec!["Neha", "Samir"]);
        assert_eq!(args.paid_by, "You");
    }
}
