use std::sync::Arc;

use chrono::{TimeDelta, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    AddExpenseCmd, Clock, Currency, Engine, EngineError, FixedClock, GroupBalanceQuery,
    GroupPatch, GroupSortKey, Money, NewGroup, Participant, SortOrder,
};
use migration::MigratorTrait;

async fn engine_with_clock() -> (Engine, Arc<FixedClock>, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap(),
    ));
    let engine = Engine::builder()
        .database(db.clone())
        .clock(clock.clone())
        .build()
        .await
        .unwrap();
    (engine, clock, db)
}

fn p(name: &str) -> Participant {
    Participant::new(name).unwrap()
}

fn money(value: &str) -> Money {
    value.parse().unwrap()
}

fn you() -> Participant {
    Participant::primary()
}

#[tokio::test]
async fn group_crud_keeps_primary_member() {
    let (engine, clock, _db) = engine_with_clock().await;

    let trip = engine
        .create_group(NewGroup::new(
            " Trip ",
            vec![p("Alice"), p("Bob")],
            Currency::Eur,
        ))
        .await
        .unwrap();
    assert_eq!(trip.name, "Trip");
    assert_eq!(trip.members, vec![you(), p("Alice"), p("Bob")]);
    assert_eq!(engine.group(trip.id).await.unwrap(), trip);

    let renamed = engine
        .update_group(
            trip.id,
            GroupPatch {
                name: Some("Lisbon".to_string()),
                members: Some(vec![p("Carol")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Lisbon");
    assert_eq!(renamed.members, vec![you(), p("Carol")]);
    assert_eq!(renamed.currency, Currency::Eur);

    let err = engine
        .create_group(NewGroup::new("  ", vec![], Currency::Inr))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidName(_)));

    clock.advance(TimeDelta::hours(2));
    let touched = engine.touch_group(trip.id).await.unwrap();
    assert_eq!(touched.last_used, clock.now());

    engine.delete_group(trip.id).await.unwrap();
    assert!(matches!(
        engine.group(trip.id).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        engine.delete_group(trip.id).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        engine.touch_group(trip.id).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn groups_listed_by_last_use() {
    let (engine, clock, _db) = engine_with_clock().await;

    let first = engine
        .create_group(NewGroup::new("First", vec![], Currency::Inr))
        .await
        .unwrap();
    clock.advance(TimeDelta::minutes(1));
    let second = engine
        .create_group(NewGroup::new("Second", vec![], Currency::Inr))
        .await
        .unwrap();

    let ids: Vec<i64> = engine.groups().await.unwrap().iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    clock.advance(TimeDelta::minutes(1));
    engine.touch_group(first.id).await.unwrap();
    let ids: Vec<i64> = engine.groups().await.unwrap().iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn trip_rollup_nets_member_balances() {
    let (engine, _clock, _db) = engine_with_clock().await;

    engine
        .create_group(NewGroup::new("Trip", vec![p("Alice"), p("Bob")], Currency::Inr))
        .await
        .unwrap();
    engine
        .adjust_balance(&you(), &p("Alice"), money("50"), Currency::Inr)
        .await
        .unwrap();
    engine
        .adjust_balance(&you(), &p("Bob"), money("-20"), Currency::Inr)
        .await
        .unwrap();

    let rollups = engine
        .group_balances(&GroupBalanceQuery::default())
        .await
        .unwrap();
    assert_eq!(rollups.len(), 1);
    assert_eq!(rollups[0].name, "Trip");
    assert_eq!(rollups[0].total_balance, money("30"));
    assert_eq!(rollups[0].positive_balances, money("50"));
    assert_eq!(rollups[0].negative_balances, money("20"));
}

#[tokio::test]
async fn rollup_ignores_debts_between_other_members() {
    let (engine, _clock, _db) = engine_with_clock().await;

    let trip = engine
        .create_group(NewGroup::new("Trip", vec![p("Alice"), p("Bob")], Currency::Inr))
        .await
        .unwrap();
    engine
        .add_expense(
            AddExpenseCmd::new("Hotel", money("300"), p("Alice"))
                .participants(vec![you(), p("Bob")])
                .group(trip.id),
        )
        .await
        .unwrap();

    let summary = engine.balance_summary().await.unwrap();
    assert_eq!(summary.you_owe, money("100"));

    let rollups = engine
        .group_balances(&GroupBalanceQuery::default())
        .await
        .unwrap();
    assert_eq!(rollups.len(), 1);
    assert_eq!(rollups[0].total_balance, money("-100"));
    assert_eq!(rollups[0].positive_balances, Money::ZERO);
    assert_eq!(rollups[0].negative_balances, money("100"));

    let detail = engine.group_detail(trip.id).await.unwrap();
    assert_eq!(detail.your_balance, rollups[0].total_balance);
}

#[tokio::test]
async fn rollups_filter_and_sort() {
    let (engine, _clock, _db) = engine_with_clock().await;

    for (name, member) in [("Flat", "Alice"), ("Office", "Bob"), ("Quiet", "Carol")] {
        engine
            .create_group(NewGroup::new(name, vec![p(member)], Currency::Inr))
            .await
            .unwrap();
    }
    engine
        .adjust_balance(&you(), &p("Alice"), money("10"), Currency::Inr)
        .await
        .unwrap();
    engine
        .adjust_balance(&you(), &p("Bob"), money("25"), Currency::Inr)
        .await
        .unwrap();

    let by_balance = engine
        .group_balances(
            &GroupBalanceQuery::default().sort(GroupSortKey::Balance, SortOrder::Desc),
        )
        .await
        .unwrap();
    let names: Vec<&str> = by_balance.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Office", "Flat"]);

    let all = engine
        .group_balances(&GroupBalanceQuery::all())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let searched = engine
        .group_balances(&GroupBalanceQuery::all().search("qui"))
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].total_balance, Money::ZERO);
}

#[tokio::test]
async fn group_detail_collects_expenses_and_members() {
    let (engine, clock, _db) = engine_with_clock().await;

    let trip = engine
        .create_group(NewGroup::new("Trip", vec![p("Alice"), p("Bob")], Currency::Inr))
        .await
        .unwrap();
    engine
        .add_expense(
            AddExpenseCmd::new("Hostel", money("90"), you())
                .participants([p("Alice"), p("Bob")])
                .group(trip.id),
        )
        .await
        .unwrap();
    clock.advance(TimeDelta::hours(1));
    engine
        .add_expense(
            AddExpenseCmd::new("Ferry", money("40"), p("Bob"))
                .participant(p("Alice"))
                .group(trip.id),
        )
        .await
        .unwrap();
    engine
        .add_expense(AddExpenseCmd::new("Unrelated", money("10"), you()).participant(p("Dan")))
        .await
        .unwrap();

    let detail = engine.group_detail(trip.id).await.unwrap();
    assert_eq!(detail.expenses.len(), 2);
    assert_eq!(detail.expenses[0].description, "Ferry");
    assert_eq!(detail.total_spent, money("130"));

    // Hostel: Alice and Bob owe 30 each. Ferry (40 over three): the user owes
    // Bob 13.34, the remainder cent included.
    let alice = detail
        .members
        .iter()
        .find(|m| m.member == p("Alice"))
        .unwrap();
    let bob = detail.members.iter().find(|m| m.member == p("Bob")).unwrap();
    assert_eq!(alice.balance, money("30"));
    assert_eq!(bob.balance, money("16.66"));
    assert_eq!(detail.your_balance, money("46.66"));

    assert!(matches!(
        engine.group_detail(999).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_group_detaches_expenses() {
    let (engine, _clock, _db) = engine_with_clock().await;

    let trip = engine
        .create_group(NewGroup::new("Trip", vec![p("Alice")], Currency::Inr))
        .await
        .unwrap();
    let expense = engine
        .add_expense(
            AddExpenseCmd::new("Snacks", money("8"), you())
                .participant(p("Alice"))
                .group(trip.id),
        )
        .await
        .unwrap();

    engine.delete_group(trip.id).await.unwrap();
    let expense = engine.expense(expense.id).await.unwrap();
    assert_eq!(expense.group_id, None);
}
