use std::sync::Arc;

use chrono::{TimeDelta, TimeZone, Utc};
use sea_orm::Database;

use engine::{
    Clock, Currency, Engine, FixedClock, Money, Participant, ReminderFrequency, ReminderPolicy,
};
use migration::MigratorTrait;

async fn engine_with_clock() -> (Engine, Arc<FixedClock>) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 10, 17, 10, 0, 0).unwrap(),
    ));
    let engine = Engine::builder()
        .database(db)
        .clock(clock.clone())
        .build()
        .await
        .unwrap();
    (engine, clock)
}

fn p(name: &str) -> Participant {
    Participant::new(name).unwrap()
}

#[tokio::test]
async fn no_reminder_logged_on_a_fresh_database() {
    let (engine, _clock) = engine_with_clock().await;
    assert_eq!(engine.last_reminder().await.unwrap(), None);
}

#[tokio::test]
async fn logged_reminder_gates_the_next_one() {
    let (engine, clock) = engine_with_clock().await;
    let you = Participant::primary();
    engine
        .adjust_balance(&you, &p("Alice"), Money::new(5000), Currency::Inr)
        .await
        .unwrap();
    engine
        .adjust_balance(&you, &p("Bob"), Money::new(2000), Currency::Inr)
        .await
        .unwrap();

    let pending = engine.pending_settlements().await.unwrap();
    let sent = engine.record_reminder(&pending).await.unwrap();
    assert_eq!(sent.sent_at, clock.now());
    assert_eq!(sent.pending.count, 2);
    assert_eq!(sent.pending.total, Money::new(7000));

    let policy = ReminderPolicy {
        enabled: true,
        frequency: ReminderFrequency::Weekly,
        quiet_hours: None,
    };

    clock.advance(TimeDelta::days(3));
    let last = engine.last_reminder().await.unwrap().map(|r| r.sent_at);
    assert_eq!(last, Some(sent.sent_at));
    assert!(!policy.should_notify(last, &clock.now()));

    clock.advance(TimeDelta::days(4));
    assert!(policy.should_notify(last, &clock.now()));

    let again = engine.record_reminder(&pending).await.unwrap();
    let latest = engine.last_reminder().await.unwrap().unwrap();
    assert_eq!(latest.id, again.id);
    assert_eq!(latest.sent_at, clock.now());
}
