use sea_orm::{Database, DatabaseConnection};

use engine::{
    AddExpenseCmd, Currency, Engine, EngineError, Money, NewSettlement, Participant,
    PaymentMethod,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
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
async fn paying_off_a_debt_to_you_records_and_zeroes() {
    let (engine, _db) = engine_with_db().await;

    let expense = engine
        .add_expense(AddExpenseCmd::new("Tickets", money("300"), you()).participant(p("Bob")))
        .await
        .unwrap();
    let balance = engine.balance_between(&you(), &p("Bob")).await.unwrap().unwrap();
    assert_eq!(balance.amount, money("150"));

    let settlement = engine
        .settle_payment(&balance, Some(PaymentMethod::Upi), vec![expense.id])
        .await
        .unwrap();
    assert_eq!(settlement.from, p("Bob"));
    assert_eq!(settlement.to, you());
    assert_eq!(settlement.amount, money("150"));
    assert_eq!(settlement.method, PaymentMethod::Upi);
    assert_eq!(settlement.related_expenses, vec![expense.id]);

    let balance = engine.balance(balance.id).await.unwrap();
    assert!(balance.is_settled());
    assert_eq!(engine.settlements().await.unwrap(), vec![settlement]);
}

#[tokio::test]
async fn negative_balance_means_you_pay() {
    let (engine, _db) = engine_with_db().await;

    let balance = engine
        .adjust_balance(&you(), &p("Alice"), money("-42.50"), Currency::Inr)
        .await
        .unwrap();

    let settlement = engine
        .settle_payment(&balance, Some(PaymentMethod::Cash), vec![])
        .await
        .unwrap();
    assert_eq!(settlement.from, you());
    assert_eq!(settlement.to, p("Alice"));
    assert_eq!(settlement.amount, money("42.50"));
}

#[tokio::test]
async fn missing_method_writes_nothing() {
    let (engine, _db) = engine_with_db().await;

    let balance = engine
        .adjust_balance(&you(), &p("Bob"), money("10"), Currency::Inr)
        .await
        .unwrap();

    let err = engine
        .settle_payment(&balance, None, vec![])
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::MissingMethod);
    assert!(engine.settlements().await.unwrap().is_empty());
    assert_eq!(
        engine.balance(balance.id).await.unwrap().amount,
        money("10")
    );
}

#[tokio::test]
async fn settled_or_unknown_pair_cannot_be_paid() {
    let (engine, _db) = engine_with_db().await;

    let balance = engine
        .adjust_balance(&you(), &p("Bob"), money("10"), Currency::Inr)
        .await
        .unwrap();
    engine
        .settle_payment(&balance, Some(PaymentMethod::PayPal), vec![])
        .await
        .unwrap();

    let err = engine
        .settle_payment(&balance, Some(PaymentMethod::PayPal), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    assert_eq!(engine.settlements().await.unwrap().len(), 1);

    let mut stranger = balance.clone();
    stranger.with_user = p("Mallory");
    let err = engine
        .settle_payment(&stranger, Some(PaymentMethod::Cash), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn stale_snapshot_settles_current_amount() {
    let (engine, _db) = engine_with_db().await;

    let stale = engine
        .adjust_balance(&you(), &p("Bob"), money("10"), Currency::Inr)
        .await
        .unwrap();
    engine
        .adjust_balance(&you(), &p("Bob"), money("5"), Currency::Inr)
        .await
        .unwrap();

    let settlement = engine
        .settle_payment(&stale, Some(PaymentMethod::BankTransfer), vec![])
        .await
        .unwrap();
    assert_eq!(settlement.amount, money("15"));
}

#[tokio::test]
async fn standalone_settlements_and_lookup_by_user() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_settlement(NewSettlement {
            from: p("Bob"),
            to: you(),
            amount: money("5"),
            currency: Currency::Inr,
            method: None,
            related_expenses: vec![],
        })
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::MissingMethod);

    engine
        .create_settlement(NewSettlement {
            from: p("Bob"),
            to: you(),
            amount: money("5"),
            currency: Currency::Inr,
            method: Some(PaymentMethod::Cash),
            related_expenses: vec![],
        })
        .await
        .unwrap();
    engine
        .create_settlement(NewSettlement {
            from: you(),
            to: p("Alice"),
            amount: money("7"),
            currency: Currency::Eur,
            method: Some(PaymentMethod::PayPal),
            related_expenses: vec![],
        })
        .await
        .unwrap();

    assert_eq!(engine.settlements().await.unwrap().len(), 2);
    assert_eq!(engine.settlements_by_user(&you()).await.unwrap().len(), 2);
    let bob = engine.settlements_by_user(&p("Bob")).await.unwrap();
    assert_eq!(bob.len(), 1);
    assert_eq!(bob[0].amount, money("5"));
    assert!(
        engine
            .settlements_by_user(&p("Carol"))
            .await
            .unwrap()
            .is_empty()
    );

    // Recording a payment on its own leaves the ledger alone.
    assert!(engine.balances().await.unwrap().is_empty());
}
