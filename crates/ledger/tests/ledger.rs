use std::{sync::Arc, time::Duration};

use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use ledger::{
    CatalogStore, Coins, Ledger, LedgerError, LedgerStore, MemoryStore, OrderStore, SqlStore,
    TransactionStore, User, UserStore, Wallet, WalletStore,
};
use migration::MigratorTrait;

const CATALOG: [(&str, i64); 10] = [
    ("t-shirt", 80),
    ("cup", 20),
    ("book", 50),
    ("pen", 10),
    ("powerbank", 200),
    ("hoody", 300),
    ("umbrella", 200),
    ("socks", 10),
    ("wallet", 50),
    ("pink-hoody", 500),
];

async fn migrated(url: &str) -> DatabaseConnection {
    let db = Database::connect(url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn sql_ledger() -> Ledger<SqlStore> {
    let db = migrated("sqlite::memory:").await;
    Ledger::builder()
        .store(SqlStore::new(db))
        .starting_balance(Coins::new(1000))
        .build()
        .unwrap()
}

async fn sql_ledger_with_file_db() -> (Ledger<SqlStore>, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("ledger_{}.db", Uuid::new_v4()));
    let db = migrated(&format!("sqlite:{}?mode=rwc", path.display())).await;
    let ledger = Ledger::builder()
        .store(SqlStore::new(db))
        .starting_balance(Coins::new(1000))
        .build()
        .unwrap();
    (ledger, path)
}

fn memory_ledger() -> Ledger<MemoryStore> {
    Ledger::builder()
        .store(MemoryStore::with_items(CATALOG))
        .starting_balance(Coins::new(1000))
        .build()
        .unwrap()
}

/// Register a user directly through the store, skipping password hashing.
async fn open_wallet<S: LedgerStore>(ledger: &Ledger<S>, name: &str, balance: i64) -> Wallet {
    let user = ledger
        .store()
        .insert_user(&User::new(name.to_string(), "unused".to_string()))
        .await
        .unwrap();
    ledger
        .store()
        .create_wallet(user.id, Coins::new(balance))
        .await
        .unwrap()
}

async fn balance<S: LedgerStore>(ledger: &Ledger<S>, wallet: &Wallet) -> i64 {
    ledger.store().wallet(wallet.id).await.unwrap().balance.amount()
}

async fn sent_count<S: LedgerStore>(ledger: &Ledger<S>, wallet: &Wallet) -> usize {
    match ledger.store().transactions_by_sender(wallet.id).await {
        Ok(rows) => rows.len(),
        Err(LedgerError::NotFound(_)) => 0,
        Err(err) => panic!("unexpected error: {err}"),
    }
}

async fn order_count<S: LedgerStore>(ledger: &Ledger<S>, wallet: &Wallet) -> usize {
    match ledger.store().orders_by_wallet(wallet.id).await {
        Ok(rows) => rows.len(),
        Err(LedgerError::NotFound(_)) => 0,
        Err(err) => panic!("unexpected error: {err}"),
    }
}

async fn transfer_moves_exact_amount<S: LedgerStore>(ledger: Ledger<S>) {
    let sender = open_wallet(&ledger, "alice", 1000).await;
    let receiver = open_wallet(&ledger, "bob", 0).await;

    let record = ledger
        .transfer(sender.id, receiver.id, Coins::new(100))
        .await
        .unwrap();

    assert_eq!(record.amount, Coins::new(100));
    assert_eq!(record.sender_wallet_id, sender.id);
    assert_eq!(record.receiver_wallet_id, receiver.id);
    assert_eq!(balance(&ledger, &sender).await, 900);
    assert_eq!(balance(&ledger, &receiver).await, 100);

    let received = ledger
        .store()
        .transactions_by_receiver(receiver.id)
        .await
        .unwrap();
    assert_eq!(received, vec![record]);
}

async fn purchase_over_balance_is_rejected<S: LedgerStore>(ledger: Ledger<S>) {
    let wallet = open_wallet(&ledger, "alice", 50).await;
    let item = ledger.store().item_by_name("powerbank").await.unwrap();

    let err = ledger
        .purchase(wallet.id, item.id, Coins::new(100))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientFunds(_)));
    assert_eq!(balance(&ledger, &wallet).await, 50);
    assert_eq!(order_count(&ledger, &wallet).await, 0);
}

async fn purchase_shows_in_inventory<S: LedgerStore>(ledger: Ledger<S>) {
    let wallet = open_wallet(&ledger, "alice", 1_000_000).await;
    let pen = ledger.store().item_by_name("pen").await.unwrap();

    let order = ledger.purchase(wallet.id, pen.id, pen.price).await.unwrap();
    assert_eq!(order.cost, Coins::new(10));
    assert_eq!(balance(&ledger, &wallet).await, 999_990);

    let history = ledger.history(wallet.id).await.unwrap();
    let inventory: Vec<_> = history
        .inventory()
        .map(|i| (i.name.as_str(), i.quantity))
        .collect();
    assert_eq!(inventory, vec![("pen", 1)]);
    assert_eq!(history.coins(), Coins::new(999_990));
}

async fn empty_history_is_not_an_error<S: LedgerStore>(ledger: Ledger<S>) {
    let wallet = open_wallet(&ledger, "alice", 1000).await;

    for _ in 0..2 {
        let history = ledger.history(wallet.id).await.unwrap();
        assert_eq!(history.coins(), Coins::new(1000));
        assert_eq!(history.inventory().count(), 0);
        assert_eq!(history.received().count(), 0);
        assert_eq!(history.sent().count(), 0);
    }
}

async fn history_names_counterparties<S: LedgerStore>(ledger: Ledger<S>) {
    let alice = open_wallet(&ledger, "alice", 1000).await;
    let bob = open_wallet(&ledger, "bob", 1000).await;
    let carol = open_wallet(&ledger, "carol", 1000).await;

    ledger.transfer(alice.id, bob.id, Coins::new(100)).await.unwrap();
    ledger.transfer(bob.id, alice.id, Coins::new(30)).await.unwrap();
    ledger.transfer(carol.id, alice.id, Coins::new(5)).await.unwrap();
    ledger.transfer(alice.id, bob.id, Coins::new(7)).await.unwrap();

    let cup = ledger.store().item_by_name("cup").await.unwrap();
    let socks = ledger.store().item_by_name("socks").await.unwrap();
    for item in [&cup, &socks, &cup] {
        ledger.purchase(alice.id, item.id, item.price).await.unwrap();
    }

    let history = ledger.history(alice.id).await.unwrap();
    let received: Vec<_> = history
        .received()
        .map(|r| (r.from_user.as_str(), r.amount.amount()))
        .collect();
    let sent: Vec<_> = history
        .sent()
        .map(|s| (s.to_user.as_str(), s.amount.amount()))
        .collect();
    let inventory: Vec<_> = history
        .inventory()
        .map(|i| (i.name.as_str(), i.quantity))
        .collect();

    assert_eq!(received, vec![("bob", 30), ("carol", 5)]);
    assert_eq!(sent, vec![("bob", 100), ("bob", 7)]);
    assert_eq!(inventory, vec![("cup", 2), ("socks", 1)]);
    assert_eq!(history.coins(), Coins::new(1000 - 100 + 30 + 5 - 7 - 20 - 10 - 20));
}

async fn missing_receiver_leaves_no_trace<S: LedgerStore>(ledger: Ledger<S>) {
    let sender = open_wallet(&ledger, "alice", 1000).await;

    let err = ledger
        .transfer(sender.id, Uuid::new_v4(), Coins::new(100))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::NotFound(_)));
    assert_eq!(balance(&ledger, &sender).await, 1000);
    assert_eq!(sent_count(&ledger, &sender).await, 0);
}

async fn insufficient_transfer_leaves_no_trace<S: LedgerStore>(ledger: Ledger<S>) {
    let sender = open_wallet(&ledger, "alice", 99).await;
    let receiver = open_wallet(&ledger, "bob", 0).await;

    let err = ledger
        .transfer(sender.id, receiver.id, Coins::new(100))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientFunds(_)));
    assert_eq!(balance(&ledger, &sender).await, 99);
    assert_eq!(balance(&ledger, &receiver).await, 0);
    assert_eq!(sent_count(&ledger, &sender).await, 0);
}

async fn exact_balance_can_be_spent<S: LedgerStore>(ledger: Ledger<S>) {
    let sender = open_wallet(&ledger, "alice", 100).await;
    let receiver = open_wallet(&ledger, "bob", 0).await;

    ledger
        .transfer(sender.id, receiver.id, Coins::new(100))
        .await
        .unwrap();

    assert_eq!(balance(&ledger, &sender).await, 0);
    assert_eq!(balance(&ledger, &receiver).await, 100);
}

async fn transfers_are_not_idempotent<S: LedgerStore>(ledger: Ledger<S>) {
    let sender = open_wallet(&ledger, "alice", 1000).await;
    let receiver = open_wallet(&ledger, "bob", 0).await;

    let first = ledger
        .transfer(sender.id, receiver.id, Coins::new(100))
        .await
        .unwrap();
    let second = ledger
        .transfer(sender.id, receiver.id, Coins::new(100))
        .await
        .unwrap();

    assert!(second.id > first.id);
    assert_eq!(balance(&ledger, &sender).await, 800);
    assert_eq!(balance(&ledger, &receiver).await, 200);
    assert_eq!(sent_count(&ledger, &sender).await, 2);
}

async fn bad_amounts_are_rejected<S: LedgerStore>(ledger: Ledger<S>) {
    let sender = open_wallet(&ledger, "alice", 1000).await;
    let receiver = open_wallet(&ledger, "bob", 0).await;

    for amount in [0, -10, 10_000_000_001] {
        let err = ledger
            .transfer(sender.id, receiver.id, Coins::new(amount))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)), "{amount}: {err}");
    }

    let err = ledger
        .transfer(sender.id, sender.id, Coins::new(10))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    assert_eq!(balance(&ledger, &sender).await, 1000);
    assert_eq!(sent_count(&ledger, &sender).await, 0);
}

async fn second_wallet_for_owner_is_rejected<S: LedgerStore>(ledger: Ledger<S>) {
    let wallet = open_wallet(&ledger, "alice", 10).await;

    let err = ledger
        .store()
        .create_wallet(wallet.user_id, Coins::new(10))
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::DuplicateOwner(wallet.user_id.to_string()));
    assert_eq!(
        ledger.store().wallet_by_owner(wallet.user_id).await.unwrap().id,
        wallet.id
    );
}

async fn duplicate_username_is_rejected<S: LedgerStore>(ledger: Ledger<S>) {
    open_wallet(&ledger, "alice", 10).await;

    let err = ledger
        .store()
        .insert_user(&User::new("alice".to_string(), "other".to_string()))
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::DuplicateUsername("alice".to_string()));
}

async fn authenticate_registers_then_verifies<S: LedgerStore>(ledger: Ledger<S>) {
    let user = ledger.authenticate("alice", "password1").await.unwrap();
    let again = ledger.authenticate("alice", "password1").await.unwrap();
    assert_eq!(user.id, again.id);

    let history = ledger.info(user.id).await.unwrap();
    assert_eq!(history.coins(), Coins::new(1000));

    let err = ledger.authenticate("alice", "password2").await.unwrap_err();
    assert_eq!(err, LedgerError::InvalidCredentials);

    let err = ledger.authenticate("al", "password1").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
    let err = ledger.authenticate("alice", "short").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
}

async fn send_coin_and_buy_by_name<S: LedgerStore>(ledger: Ledger<S>) {
    let alice = open_wallet(&ledger, "alice", 1000).await;
    let bob = open_wallet(&ledger, "bob", 0).await;

    ledger
        .send_coin(alice.user_id, "bob", Coins::new(250))
        .await
        .unwrap();
    let order = ledger.buy_item(bob.user_id, "cup").await.unwrap();
    assert_eq!(order.cost, Coins::new(20));

    let err = ledger.buy_item(bob.user_id, "hoody").await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds(_)));
    let err = ledger.buy_item(bob.user_id, "yacht").await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    let err = ledger
        .send_coin(alice.user_id, "nobody", Coins::new(1))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));

    assert_eq!(balance(&ledger, &alice).await, 750);
    assert_eq!(balance(&ledger, &bob).await, 230);
    assert_eq!(order_count(&ledger, &bob).await, 1);
}

/// `attempts` concurrent purchases of `cost` against one wallet holding
/// `start`; exactly `start / cost` may succeed.
async fn concurrent_purchases_never_overdraw<S: LedgerStore + 'static>(ledger: Ledger<S>) {
    let (start, cost, attempts) = (100, 30, 10);
    let wallet = open_wallet(&ledger, "alice", start).await;
    let item = ledger.store().item_by_name("t-shirt").await.unwrap();
    let ledger = Arc::new(ledger);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..attempts {
        let ledger = Arc::clone(&ledger);
        let (wallet_id, item_id) = (wallet.id, item.id);
        tasks.spawn(async move { ledger.purchase(wallet_id, item_id, Coins::new(cost)).await });
    }

    let mut succeeded = 0;
    while let Some(outcome) = tasks.join_next().await {
        match outcome.unwrap() {
            Ok(_) => succeeded += 1,
            Err(LedgerError::InsufficientFunds(_)) => {}
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    assert_eq!(succeeded, start / cost);
    assert_eq!(balance(&*ledger, &wallet).await, start - succeeded * cost);
    assert_eq!(order_count(&*ledger, &wallet).await as i64, succeeded);
}

async fn concurrent_transfers_conserve_coins<S: LedgerStore + 'static>(ledger: Ledger<S>) {
    let alice = open_wallet(&ledger, "alice", 500).await;
    let bob = open_wallet(&ledger, "bob", 500).await;
    let ledger = Arc::new(ledger);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..20 {
        let ledger = Arc::clone(&ledger);
        let (from, to) = if i % 2 == 0 {
            (alice.id, bob.id)
        } else {
            (bob.id, alice.id)
        };
        tasks.spawn(async move { ledger.transfer(from, to, Coins::new(70)).await });
    }
    while let Some(outcome) = tasks.join_next().await {
        match outcome.unwrap() {
            Ok(_) | Err(LedgerError::InsufficientFunds(_)) => {}
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    let (a, b) = (
        balance(&*ledger, &alice).await,
        balance(&*ledger, &bob).await,
    );
    assert!(a >= 0 && b >= 0);
    assert_eq!(a + b, 1000);
}

/// `attempts` concurrent transfers of `amount` out of one wallet holding
/// `start`, each to its own receiver; exactly `start / amount` may succeed.
async fn concurrent_transfers_drain_to_floor<S: LedgerStore + 'static>(ledger: Ledger<S>) {
    let (start, amount, attempts) = (100, 30, 16);
    let sender = open_wallet(&ledger, "alice", start).await;
    let mut receivers = Vec::new();
    for i in 0..attempts {
        receivers.push(open_wallet(&ledger, &format!("receiver{i}"), 0).await);
    }
    let ledger = Arc::new(ledger);

    let mut tasks = tokio::task::JoinSet::new();
    for receiver in &receivers {
        let ledger = Arc::clone(&ledger);
        let (from, to) = (sender.id, receiver.id);
        tasks.spawn(async move { ledger.transfer(from, to, Coins::new(amount)).await });
    }

    let mut succeeded = 0;
    while let Some(outcome) = tasks.join_next().await {
        match outcome.unwrap() {
            Ok(_) => succeeded += 1,
            Err(LedgerError::InsufficientFunds(_)) => {}
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    assert_eq!(succeeded, start / amount);
    assert_eq!(balance(&*ledger, &sender).await, start - succeeded * amount);
    assert_eq!(sent_count(&*ledger, &sender).await as i64, succeeded);

    let mut received = 0;
    for receiver in &receivers {
        let got = balance(&*ledger, receiver).await;
        assert!(got == 0 || got == amount);
        received += got;
    }
    assert_eq!(received, succeeded * amount);
}

macro_rules! on_both_stores {
    ($($name:ident),* $(,)?) => {
        mod sql {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(super::sql_ledger().await).await;
                }
            )*
        }

        mod memory {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(super::memory_ledger()).await;
                }
            )*
        }
    };
}

on_both_stores!(
    transfer_moves_exact_amount,
    purchase_over_balance_is_rejected,
    purchase_shows_in_inventory,
    empty_history_is_not_an_error,
    history_names_counterparties,
    missing_receiver_leaves_no_trace,
    insufficient_transfer_leaves_no_trace,
    exact_balance_can_be_spent,
    transfers_are_not_idempotent,
    bad_amounts_are_rejected,
    second_wallet_for_owner_is_rejected,
    duplicate_username_is_rejected,
    authenticate_registers_then_verifies,
    send_coin_and_buy_by_name,
);

#[tokio::test]
async fn concurrent_purchases_on_file_db() {
    let (ledger, path) = sql_ledger_with_file_db().await;
    concurrent_purchases_never_overdraw(ledger).await;
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn concurrent_transfers_on_file_db() {
    let (ledger, path) = sql_ledger_with_file_db().await;
    concurrent_transfers_conserve_coins(ledger).await;
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn concurrent_transfer_drain_on_file_db() {
    let (ledger, path) = sql_ledger_with_file_db().await;
    concurrent_transfers_drain_to_floor(ledger).await;
    let _ = std::fs::remove_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfer_drain_in_memory() {
    concurrent_transfers_drain_to_floor(memory_ledger()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_in_memory() {
    concurrent_purchases_never_overdraw(memory_ledger()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_in_memory() {
    concurrent_transfers_conserve_coins(memory_ledger()).await;
}

#[tokio::test]
async fn failed_commit_leaves_no_trace() {
    let store = MemoryStore::with_items(CATALOG);
    let ledger = Ledger::builder()
        .store(store.clone())
        .build()
        .unwrap();
    let sender = open_wallet(&ledger, "alice", 1000).await;
    let receiver = open_wallet(&ledger, "bob", 0).await;
    let pen = store.item_by_name("pen").await.unwrap();

    store.fail_next_commit();
    let err = ledger
        .transfer(sender.id, receiver.id, Coins::new(100))
        .await
        .unwrap_err();
    assert!(err.is_storage());

    store.fail_next_commit();
    let err = ledger
        .purchase(sender.id, pen.id, pen.price)
        .await
        .unwrap_err();
    assert!(err.is_storage());

    assert_eq!(balance(&ledger, &sender).await, 1000);
    assert_eq!(balance(&ledger, &receiver).await, 0);
    assert_eq!(sent_count(&ledger, &sender).await, 0);
    assert_eq!(order_count(&ledger, &sender).await, 0);
}

#[tokio::test]
async fn failed_registration_creates_no_user() {
    let store = MemoryStore::new();
    let ledger = Ledger::builder()
        .store(store.clone())
        .starting_balance(Coins::new(1000))
        .build()
        .unwrap();

    store.fail_next_commit();
    let err = ledger.authenticate("alice", "password1").await.unwrap_err();
    assert!(err.is_storage());
    assert!(matches!(
        store.user_by_username("alice").await,
        Err(LedgerError::NotFound(_))
    ));
}

#[tokio::test]
async fn stalled_unit_times_out_and_rolls_back() {
    let store = MemoryStore::new();
    let ledger = Ledger::builder()
        .store(store.clone())
        .unit_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let sender = open_wallet(&ledger, "alice", 1000).await;
    let receiver = open_wallet(&ledger, "bob", 0).await;

    let held = store.begin().await.unwrap();
    let err = ledger
        .transfer(sender.id, receiver.id, Coins::new(10))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)), "{err}");
    drop(held);

    assert_eq!(balance(&ledger, &sender).await, 1000);
    assert_eq!(balance(&ledger, &receiver).await, 0);
    assert_eq!(sent_count(&ledger, &sender).await, 0);

    ledger
        .transfer(sender.id, receiver.id, Coins::new(10))
        .await
        .unwrap();
    assert_eq!(balance(&ledger, &receiver).await, 10);
}

#[tokio::test]
async fn password_hashing_leaves_the_runtime_free() {
    let ledger = memory_ledger();
    let mut sign_in = std::pin::pin!(ledger.authenticate("alice", "password1"));

    // A zero timeout polls once; hashing on the blocking pool cannot be done yet.
    assert!(
        tokio::time::timeout(Duration::ZERO, &mut sign_in)
            .await
            .is_err()
    );
    let user = sign_in.await.unwrap();
    assert_eq!(user.username, "alice");
}

#[test]
fn builder_requires_store() {
    let err = Ledger::<MemoryStore>::builder().build().unwrap_err();
    assert!(err.is_storage());
}

#[test]
fn builder_rejects_zero_unit_timeout() {
    let err = Ledger::builder()
        .store(MemoryStore::new())
        .unit_timeout(Duration::ZERO)
        .build()
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
}
