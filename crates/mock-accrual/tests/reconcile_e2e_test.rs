//! 端到端对账测试
//!
//! 在随机端口启动模拟积分系统，用真实的 HTTP 客户端驱动对账器。

use std::sync::Arc;
use std::time::Duration;

use loyalty_ledger::{
    LedgerStore, MemoryLedgerStore, OrderStatus, Reconciler, ReqwestAccrualClient,
};
use mock_accrual::{
    AccrualRecord, FixedWindowLimiter, MockState, RecordStatus, Registry, accrual_routes,
};
use rust_decimal_macros::dec;
use tokio::net::TcpListener;

const ORDER_A: &str = "79927398713";
const ORDER_B: &str = "2377225624";
const ORDER_C: &str = "12345678903";

async fn spawn_mock(state: MockState) -> String {
    let app = accrual_routes().with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn ledger_with_orders(numbers: &[&str]) -> Arc<MemoryLedgerStore> {
    let store = Arc::new(MemoryLedgerStore::new());
    store.open_account("alice").await.unwrap();
    for number in numbers {
        store.insert_order("alice", number).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    store
}

fn reconciler(store: Arc<MemoryLedgerStore>, base_url: String) -> Reconciler {
    let client = ReqwestAccrualClient::new(base_url, Duration::from_secs(2)).unwrap();
    Reconciler::new(store, Arc::new(client))
}

#[tokio::test]
async fn test_reconcile_against_mock_authority() {
    let registry = Arc::new(Registry::new());
    registry.upsert(AccrualRecord {
        order: ORDER_A.to_string(),
        status: RecordStatus::Processed,
        accrual: Some(dec!(500)),
    });
    registry.upsert(AccrualRecord {
        order: ORDER_B.to_string(),
        status: RecordStatus::Processing,
        accrual: None,
    });
    let base_url = spawn_mock(MockState::new(registry.clone())).await;

    let store = ledger_with_orders(&[ORDER_A, ORDER_B, ORDER_C]).await;
    let reconciler = reconciler(store.clone(), base_url);

    let report = reconciler.tick().await.unwrap();
    assert_eq!(report.polled, 3);
    assert_eq!(report.applied, 2);
    assert_eq!(report.not_registered, 1);

    let orders = store.list_orders("alice").await.unwrap();
    assert_eq!(orders[0].status, OrderStatus::Processed);
    assert_eq!(orders[1].status, OrderStatus::Processing);
    assert_eq!(orders[2].status, OrderStatus::New);
    assert_eq!(store.get_balance("alice").await.unwrap().current, dec!(500));

    // 积分系统拒绝 B，下一轮写回 INVALID
    registry.upsert(AccrualRecord {
        order: ORDER_B.to_string(),
        status: RecordStatus::Invalid,
        accrual: None,
    });
    let report = reconciler.tick().await.unwrap();
    assert_eq!(report.polled, 2);
    assert_eq!(report.applied, 1);
    assert_eq!(
        store.list_unsettled().await.unwrap(),
        vec![ORDER_C.to_string()]
    );
}

#[tokio::test]
async fn test_rate_limited_tick_defers_remaining_orders() {
    let registry = Arc::new(Registry::new());
    for number in [ORDER_A, ORDER_B, ORDER_C] {
        registry.upsert(AccrualRecord {
            order: number.to_string(),
            status: RecordStatus::Processed,
            accrual: Some(dec!(10)),
        });
    }
    let state = MockState::new(registry)
        .with_limiter(FixedWindowLimiter::new(1, Duration::from_secs(60)));
    let base_url = spawn_mock(state).await;

    let store = ledger_with_orders(&[ORDER_A, ORDER_B, ORDER_C]).await;
    let report = reconciler(store.clone(), base_url).tick().await.unwrap();

    assert!(report.rate_limited);
    assert_eq!(report.applied, 1);
    assert_eq!(report.deferred, 2);
    assert!(report.retry_after.is_some());
    assert_eq!(
        Reconciler::next_delay(&report, Duration::from_secs(1)),
        report.retry_after.unwrap().max(Duration::from_secs(1))
    );
    assert_eq!(store.list_unsettled().await.unwrap().len(), 2);
}
