//! Integration tests for order persistence and lifecycle.
//!
//! These tests run the repository and service against the in-memory store,
//! which mirrors the Redis semantics the repository relies on.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::OrderId;
use domain::{
    CustomerId, Cursor, DomainError, ItemId, LifecycleError, LineItem, ORDER_INDEX_KEY, OpContext,
    Order, OrderRepository, OrderService, OrderStatus, PageRequest, RepositoryError, order_key,
    transition_at,
};
use kv_store::{InMemoryKvStore, KeyValueStore, KeyValueStoreExt, WriteBatch};
use tokio_util::sync::CancellationToken;

fn create_repository() -> OrderRepository<InMemoryKvStore> {
    OrderRepository::new(InMemoryKvStore::new())
}

fn sample_order(id: u64) -> Order {
    Order::new(
        OrderId::new(id),
        CustomerId::new(),
        vec![
            LineItem::new(ItemId::new(), 2, 500),
            LineItem::new(ItemId::new(), 1, 250),
        ],
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    )
    .unwrap()
}

async fn list_all(repo: &OrderRepository<InMemoryKvStore>, size: usize) -> Vec<Order> {
    let ctx = OpContext::new();
    let mut request = PageRequest::new(size, Cursor::START).unwrap();
    let mut orders = Vec::new();
    loop {
        let page = repo.list(&ctx, request).await.unwrap();
        let done = page.is_last();
        orders.extend(page.orders);
        if done {
            return orders;
        }
        request = PageRequest::new(request.size(), page.next).unwrap();
    }
}

mod persistence {
    use super::*;

    #[tokio::test]
    async fn round_trip_preserves_every_field() {
        let repo = create_repository();
        let ctx = OpContext::new();
        let order = sample_order(1);

        repo.create(&ctx, order.clone()).await.unwrap();
        let loaded = repo.get_by_id(&ctx, order.id()).await.unwrap();

        assert_eq!(loaded, order);
        assert_eq!(loaded.line_items(), order.line_items());
        assert_eq!(loaded.created_at(), order.created_at());
    }

    #[tokio::test]
    async fn deleted_order_is_gone_everywhere() {
        let repo = create_repository();
        let ctx = OpContext::new();
        let id = OrderId::new(1);
        repo.create(&ctx, sample_order(1)).await.unwrap();

        repo.delete_by_id(&ctx, id).await.unwrap();

        assert!(matches!(
            repo.get_by_id(&ctx, id).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete_by_id(&ctx, id).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(list_all(&repo, 10).await.is_empty());
    }

    #[tokio::test]
    async fn update_never_creates() {
        let repo = create_repository();
        let ctx = OpContext::new();

        let err = repo
            .update_by_id(&ctx, OrderId::new(5), sample_order(5))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::NotFound(_)));
        assert!(!repo.store().exists(&order_key(OrderId::new(5))).await.unwrap());
        assert_eq!(repo.count(&ctx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_after_delete_does_not_resurrect() {
        let repo = create_repository();
        let ctx = OpContext::new();
        let order = repo.create(&ctx, sample_order(3)).await.unwrap();
        repo.delete_by_id(&ctx, order.id()).await.unwrap();

        let err = repo
            .update_by_id(&ctx, order.id(), order.clone())
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::NotFound(_)));
        assert!(matches!(
            repo.get_by_id(&ctx, order.id()).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn corrupted_record_is_a_decode_error() {
        let repo = create_repository();
        let ctx = OpContext::new();
        let key = order_key(OrderId::new(8));
        repo.store()
            .put(&key, br#"{"order_id":8,"customer_id":"nope"}"#.to_vec())
            .await
            .unwrap();

        let err = repo.get_by_id(&ctx, OrderId::new(8)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Decode { key: k, .. } if k == key));
    }

    #[tokio::test]
    async fn record_violating_lifecycle_is_a_decode_error() {
        let repo = create_repository();
        let key = order_key(OrderId::new(9));
        let json = r#"{
            "order_id": 9,
            "customer_id": "11111111-1111-1111-1111-111111111111",
            "line_items": [],
            "created_at": "2024-05-01T12:00:00Z",
            "shipped_at": null,
            "completed_at": "2024-05-02T12:00:00Z"
        }"#;
        repo.store().put(&key, json.as_bytes().to_vec()).await.unwrap();

        let err = repo
            .get_by_id(&OpContext::new(), OrderId::new(9))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Decode { .. }));
    }
}

mod index {
    use super::*;

    async fn index_members(repo: &OrderRepository<InMemoryKvStore>) -> HashSet<String> {
        repo.store()
            .scan_all(ORDER_INDEX_KEY, 100)
            .await
            .unwrap()
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn index_matches_stored_orders() {
        let repo = create_repository();
        let ctx = OpContext::new();

        for id in 1..=20 {
            repo.create(&ctx, sample_order(id)).await.unwrap();
        }
        for id in (1..=20).step_by(3) {
            repo.delete_by_id(&ctx, OrderId::new(id)).await.unwrap();
        }
        // Failed operations must leave the index alone.
        let _ = repo.create(&ctx, sample_order(2)).await;
        let _ = repo.delete_by_id(&ctx, OrderId::new(1)).await;

        let expected: HashSet<String> = (1..=20u64)
            .filter(|id| (id - 1) % 3 != 0)
            .map(|id| order_key(OrderId::new(id)))
            .collect();

        assert_eq!(index_members(&repo).await, expected);
        assert_eq!(repo.store().key_count().await, expected.len());
    }

    #[tokio::test]
    async fn failed_create_commit_leaves_nothing_behind() {
        let repo = create_repository();
        let ctx = OpContext::new();
        repo.store().fail_next_commits(1).await;

        let err = repo.create(&ctx, sample_order(1)).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Store(_)));
        assert!(index_members(&repo).await.is_empty());
        assert_eq!(repo.store().key_count().await, 0);
    }

    #[tokio::test]
    async fn failed_delete_commit_keeps_record_and_entry() {
        let repo = create_repository();
        let ctx = OpContext::new();
        let order = repo.create(&ctx, sample_order(1)).await.unwrap();
        repo.store().fail_next_commits(1).await;

        let err = repo.delete_by_id(&ctx, order.id()).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Store(_)));
        assert_eq!(repo.get_by_id(&ctx, order.id()).await.unwrap(), order);
        assert!(index_members(&repo).await.contains(&order_key(order.id())));
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn full_scan_returns_every_order_once() {
        let repo = create_repository();
        let ctx = OpContext::new();
        for id in 0..137 {
            repo.create(&ctx, sample_order(id)).await.unwrap();
        }

        let orders = list_all(&repo, 10).await;
        let ids: HashSet<OrderId> = orders.iter().map(|o| o.id()).collect();

        assert_eq!(orders.len(), 137);
        assert_eq!(ids.len(), 137);
    }

    #[tokio::test]
    async fn cursors_are_not_monotonic() {
        let repo = create_repository();
        let ctx = OpContext::new();
        for id in 0..300 {
            repo.create(&ctx, sample_order(id)).await.unwrap();
        }

        let mut request = PageRequest::new(5, Cursor::START).unwrap();
        let mut cursors = Vec::new();
        loop {
            let page = repo.list(&ctx, request).await.unwrap();
            if page.is_last() {
                break;
            }
            cursors.push(page.next.as_u64());
            request = PageRequest::new(request.size(), page.next).unwrap();
        }

        assert!(cursors.windows(2).any(|w| w[1] < w[0]));
    }

    #[tokio::test]
    async fn dangling_entries_are_skipped() {
        let repo = create_repository();
        let ctx = OpContext::new();
        for id in 1..=3 {
            repo.create(&ctx, sample_order(id)).await.unwrap();
        }
        repo.store()
            .commit(WriteBatch::new().delete(order_key(OrderId::new(2))))
            .await
            .unwrap();

        let ids: HashSet<OrderId> = list_all(&repo, 50).await.iter().map(|o| o.id()).collect();
        assert_eq!(ids, HashSet::from([OrderId::new(1), OrderId::new(3)]));
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn transitions_only_move_forward() {
        let service = OrderService::new(InMemoryKvStore::new());
        let ctx = OpContext::new();
        let order = service
            .create_order(&ctx, CustomerId::new(), vec![LineItem::new(ItemId::new(), 1, 10)])
            .await
            .unwrap();
        let id = order.id();

        let shipped = service.update_status(&ctx, id, "shipped").await.unwrap();
        let shipped_at = shipped.shipped_at().unwrap();
        assert!(shipped_at >= order.created_at());

        assert!(matches!(
            service.update_status(&ctx, id, "shipped").await,
            Err(DomainError::Lifecycle(LifecycleError::AlreadyShipped))
        ));

        let completed = service.update_status(&ctx, id, "completed").await.unwrap();
        assert_eq!(completed.shipped_at(), Some(shipped_at));
        assert!(completed.completed_at().unwrap() >= shipped_at);

        assert!(matches!(
            service.update_status(&ctx, id, "completed").await,
            Err(DomainError::Lifecycle(LifecycleError::NotYetShipped))
        ));
        assert!(matches!(
            service.update_status(&ctx, id, "cancelled").await,
            Err(DomainError::Lifecycle(LifecycleError::InvalidStatus(_)))
        ));
        assert_eq!(service.get_order(&ctx, id).await.unwrap(), completed);
    }

    #[tokio::test]
    async fn create_ship_complete_delete() {
        let service = OrderService::new(InMemoryKvStore::new());
        let ctx = OpContext::new();
        let customer: CustomerId = "11111111-1111-1111-1111-111111111111"
            .parse::<uuid::Uuid>()
            .unwrap()
            .into();
        let item: ItemId = "22222222-2222-2222-2222-222222222222"
            .parse::<uuid::Uuid>()
            .unwrap()
            .into();

        let order = service
            .create_order(&ctx, customer, vec![LineItem::new(item, 2, 500)])
            .await
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Created);
        assert!(order.shipped_at().is_none());
        assert!(order.completed_at().is_none());

        let shipped = service.update_status(&ctx, order.id(), "shipped").await.unwrap();
        assert!(shipped.shipped_at().is_some());

        assert!(matches!(
            service.update_status(&ctx, order.id(), "shipped").await,
            Err(DomainError::Lifecycle(LifecycleError::AlreadyShipped))
        ));

        let completed = service
            .update_status(&ctx, order.id(), "completed")
            .await
            .unwrap();
        assert!(completed.shipped_at() <= completed.completed_at());

        service.delete_order(&ctx, order.id()).await.unwrap();
        assert!(matches!(
            service.get_order(&ctx, order.id()).await,
            Err(DomainError::Repository(RepositoryError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn ship_list_complete_delete_scenario() {
        let repo = create_repository();
        let ctx = OpContext::new();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let customer = CustomerId::new();
        let item = ItemId::new();
        let order = Order::new(
            OrderId::new(42),
            customer,
            vec![LineItem::new(item, 2, 500)],
            t0,
        )
        .unwrap();

        repo.create(&ctx, order.clone()).await.unwrap();
        assert_eq!(
            repo.get_by_id(&ctx, OrderId::new(42)).await.unwrap().status(),
            OrderStatus::Created
        );

        let t1 = t0 + chrono::Duration::hours(1);
        let shipped = transition_at(order, "shipped", t1).unwrap();
        repo.update_by_id(&ctx, OrderId::new(42), shipped).await.unwrap();

        let page = repo.list(&ctx, PageRequest::new(10, Cursor::START).unwrap()).await.unwrap();
        assert_eq!(page.orders.len(), 1);
        assert_eq!(page.orders[0].shipped_at(), Some(t1));
        assert!(page.is_last());

        let loaded = repo.get_by_id(&ctx, OrderId::new(42)).await.unwrap();
        let t2 = t1 + chrono::Duration::hours(1);
        let completed = transition_at(loaded, "completed", t2).unwrap();
        repo.update_by_id(&ctx, OrderId::new(42), completed).await.unwrap();

        let loaded = repo.get_by_id(&ctx, OrderId::new(42)).await.unwrap();
        assert_eq!(loaded.status(), OrderStatus::Completed);
        assert_eq!(loaded.completed_at(), Some(t2));

        repo.delete_by_id(&ctx, OrderId::new(42)).await.unwrap();
        assert!(matches!(
            repo.get_by_id(&ctx, OrderId::new(42)).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert_eq!(repo.count(&ctx).await.unwrap(), 0);
    }
}

mod interruption {
    use super::*;

    #[tokio::test]
    async fn canceled_context_fails_every_operation() {
        let repo = create_repository();
        let token = CancellationToken::new();
        let ctx = OpContext::new().with_cancellation(token.clone());
        repo.create(&ctx, sample_order(1)).await.unwrap();
        token.cancel();

        assert!(matches!(
            repo.get_by_id(&ctx, OrderId::new(1)).await,
            Err(RepositoryError::Canceled)
        ));
        assert!(matches!(
            repo.delete_by_id(&ctx, OrderId::new(1)).await,
            Err(RepositoryError::Canceled)
        ));
        assert!(matches!(
            repo.list(&ctx, PageRequest::first()).await,
            Err(RepositoryError::Canceled)
        ));

        // Nothing was deleted behind the cancellation.
        assert!(repo.get_by_id(&OpContext::new(), OrderId::new(1)).await.is_ok());
    }

    #[tokio::test]
    async fn expired_deadline_fails_promptly() {
        let repo = create_repository();
        let ctx = OpContext::with_timeout(Duration::ZERO);

        assert!(matches!(
            repo.create(&ctx, sample_order(1)).await,
            Err(RepositoryError::DeadlineExceeded)
        ));
        assert_eq!(repo.store().key_count().await, 0);
    }

    #[tokio::test]
    async fn service_surfaces_cancellation() {
        let service = OrderService::new(InMemoryKvStore::new());
        let token = CancellationToken::new();
        token.cancel();
        let ctx = OpContext::new().with_cancellation(token);

        let err = service
            .create_order(&ctx, CustomerId::new(), vec![])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Repository(RepositoryError::Canceled)
        ));
    }
}
