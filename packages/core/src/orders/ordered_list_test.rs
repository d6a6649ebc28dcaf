//! Tests for OrderedList link surgery

#[cfg(test)]
mod tests {
    use crate::db::{GraphStore, MemoryStore, RecordStore};
    use crate::models::{Identity, Record};
    use crate::orders::{OrderError, OrderedList};
    use serde_json::json;
    use std::sync::Arc;

    fn page(n: u32) -> Record {
        Record::new("page".to_string(), json!({ "n": n }))
    }

    fn container() -> Identity {
        Identity::new("book-1/list_source")
    }

    fn new_list(store: &Arc<MemoryStore>) -> OrderedList {
        OrderedList::detached(container(), store.clone(), store.clone())
    }

    /// Re-open the persisted chain in a fresh session
    fn reopen(store: &Arc<MemoryStore>, list: &OrderedList) -> OrderedList {
        OrderedList::load(
            container(),
            list.head().cloned(),
            list.tail().cloned(),
            store.clone(),
            store.clone(),
        )
    }

    async fn list_of(store: &Arc<MemoryStore>, pages: &[Record]) -> OrderedList {
        let mut list = new_list(store);
        for p in pages {
            list.append_target(p.clone()).await.unwrap();
        }
        list.persist().await.unwrap();
        list
    }

    fn ids(pages: &[Record]) -> Vec<Identity> {
        pages.iter().map(|p| p.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_append_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let pages: Vec<Record> = (0..4).map(page).collect();
        let list = list_of(&store, &pages).await;

        let mut fresh = reopen(&store, &list);
        assert_eq!(fresh.target_ids().await.unwrap(), ids(&pages));
        assert_eq!(fresh.len().await.unwrap(), 4);
        fresh.validate().await.unwrap();

        // Targets were materialized and saved along with their nodes
        let targets = fresh.targets().await.unwrap();
        assert!(targets.iter().all(|t| t.version >= 1));
    }

    #[tokio::test]
    async fn test_node_identities_live_in_the_container() {
        let store = Arc::new(MemoryStore::new());
        let list = list_of(&store, &[page(0)]).await;

        let head = list.head().unwrap();
        assert!(head.as_str().starts_with("book-1/list_source#"));
        assert_eq!(list.head(), list.tail());

        let statements = store.get_statements(head).await.unwrap().unwrap();
        assert_eq!(statements.proxy_in, Some(container()));
        assert!(statements.next.is_none() && statements.prev.is_none());
    }

    #[tokio::test]
    async fn test_insert_at_every_position() {
        for k in 0..=3 {
            let store = Arc::new(MemoryStore::new());
            let mut pages: Vec<Record> = (0..3).map(page).collect();
            let mut list = list_of(&store, &pages).await;

            let inserted = page(99);
            list.insert_at(k, inserted.clone()).await.unwrap();
            list.persist().await.unwrap();
            pages.insert(k, inserted);

            let mut fresh = reopen(&store, &list);
            assert_eq!(fresh.target_ids().await.unwrap(), ids(&pages), "k = {}", k);
            fresh.validate().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_insert_beyond_len_is_out_of_range() {
        let store = Arc::new(MemoryStore::new());
        let mut list = list_of(&store, &[page(0), page(1)]).await;

        let err = list.insert_at(3, page(9)).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::PositionOutOfRange { position: 3, len: 2 }
        ));
        assert!(!list.has_changes());
    }

    #[tokio::test]
    async fn test_delete_at_every_position() {
        for k in 0..3 {
            let store = Arc::new(MemoryStore::new());
            let mut pages: Vec<Record> = (0..3).map(page).collect();
            let mut list = list_of(&store, &pages).await;

            let removed = list.delete_at(k).await.unwrap();
            list.persist().await.unwrap();
            pages.remove(k);

            assert!(store.get_statements(removed.uri()).await.unwrap().is_none());

            let mut fresh = reopen(&store, &list);
            assert_eq!(fresh.target_ids().await.unwrap(), ids(&pages), "k = {}", k);
            fresh.validate().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_delete_at_out_of_range() {
        let store = Arc::new(MemoryStore::new());
        let mut list = list_of(&store, &[page(0)]).await;

        assert!(matches!(
            list.delete_at(1).await.unwrap_err(),
            OrderError::PositionOutOfRange { position: 1, len: 1 }
        ));
    }

    #[tokio::test]
    async fn test_delete_target_first_match_and_absent_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let a = page(0);
        let b = page(1);
        let mut list = list_of(&store, &[a.clone(), b.clone(), a.clone()]).await;

        assert!(list.delete_target(&a.id).await.unwrap());
        assert_eq!(list.target_ids().await.unwrap(), vec![b.id.clone(), a.id.clone()]);

        assert!(!list.delete_target(&Identity::new("missing")).await.unwrap());
        assert_eq!(list.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_target_all() {
        let store = Arc::new(MemoryStore::new());
        let a = page(0);
        let b = page(1);
        let mut list = list_of(&store, &[a.clone(), b.clone(), a.clone()]).await;

        assert_eq!(list.delete_target_all(&a.id).await.unwrap(), 2);
        list.persist().await.unwrap();

        let mut fresh = reopen(&store, &list);
        assert_eq!(fresh.target_ids().await.unwrap(), vec![b.id]);
        assert_eq!(store.statement_count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_node_by_identity() {
        let store = Arc::new(MemoryStore::new());
        let mut list = list_of(&store, &[page(0), page(1)]).await;
        let head = list.head().cloned().unwrap();

        assert!(list.delete_node(&head).await.unwrap());
        assert!(!list.delete_node(&head).await.unwrap());
        assert_eq!(list.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let mut list = list_of(&store, &[page(0), page(1)]).await;

        assert_eq!(list.clear().await.unwrap(), 2);
        list.persist().await.unwrap();
        assert!(list.is_empty());
        assert_eq!(store.statement_count().await, 0);

        assert_eq!(list.clear().await.unwrap(), 0);
        assert!(!list.persist().await.unwrap(), "nothing left to write");
    }

    #[tokio::test]
    async fn test_insert_proxy_for_at_does_not_materialize() {
        let store = Arc::new(MemoryStore::new());
        let existing = store.save(&page(7)).await.unwrap();
        let mut list = list_of(&store, &[page(0)]).await;

        let node_id = list
            .insert_proxy_for_at(0, existing.id.clone())
            .await
            .unwrap();
        assert!(list.node(&node_id).unwrap().target().is_none());

        list.persist().await.unwrap();
        let stored = store.load(&existing.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1, "untouched target is not re-saved");
    }

    #[tokio::test]
    async fn test_traversal_hits_cache_on_second_walk() {
        let store = Arc::new(MemoryStore::new());
        let list = list_of(&store, &(0..5).map(page).collect::<Vec<_>>()).await;

        let mut fresh = reopen(&store, &list);
        fresh.node_ids().await.unwrap();
        let (_, misses) = fresh.cache_stats();
        assert_eq!(misses, 5);

        fresh.node_ids().await.unwrap();
        assert_eq!(fresh.cache_stats().1, 5, "second walk never refetches");
    }

    #[tokio::test]
    async fn test_dangling_next_surfaces() {
        let store = Arc::new(MemoryStore::new());
        let list = list_of(&store, &[page(0), page(1)]).await;
        store.delete_statements(list.tail().unwrap()).await.unwrap();

        let mut fresh = reopen(&store, &list);
        let err = fresh.node_ids().await.unwrap_err();
        assert!(matches!(err, OrderError::DanglingLink { .. }));
    }

    #[tokio::test]
    async fn test_cycle_is_detected() {
        let store = Arc::new(MemoryStore::new());
        let list = list_of(&store, &[page(0), page(1)]).await;
        let head = list.head().cloned().unwrap();
        let tail = list.tail().cloned().unwrap();

        let mut statements = store.get_statements(&tail).await.unwrap().unwrap();
        statements.next = Some(head);
        store.put_statements(&tail, statements).await.unwrap();

        let mut fresh = reopen(&store, &list);
        assert!(matches!(
            fresh.node_ids().await.unwrap_err(),
            OrderError::CycleDetected { .. }
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_unanswered_next() {
        let store = Arc::new(MemoryStore::new());
        let list = list_of(&store, &[page(0), page(1)]).await;
        let tail = list.tail().cloned().unwrap();

        let mut statements = store.get_statements(&tail).await.unwrap().unwrap();
        statements.prev = Some(Identity::new("book-1/list_source#bogus"));
        store.put_statements(&tail, statements).await.unwrap();

        let mut fresh = reopen(&store, &list);
        assert_eq!(fresh.len().await.unwrap(), 2, "traversal still follows next");
        assert!(matches!(
            fresh.validate().await.unwrap_err(),
            OrderError::MalformedList { .. }
        ));
    }

    #[tokio::test]
    async fn test_validate_accepts_unsaved_relinks() {
        let store = Arc::new(MemoryStore::new());
        let mut list = list_of(&store, &[page(0), page(1), page(2)]).await;

        list.insert_at(1, page(9)).await.unwrap();
        list.delete_at(3).await.unwrap();
        list.validate().await.unwrap();
    }

    #[tokio::test]
    async fn test_validate_rejects_stale_tail() {
        let store = Arc::new(MemoryStore::new());
        let list = list_of(&store, &[page(0), page(1)]).await;

        let mut wrong = OrderedList::load(
            container(),
            list.head().cloned(),
            list.head().cloned(),
            store.clone(),
            store.clone(),
        );
        assert!(matches!(
            wrong.validate().await.unwrap_err(),
            OrderError::MalformedList { .. }
        ));
    }
}
