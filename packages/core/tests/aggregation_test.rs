//! Integration tests for filtered views and reverse lookups

use serde_json::json;
use std::sync::Arc;
use strand_core::aggregation::{is_ordered_by, ordered_by, FilteredAssociation};
use strand_core::config::OrderedAggregationConfig;
use strand_core::db::{MemoryStore, RecordStore};
use strand_core::models::{Identity, Record};
use strand_core::orders::OrderedAggregation;

async fn owner(store: &Arc<MemoryStore>, id: &str) -> Identity {
    let record = Record::new_with_id(Identity::new(id), "collection".to_string(), json!({}));
    store.save(&record).await.unwrap().id
}

async fn aggregation(store: &Arc<MemoryStore>, owner: &Identity) -> OrderedAggregation {
    OrderedAggregation::load(
        OrderedAggregationConfig::default(),
        owner,
        store.clone(),
        store.clone(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_ordered_by_finds_every_owner() {
    let store = Arc::new(MemoryStore::new());
    let first = owner(&store, "book-1").await;
    let second = owner(&store, "book-2").await;
    let shared = Record::new("page".to_string(), json!({}));

    aggregation(&store, &first)
        .await
        .append_target(shared.clone())
        .await
        .unwrap();
    aggregation(&store, &second)
        .await
        .append_target(shared.clone())
        .await
        .unwrap();

    let owners = ordered_by(store.as_ref(), store.as_ref(), &shared.id)
        .await
        .unwrap();
    assert_eq!(owners, vec![first.clone(), second]);

    let ordered = is_ordered_by(store.as_ref(), store.as_ref(), &shared.id, &first, "list_source");
    assert!(ordered.await.unwrap());

    let mut agg = aggregation(&store, &first).await;
    agg.delete_target(&shared.id).await.unwrap();
    let ordered = is_ordered_by(store.as_ref(), store.as_ref(), &shared.id, &first, "list_source");
    assert!(!ordered.await.unwrap());
}

#[tokio::test]
async fn test_filtered_view_alongside_ordered_members() {
    let store = Arc::new(MemoryStore::new());
    let parent = owner(&store, "parent").await;
    let mut agg = aggregation(&store, &parent).await;

    let object = Record::new("object".to_string(), json!({}));
    agg.append_target(object.clone()).await.unwrap();

    let view =
        FilteredAssociation::flag("child_collections", "members", store.clone(), "collection");
    let mut owner_record = agg.owner().clone();
    let child = Record::new("collection".to_string(), json!({ "collection": true }));
    view.append(&mut owner_record, child.clone()).await.unwrap();
    assert_eq!(view.ids(&owner_record).await.unwrap(), vec![child.id.clone()]);

    // Replacing the view's members keeps the unselected, ordered object
    let other = Record::new("collection".to_string(), json!({ "collection": true }));
    view.write(&mut owner_record, vec![other.clone()]).await.unwrap();
    agg.reload().await.unwrap();

    assert!(agg.is_member(&other.id));
    assert!(!agg.is_member(&child.id));
    assert_eq!(agg.target_ids().await.unwrap(), vec![object.id.clone()]);
    assert!(agg.is_member(&object.id));
}
