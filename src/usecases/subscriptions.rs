//! Subscription Registry - Per-Connection Filter State
//!
//! One filter record per connection. `subscribe` replaces the record
//! wholesale; the token-list and filter-update variants merge into the
//! existing record instead. Match queries drive the broadcast fan-out.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::protocol::SubscriptionFilters;

/// Registry of active subscriptions keyed by connection id.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<Uuid, SubscriptionFilters>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace a connection's filters wholesale.
    pub async fn subscribe(&self, id: Uuid, filters: SubscriptionFilters) {
        debug!(connection = %id, ?filters, "Subscription installed");
        self.subscriptions.write().await.insert(id, filters);
    }

    /// Merge a token allow-list into the existing filters, keeping the
    /// other fields. Returns the filters now in effect.
    pub async fn subscribe_tokens(&self, id: Uuid, tokens: Vec<String>) -> SubscriptionFilters {
        let mut subscriptions = self.subscriptions.write().await;
        let entry = subscriptions.entry(id).or_default();
        entry.tokens = Some(tokens);
        entry.clone()
    }

    /// Merge individual filter fields into the existing record.
    /// Returns the merged filters.
    pub async fn update_filters(
        &self,
        id: Uuid,
        update: SubscriptionFilters,
    ) -> SubscriptionFilters {
        let mut subscriptions = self.subscriptions.write().await;
        let entry = subscriptions.entry(id).or_default();
        entry.merge_from(update);
        entry.clone()
    }

    /// Remove a connection's record. Returns whether one existed.
    pub async fn unsubscribe(&self, id: Uuid) -> bool {
        self.subscriptions.write().await.remove(&id).is_some()
    }

    /// Current filters for a connection.
    pub async fn get(&self, id: Uuid) -> Option<SubscriptionFilters> {
        self.subscriptions.read().await.get(&id).cloned()
    }

    /// Number of registered subscriptions.
    pub async fn count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Connections whose filters match a whole-result update.
    pub async fn subscribers_for_update(&self, update: &SubscriptionFilters) -> Vec<Uuid> {
        self.subscriptions
            .read()
            .await
            .iter()
            .filter(|(_, filters)| filters.matches_update(update))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Connections holding an explicit allow-list containing the
    /// address. Per-token deltas go only to these; the generic
    /// `tokenUpdates` channel already covers list-less connections.
    pub async fn delta_subscribers(&self, address: &str) -> Vec<Uuid> {
        self.subscriptions
            .read()
            .await
            .iter()
            .filter(|(_, filters)| {
                filters
                    .tokens
                    .as_ref()
                    .is_some_and(|list| list.iter().any(|a| a == address))
            })
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::token::TimeWindow;

    #[tokio::test]
    async fn test_subscribe_replaces_wholesale() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();

        registry
            .subscribe(
                id,
                SubscriptionFilters {
                    time: Some(TimeWindow::OneHour),
                    tokens: Some(vec!["mint1".to_string()]),
                    ..SubscriptionFilters::default()
                },
            )
            .await;

        registry
            .subscribe(
                id,
                SubscriptionFilters {
                    sort: Some("-marketCap".to_string()),
                    ..SubscriptionFilters::default()
                },
            )
            .await;

        let filters = registry.get(id).await.unwrap();
        // The earlier window and allow-list are gone.
        assert_eq!(filters.time, None);
        assert_eq!(filters.tokens, None);
        assert_eq!(filters.sort.as_deref(), Some("-marketCap"));
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_subscribe_tokens_merges_into_existing_filters() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();

        registry
            .subscribe(id, SubscriptionFilters::connection_default())
            .await;
        let merged = registry
            .subscribe_tokens(id, vec!["mint1".to_string(), "mint2".to_string()])
            .await;

        assert_eq!(merged.time, Some(TimeWindow::OneDay));
        assert_eq!(merged.limit, Some(50));
        assert_eq!(
            merged.tokens,
            Some(vec!["mint1".to_string(), "mint2".to_string()])
        );
    }

    #[tokio::test]
    async fn test_update_filters_merges_field_wise() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();

        registry
            .subscribe(id, SubscriptionFilters::connection_default())
            .await;
        let merged = registry
            .update_filters(
                id,
                SubscriptionFilters {
                    time: Some(TimeWindow::SevenDays),
                    ..SubscriptionFilters::default()
                },
            )
            .await;

        assert_eq!(merged.time, Some(TimeWindow::SevenDays));
        assert_eq!(merged.sort.as_deref(), Some("volume"));
    }

    #[tokio::test]
    async fn test_deltas_target_explicit_allow_lists_only() {
        let registry = SubscriptionRegistry::new();
        let list_less = Uuid::new_v4();
        let listed = Uuid::new_v4();

        registry
            .subscribe(list_less, SubscriptionFilters::connection_default())
            .await;
        registry
            .subscribe(
                listed,
                SubscriptionFilters {
                    tokens: Some(vec!["mint1".to_string()]),
                    ..SubscriptionFilters::default()
                },
            )
            .await;

        assert_eq!(registry.delta_subscribers("mint1").await, vec![listed]);
        // A list-less connection never receives deltas, and an unlisted
        // address targets nobody.
        assert!(registry.delta_subscribers("mint2").await.is_empty());
    }

    #[tokio::test]
    async fn test_filter_matching_for_broadcast() {
        let registry = SubscriptionRegistry::new();
        let matching = Uuid::new_v4();
        let other_window = Uuid::new_v4();

        registry
            .subscribe(matching, SubscriptionFilters::connection_default())
            .await;
        registry
            .subscribe(
                other_window,
                SubscriptionFilters {
                    time: Some(TimeWindow::OneHour),
                    ..SubscriptionFilters::connection_default()
                },
            )
            .await;

        let update = SubscriptionFilters::connection_default();
        assert_eq!(registry.subscribers_for_update(&update).await, vec![matching]);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_record() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        registry
            .subscribe(id, SubscriptionFilters::connection_default())
            .await;

        assert!(registry.unsubscribe(id).await);
        assert!(!registry.unsubscribe(id).await);
        assert_eq!(registry.count().await, 0);
    }
}
