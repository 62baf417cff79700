//! Typed load/save of state records on top of a [`StateStore`].

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DatabaseError;
use crate::store::StateStore;

/// Load a record, falling back to its default when it was never saved.
pub async fn load<T>(store: &dyn StateStore, scope: &str, property: &str) -> Result<T, DatabaseError>
where
    T: DeserializeOwned + Default,
{
    match store.read_state(scope, property).await? {
        Some(value) => serde_json::from_value(value).map_err(|e| {
            DatabaseError::Serialization(format!("{scope}/{property}: {e}"))
        }),
        None => Ok(T::default()),
    }
}

/// Overwrite a record.
pub async fn save<T>(
    store: &dyn StateStore,
    scope: &str,
    property: &str,
    record: &T,
) -> Result<(), DatabaseError>
where
    T: Serialize + Sync,
{
    let value =
        serde_json::to_value(record).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    store.write_state(scope, property, &value).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::{ConversationFlow, Question, UserProfile};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn missing_record_loads_default() {
        let store = MemoryStore::new();
        let flow: ConversationFlow = load(&store, "s", "ConversationFlow").await.unwrap();
        assert_eq!(flow.last_question_asked, Question::None);
    }

    #[tokio::test]
    async fn saved_record_round_trips() {
        let store = MemoryStore::new();
        let profile = UserProfile {
            user_name: Some("Bob".into()),
            ..Default::default()
        };
        save(&store, "u", "UserProfile", &profile).await.unwrap();
        let back: UserProfile = load(&store, "u", "UserProfile").await.unwrap();
        assert_eq!(back, profile);
    }

    #[tokio::test]
    async fn malformed_record_is_a_serialization_error() {
        let store = MemoryStore::new();
        store
            .write_state("s", "ConversationFlow", &serde_json::json!({"lastQuestionAsked": 5}))
            .await
            .unwrap();
        let err = load::<ConversationFlow>(&store, "s", "ConversationFlow")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Serialization(_)));
    }
}
