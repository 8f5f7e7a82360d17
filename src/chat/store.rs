//! Session persistence on top of the key-value table.
//!
//! Every public operation swallows storage failures: the error is
//! logged and a safe default is returned so the chat loop keeps going.
use anyhow::{Error, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio_rusqlite::Connection;

use super::db::{kv_get, kv_set};
use super::models::{
    CreatedSession, SessionRecord, SessionState, session_id_for, session_key, session_name_for,
};

pub const CURRENT_SESSION_ID_KEY: &str = "currentSessionId";
pub const SESSION_COUNTER_KEY: &str = "sessionCounter";
pub const SESSION_LIST_KEY: &str = "sessionList";

#[derive(Clone)]
pub struct SessionStore {
    db: Connection,
}

impl SessionStore {
    pub fn new(db: Connection) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        kv_get(&self.db, key)
            .await
            .inspect_err(|e| tracing::error!("Error reading {}: {}", key, e))
            .ok()
            .flatten()
    }

    pub async fn set(&self, key: &str, value: &Value) -> bool {
        kv_set(&self.db, key, value)
            .await
            .inspect_err(|e| tracing::error!("Error writing {}: {}", key, e))
            .is_ok()
    }

    async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match kv_get(&self.db, key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn find_record(&self, id: &str) -> Result<Option<SessionRecord>, Error> {
        self.get_as(&session_key(id)).await
    }

    async fn try_list_session_ids(&self) -> Result<Vec<String>, Error> {
        Ok(self.get_as(SESSION_LIST_KEY).await?.unwrap_or_default())
    }

    async fn try_save_session(&self, state: &SessionState) -> Result<(), Error> {
        let record = SessionRecord {
            history: state.chat_history.clone(),
            model: state.current_model.clone(),
            timestamp: Utc::now(),
            name: state.current_chat_name.clone(),
        };
        let id = &state.current_chat_id;
        kv_set(&self.db, &session_key(id), &json!(record)).await?;
        kv_set(&self.db, CURRENT_SESSION_ID_KEY, &json!(id)).await?;
        kv_set(&self.db, SESSION_COUNTER_KEY, &json!(state.chat_counter)).await?;

        let mut ids = self.try_list_session_ids().await?;
        if !ids.contains(id) {
            ids.push(id.clone());
            kv_set(&self.db, SESSION_LIST_KEY, &json!(ids)).await?;
        }
        Ok(())
    }

    /// Writes the active session under `session:{id}` along with the
    /// current id, the counter, and the list of known ids.
    pub async fn save_session(&self, state: &SessionState) {
        if let Err(e) = self.try_save_session(state).await {
            tracing::error!("Error saving chat: {}", e);
        }
    }

    /// Loads `session:{id}` (or the current id when `None`) into
    /// `state`. Returns false and leaves `state` alone on a miss.
    pub async fn load_session(&self, state: &mut SessionState, id: Option<&str>) -> bool {
        let id = id.unwrap_or(&state.current_chat_id).to_string();
        match self.find_record(&id).await {
            Ok(Some(record)) => {
                state.chat_history = record.history;
                state.current_model = record.model;
                state.current_chat_name = record.name;
                state.current_chat_id = id;
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::error!("Error loading chat: {}", e);
                false
            }
        }
    }

    pub async fn list_session_ids(&self) -> Vec<String> {
        self.try_list_session_ids().await.unwrap_or_else(|e| {
            tracing::error!("Error listing chats: {}", e);
            Vec::new()
        })
    }

    /// The display name of a session, or the id itself when the record
    /// can't be read.
    pub async fn get_display_name(&self, id: &str) -> String {
        match self.find_record(id).await {
            Ok(Some(record)) => record.name,
            Ok(None) => id.to_string(),
            Err(e) => {
                tracing::debug!("Falling back to id for chat name {}: {}", id, e);
                id.to_string()
            }
        }
    }

    /// Bumps the persisted counter and makes a fresh, empty session
    /// the active one. The counter is never rolled back even if the
    /// new session is abandoned.
    pub async fn create_session(&self, state: &mut SessionState) -> CreatedSession {
        let saved_counter = self
            .get_as::<u64>(SESSION_COUNTER_KEY)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Error reading session counter: {}", e);
                Some(state.chat_counter)
            });
        let counter = saved_counter.map(|c| c + 1).unwrap_or(1);

        let created = CreatedSession {
            id: session_id_for(counter),
            name: session_name_for(counter),
        };
        state.chat_counter = counter;
        state.current_chat_id = created.id.clone();
        state.current_chat_name = created.name.clone();
        state.chat_history.clear();

        self.save_session(state).await;
        tracing::debug!("Created chat {} ({})", created.id, created.name);
        created
    }

    /// Overwrites the display name of `id`. The id and its storage key
    /// stay the same.
    pub async fn rename_session(&self, state: &mut SessionState, id: &str, new_name: &str) -> bool {
        let mut record = match self.find_record(id).await {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!("Error renaming chat: {}", e);
                return false;
            }
        };

        record.name = new_name.to_string();
        if let Err(e) = kv_set(&self.db, &session_key(id), &json!(record)).await {
            tracing::error!("Error renaming chat: {}", e);
            return false;
        }

        if id == state.current_chat_id {
            state.current_chat_name = new_name.to_string();
        }
        true
    }

    /// Loads `id` and, if found, saves it straight back so it becomes
    /// the persisted current session.
    pub async fn switch_session(&self, state: &mut SessionState, id: &str) -> bool {
        let success = self.load_session(state, Some(id)).await;
        if success {
            self.save_session(state).await;
        }
        success
    }

    /// First known session whose display name is exactly `name`.
    pub async fn find_session_by_name(&self, name: &str) -> Option<String> {
        for id in self.list_session_ids().await {
            if self.get_display_name(&id).await == name {
                return Some(id);
            }
        }
        None
    }

    pub async fn saved_counter(&self) -> Option<u64> {
        self.get_as(SESSION_COUNTER_KEY)
            .await
            .inspect_err(|e| tracing::error!("Error reading session counter: {}", e))
            .ok()
            .flatten()
    }

    pub async fn saved_current_id(&self) -> Option<String> {
        self.get_as(CURRENT_SESSION_ID_KEY)
            .await
            .inspect_err(|e| tracing::error!("Error reading current chat: {}", e))
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::initialize_db;

    async fn test_store() -> SessionStore {
        let db = Connection::open_in_memory().await.unwrap();
        db.call(|conn| {
            initialize_db(conn)?;
            Ok(())
        })
        .await
        .unwrap();
        SessionStore::new(db)
    }

    /// A store whose schema was never created, so every query fails.
    async fn broken_store() -> SessionStore {
        SessionStore::new(Connection::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let store = test_store().await;
        let mut state = SessionState::default();
        state.current_model = "gpt-5-mini".to_string();
        state.current_chat_name = "Project notes".to_string();
        state.push_turn("hello", "world");
        store.save_session(&state).await;

        let mut loaded = SessionState {
            current_model: "grok-4-fast".to_string(),
            chat_history: vec!["You: stale".to_string()],
            current_chat_id: "other".to_string(),
            current_chat_name: "other".to_string(),
            chat_counter: state.chat_counter,
        };
        assert!(store.load_session(&mut loaded, Some("default")).await);
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_load_missing_leaves_state_unchanged() {
        let store = test_store().await;
        let mut state = SessionState::default();
        state.push_turn("a", "b");
        let before = state.clone();

        assert!(!store.load_session(&mut state, Some("chat_99")).await);
        assert!(!store.load_session(&mut state, None).await);
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_save_updates_index_keys() {
        let store = test_store().await;
        let state = SessionState::default();
        store.save_session(&state).await;

        assert_eq!(
            store.get(CURRENT_SESSION_ID_KEY).await,
            Some(json!("default"))
        );
        assert_eq!(store.get(SESSION_COUNTER_KEY).await, Some(json!(1)));
        assert_eq!(store.list_session_ids().await, vec!["default"]);
    }

    #[tokio::test]
    async fn test_repeated_saves_do_not_duplicate_ids() {
        let store = test_store().await;
        let state = SessionState::default();
        store.save_session(&state).await;
        store.save_session(&state).await;

        assert_eq!(store.list_session_ids().await, vec!["default"]);
    }

    #[tokio::test]
    async fn test_create_session_twice() {
        let store = test_store().await;
        let mut state = SessionState::default();
        store.save_session(&state).await;

        state.push_turn("hi", "there");
        let first = store.create_session(&mut state).await;
        assert!(state.chat_history.is_empty());
        let second = store.create_session(&mut state).await;
        assert!(state.chat_history.is_empty());

        assert_eq!(first.id, "chat_2");
        assert_eq!(first.name, "New Chat 2");
        assert_eq!(second.id, "chat_3");
        assert_eq!(state.current_chat_id, "chat_3");
        assert_eq!(state.current_chat_name, "New Chat 3");
        assert_eq!(state.chat_counter, 3);
        assert_eq!(
            store.list_session_ids().await,
            vec!["default", "chat_2", "chat_3"]
        );

        let mut check = SessionState::default();
        assert!(store.load_session(&mut check, Some("chat_2")).await);
        assert!(check.chat_history.is_empty());
    }

    #[tokio::test]
    async fn test_create_session_on_empty_store_starts_at_one() {
        let store = test_store().await;
        let mut state = SessionState::default();
        let created = store.create_session(&mut state).await;
        assert_eq!(created.id, "chat_1");
        assert_eq!(store.saved_counter().await, Some(1));
    }

    #[tokio::test]
    async fn test_rename_session() {
        let store = test_store().await;
        let mut state = SessionState::default();
        store.save_session(&state).await;

        assert!(store.rename_session(&mut state, "default", "X").await);
        assert_eq!(store.get_display_name("default").await, "X");
        // The id is untouched, only the name follows
        assert_eq!(state.current_chat_id, "default");
        assert_eq!(state.current_chat_name, "X");
        assert_eq!(store.list_session_ids().await, vec!["default"]);
    }

    #[tokio::test]
    async fn test_rename_missing_session() {
        let store = test_store().await;
        let mut state = SessionState::default();
        store.save_session(&state).await;
        let before_record = store.get("session:default").await;
        let before_state = state.clone();

        assert!(!store.rename_session(&mut state, "ghost", "X").await);
        assert_eq!(store.get("session:ghost").await, None);
        assert_eq!(store.get("session:default").await, before_record);
        assert_eq!(store.list_session_ids().await, vec!["default"]);
        assert_eq!(state, before_state);
    }

    #[tokio::test]
    async fn test_rename_other_session_keeps_current_name() {
        let store = test_store().await;
        let mut state = SessionState::default();
        store.save_session(&state).await;
        store.create_session(&mut state).await;

        assert!(store.rename_session(&mut state, "default", "Old").await);
        assert_eq!(state.current_chat_name, "New Chat 2");
        assert_eq!(store.get_display_name("default").await, "Old");
    }

    #[tokio::test]
    async fn test_switch_session() {
        let store = test_store().await;
        let mut state = SessionState::default();
        state.push_turn("first", "chat");
        store.save_session(&state).await;
        store.create_session(&mut state).await;

        assert!(store.switch_session(&mut state, "default").await);
        assert_eq!(state.current_chat_id, "default");
        assert_eq!(state.chat_history, vec!["You: first", "AI: chat"]);
        assert_eq!(store.saved_current_id().await, Some("default".to_string()));

        assert!(!store.switch_session(&mut state, "missing").await);
        assert_eq!(state.current_chat_id, "default");
    }

    #[tokio::test]
    async fn test_find_session_by_name() {
        let store = test_store().await;
        let mut state = SessionState::default();
        store.save_session(&state).await;
        store.create_session(&mut state).await;

        assert_eq!(
            store.find_session_by_name("New Chat 2").await,
            Some("chat_2".to_string())
        );
        assert_eq!(
            store.find_session_by_name("default").await,
            Some("default".to_string())
        );
        assert_eq!(store.find_session_by_name("nope").await, None);
    }

    #[tokio::test]
    async fn test_display_name_falls_back_to_id() {
        let store = test_store().await;
        assert_eq!(store.get_display_name("chat_7").await, "chat_7");

        let broken = broken_store().await;
        assert_eq!(broken.get_display_name("chat_7").await, "chat_7");
    }

    #[tokio::test]
    async fn test_storage_failures_return_defaults() {
        let store = broken_store().await;
        let mut state = SessionState::default();
        let before = state.clone();

        assert_eq!(store.get("anything").await, None);
        assert!(!store.set("anything", &json!(1)).await);
        assert!(store.list_session_ids().await.is_empty());
        assert!(!store.load_session(&mut state, None).await);
        assert!(!store.rename_session(&mut state, "default", "X").await);
        assert!(!store.switch_session(&mut state, "default").await);
        store.save_session(&state).await;
        assert_eq!(state, before);
        assert_eq!(store.saved_counter().await, None);
        assert_eq!(store.saved_current_id().await, None);
    }
}
