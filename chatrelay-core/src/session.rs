//! Chat sessions and their message logs
//!
//! The session list lives under [`SESSION_STORE`]; each session's messages
//! live under `"{MESSAGE_STORE}_{id}"`. There is always at least one
//! session.

use crate::assistant::Assistant;
use crate::protocol::{ChatRequest, Message, MessageRole};
use crate::storage::{
    JsonStoreExt, KeyValueStore, StorageError, StorageResult, MESSAGE_STORE, SESSION_STORE,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    /// Id of the assistant this session talks to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant: Option<String>,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            assistant: None,
        }
    }

    pub fn with_assistant(mut self, assistant_id: impl Into<String>) -> Self {
        self.assistant = Some(assistant_id.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant: Option<String>,
}

/// Default name for the `n`th session
pub fn session_name(n: usize) -> String {
    format!("session-{}", n)
}

fn message_key(session_id: &str) -> String {
    format!("{}_{}", MESSAGE_STORE, session_id)
}

pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All sessions; an empty store is seeded with one
    pub fn list(&self) -> StorageResult<Vec<Session>> {
        match self.store.get_json::<Vec<Session>>(SESSION_STORE)? {
            Some(list) if !list.is_empty() => Ok(list),
            _ => {
                let list = vec![Session::new(session_name(1))];
                debug!("Seeding initial session {}", list[0].id);
                self.save(&list)?;
                Ok(list)
            }
        }
    }

    pub fn get(&self, id: &str) -> StorageResult<Option<Session>> {
        Ok(self.list()?.into_iter().find(|s| s.id == id))
    }

    pub fn add(&self, session: Session) -> StorageResult<Vec<Session>> {
        let mut list = self.list()?;
        list.push(session);
        self.save(&list)?;
        Ok(list)
    }

    pub fn update(&self, id: &str, patch: SessionPatch) -> StorageResult<Vec<Session>> {
        let mut list = self.list()?;
        let session = list
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StorageError::NotFound(format!("session '{}'", id)))?;

        if let Some(name) = patch.name {
            session.name = name;
        }
        if let Some(assistant) = patch.assistant {
            session.assistant = Some(assistant);
        }

        self.save(&list)?;
        Ok(list)
    }

    /// Remove a session together with its messages
    pub fn remove(&self, id: &str) -> StorageResult<Vec<Session>> {
        let mut list = self.list()?;
        if !list.iter().any(|s| s.id == id) {
            return Err(StorageError::NotFound(format!("session '{}'", id)));
        }
        if list.len() == 1 {
            return Err(StorageError::LastSession);
        }

        list.retain(|s| s.id != id);
        self.save(&list)?;
        self.store.remove(&message_key(id));
        Ok(list)
    }

    /// Message log of a session, empty when none was saved
    pub fn messages(&self, id: &str) -> StorageResult<Vec<Message>> {
        Ok(self.store.get_json(&message_key(id))?.unwrap_or_default())
    }

    pub fn set_messages(&self, id: &str, messages: &[Message]) -> StorageResult<()> {
        self.store.set_json(&message_key(id), messages)
    }

    fn save(&self, list: &[Session]) -> StorageResult<()> {
        self.store.set_json(SESSION_STORE, list)
    }
}

/// Build the next turn for `prompt`.
///
/// Returns the message log with the new user message appended and the
/// request to post to the relay, or `None` when the prompt is blank. The
/// request history is the last `max_log` messages before the new turn.
pub fn prepare_turn(
    messages: &[Message],
    prompt: &str,
    assistant: &Assistant,
) -> Option<(Vec<Message>, ChatRequest)> {
    if prompt.trim().is_empty() {
        return None;
    }

    let keep = usize::from(assistant.max_log).min(messages.len());
    let history = messages[messages.len() - keep..].to_vec();

    let mut log = messages.to_vec();
    log.push(Message::user(prompt));

    let request = ChatRequest::new(prompt)
        .with_history(history)
        .with_options(assistant.options());
    Some((log, request))
}

/// Record streamed assistant text in the log.
///
/// Replaces the trailing assistant message if there is one, otherwise
/// appends a new one. Empty text leaves the log unchanged.
pub fn apply_suggestion(messages: &mut Vec<Message>, suggestion: &str) {
    if suggestion.is_empty() {
        return;
    }
    match messages.last_mut() {
        Some(last) if last.role == MessageRole::Assistant => {
            last.content = suggestion.to_string();
        }
        _ => messages.push(Message::assistant(suggestion)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_list_seeds_single_session() {
        let sessions = SessionStore::new(MemoryStore::new());
        let list = sessions.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "session-1");
        assert_eq!(sessions.list().unwrap(), list);
    }

    #[test]
    fn test_remove_deletes_messages() {
        let backing = Arc::new(MemoryStore::new());
        let sessions = SessionStore::new(Arc::clone(&backing));
        let second = Session::new(session_name(2));
        let id = second.id.clone();
        sessions.add(second).unwrap();
        sessions
            .set_messages(&id, &[Message::user("hi"), Message::assistant("hello")])
            .unwrap();
        assert_eq!(sessions.messages(&id).unwrap().len(), 2);

        let remaining = sessions.remove(&id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(backing.get(&message_key(&id)).is_none());
        assert!(sessions.messages(&id).unwrap().is_empty());
    }

    #[test]
    fn test_last_session_cannot_be_removed() {
        let sessions = SessionStore::new(MemoryStore::new());
        let id = sessions.list().unwrap()[0].id.clone();
        assert!(matches!(sessions.remove(&id), Err(StorageError::LastSession)));
        assert!(matches!(
            sessions.remove("nope"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_renames_and_binds_assistant() {
        let sessions = SessionStore::new(MemoryStore::new());
        let id = sessions.list().unwrap()[0].id.clone();
        sessions
            .update(
                &id,
                SessionPatch {
                    name: Some("work".to_string()),
                    assistant: Some("a1".to_string()),
                },
            )
            .unwrap();
        let session = sessions.get(&id).unwrap().unwrap();
        assert_eq!(session.name, "work");
        assert_eq!(session.assistant.as_deref(), Some("a1"));
    }

    #[test]
    fn test_prepare_turn_blank_prompt() {
        let assistant = Assistant::new("a", "");
        assert!(prepare_turn(&[], "   ", &assistant).is_none());
    }

    #[test]
    fn test_prepare_turn_history_window() {
        let mut assistant = Assistant::new("a", "sys");
        assistant.max_log = 2;
        let messages = vec![
            Message::user("one"),
            Message::assistant("two"),
            Message::user("three"),
            Message::assistant("four"),
        ];

        let (log, request) = prepare_turn(&messages, "five", &assistant).unwrap();
        assert_eq!(log.len(), 5);
        assert_eq!(log[4], Message::user("five"));
        assert_eq!(
            request.history,
            vec![Message::user("three"), Message::assistant("four")]
        );
        assert_eq!(request.prompt, "five");
        assert_eq!(request.options.system_prompt, "sys");
    }

    #[test]
    fn test_prepare_turn_zero_history() {
        let mut assistant = Assistant::new("a", "");
        assistant.max_log = 0;
        let (_, request) = prepare_turn(&[Message::user("old")], "new", &assistant).unwrap();
        assert!(request.history.is_empty());
    }

    #[test]
    fn test_apply_suggestion() {
        let mut log = vec![Message::user("hi")];
        apply_suggestion(&mut log, "");
        assert_eq!(log.len(), 1);

        apply_suggestion(&mut log, "Hel");
        apply_suggestion(&mut log, "Hello");
        assert_eq!(log.len(), 2);
        assert_eq!(log[1], Message::assistant("Hello"));
    }
}
