//! Assistant presets
//!
//! An assistant bundles a system prompt with generation options. Presets
//! are persisted as one JSON list under [`ASSISTANT_STORE`]; the first read
//! of an empty store seeds it with [`default_assistants`].

use crate::config::{ValidationError, MAX_TOKEN, TEMPERATURE};
use crate::protocol::AssistantOptions;
use crate::storage::{JsonStoreExt, KeyValueStore, StorageError, StorageResult, ASSISTANT_STORE};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::debug;
use uuid::Uuid;

pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=2.0;
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 50..=2000;
pub const MAX_LOG_RANGE: RangeInclusive<u8> = 0..=8;

/// Prior messages sent with each turn by the seeded preset
pub const DEFAULT_MAX_LOG: u8 = 4;

const DEFAULT_NAME: &str = "AI Assistant";
const DEFAULT_PROMPT: &str = "You are a helpful assistant. Answer accurately and concisely, \
and decline requests that promote violence, discrimination or other harm.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    pub name: String,
    /// System prompt
    pub prompt: String,
    pub temperature: f32,
    /// Number of prior messages sent as history
    pub max_log: u8,
    pub max_tokens: u32,
}

impl Assistant {
    /// New preset with default options and a fresh id
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            prompt: prompt.into(),
            temperature: TEMPERATURE,
            max_log: DEFAULT_MAX_LOG,
            max_tokens: MAX_TOKEN,
        }
    }

    /// Options sent to the relay for a turn with this assistant
    pub fn options(&self) -> AssistantOptions {
        AssistantOptions::new(self.prompt.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_max_history(self.max_log)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::required("assistant.name"));
        }
        if !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(ValidationError::out_of_range(
                "assistant.temperature",
                format!("{} is outside {:?}", self.temperature, TEMPERATURE_RANGE),
            ));
        }
        if !MAX_TOKENS_RANGE.contains(&self.max_tokens) {
            return Err(ValidationError::out_of_range(
                "assistant.max_tokens",
                format!("{} is outside {:?}", self.max_tokens, MAX_TOKENS_RANGE),
            ));
        }
        if !MAX_LOG_RANGE.contains(&self.max_log) {
            return Err(ValidationError::out_of_range(
                "assistant.max_log",
                format!("{} is outside {:?}", self.max_log, MAX_LOG_RANGE),
            ));
        }
        Ok(())
    }

    fn apply(&mut self, patch: AssistantPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(prompt) = patch.prompt {
            self.prompt = prompt;
        }
        if let Some(temperature) = patch.temperature {
            self.temperature = temperature;
        }
        if let Some(max_log) = patch.max_log {
            self.max_log = max_log;
        }
        if let Some(max_tokens) = patch.max_tokens {
            self.max_tokens = max_tokens;
        }
    }
}

/// Partial update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_log: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Presets written to an empty store
pub fn default_assistants() -> Vec<Assistant> {
    vec![Assistant::new(DEFAULT_NAME, DEFAULT_PROMPT)]
}

/// Assistant list persisted in a [`KeyValueStore`]
pub struct AssistantStore<S> {
    store: S,
}

impl<S: KeyValueStore> AssistantStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All presets, seeding the defaults on first use
    pub fn list(&self) -> StorageResult<Vec<Assistant>> {
        if let Some(list) = self.store.get_json(ASSISTANT_STORE)? {
            return Ok(list);
        }
        let list = default_assistants();
        debug!("Seeding {} default assistants", list.len());
        self.save(&list)?;
        Ok(list)
    }

    pub fn get(&self, id: &str) -> StorageResult<Option<Assistant>> {
        Ok(self.list()?.into_iter().find(|a| a.id == id))
    }

    pub fn add(&self, assistant: Assistant) -> StorageResult<Vec<Assistant>> {
        assistant.validate()?;
        let mut list = self.list()?;
        list.push(assistant);
        self.save(&list)?;
        Ok(list)
    }

    /// Merge `patch` into the preset with `id`. Unknown ids leave the list
    /// untouched.
    pub fn update(&self, id: &str, patch: AssistantPatch) -> StorageResult<Vec<Assistant>> {
        let mut list = self.list()?;
        let Some(index) = list.iter().position(|a| a.id == id) else {
            return Ok(list);
        };

        let mut updated = list[index].clone();
        updated.apply(patch);
        updated.validate()?;
        list[index] = updated;

        self.save(&list)?;
        Ok(list)
    }

    /// Remove the preset with `id` and persist the remaining list
    pub fn remove(&self, id: &str) -> StorageResult<Vec<Assistant>> {
        let mut list = self.list()?;
        let before = list.len();
        list.retain(|a| a.id != id);
        if list.len() == before {
            return Err(StorageError::NotFound(format!("assistant '{}'", id)));
        }
        self.save(&list)?;
        Ok(list)
    }

    fn save(&self, list: &[Assistant]) -> StorageResult<()> {
        self.store.set_json(ASSISTANT_STORE, list)
    }
}
