use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::state::{CustomizationState, CustomizationStore, Mutation, SubscriptionId};

pub type EventPayload = Map<String, Value>;

/// Append-only writer for a session's `events.jsonl`.
///
/// - default fields are `type`, `session_id`, `ts`
/// - caller payload is merged last and can override defaults
/// - one compact JSON object per line
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        for (key, value) in payload {
            event.insert(key, value);
        }

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&event)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(event))
    }

    /// Logs every store mutation as one event line.
    pub fn attach(&self, store: &CustomizationStore) -> SubscriptionId {
        let writer = self.clone();
        store.subscribe(move |snapshot, mutation| {
            let payload = mutation_payload(snapshot, mutation);
            if let Err(err) = writer.emit(mutation.event_type(), payload) {
                tracing::warn!(
                    path = %writer.path().display(),
                    "failed to append session event: {err:#}"
                );
            }
        })
    }
}

fn mutation_payload(snapshot: &CustomizationState, mutation: &Mutation) -> EventPayload {
    let mut payload = EventPayload::new();
    match mutation {
        Mutation::ColorChanged(color) => {
            payload.insert("color".to_string(), Value::String(color.to_string()));
        }
        Mutation::DecalChanged(slot) => {
            let decal = snapshot.decal(*slot);
            payload.insert("slot".to_string(), Value::String(slot.as_str().to_string()));
            payload.insert("payload_len".to_string(), Value::from(decal.len()));
            payload.insert(
                "payload_sha256".to_string(),
                Value::String(short_digest(decal)),
            );
        }
        Mutation::FilterChanged { slot, enabled } => {
            payload.insert("slot".to_string(), Value::String(slot.as_str().to_string()));
            payload.insert("enabled".to_string(), Value::Bool(*enabled));
        }
        Mutation::IntroChanged(intro) => {
            payload.insert("intro".to_string(), Value::Bool(*intro));
        }
    }
    payload
}

fn short_digest(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..8])
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
