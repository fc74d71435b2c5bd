//! In-memory doubles for the pipeline seams.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::error::{BackendError, FetchError};
use crate::llm::ModelBackend;
use crate::models::{AlertRecord, ChatMessage, Severity, SourceKind};
use crate::schedule::{Sleeper, StopHandle};
use crate::sources::AlertSource;

/// Replays scripted replies; once the script runs out the last reply repeats.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    pub calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedBackend {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, String>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(None),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always(reply: Result<&str, &str>) -> Self {
        Self::new([reply.map(str::to_string).map_err(str::to_string)])
    }

    pub fn call_log(&self) -> Arc<Mutex<Vec<Vec<ChatMessage>>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let next = self.replies.lock().unwrap().pop_front();
        let reply = match next {
            Some(reply) => {
                *self.last.lock().unwrap() = Some(reply.clone());
                reply
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err("script exhausted".to_string())),
        };
        reply.map_err(|body| BackendError::Status { status: 503, body })
    }
}

/// Records requested sleeps and returns immediately; optionally stops a loop after N sleeps.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
    stop_after: Option<(usize, StopHandle)>,
}

impl RecordingSleeper {
    pub fn stopping_after(count: usize, handle: StopHandle) -> Self {
        Self {
            sleeps: Mutex::new(Vec::new()),
            stop_after: Some((count, handle)),
        }
    }

    pub fn recorded(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(duration);
            sleeps.len()
        };
        if let Some((limit, handle)) = &self.stop_after {
            if count >= *limit {
                handle.stop();
            }
        }
    }
}

/// Source returning fixed records, or failing every time.
pub struct StaticSource {
    pub records: Option<Vec<AlertRecord>>,
    pub fetches: Arc<Mutex<usize>>,
}

impl StaticSource {
    pub fn with_records(records: Vec<AlertRecord>) -> Self {
        Self {
            records: Some(records),
            fetches: Arc::new(Mutex::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            records: None,
            fetches: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait]
impl AlertSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Result<Vec<AlertRecord>, FetchError> {
        *self.fetches.lock().unwrap() += 1;
        self.records.clone().ok_or_else(|| FetchError::Status {
            source_name: "static".to_string(),
            status: 502,
            body: "feed unavailable".to_string(),
        })
    }
}

pub fn alert(title: &str, points: u64) -> AlertRecord {
    AlertRecord {
        title: title.to_string(),
        content: format!("Points: {} | https://example.com/{}", points, points),
        severity: Severity::from_popularity(points),
        source: SourceKind::Hackernews,
        timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        link: Some(format!("https://example.com/{}", points)),
        popularity: Some(points),
    }
}
