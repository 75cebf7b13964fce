//! In-memory adapters and app builders shared by the integration tests.
#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::Algorithm;
use keel_api::{
    AppComponents,
    config::Settings,
    models::{UserCreate, UserRead},
    services::{
        AppMetrics, AppState, CacheError, CacheStore, CounterStore, JwtVerifier, MessageBroker,
        QueueError, RepositoryError, SearchError, SearchIndex, UserRepository, WindowCount,
        issue_token,
    },
    utils::PiiScrubber,
};
use serde_json::{Value, json};

pub const SECRET: &str = "integration-test-secret";

#[derive(Default)]
pub struct MemoryUsers {
    rows: Mutex<Vec<UserRead>>,
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn create(&self, user: &UserCreate) -> Result<UserRead, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|row| row.email == user.email) {
            return Err(RepositoryError::Duplicate);
        }
        let row = UserRead {
            id: rows.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: i64) -> Result<Option<UserRead>, RepositoryError> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, offset: u32, limit: u32) -> Result<Vec<UserRead>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok(rows.len() != before)
    }

    async fn check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Cache and counter store. `broken` makes every call fail.
#[derive(Default)]
pub struct MemoryCache {
    values: Mutex<HashMap<String, Value>>,
    counters: Mutex<HashMap<String, u64>>,
    pub ttls: Mutex<HashMap<String, Duration>>,
    broken: bool,
}

impl MemoryCache {
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    fn guard(&self) -> Result<(), CacheError> {
        if self.broken {
            Err(CacheError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.guard()?;
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set_json(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), CacheError> {
        self.guard()?;
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        self.ttls.lock().unwrap().insert(key.to_string(), ttl);
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.guard()
    }
}

#[async_trait]
impl CounterStore for MemoryCache {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CacheError> {
        self.guard()?;
        let mut counters = self.counters.lock().unwrap();
        let count = counters.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(WindowCount {
            count: *count,
            ttl: window.as_secs(),
        })
    }
}

#[derive(Default)]
pub struct MemorySearch {
    documents: Mutex<HashMap<(String, String), Value>>,
}

#[async_trait]
impl SearchIndex for MemorySearch {
    async fn index_document(
        &self,
        index: &str,
        doc_id: &str,
        document: &Value,
    ) -> Result<Value, SearchError> {
        let previous = self
            .documents
            .lock()
            .unwrap()
            .insert((index.to_string(), doc_id.to_string()), document.clone());
        let result = if previous.is_some() { "updated" } else { "created" };
        Ok(json!({"_index": index, "_id": doc_id, "result": result}))
    }

    async fn get_document(&self, index: &str, doc_id: &str) -> Result<Value, SearchError> {
        let documents = self.documents.lock().unwrap();
        let source = documents
            .get(&(index.to_string(), doc_id.to_string()))
            .ok_or(SearchError::NotFound)?;
        Ok(json!({"_index": index, "_id": doc_id, "found": true, "_source": source}))
    }

    async fn search(
        &self,
        index: &str,
        query: Option<&str>,
        size: u32,
    ) -> Result<Value, SearchError> {
        let documents = self.documents.lock().unwrap();
        let hits: Vec<Value> = documents
            .iter()
            .filter(|((i, _), _)| i == index)
            .filter(|(_, doc)| query.is_none_or(|q| doc.to_string().contains(q)))
            .take(size as usize)
            .map(|((_, id), doc)| json!({"_id": id, "_source": doc}))
            .collect();
        Ok(json!({"hits": {"total": {"value": hits.len()}, "hits": hits}}))
    }

    async fn cluster_health(&self) -> Result<Value, SearchError> {
        Ok(json!({"status": "green"}))
    }
}

/// Routes every published message to the queue named by its routing key.
#[derive(Default)]
pub struct MemoryBroker {
    queues: Mutex<HashMap<String, VecDeque<Value>>>,
    pub consumers: Mutex<Vec<String>>,
}

#[async_trait]
impl MessageBroker for MemoryBroker {
    async fn publish(
        &self,
        _exchange: &str,
        routing_key: &str,
        payload: &Value,
    ) -> Result<(), QueueError> {
        self.queues
            .lock()
            .unwrap()
            .entry(routing_key.to_string())
            .or_default()
            .push_back(payload.clone());
        Ok(())
    }

    async fn consume_one(&self, queue: &str) -> Result<Option<Value>, QueueError> {
        Ok(self
            .queues
            .lock()
            .unwrap()
            .get_mut(queue)
            .and_then(VecDeque::pop_front))
    }

    async fn start_consumer(&self, queue: &str) -> Result<(), QueueError> {
        self.consumers.lock().unwrap().push(queue.to_string());
        Ok(())
    }

    async fn check(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

/// Handles to the fakes behind a fully wired [`AppState`].
pub struct Fakes {
    pub users: Arc<MemoryUsers>,
    pub cache: Arc<MemoryCache>,
    pub search: Arc<MemorySearch>,
    pub broker: Arc<MemoryBroker>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            users: Arc::new(MemoryUsers::default()),
            cache: Arc::new(MemoryCache::default()),
            search: Arc::new(MemorySearch::default()),
            broker: Arc::new(MemoryBroker::default()),
        }
    }

    pub fn state(&self) -> AppState {
        AppState::default()
            .with_users(self.users.clone())
            .with_cache(self.cache.clone())
            .with_search(self.search.clone())
            .with_broker(self.broker.clone())
    }
}

pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.jwt.secret = SECRET.to_string();
    settings
}

pub fn components_with(
    settings: &Settings,
    state: AppState,
    counters: Option<Arc<dyn CounterStore>>,
) -> AppComponents {
    AppComponents::new(
        settings,
        state,
        counters,
        JwtVerifier::from_config(&settings.jwt).unwrap(),
        AppMetrics::new(&settings.app.name).unwrap(),
        PiiScrubber::new(["password", "email"]),
    )
}

/// Every adapter present, counters backed by the fake cache.
pub fn components(fakes: &Fakes) -> AppComponents {
    components_with(&settings(), fakes.state(), Some(fakes.cache.clone()))
}

pub fn sign(claims: Value) -> String {
    let Value::Object(claims) = claims else {
        panic!("claims must be an object");
    };
    issue_token(&claims, Algorithm::HS256, SECRET).unwrap()
}

pub fn token_for(sub: &str) -> String {
    let now = Utc::now().timestamp();
    sign(json!({"sub": sub, "role": "admin", "iat": now, "exp": now + 3600}))
}

pub fn token() -> String {
    token_for("tester@example.com")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

