#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use payment_router::app::config::Config;
use payment_router::handlers;
use payment_router::store::{BackendError, PaymentStore, SharedStore};
use serde_json::Value;
use tokio::net::TcpListener;

#[derive(Default)]
struct Inner {
    lists: HashMap<String, Vec<String>>,
    zsets: HashMap<String, Vec<(i64, String)>>,
    hashes: HashMap<String, HashMap<String, String>>,
    volatile: HashMap<String, (String, Instant)>,
}

// Dublê em memória do SharedStore. Listas com head no índice 0, sorted
// sets com membros únicos; eval calcula nativamente o contrato do script
// de summary (por chave: conta membros na janela de score e soma o
// prefixo de centavos).
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    fail: AtomicBool,
}

impl InMemoryStore {
    // Faz toda operação seguinte falhar, simulando uma queda do backend
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn guard(&self) -> Result<MutexGuard<'_, Inner>, BackendError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("injected outage".to_string()));
        }
        Ok(self.inner.lock().unwrap())
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .lists
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn hash(&self, key: &str) -> HashMap<String, String> {
        self.inner
            .lock()
            .unwrap()
            .hashes
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn holds_key(&self, key: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .volatile
            .get(key)
            .is_some_and(|(_, expiry)| *expiry > Instant::now())
    }
}

fn parse_score_bound(raw: &str, unbounded: i64) -> i64 {
    match raw {
        "-inf" | "+inf" | "inf" => unbounded,
        _ => raw.parse().unwrap_or(unbounded),
    }
}

#[async_trait]
impl SharedStore for InMemoryStore {
    async fn lpush(&self, key: &str, payload: &str) -> Result<(), BackendError> {
        self.guard()?
            .lists
            .entry(key.to_string())
            .or_default()
            .insert(0, payload.to_string());
        Ok(())
    }

    async fn rpoplpush(&self, src: &str, dst: &str) -> Result<Option<String>, BackendError> {
        let mut inner = self.guard()?;
        let moved = inner.lists.get_mut(src).and_then(|list| list.pop());
        if let Some(payload) = &moved {
            inner
                .lists
                .entry(dst.to_string())
                .or_default()
                .insert(0, payload.clone());
        }
        Ok(moved)
    }

    async fn lrem(&self, key: &str, count: isize, payload: &str) -> Result<(), BackendError> {
        let mut inner = self.guard()?;
        if let Some(list) = inner.lists.get_mut(key) {
            let mut removed = 0isize;
            list.retain(|entry| {
                if (count == 0 || removed < count) && entry == payload {
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        Ok(())
    }

    async fn zadd(&self, key: &str, score: i64, member: &str) -> Result<(), BackendError> {
        let mut inner = self.guard()?;
        let set = inner.zsets.entry(key.to_string()).or_default();
        match set.iter_mut().find(|(_, existing)| existing == member) {
            Some(entry) => entry.0 = score,
            None => set.push((score, member.to_string())),
        }
        Ok(())
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: &str,
        max: &str,
    ) -> Result<Vec<String>, BackendError> {
        let inner = self.guard()?;
        let min = parse_score_bound(min, i64::MIN);
        let max = parse_score_bound(max, i64::MAX);
        let mut members: Vec<(i64, String)> = inner
            .zsets
            .get(key)
            .map(|set| {
                set.iter()
                    .filter(|(score, _)| *score >= min && *score <= max)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        members.sort();
        Ok(members.into_iter().map(|(_, member)| member).collect())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), BackendError> {
        self.guard()?
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, BackendError> {
        Ok(self.guard()?.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, BackendError> {
        let mut inner = self.guard()?;
        let now = Instant::now();
        match inner.volatile.get(key) {
            Some((_, expiry)) if *expiry > now => Ok(false),
            _ => {
                inner
                    .volatile
                    .insert(key.to_string(), (value.to_string(), now + ttl));
                Ok(true)
            }
        }
    }

    async fn del(&self, keys: &[String]) -> Result<(), BackendError> {
        let mut inner = self.guard()?;
        for key in keys {
            inner.lists.remove(key);
            inner.zsets.remove(key);
            inner.hashes.remove(key);
            inner.volatile.remove(key);
        }
        Ok(())
    }

    async fn eval(
        &self,
        _script: &str,
        keys: &[String],
        args: &[String],
    ) -> Result<Vec<i64>, BackendError> {
        let inner = self.guard()?;
        let min = parse_score_bound(args.first().map(String::as_str).unwrap_or("-inf"), i64::MIN);
        let max = parse_score_bound(args.get(1).map(String::as_str).unwrap_or("+inf"), i64::MAX);
        let mut reply = Vec::new();
        for key in keys {
            let mut count = 0i64;
            let mut sum = 0i64;
            if let Some(set) = inner.zsets.get(key) {
                for (score, member) in set {
                    if *score < min || *score > max {
                        continue;
                    }
                    if let Some(cents) = member
                        .split(':')
                        .next()
                        .and_then(|prefix| prefix.parse::<i64>().ok())
                    {
                        count += 1;
                        sum += cents;
                    }
                }
            }
            reply.push(count);
            reply.push(sum);
        }
        Ok(reply)
    }

    async fn scan_match(&self, pattern: &str) -> Result<Vec<String>, BackendError> {
        let inner = self.guard()?;
        let prefix = pattern.trim_end_matches('*');
        let mut keys: Vec<String> = inner
            .lists
            .keys()
            .chain(inner.zsets.keys())
            .chain(inner.hashes.keys())
            .chain(inner.volatile.keys())
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

struct DoubleState {
    failing: AtomicBool,
    payment_status: AtomicU16,
    health_hits: AtomicUsize,
    received: Mutex<Vec<Value>>,
}

// Dublê de Payment Processor com health e resposta de pagamento
// programáveis, escutando numa porta local efêmera
#[derive(Clone)]
pub struct ProcessorDouble {
    pub base_url: String,
    state: Arc<DoubleState>,
}

impl ProcessorDouble {
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_payment_status(&self, status: u16) {
        self.state.payment_status.store(status, Ordering::SeqCst);
    }

    pub fn health_hits(&self) -> usize {
        self.state.health_hits.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Value> {
        self.state.received.lock().unwrap().clone()
    }
}

pub async fn spawn_processor() -> ProcessorDouble {
    let state = Arc::new(DoubleState {
        failing: AtomicBool::new(false),
        payment_status: AtomicU16::new(200),
        health_hits: AtomicUsize::new(0),
        received: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/payments", post(accept_payment))
        .route("/payments/service-health", get(report_health))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ProcessorDouble {
        base_url: format!("http://{}", addr),
        state,
    }
}

async fn accept_payment(
    State(state): State<Arc<DoubleState>>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.received.lock().unwrap().push(body);
    StatusCode::from_u16(state.payment_status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

async fn report_health(State(state): State<Arc<DoubleState>>) -> Json<Value> {
    state.health_hits.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({
        "failing": state.failing.load(Ordering::SeqCst),
        "minResponseTime": 0,
    }))
}

pub fn test_config(default_url: &str, fallback_url: &str) -> Config {
    Config {
        redis_url: "redis://localhost:6379".to_string(),
        workers: 2,
        server_port: 0,
        default_processor_url: default_url.to_string(),
        fallback_processor_url: fallback_url.to_string(),
    }
}

// Sobe o router de verdade numa porta efêmera e devolve a base URL
pub async fn spawn_app(store: PaymentStore) -> String {
    let app = handlers::router(store);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

// Faz poll do probe até dar true, por no máximo cinco segundos
pub async fn eventually<F, Fut>(mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if probe().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
