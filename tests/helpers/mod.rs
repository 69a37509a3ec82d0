#![allow(dead_code)] // Test helpers appear unused when compiled independently

use async_trait::async_trait;
use axum::{
    body::Bytes as AxumBytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use bytes::Bytes;
use frostbit::record::now_ms;
use frostbit::retry::{BackoffStrategy, RetryConfig};
use frostbit::store::{ColdStore, HotStore, MemoryColdStore, MemoryHotStore, StoreError};
use frostbit::{MigrationSettings, Record, RecordKey};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Record whose timestamp is `days` days in the past.
pub fn aged(id: &str, days: i64, payload: serde_json::Value) -> Record {
    Record::new(id, "tenant-1", now_ms() - days * DAY_MS, payload)
}

/// Engine settings for tests: 90 day cutoff, fast fixed retries.
pub fn test_settings(batch_limit: usize) -> MigrationSettings {
    let mut settings = MigrationSettings::new(Duration::from_secs(90 * 86_400), batch_limit);
    settings.op_timeout = Duration::from_secs(1);
    settings.retry = RetryConfig {
        max_attempts: 3,
        delay: Duration::from_millis(1),
        backoff: BackoffStrategy::Fixed,
    };
    settings
}

/// Shared, ordered log of store operations as `"{op} {id-or-key}"`.
#[derive(Clone, Default)]
pub struct OpLog(Arc<StdMutex<Vec<String>>>);

impl OpLog {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Operations touching `needle` (id or cold key), in order.
    pub fn for_subject(&self, needle: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| {
                let (op, subject) = e.split_once(' ')?;
                let hit = subject == needle || subject.ends_with(&format!("/{}", needle));
                hit.then(|| op.to_string())
            })
            .collect()
    }
}

/// Hot store wrapper with switchable faults.
pub struct FaultyHotStore {
    pub inner: Arc<MemoryHotStore>,
    pub log: OpLog,
    /// Every `get` fails as unavailable.
    pub get_outage: AtomicBool,
    /// Number of upcoming `delete` calls that fail.
    pub delete_failures: AtomicU32,
    /// Ids that disappear right before they are read.
    pub vanish_on_get: StdMutex<HashSet<String>>,
    /// Ids rewritten with a fresh timestamp right before they are read.
    pub refresh_on_get: StdMutex<HashSet<String>>,
}

impl FaultyHotStore {
    pub fn new(inner: Arc<MemoryHotStore>, log: OpLog) -> Self {
        Self {
            inner,
            log,
            get_outage: AtomicBool::new(false),
            delete_failures: AtomicU32::new(0),
            vanish_on_get: StdMutex::new(HashSet::new()),
            refresh_on_get: StdMutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl HotStore for FaultyHotStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
        self.log.push(format!("hot.get {}", key.id));
        if self.get_outage.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("hot store outage".into()));
        }
        let vanish = self.vanish_on_get.lock().unwrap().remove(&key.id);
        if vanish {
            self.inner.delete(key).await?;
        }
        let refresh = self.refresh_on_get.lock().unwrap().remove(&key.id);
        if refresh {
            if let Some(mut record) = self.inner.get(key).await? {
                record.timestamp_ms = now_ms();
                self.inner.insert(record).await;
            }
        }
        self.inner.get(key).await
    }

    async fn query_older_than(
        &self,
        cutoff_ms: i64,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        self.inner.query_older_than(cutoff_ms, limit).await
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), StoreError> {
        self.log.push(format!("hot.delete {}", key.id));
        let pending = self.delete_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.delete_failures.store(pending - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("hot delete throttled".into()));
        }
        self.inner.delete(key).await
    }
}

/// Cold store wrapper with switchable faults and concurrency tracking.
pub struct FaultyColdStore {
    pub inner: Arc<MemoryColdStore>,
    pub log: OpLog,
    /// Number of upcoming `put` calls that fail.
    pub put_failures: AtomicU32,
    /// Every `put` fails permanently.
    pub put_rejects: AtomicBool,
    /// `put` acknowledges but stores nothing.
    pub drop_writes: AtomicBool,
    /// Every `get` fails as unavailable.
    pub get_outage: AtomicBool,
    /// Delay before each `put` completes, in milliseconds.
    pub put_delay_ms: AtomicU64,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub puts: AtomicUsize,
}

impl FaultyColdStore {
    pub fn new(inner: Arc<MemoryColdStore>, log: OpLog) -> Self {
        Self {
            inner,
            log,
            put_failures: AtomicU32::new(0),
            put_rejects: AtomicBool::new(false),
            drop_writes: AtomicBool::new(false),
            get_outage: AtomicBool::new(false),
            put_delay_ms: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ColdStore for FaultyColdStore {
    async fn put(&self, key: &str, blob: Bytes) -> Result<(), StoreError> {
        self.log.push(format!("cold.put {}", key));
        self.puts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.put_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let result = if self.put_rejects.load(Ordering::SeqCst) {
            Err(StoreError::Http {
                status: 403,
                key: key.to_string(),
            })
        } else if self.put_failures.load(Ordering::SeqCst) > 0 {
            self.put_failures.fetch_sub(1, Ordering::SeqCst);
            Err(StoreError::Unavailable("cold store throttled".into()))
        } else if self.drop_writes.load(Ordering::SeqCst) {
            Ok(())
        } else {
            self.inner.put(key, blob).await
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.log.push(format!("cold.get {}", key));
        if self.get_outage.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("cold store outage".into()));
        }
        self.inner.get(key).await
    }
}

/// Memory stores wrapped in fault injectors sharing one op log.
pub struct Harness {
    pub hot_data: Arc<MemoryHotStore>,
    pub cold_data: Arc<MemoryColdStore>,
    pub hot: Arc<FaultyHotStore>,
    pub cold: Arc<FaultyColdStore>,
    pub log: OpLog,
}

impl Harness {
    pub fn new() -> Self {
        let log = OpLog::default();
        let hot_data = Arc::new(MemoryHotStore::new());
        let cold_data = Arc::new(MemoryColdStore::new());
        Self {
            hot: Arc::new(FaultyHotStore::new(hot_data.clone(), log.clone())),
            cold: Arc::new(FaultyColdStore::new(cold_data.clone(), log.clone())),
            hot_data,
            cold_data,
            log,
        }
    }

    pub async fn seed(&self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.hot_data.insert(record).await;
        }
    }

    pub async fn in_hot(&self, id: &str) -> bool {
        self.hot_data.contains(&RecordKey::new(id, "tenant-1")).await
    }

    pub async fn cold_blob(&self, key: &str) -> Option<Bytes> {
        self.cold_data.get(key).await.unwrap()
    }
}

// --- Mock object store served over HTTP ---

#[derive(Clone)]
struct ObjectState {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    token: Option<String>,
    unavailable_puts: Arc<AtomicU32>,
}

pub struct MockObjectStore {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    unavailable_puts: Arc<AtomicU32>,
}

impl MockObjectStore {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }

    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Answer the next `n` uploads with 503.
    pub fn fail_next_puts(&self, n: u32) {
        self.unavailable_puts.store(n, Ordering::SeqCst);
    }
}

/// Best-effort check for whether binding to loopback is permitted in the current sandbox.
pub async fn can_bind_loopback() -> bool {
    match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => false,
        Err(_) => true, // treat other errors as non-fatal for skipping
    }
}

/// Spawn the mock object store, return (handle, base URL)
pub async fn spawn_mock_object_store(token: Option<&str>) -> (MockObjectStore, String) {
    let objects = Arc::new(Mutex::new(HashMap::new()));
    let unavailable_puts = Arc::new(AtomicU32::new(0));
    let state = ObjectState {
        objects: objects.clone(),
        token: token.map(str::to_string),
        unavailable_puts: unavailable_puts.clone(),
    };

    let app = Router::new()
        .route("/bucket/*key", get(get_object).put(put_object))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock object store listener");
    let port = listener.local_addr().unwrap().port();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(err) = server.await {
            eprintln!("mock object store error: {}", err);
        }
    });

    (
        MockObjectStore {
            shutdown_tx,
            handle,
            objects,
            unavailable_puts,
        },
        format!("http://127.0.0.1:{}/bucket", port),
    )
}

fn authorized(state: &ObjectState, headers: &HeaderMap) -> bool {
    match &state.token {
        None => true,
        Some(token) => headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", token))
            .unwrap_or(false),
    }
}

async fn put_object(
    State(state): State<ObjectState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: AxumBytes,
) -> StatusCode {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED;
    }
    let pending = state.unavailable_puts.load(Ordering::SeqCst);
    if pending > 0 {
        state.unavailable_puts.store(pending - 1, Ordering::SeqCst);
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    state
        .objects
        .lock()
        .await
        .insert(key, Bytes::from(body.to_vec()));
    StatusCode::OK
}

async fn get_object(
    State(state): State<ObjectState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> axum::response::Response {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match state.objects.lock().await.get(&key) {
        Some(body) => (StatusCode::OK, body.to_vec()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
