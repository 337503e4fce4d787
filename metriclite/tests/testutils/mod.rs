//! Shared fixtures for metriclite integration tests
//!
//! All tests run against in-memory collaborators: a scripted analytical
//! engine, an in-memory object store / key-value store, and a
//! process-local pub/sub channel. Each fixture gets its own temp
//! directory for the partition cache so tests can run in parallel.
#![allow(dead_code)] // Not every test binary uses every fixture helper.

use async_trait::async_trait;
use metriclite::cache::{CacheConfig, CacheHierarchy, InvalidationBus};
use metriclite::coordinator::{QueryCoordinator, QueryRequest};
use metriclite::exec::{Row, Value};
use metriclite::metadata::MemoryMetadataProvider;
use metriclite::plan::GeneratorConfig;
use metriclite::storage::{
    AnalyticalEngine, EngineError, LocalPubSub, MemoryKeyValueStore, MemoryObjectStore,
    PhysicalTableRef,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

type Responder = Box<dyn Fn(&str) -> Vec<Row> + Send + Sync>;

/// Analytical engine double: records every attach/staging/query call and
/// answers statements through a programmable responder.
pub struct ScriptedEngine {
    pub attached: Mutex<Vec<String>>,
    pub staged: Mutex<Vec<(String, usize)>>,
    pub statements: Mutex<Vec<String>>,
    responder: Responder,
}

impl ScriptedEngine {
    pub fn with_responder(responder: impl Fn(&str) -> Vec<Row> + Send + Sync + 'static) -> Self {
        Self {
            attached: Mutex::new(Vec::new()),
            staged: Mutex::new(Vec::new()),
            statements: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    /// Engine answering every statement with the same rows.
    pub fn returning(rows: Vec<Row>) -> Self {
        Self::with_responder(move |_| rows.clone())
    }

    pub fn statement_count(&self) -> usize {
        self.statements.lock().len()
    }

    pub fn attach_count(&self) -> usize {
        self.attached.lock().len()
    }
}

#[async_trait]
impl AnalyticalEngine for ScriptedEngine {
    async fn attach(&self, alias: &str, path: &Path) -> Result<(), EngineError> {
        if !path.exists() {
            return Err(EngineError::Attach {
                alias: alias.to_string(),
                message: format!("no such file: {}", path.display()),
            });
        }
        self.attached.lock().push(alias.to_string());
        Ok(())
    }

    async fn detach(&self, _alias: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn load_staging(&self, relation: &str, paths: &[PathBuf]) -> Result<(), EngineError> {
        for path in paths {
            if !path.exists() {
                return Err(EngineError::Staging {
                    relation: relation.to_string(),
                    message: format!("no such file: {}", path.display()),
                });
            }
        }
        self.staged.lock().push((relation.to_string(), paths.len()));
        Ok(())
    }

    async fn drop_staging(&self, _relation: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn query(&self, statement: &str) -> Result<Vec<Row>, EngineError> {
        self.statements.lock().push(statement.to_string());
        Ok((self.responder)(statement))
    }
}

/// Fully wired coordinator plus handles to every collaborator.
pub struct TestFixture {
    pub metadata: Arc<MemoryMetadataProvider>,
    pub objects: Arc<MemoryObjectStore>,
    pub kv: Arc<MemoryKeyValueStore>,
    pub pubsub: Arc<LocalPubSub>,
    pub engine: Arc<ScriptedEngine>,
    pub cache: Arc<CacheHierarchy>,
    pub coordinator: QueryCoordinator,
    // Held for its Drop; the partition cache root lives here.
    pub cache_dir: TempDir,
}

impl TestFixture {
    pub fn new(metadata: Arc<MemoryMetadataProvider>, engine: Arc<ScriptedEngine>) -> Self {
        Self::build(metadata, engine, GeneratorConfig::default(), None)
    }

    pub fn with_generator_config(
        metadata: Arc<MemoryMetadataProvider>,
        engine: Arc<ScriptedEngine>,
        generator_config: GeneratorConfig,
    ) -> Self {
        Self::build(metadata, engine, generator_config, None)
    }

    /// Share a pub/sub channel across fixtures to simulate a cluster.
    pub fn on_channel(
        metadata: Arc<MemoryMetadataProvider>,
        engine: Arc<ScriptedEngine>,
        pubsub: Arc<LocalPubSub>,
    ) -> Self {
        Self::build(metadata, engine, GeneratorConfig::default(), Some(pubsub))
    }

    fn build(
        metadata: Arc<MemoryMetadataProvider>,
        engine: Arc<ScriptedEngine>,
        generator_config: GeneratorConfig,
        pubsub: Option<Arc<LocalPubSub>>,
    ) -> Self {
        let cache_dir = tempfile::tempdir().expect("temp dir for partition cache");
        let mut cache_config = CacheConfig::default();
        cache_config.partition.root = cache_dir.path().to_path_buf();

        let objects = Arc::new(MemoryObjectStore::new());
        let kv = Arc::new(MemoryKeyValueStore::new());
        let pubsub = pubsub.unwrap_or_else(|| Arc::new(LocalPubSub::new()));
        let cache = Arc::new(
            CacheHierarchy::new(cache_config, kv.clone(), objects.clone())
                .expect("valid cache config"),
        );
        let bus = InvalidationBus::new(pubsub.clone());
        let coordinator = QueryCoordinator::new(
            metadata.clone(),
            engine.clone(),
            cache.clone(),
            bus,
            generator_config,
        );
        Self {
            metadata,
            objects,
            kv,
            pubsub,
            engine,
            cache,
            coordinator,
            cache_dir,
        }
    }

    /// Seed one partition object in the remote store.
    pub fn seed_partition(&self, metric_id: &str, time_point: &str, dim_code: &str) {
        let table = PhysicalTableRef::new(metric_id, time_point, dim_code);
        self.objects
            .put_object(table.storage_key(), b"partition-bytes".to_vec());
    }
}

pub fn request(metric_ids: &[&str], time_points: &[&str]) -> QueryRequest {
    QueryRequest {
        metric_ids: metric_ids.iter().map(|s| s.to_string()).collect(),
        time_points: time_points.iter().map(|s| s.to_string()).collect(),
        ..QueryRequest::default()
    }
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    let mut row = Row::new();
    for (column, value) in pairs {
        row.set(*column, value.clone());
    }
    row
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
