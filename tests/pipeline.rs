//! End-to-end scenarios (seed tests) exercising the scheduler itself, without
//! touching a network or a real database: every Observation here is a
//! `FileObservation` against a local temp file, and every sink is an
//! in-process fake `Session`.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write as _;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;

use siphon::adapter::Adapter;
use siphon::config::Settings;
use siphon::errors::Result;
use siphon::item::observation::FileObservation;
use siphon::item::{Exporter, Finding, FindingTag, Item, Observation};
use siphon::observer::Observer;
use siphon::pipeline::{AdapterFactory, Manager, ObserverFactory, PipelineContext};
use siphon::session::{Session, SessionRegistry, WritableSession};

#[derive(Debug)]
struct PageFinding {
    title: String,
}

impl Finding for PageFinding {
    fn tag(&self) -> FindingTag {
        "page"
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct RowExporter {
    sink: String,
    row: serde_json::Value,
}

#[async_trait]
impl Exporter for RowExporter {
    fn name(&self) -> &str {
        &self.sink
    }

    fn identity(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.row.to_string().hash(&mut hasher);
        hasher.finish()
    }

    async fn export(&self, session: &dyn Session) -> Result<()> {
        let writable = session
            .as_writable_session()
            .expect("test session must be writable");
        writable.insert_row("pages", &self.row).await
    }
}

#[derive(Default)]
struct RecordingSession {
    rows: StdMutex<Vec<serde_json::Value>>,
}

#[async_trait]
impl Session for RecordingSession {
    fn as_writable_session(&self) -> Option<&dyn WritableSession> {
        Some(self)
    }
}

#[async_trait]
impl WritableSession for RecordingSession {
    async fn insert_row(&self, _table: &str, row: &serde_json::Value) -> Result<()> {
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }
}

struct SeedObserver {
    path: String,
}

impl Observer for SeedObserver {
    fn name(&self) -> &str {
        "seed"
    }

    fn initial_observations(&self) -> Vec<Box<dyn Observation>> {
        let path = self.path.clone();
        vec![Box::new(FileObservation::new(path, |lines| {
            Box::pin(futures::stream::iter(
                lines.into_iter().map(|title| Item::finding(PageFinding { title })),
            ))
        }))]
    }
}

struct ExportAdapter;

#[async_trait]
impl Adapter for ExportAdapter {
    fn subscribers(&self) -> &[FindingTag] {
        &["page"]
    }

    async fn adapt(&self, finding: &dyn Finding) -> Vec<Item> {
        let page = finding.as_any().downcast_ref::<PageFinding>().unwrap();
        vec![Item::exporter(RowExporter {
            sink: "warehouse".to_string(),
            row: serde_json::json!({ "title": page.title }),
        })]
    }
}

fn test_settings() -> Arc<Settings> {
    Arc::new(
        Settings::from_yaml_str(
            r#"
concurrency:
  observers: 1
  adapters: 1
  exporters: 1
observation:
  delay: 0
"#,
        )
        .unwrap(),
    )
}

fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{content}").unwrap();
    file
}

#[tokio::test]
async fn single_seed_single_finding_single_export() {
    let file = write_temp_file("T\n");
    let path = file.path().to_string_lossy().to_string();

    let session = Arc::new(RecordingSession::default());
    let sessions = SessionRegistry::builder()
        .with_session("warehouse", Arc::clone(&session) as Arc<dyn Session>)
        .build();

    let context = PipelineContext {
        settings: test_settings(),
        sessions,
        observer_factories: vec![Box::new(move |_shared| {
            Box::new(SeedObserver { path: path.clone() }) as Box<dyn Observer>
        }) as ObserverFactory],
        adapter_factories: vec![
            Box::new(|_shared| Arc::new(ExportAdapter) as Arc<dyn Adapter>) as AdapterFactory
        ],
    };

    let mut manager = Manager::new(context);
    let summary = manager.run_observe().await.unwrap();

    assert_eq!(summary.observed, 1);
    assert_eq!(summary.not_observed, 0);
    assert_eq!(summary.exported, 1);

    let rows = session.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "T");
}

#[tokio::test]
async fn transient_fetch_failure_is_recorded_as_not_observed() {
    let context = PipelineContext {
        settings: test_settings(),
        sessions: SessionRegistry::default(),
        observer_factories: vec![Box::new(|_shared| {
            Box::new(SeedObserver {
                path: "/nonexistent/path/does-not-exist.txt".to_string(),
            }) as Box<dyn Observer>
        }) as ObserverFactory],
        adapter_factories: Vec::new(),
    };

    let mut manager = Manager::new(context);
    let summary = manager.run_observe().await.unwrap();

    assert_eq!(summary.observed, 0);
    assert_eq!(summary.not_observed, 1);
    assert_eq!(summary.exported, 0);
}

#[tokio::test]
async fn duplicate_observation_is_fetched_once() {
    let file = write_temp_file("T\n");
    let path = file.path().to_string_lossy().to_string();

    struct TwiceObserver {
        path: String,
    }
    impl Observer for TwiceObserver {
        fn name(&self) -> &str {
            "twice"
        }
        fn initial_observations(&self) -> Vec<Box<dyn Observation>> {
            vec![
                Box::new(FileObservation::new(self.path.clone(), |_| {
                    Box::pin(futures::stream::empty())
                })),
                Box::new(FileObservation::new(self.path.clone(), |_| {
                    Box::pin(futures::stream::empty())
                })),
            ]
        }
    }

    let context = PipelineContext {
        settings: test_settings(),
        sessions: SessionRegistry::default(),
        observer_factories: vec![Box::new(move |_shared| {
            Box::new(TwiceObserver { path: path.clone() }) as Box<dyn Observer>
        }) as ObserverFactory],
        adapter_factories: Vec::new(),
    };

    let mut manager = Manager::new(context);
    let summary = manager.run_observe().await.unwrap();

    assert_eq!(summary.observed + summary.not_observed, 1);
}

#[tokio::test]
async fn disallowed_url_is_rejected_before_fetch() {
    use siphon::item::observation::HttpObservation;

    struct DisallowedObserver;
    impl Observer for DisallowedObserver {
        fn name(&self) -> &str {
            "disallowed"
        }
        fn initial_observations(&self) -> Vec<Box<dyn Observation>> {
            vec![Box::new(
                HttpObservation::new("https://other.test/", |_| Box::pin(futures::stream::empty()))
                    .with_allowed(vec!["https://example.test/".to_string()]),
            )]
        }
    }

    let context = PipelineContext {
        settings: test_settings(),
        sessions: SessionRegistry::default(),
        observer_factories: vec![Box::new(|_shared| {
            Box::new(DisallowedObserver) as Box<dyn Observer>
        }) as ObserverFactory],
        adapter_factories: Vec::new(),
    };

    let mut manager = Manager::new(context);
    let summary = manager.run_observe().await.unwrap();

    assert_eq!(summary.observed, 0);
    assert_eq!(summary.not_observed, 0);
    assert_eq!(summary.exported, 0);
}

#[tokio::test]
async fn adapters_run_in_strictly_non_increasing_priority_order() {
    let order: Arc<StdMutex<Vec<&'static str>>> = Arc::new(StdMutex::new(Vec::new()));

    struct RecordingAdapter {
        name: &'static str,
        priority: i64,
        order: Arc<StdMutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Adapter for RecordingAdapter {
        fn priority(&self) -> i64 {
            self.priority
        }
        fn subscribers(&self) -> &[FindingTag] {
            &["page"]
        }
        async fn adapt(&self, _finding: &dyn Finding) -> Vec<Item> {
            self.order.lock().unwrap().push(self.name);
            Vec::new()
        }
    }

    let file = write_temp_file("T\n");
    let path = file.path().to_string_lossy().to_string();

    let low = order.clone();
    let high = order.clone();

    let context = PipelineContext {
        settings: test_settings(),
        sessions: SessionRegistry::default(),
        observer_factories: vec![Box::new(move |_shared| {
            Box::new(SeedObserver { path: path.clone() }) as Box<dyn Observer>
        }) as ObserverFactory],
        adapter_factories: vec![
            Box::new(move |_shared| {
                Arc::new(RecordingAdapter {
                    name: "low",
                    priority: 1,
                    order: low.clone(),
                }) as Arc<dyn Adapter>
            }) as AdapterFactory,
            Box::new(move |_shared| {
                Arc::new(RecordingAdapter {
                    name: "high",
                    priority: 10,
                    order: high.clone(),
                }) as Arc<dyn Adapter>
            }) as AdapterFactory,
        ],
    };

    let mut manager = Manager::new(context);
    manager.run_observe().await.unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["high", "low"]);
}

#[tokio::test]
async fn shutdown_reaches_quiescence_with_a_large_cascading_chain() {
    const CHAIN_LEN: usize = 1000;

    #[derive(Debug)]
    struct ChainFinding;
    impl Finding for ChainFinding {
        fn tag(&self) -> FindingTag {
            "chain"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct ChainObserver {
        path: String,
    }
    impl Observer for ChainObserver {
        fn name(&self) -> &str {
            "chain"
        }
        fn initial_observations(&self) -> Vec<Box<dyn Observation>> {
            vec![Box::new(FileObservation::new(self.path.clone(), |_lines| {
                Box::pin(futures::stream::iter(
                    (0..CHAIN_LEN).map(|_| Item::finding(ChainFinding)),
                ))
            }))]
        }
    }

    struct ChainAdapter {
        path: String,
    }
    #[async_trait]
    impl Adapter for ChainAdapter {
        fn subscribers(&self) -> &[FindingTag] {
            &["chain"]
        }
        async fn adapt(&self, _finding: &dyn Finding) -> Vec<Item> {
            // Loops a duplicate Observation back to the observe queue; the
            // router's `seen` gate must dedup every one of these against the
            // original seed.
            vec![Item::observation(FileObservation::new(
                self.path.clone(),
                |_| Box::pin(futures::stream::empty()),
            ))]
        }
    }

    let file = write_temp_file("line\n");
    let path = file.path().to_string_lossy().to_string();
    let observer_path = path.clone();
    let adapter_path = path.clone();

    let context = PipelineContext {
        settings: Arc::new(
            Settings::from_yaml_str(
                r#"
concurrency:
  observers: 8
  adapters: 2
  exporters: 8
observation:
  delay: 0
"#,
            )
            .unwrap(),
        ),
        sessions: SessionRegistry::default(),
        observer_factories: vec![Box::new(move |_shared| {
            Box::new(ChainObserver {
                path: observer_path.clone(),
            }) as Box<dyn Observer>
        }) as ObserverFactory],
        adapter_factories: vec![Box::new(move |_shared| {
            Arc::new(ChainAdapter {
                path: adapter_path.clone(),
            }) as Arc<dyn Adapter>
        }) as AdapterFactory],
    };

    let mut manager = Manager::new(context);
    let summary = manager.run_observe().await.unwrap();

    assert_eq!(summary.observed, 1);
    assert_eq!(summary.not_observed, 0);
}
