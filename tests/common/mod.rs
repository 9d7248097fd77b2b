//! Shared fixture: a two-file Go repository with a snapshot ready to index.

#![allow(dead_code)]

use parking_lot::Mutex;
use repocontext::engine::{
    CallGraphInfo, Field, FileContext, Function, MemoryIndex, Parameter, QueryEngine, QueryOptions,
    SearchResult, SnapshotIndexBuilder, TypeDef, TypeRef, REPOCONTEXT_DIR, SNAPSHOT_FILE,
};
use repocontext::tools::{RepoContextServer, ToolRequest, ToolResponse};
use repocontext::types::RecoveryConfig;
use repocontext::{Config, Error, Result};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const MAIN_GO: &str = "package main

import \"fmt\"

// main wires the app.
func main() {
\tcfg := Load(\"app.json\")
\trun(cfg)
\tfmt.Println(\"done\")
}

func run(cfg *Config) error {
\treturn nil
}
";

pub const CONFIG_GO: &str = "package main

type Config struct {
\tName string
\tPort int
}

func Load(path string) *Config {
\treturn &Config{Name: path}
}

func (c *Config) Addr() string {
\treturn c.Name
}
";

fn func(name: &str, signature: &str, start: u32, end: u32) -> Function {
    Function {
        name: name.into(),
        signature: signature.into(),
        start_line: start,
        end_line: end,
        ..Function::default()
    }
}

pub fn snapshot() -> Vec<FileContext> {
    let mut main = func("main", "func main()", 6, 10);
    main.calls = vec!["Load".into(), "run".into(), "fmt.Println".into()];

    let mut run = func("run", "func run(cfg *Config) error", 12, 14);
    run.parameters = vec![Parameter {
        name: "cfg".into(),
        type_name: "*Config".into(),
    }];
    run.returns = vec![TypeRef {
        name: "error".into(),
        kind: "basic".into(),
    }];

    let mut load = func("Load", "func Load(path string) *Config", 8, 10);
    load.parameters = vec![Parameter {
        name: "path".into(),
        type_name: "string".into(),
    }];
    load.returns = vec![TypeRef {
        name: "*Config".into(),
        kind: "pointer".into(),
    }];

    let mut addr = func("Addr", "func (c *Config) Addr() string", 12, 14);
    addr.receiver = Some("*Config".into());

    vec![
        FileContext {
            path: "main.go".into(),
            language: "go".into(),
            functions: vec![main, run],
            ..FileContext::default()
        },
        FileContext {
            path: "config.go".into(),
            language: "go".into(),
            functions: vec![load, addr],
            types: vec![TypeDef {
                name: "Config".into(),
                kind: "struct".into(),
                fields: vec![
                    Field {
                        name: "Name".into(),
                        type_name: "string".into(),
                        tag: String::new(),
                    },
                    Field {
                        name: "Port".into(),
                        type_name: "int".into(),
                        tag: String::new(),
                    },
                ],
                methods: vec![],
                start_line: 3,
                end_line: 6,
                embedded: vec![],
            }],
            ..FileContext::default()
        },
    ]
}

/// Write the sources and `.repocontext/snapshot.json` into `root`.
pub fn write_repository(root: &Path) {
    std::fs::write(root.join("main.go"), MAIN_GO).unwrap();
    std::fs::write(root.join("config.go"), CONFIG_GO).unwrap();
    let meta = root.join(REPOCONTEXT_DIR);
    std::fs::create_dir_all(&meta).unwrap();
    std::fs::write(
        meta.join(SNAPSHOT_FILE),
        serde_json::to_string_pretty(&snapshot()).unwrap(),
    )
    .unwrap();
}

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub index: Arc<MemoryIndex>,
    pub server: RepoContextServer,
}

/// Repository on disk, server wired to an empty in-memory index.
pub fn fixture_with(config: Config) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    write_repository(dir.path());
    let index = Arc::new(MemoryIndex::new());
    let builder = Arc::new(SnapshotIndexBuilder::new(index.clone()));
    let mut server = RepoContextServer::new(config)
        .with_engine(index.clone())
        .with_builder(builder)
        .with_repo_path(dir.path());
    server.register_all_tools().unwrap();
    Fixture { dir, index, server }
}

pub fn fixture() -> Fixture {
    fixture_with(Config::default())
}

impl Fixture {
    pub async fn call(&self, request: ToolRequest) -> ToolResponse {
        self.server
            .call_tool(&request, &CancellationToken::new())
            .await
            .unwrap()
    }

    /// Call a tool that must succeed and parse its JSON payload.
    pub async fn call_json(&self, request: ToolRequest) -> serde_json::Value {
        let response = self.call(request).await;
        assert!(!response.is_error, "unexpected error: {}", response.text_content());
        serde_json::from_str(&response.text_content()).unwrap()
    }

    pub async fn build(&self) -> serde_json::Value {
        self.call_json(ToolRequest::new("build_index")).await
    }
}

/// Engine that replays scripted failures, then succeeds with empty results.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    failures: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn failing(messages: &[&str]) -> Self {
        Self {
            failures: Mutex::new(messages.iter().map(|m| m.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(message: &str) -> Self {
        Self::failing(&vec![message; 64])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().pop_front() {
            Some(message) => Err(Error::backend(message)),
            None => Ok(()),
        }
    }
}

impl QueryEngine for ScriptedEngine {
    fn search_by_name(&self, name: &str, options: &QueryOptions) -> Result<SearchResult> {
        self.next()?;
        Ok(SearchResult::new(name, "name", options))
    }

    fn search_by_pattern(&self, pattern: &str, options: &QueryOptions) -> Result<SearchResult> {
        self.next()?;
        Ok(SearchResult::new(pattern, "pattern", options))
    }

    fn search_by_type(&self, entity_type: &str, options: &QueryOptions) -> Result<SearchResult> {
        self.next()?;
        Ok(SearchResult::new(entity_type, "type", options))
    }

    fn search_in_file(&self, path: &str, options: &QueryOptions) -> Result<SearchResult> {
        self.next()?;
        Ok(SearchResult::new(path, "file", options))
    }

    fn call_graph(&self, function: &str, options: &QueryOptions) -> Result<CallGraphInfo> {
        self.next()?;
        Ok(CallGraphInfo::empty(function, options.max_depth))
    }
}

pub fn server_with(engine: Arc<ScriptedEngine>, recovery: RecoveryConfig) -> (tempfile::TempDir, RepoContextServer) {
    let dir = tempfile::tempdir().unwrap();
    self::write_repository(dir.path());
    let config = Config {
        recovery,
        ..Config::default()
    };
    let mut server = RepoContextServer::new(config)
        .with_engine(engine)
        .with_repo_path(dir.path());
    server.register_all_tools().unwrap();
    (dir, server)
}
