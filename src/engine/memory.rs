//! In-memory reference query engine.
//!
//! Holds one semantic chunk per ingested file plus a flat entry list and the
//! call relations derived from `Function::calls`. All reads share a
//! `parking_lot::RwLock`; `ingest` swaps the whole state at once.

use super::models::{
    CallGraphEntry, CallGraphInfo, EntityKind, FileContext, IndexEntry, QueryOptions,
    SearchResult, SearchResultEntry, SemanticChunk,
};
use super::{BuildStats, QueryEngine};
use crate::budget::profiles::SEARCH;
use crate::budget::{fit_prefix, search_entries_cost, search_entry_cost};
use crate::types::{Error, Result};
use chrono::Utc;
use globset::{Glob, GlobMatcher};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Characters that only make sense in a regular expression.
const REGEX_METACHARACTERS: [char; 7] = ['(', ')', '^', '$', '+', '|', '\\'];
const REGEX_SEQUENCES: [&str; 9] = ["(?", ".+", ".*", ".?", "\\d", "\\w", "\\s", "\\p{", "\\b"];

/// Compiled patterns kept between queries; the cache starts over once full.
const REGEX_CACHE_LIMIT: usize = 128;

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: IndexEntry,
    chunk: Arc<SemanticChunk>,
    /// Receiver type for methods.
    receiver: Option<String>,
}

impl StoredEntry {
    fn to_result(&self) -> SearchResultEntry {
        SearchResultEntry {
            index_entry: self.entry.clone(),
            chunk_data: Some(self.chunk.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct CallRelation {
    caller: String,
    callee: String,
    file: String,
    line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Callers,
    Callees,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: Vec<StoredEntry>,
    calls: Vec<CallRelation>,
}

#[derive(Debug)]
enum NameMatcher {
    Regex(Regex),
    Glob(GlobMatcher),
    Exact(String),
}

impl NameMatcher {
    fn is_match(&self, name: &str) -> bool {
        match self {
            NameMatcher::Regex(re) => re.is_match(name),
            NameMatcher::Glob(glob) => glob.is_match(name),
            NameMatcher::Exact(exact) => exact == name,
        }
    }
}

/// Thread-safe in-memory index.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    state: RwLock<IndexState>,
    regex_cache: RwLock<HashMap<String, Regex>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from file records.
    pub fn from_files(files: Vec<FileContext>) -> Self {
        let index = Self::new();
        index.ingest(files);
        index
    }

    /// Replace the index contents with `files`.
    pub fn ingest(&self, files: Vec<FileContext>) -> BuildStats {
        let started = Instant::now();
        let mut next = IndexState::default();
        let mut stats = BuildStats {
            files_processed: files.len(),
            ..BuildStats::default()
        };

        for file in files {
            let token_count = serde_json::to_string(&file).map_or(0, |s| s.len() / 4);
            let chunk = Arc::new(SemanticChunk {
                id: uuid::Uuid::new_v4().to_string(),
                files: vec![file.path.clone()],
                file_data: vec![file.clone()],
                token_count,
                created_at: Utc::now(),
            });

            let mut push = |entry: IndexEntry, receiver: Option<String>| {
                next.entries.push(StoredEntry {
                    entry,
                    chunk: chunk.clone(),
                    receiver,
                });
            };

            for f in &file.functions {
                push(
                    entry(&f.name, EntityKind::Function, &file.path, f.start_line, f.end_line, &chunk.id, &f.signature),
                    f.receiver.as_deref().map(|r| base_type_name(r).to_string()),
                );
            }
            for t in &file.types {
                let signature = format!("type {} {}", t.name, t.kind);
                push(
                    entry(&t.name, t.entity_kind(), &file.path, t.start_line, t.end_line, &chunk.id, &signature),
                    None,
                );
            }
            for v in &file.variables {
                let signature = format!("var {} {}", v.name, v.type_name).trim_end().to_string();
                push(
                    entry(&v.name, EntityKind::Variable, &file.path, v.start_line, v.end_line, &chunk.id, &signature),
                    None,
                );
            }
            for c in &file.constants {
                let mut signature = format!("const {} {}", c.name, c.type_name).trim_end().to_string();
                if !c.value.is_empty() {
                    signature.push_str(" = ");
                    signature.push_str(&c.value);
                }
                push(
                    entry(&c.name, EntityKind::Constant, &file.path, c.start_line, c.end_line, &chunk.id, &signature),
                    None,
                );
            }

            stats.functions_indexed += file.functions.len();
            stats.types_indexed += file.types.len();
            stats.variables_indexed += file.variables.len();
            stats.constants_indexed += file.constants.len();

            for f in &file.functions {
                for callee in &f.calls {
                    next.calls.push(CallRelation {
                        caller: f.name.clone(),
                        callee: callee.clone(),
                        file: file.path.clone(),
                        line: f.start_line,
                    });
                }
            }
        }

        stats.calls_indexed = next.calls.len();
        stats.duration = started.elapsed();
        *self.state.write() = next;

        tracing::debug!(
            "index_ingested: files={}, functions={}, types={}, calls={}",
            stats.files_processed,
            stats.functions_indexed,
            stats.types_indexed,
            stats.calls_indexed
        );
        stats
    }

    /// Number of indexed entities.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn search(
        &self,
        query: &str,
        search_type: &str,
        options: &QueryOptions,
        predicate: impl Fn(&IndexEntry) -> bool,
    ) -> SearchResult {
        let state = self.state.read();
        let mut result = SearchResult::new(query, search_type, options);
        result.entries = state
            .entries
            .iter()
            .filter(|stored| predicate(&stored.entry))
            .map(StoredEntry::to_result)
            .collect();

        if options.include_types {
            let related = state.related_types(&result.entries);
            result.entries.extend(related);
        }

        if options.wants_call_graph() {
            let first_function = result
                .entries
                .iter()
                .find(|e| e.index_entry.entity_type == EntityKind::Function)
                .map(|e| e.index_entry.name.clone());
            if let Some(function) = first_function {
                result.call_graph = Some(state.call_graph(&function, options));
            }
        }

        apply_token_limit(&mut result, options.max_tokens);
        result
    }

    fn matcher(&self, pattern: &str) -> NameMatcher {
        if !is_regex_pattern(pattern) {
            return match Glob::new(pattern) {
                Ok(glob) => NameMatcher::Glob(glob.compile_matcher()),
                Err(_) => NameMatcher::Exact(pattern.to_string()),
            };
        }

        let source = strip_delimiters(pattern);
        if let Some(re) = self.regex_cache.read().get(source) {
            return NameMatcher::Regex(re.clone());
        }
        match Regex::new(source) {
            Ok(re) => {
                let mut cache = self.regex_cache.write();
                if cache.len() >= REGEX_CACHE_LIMIT {
                    cache.clear();
                }
                cache.insert(source.to_string(), re.clone());
                NameMatcher::Regex(re)
            }
            Err(_) => NameMatcher::Exact(pattern.to_string()),
        }
    }
}

impl IndexState {
    fn find(&self, name: &str) -> Option<&StoredEntry> {
        self.entries.iter().find(|s| s.entry.name == name)
    }

    fn call_graph(&self, function: &str, options: &QueryOptions) -> CallGraphInfo {
        let depth = if options.max_depth <= 0 { 1 } else { options.max_depth };
        let mut graph = CallGraphInfo::empty(function, depth);
        if options.include_callers {
            self.collect(function, Direction::Callers, depth, 0, &mut HashSet::new(), &mut graph.callers);
        }
        if options.include_callees {
            self.collect(function, Direction::Callees, depth, 0, &mut HashSet::new(), &mut graph.callees);
        }
        graph
    }

    /// Depth-first walk; `visited` holds the current path so cycles stop
    /// while sibling branches may revisit a function.
    fn collect(
        &self,
        function: &str,
        direction: Direction,
        max_depth: i64,
        depth: i64,
        visited: &mut HashSet<String>,
        out: &mut Vec<CallGraphEntry>,
    ) {
        if depth >= max_depth || !visited.insert(function.to_string()) {
            return;
        }

        for relation in &self.calls {
            let next = match direction {
                Direction::Callers if relation.callee == function => &relation.caller,
                Direction::Callees if relation.caller == function => &relation.callee,
                _ => continue,
            };
            out.push(CallGraphEntry {
                function: next.clone(),
                file: relation.file.clone(),
                line: relation.line,
                chunk_data: self.find(next).map(|s| s.chunk.clone()),
            });
            if depth + 1 < max_depth {
                self.collect(next, direction, max_depth, depth + 1, visited, out);
            }
        }

        visited.remove(function);
    }

    /// Type definitions referenced by the matched entries, plus methods of
    /// matched types, excluding anything already present.
    fn related_types(&self, matched: &[SearchResultEntry]) -> Vec<SearchResultEntry> {
        let mut wanted: Vec<String> = Vec::new();
        let mut methods_of: Vec<String> = Vec::new();

        for hit in matched {
            let e = &hit.index_entry;
            let Some(chunk) = hit.chunk_data.as_deref() else {
                continue;
            };
            if e.entity_type == EntityKind::Function {
                if let Some((_, f)) = chunk.function(&e.name) {
                    wanted.extend(f.parameters.iter().map(|p| base_type_name(&p.type_name).to_string()));
                    wanted.extend(f.returns.iter().map(|r| base_type_name(&r.name).to_string()));
                }
            } else if e.entity_type.is_type_like() {
                if let Some((_, t)) = chunk.type_def(&e.name) {
                    wanted.extend(t.fields.iter().map(|fd| base_type_name(&fd.type_name).to_string()));
                    wanted.extend(t.embedded.iter().map(|em| base_type_name(em).to_string()));
                }
                methods_of.push(e.name.clone());
            }
        }

        let mut related: Vec<SearchResultEntry> = Vec::new();
        for stored in &self.entries {
            let e = &stored.entry;
            let is_wanted_type = e.entity_type.is_type_like() && wanted.iter().any(|w| *w == e.name);
            let is_method = e.entity_type == EntityKind::Function
                && stored
                    .receiver
                    .as_ref()
                    .is_some_and(|r| methods_of.iter().any(|t| t == r));
            if !(is_wanted_type || is_method) {
                continue;
            }
            let already = matched.iter().chain(related.iter()).any(|m| m.index_entry == *e);
            if !already {
                related.push(stored.to_result());
            }
        }
        related
    }
}

impl QueryEngine for MemoryIndex {
    fn search_by_name(&self, name: &str, options: &QueryOptions) -> Result<SearchResult> {
        Ok(self.search(name, "name", options, |e| e.name == name))
    }

    fn search_by_pattern(&self, pattern: &str, options: &QueryOptions) -> Result<SearchResult> {
        let matcher = self.matcher(pattern);
        Ok(self.search(pattern, "pattern", options, |e| matcher.is_match(&e.name)))
    }

    fn search_by_type(&self, entity_type: &str, options: &QueryOptions) -> Result<SearchResult> {
        let kind = EntityKind::parse(entity_type).ok_or_else(|| {
            Error::validation(format!("unsupported entity type '{}'", entity_type))
        })?;
        Ok(self.search(entity_type, "type", options, |e| e.entity_type.matches_query(kind)))
    }

    fn search_in_file(&self, path: &str, options: &QueryOptions) -> Result<SearchResult> {
        let wanted = Path::new(path).file_name();
        Ok(self.search(path, "file", options, |e| {
            e.file == path || Path::new(&e.file).file_name() == wanted
        }))
    }

    fn call_graph(&self, function: &str, options: &QueryOptions) -> Result<CallGraphInfo> {
        Ok(self.state.read().call_graph(function, options))
    }
}

fn entry(
    name: &str,
    kind: EntityKind,
    file: &str,
    start_line: u32,
    end_line: u32,
    chunk_id: &str,
    signature: &str,
) -> IndexEntry {
    IndexEntry {
        name: name.to_string(),
        entity_type: kind,
        file: file.to_string(),
        start_line,
        end_line,
        chunk_id: chunk_id.to_string(),
        signature: signature.to_string(),
    }
}

/// `*pkg.Config`, `[]Config` and `Config` all name `Config`.
fn base_type_name(raw: &str) -> &str {
    raw.trim()
        .rsplit(['*', ']', '.'])
        .next()
        .unwrap_or(raw)
}

fn is_regex_pattern(pattern: &str) -> bool {
    if pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        return true;
    }
    if pattern.contains(REGEX_METACHARACTERS) {
        return true;
    }
    if REGEX_SEQUENCES.iter().any(|seq| pattern.contains(seq)) {
        return true;
    }
    // `{2,3}` / `{4}` are quantifiers; `{a,b}` is glob alternation.
    if let (Some(open), Some(close)) = (pattern.find('{'), pattern.find('}')) {
        if open < close {
            let inner = &pattern[open + 1..close];
            let numeric = !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit() || c == ',');
            return numeric && inner.chars().any(|c| c.is_ascii_digit());
        }
    }
    false
}

fn strip_delimiters(pattern: &str) -> &str {
    if pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        &pattern[1..pattern.len() - 1]
    } else {
        pattern
    }
}

fn apply_token_limit(result: &mut SearchResult, max_tokens: usize) {
    if max_tokens == 0 {
        let edges = result
            .call_graph
            .as_ref()
            .map_or(0, |g| g.callers.len() + g.callees.len());
        result.token_count = search_entries_cost(&result.entries) + edges * SEARCH.secondary_overhead;
        return;
    }
    let (keep, used) = fit_prefix(&result.entries, max_tokens, search_entry_cost);
    if keep < result.entries.len() {
        result.entries.truncate(keep);
        result.truncated = true;
    }
    result.token_count = used;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::{Field, Function, Parameter, TypeDef, TypeRef, Variable};

    fn function(name: &str, calls: &[&str], line: u32) -> Function {
        Function {
            name: name.to_string(),
            signature: format!("func {}()", name),
            start_line: line,
            end_line: line + 5,
            calls: calls.iter().map(|c| c.to_string()).collect(),
            ..Function::default()
        }
    }

    fn sample_index() -> MemoryIndex {
        let mut handle = function("HandleRequest", &["ParseConfig", "Validate"], 10);
        handle.parameters = vec![Parameter {
            name: "cfg".into(),
            type_name: "*Config".into(),
        }];
        handle.returns = vec![TypeRef {
            name: "error".into(),
            kind: "basic".into(),
        }];
        let mut validate = function("Validate", &["ParseConfig"], 30);
        validate.receiver = Some("*Config".into());

        MemoryIndex::from_files(vec![
            FileContext {
                path: "server/handler.go".into(),
                language: "go".into(),
                functions: vec![
                    function("main", &["HandleRequest"], 1),
                    handle,
                    validate,
                    function("ParseConfig", &[], 50),
                ],
                ..FileContext::default()
            },
            FileContext {
                path: "server/config.go".into(),
                language: "go".into(),
                types: vec![TypeDef {
                    name: "Config".into(),
                    kind: "struct".into(),
                    fields: vec![Field {
                        name: "Port".into(),
                        type_name: "int".into(),
                        tag: String::new(),
                    }],
                    methods: vec![],
                    start_line: 3,
                    end_line: 8,
                    embedded: vec![],
                }],
                variables: vec![Variable {
                    name: "defaultConfig".into(),
                    type_name: "Config".into(),
                    start_line: 10,
                    end_line: 10,
                }],
                ..FileContext::default()
            },
        ])
    }

    fn names(result: &SearchResult) -> Vec<&str> {
        result.entries.iter().map(|e| e.index_entry.name.as_str()).collect()
    }

    #[test]
    fn test_ingest_counts() {
        let index = sample_index();
        assert_eq!(index.len(), 6);
        let stats = index.ingest(vec![]);
        assert_eq!(stats.files_processed, 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_by_name_exact() {
        let index = sample_index();
        let result = index.search_by_name("Validate", &QueryOptions::default()).unwrap();
        assert_eq!(names(&result), vec!["Validate"]);
        assert!(result.entries[0].chunk_data.is_some());
        assert!(index.search_by_name("valid", &QueryOptions::default()).unwrap().entries.is_empty());
    }

    #[test]
    fn test_pattern_glob_and_regex() {
        let index = sample_index();
        let opts = QueryOptions::default();
        assert_eq!(names(&index.search_by_pattern("Handle*", &opts).unwrap()), vec!["HandleRequest"]);
        assert_eq!(
            names(&index.search_by_pattern("{main,Validate}", &opts).unwrap()),
            vec!["main", "Validate"]
        );
        assert_eq!(
            names(&index.search_by_pattern("[!HVP]*", &opts).unwrap()),
            vec!["main", "Config", "defaultConfig"]
        );
        assert_eq!(
            names(&index.search_by_pattern("^Parse|^Valid", &opts).unwrap()),
            vec!["Validate", "ParseConfig"]
        );
        assert_eq!(names(&index.search_by_pattern("/^Conf.*$/", &opts).unwrap()), vec!["Config"]);
        // invalid regex falls back to exact comparison
        assert!(index.search_by_pattern("(unclosed", &opts).unwrap().entries.is_empty());
    }

    #[test]
    fn test_regex_cache_stays_bounded() {
        let index = sample_index();
        let opts = QueryOptions::default();
        for i in 0..REGEX_CACHE_LIMIT * 3 {
            index.search_by_pattern(&format!("^Handle(Request)?{}?$", i), &opts).unwrap();
            assert!(index.regex_cache.read().len() <= REGEX_CACHE_LIMIT);
        }

        // a pattern evicted by the reset still compiles and matches
        assert_eq!(
            names(&index.search_by_pattern("^Handle(Request)?0?$", &opts).unwrap()),
            vec!["HandleRequest"]
        );
    }

    #[test]
    fn test_search_by_type() {
        let index = sample_index();
        let opts = QueryOptions::default();
        assert_eq!(index.search_by_type("function", &opts).unwrap().entries.len(), 4);
        assert_eq!(names(&index.search_by_type("type", &opts).unwrap()), vec!["Config"]);
        assert_eq!(names(&index.search_by_type("variable", &opts).unwrap()), vec!["defaultConfig"]);
        assert!(index.search_by_type("module", &opts).is_err());
    }

    #[test]
    fn test_search_in_file_by_basename() {
        let index = sample_index();
        let result = index.search_in_file("config.go", &QueryOptions::default()).unwrap();
        assert_eq!(names(&result), vec!["Config", "defaultConfig"]);
    }

    #[test]
    fn test_call_graph_depth() {
        let index = sample_index();
        let shallow = index
            .call_graph("main", &QueryOptions::call_graph(1, false, true))
            .unwrap();
        let callees: Vec<_> = shallow.callees.iter().map(|c| c.function.as_str()).collect();
        assert_eq!(callees, vec!["HandleRequest"]);

        let deep = index
            .call_graph("main", &QueryOptions::call_graph(3, false, true))
            .unwrap();
        let callees: Vec<_> = deep.callees.iter().map(|c| c.function.as_str()).collect();
        assert_eq!(callees, vec!["HandleRequest", "ParseConfig", "Validate", "ParseConfig"]);

        let callers = index
            .call_graph("ParseConfig", &QueryOptions::call_graph(0, true, false))
            .unwrap();
        assert_eq!(callers.depth, 1);
        assert_eq!(callers.callers.len(), 2);
        assert!(callers.callees.is_empty());
    }

    #[test]
    fn test_call_graph_cycle_terminates() {
        let index = MemoryIndex::from_files(vec![FileContext {
            path: "loop.go".into(),
            functions: vec![function("a", &["b"], 1), function("b", &["a"], 10)],
            ..FileContext::default()
        }]);
        let graph = index
            .call_graph("a", &QueryOptions::call_graph(10, true, true))
            .unwrap();
        assert_eq!(graph.callees.len(), 2);
        assert_eq!(graph.callers.len(), 2);
    }

    #[test]
    fn test_include_types_adds_referenced_types_and_methods() {
        let index = sample_index();
        let opts = QueryOptions {
            include_types: true,
            ..QueryOptions::default()
        };
        let by_function = index.search_by_name("HandleRequest", &opts).unwrap();
        assert_eq!(names(&by_function), vec!["HandleRequest", "Config"]);

        let by_type = index.search_by_name("Config", &opts).unwrap();
        assert_eq!(names(&by_type), vec!["Config", "Validate"]);
    }

    #[test]
    fn test_search_attaches_call_graph_of_first_function() {
        let index = sample_index();
        let opts = QueryOptions {
            include_callers: true,
            ..QueryOptions::default()
        };
        let result = index.search_by_name("Validate", &opts).unwrap();
        let graph = result.call_graph.unwrap();
        assert_eq!(graph.function, "Validate");
        assert_eq!(graph.callers[0].function, "HandleRequest");
    }

    #[test]
    fn test_engine_token_limit_prefix() {
        let index = sample_index();
        let all = index.search_by_type("function", &QueryOptions::default()).unwrap();
        let first_cost = search_entry_cost(&all.entries[0]);

        let opts = QueryOptions {
            max_tokens: first_cost,
            ..QueryOptions::default()
        };
        let limited = index.search_by_type("function", &opts).unwrap();
        assert_eq!(limited.entries.len(), 1);
        assert!(limited.truncated);
        assert_eq!(limited.token_count, first_cost);
    }

    #[test]
    fn test_base_type_name() {
        assert_eq!(base_type_name("*Config"), "Config");
        assert_eq!(base_type_name("[]*pkg.Config"), "Config");
        assert_eq!(base_type_name("int"), "int");
    }
}
