//! Parameter records, one per tool family.
//!
//! Each record is parsed from a [`ToolRequest`] against the configured
//! [`LimitsConfig`] and exposes its token ceiling and relationship flags
//! through [`ToolParams`], so the pipeline can shape any result without
//! knowing which tool produced it.

use super::request::ToolRequest;
use crate::engine::{EntityKind, QueryOptions};
use crate::types::{Error, LimitsConfig, Result};
use serde::Serialize;
use std::fmt;

/// Relationship flags forwarded to the query engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inclusion {
    pub callers: bool,
    pub callees: bool,
    pub types: bool,
}

impl Inclusion {
    fn parse(req: &ToolRequest) -> Self {
        Self {
            callers: req.get_bool("include_callers", false),
            callees: req.get_bool("include_callees", false),
            types: req.get_bool("include_types", false),
        }
    }

    /// Engine options carrying these flags. The token ceiling is applied by
    /// the optimizer afterwards, so the engine is asked for everything.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            include_callers: self.callers,
            include_callees: self.callees,
            include_types: self.types,
            ..QueryOptions::default()
        }
    }
}

/// Capabilities shared by every parameter record.
pub trait ToolParams: Send + Sync {
    /// Ceiling handed to the optimizer; `None` leaves the result unshaped.
    fn token_ceiling(&self) -> Option<usize> {
        None
    }

    fn inclusion(&self) -> Inclusion {
        Inclusion::default()
    }
}

fn parse_max_tokens(req: &ToolRequest, limits: &LimitsConfig) -> Result<usize> {
    let raw = req.get_int("max_tokens", limits.default_max_tokens);
    usize::try_from(raw)
        .map_err(|_| Error::validation(format!("max_tokens must be non-negative, got {}", raw)))
}

fn non_negative(req: &ToolRequest, key: &str) -> usize {
    usize::try_from(req.get_int(key, 0)).unwrap_or(0)
}

/// Implements [`ToolParams`] for a record whose `max_tokens` field is the
/// ceiling, with an optional inclusion mapping.
macro_rules! token_ceiling {
    ($ty:ty) => {
        token_ceiling!($ty, |_params| Inclusion::default());
    };
    ($ty:ty, |$params:ident| $inclusion:expr) => {
        impl ToolParams for $ty {
            fn token_ceiling(&self) -> Option<usize> {
                Some(self.max_tokens)
            }

            fn inclusion(&self) -> Inclusion {
                let $params = self;
                $inclusion
            }
        }
    };
}

// =============================================================================
// Search
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryByNameParams {
    pub name: String,
    pub inclusion: Inclusion,
    pub max_tokens: usize,
}

impl QueryByNameParams {
    pub fn parse(req: &ToolRequest, limits: &LimitsConfig) -> Result<Self> {
        Ok(Self {
            name: req.require_string("name")?,
            inclusion: Inclusion::parse(req),
            max_tokens: parse_max_tokens(req, limits)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryByPatternParams {
    pub pattern: String,
    pub entity_type: Option<EntityKind>,
    pub inclusion: Inclusion,
    pub max_tokens: usize,
}

impl QueryByPatternParams {
    pub fn parse(req: &ToolRequest, limits: &LimitsConfig) -> Result<Self> {
        let pattern = req.require_string("pattern")?;
        let raw_type = req.get_string("entity_type", "");
        let entity_type = match raw_type.as_str() {
            "" => None,
            "function" | "type" | "variable" | "constant" => EntityKind::parse(&raw_type),
            other => {
                return Err(Error::validation(format!(
                    "invalid entity_type '{}', must be one of: function, type, variable, constant",
                    other
                )))
            }
        };
        Ok(Self {
            pattern,
            entity_type,
            inclusion: Inclusion::parse(req),
            max_tokens: parse_max_tokens(req, limits)?,
        })
    }
}

token_ceiling!(QueryByNameParams, |params| params.inclusion);

token_ceiling!(QueryByPatternParams, |params| params.inclusion);

// =============================================================================
// Call graph
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallGraphParams {
    pub function_name: String,
    pub max_depth: i64,
    pub include_callers: bool,
    pub include_callees: bool,
    /// Only read by the enhanced variant.
    pub include_external: bool,
    pub max_tokens: usize,
}

impl CallGraphParams {
    /// Plain variant: depth passed through, the engine floors it at 1.
    pub fn parse(req: &ToolRequest, limits: &LimitsConfig) -> Result<Self> {
        Ok(Self {
            function_name: req.require_string("function_name")?,
            max_depth: req.get_int("max_depth", limits.default_call_graph_depth),
            include_callers: req.get_bool("include_callers", false),
            include_callees: req.get_bool("include_callees", false),
            include_external: true,
            max_tokens: parse_max_tokens(req, limits)?,
        })
    }

    /// Enhanced variant: depth normalized into `1..=max_call_graph_depth`
    /// and external calls filtered unless asked for.
    pub fn parse_enhanced(req: &ToolRequest, limits: &LimitsConfig) -> Result<Self> {
        let mut params = Self::parse(req, limits)?;
        params.max_depth = match params.max_depth {
            d if d <= 0 => limits.default_call_graph_depth,
            d if d > limits.max_call_graph_depth => limits.max_call_graph_depth,
            d => d,
        };
        params.include_external = req.get_bool("include_external", false);
        Ok(params)
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::call_graph(self.max_depth, self.include_callers, self.include_callees)
    }
}

token_ceiling!(CallGraphParams, |params| Inclusion {
    callers: params.include_callers,
    callees: params.include_callees,
    types: false,
});

// =============================================================================
// Listing
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntitiesParams {
    pub max_tokens: usize,
    pub include_signatures: bool,
    /// 0 means no limit.
    pub limit: usize,
    pub offset: usize,
}

impl ListEntitiesParams {
    pub fn parse(req: &ToolRequest, limits: &LimitsConfig) -> Result<Self> {
        Ok(Self {
            max_tokens: parse_max_tokens(req, limits)?,
            include_signatures: req.get_bool("include_signatures", true),
            limit: non_negative(req, "limit"),
            offset: non_negative(req, "offset"),
        })
    }
}

// =============================================================================
// Dependencies
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Callers,
    Callees,
    Both,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Callers => "callers",
            DependencyType::Callees => "callees",
            DependencyType::Both => "both",
        }
    }

    pub fn wants_callers(&self) -> bool {
        matches!(self, DependencyType::Callers | DependencyType::Both)
    }

    pub fn wants_callees(&self) -> bool {
        matches!(self, DependencyType::Callees | DependencyType::Both)
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindDependenciesParams {
    pub entity_name: String,
    pub dependency_type: DependencyType,
    pub max_tokens: usize,
}

impl FindDependenciesParams {
    pub fn parse(req: &ToolRequest, limits: &LimitsConfig) -> Result<Self> {
        let entity_name = req.require_string("entity_name")?;
        let raw = req.get_string("dependency_type", "both");
        let dependency_type = match raw.trim().to_lowercase().as_str() {
            "callers" => DependencyType::Callers,
            "callees" => DependencyType::Callees,
            "both" | "" => DependencyType::Both,
            _ => {
                return Err(Error::validation(format!(
                    "invalid dependency_type '{}': must be 'callees', 'callers', or 'both'",
                    raw.trim()
                )))
            }
        };
        Ok(Self {
            entity_name,
            dependency_type,
            max_tokens: parse_max_tokens(req, limits)?,
        })
    }
}

// =============================================================================
// Context
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionContextParams {
    pub function_name: String,
    pub include_implementations: bool,
    pub context_lines: usize,
    pub max_tokens: usize,
}

impl FunctionContextParams {
    pub fn parse(req: &ToolRequest, limits: &LimitsConfig) -> Result<Self> {
        let context_lines = match req.get_int("context_lines", limits.default_context_lines) {
            n if n <= 0 => limits.default_context_lines,
            n if n > limits.max_context_lines => limits.max_context_lines,
            n => n,
        };
        Ok(Self {
            function_name: req.require_string("function_name")?,
            include_implementations: req.get_bool("include_implementations", false),
            context_lines: usize::try_from(context_lines).unwrap_or(0),
            max_tokens: parse_max_tokens(req, limits)?,
        })
    }
}

token_ceiling!(FunctionContextParams, |_params| Inclusion {
    callers: true,
    callees: true,
    types: true,
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeContextParams {
    pub type_name: String,
    pub include_methods: bool,
    pub include_usage: bool,
    pub max_tokens: usize,
}

impl TypeContextParams {
    pub fn parse(req: &ToolRequest, limits: &LimitsConfig) -> Result<Self> {
        Ok(Self {
            type_name: req.require_string("type_name")?,
            include_methods: req.get_bool("include_methods", false),
            include_usage: req.get_bool("include_usage", false),
            max_tokens: parse_max_tokens(req, limits)?,
        })
    }
}

token_ceiling!(TypeContextParams, |_params| Inclusion {
    types: true,
    ..Inclusion::default()
});

token_ceiling!(ListEntitiesParams);
token_ceiling!(FindDependenciesParams);

// =============================================================================
// Repository
// =============================================================================

/// `build_index` / `get_repository_status`. Never shaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryParams {
    pub path: Option<String>,
    pub verbose: bool,
}

impl RepositoryParams {
    pub fn parse(req: &ToolRequest, _limits: &LimitsConfig) -> Result<Self> {
        Ok(Self {
            path: req.optional_string("path"),
            verbose: req.get_bool("verbose", false),
        })
    }
}

impl ToolParams for RepositoryParams {}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> LimitsConfig {
        LimitsConfig::default()
    }

    #[test]
    fn test_max_tokens_default_and_negative() {
        let req = ToolRequest::new("query_by_name").arg("name", "main");
        let params = QueryByNameParams::parse(&req, &limits()).unwrap();
        assert_eq!(params.token_ceiling(), Some(2000));

        let req = req.arg("max_tokens", -5);
        let err = QueryByNameParams::parse(&req, &limits()).unwrap_err();
        assert_eq!(err.detail(), "max_tokens must be non-negative, got -5");
    }

    #[test]
    fn test_inclusion_flows_into_query_options() {
        let req = ToolRequest::new("query_by_name")
            .arg("name", "main")
            .arg("include_callers", true)
            .arg("include_types", "true");
        let params = QueryByNameParams::parse(&req, &limits()).unwrap();
        let opts = params.inclusion().query_options();
        assert!(opts.include_callers);
        assert!(!opts.include_callees);
        assert!(opts.include_types);
        assert_eq!(opts.max_tokens, 0);
    }

    #[test]
    fn test_pattern_entity_type() {
        let base = ToolRequest::new("query_by_pattern").arg("pattern", "Handle*");
        let params = QueryByPatternParams::parse(&base, &limits()).unwrap();
        assert_eq!(params.entity_type, None);

        let typed = base.clone().arg("entity_type", "constant");
        let params = QueryByPatternParams::parse(&typed, &limits()).unwrap();
        assert_eq!(params.entity_type, Some(EntityKind::Constant));

        let bad = base.arg("entity_type", "struct");
        assert_eq!(
            QueryByPatternParams::parse(&bad, &limits()).unwrap_err().detail(),
            "invalid entity_type 'struct', must be one of: function, type, variable, constant"
        );
    }

    #[test]
    fn test_enhanced_depth_normalization() {
        let req = |depth: i64| {
            ToolRequest::new("get_call_graph_enhanced")
                .arg("function_name", "main")
                .arg("max_depth", depth)
        };
        let depth = |d| {
            CallGraphParams::parse_enhanced(&req(d), &limits())
                .unwrap()
                .max_depth
        };
        assert_eq!(depth(0), 2);
        assert_eq!(depth(-3), 2);
        assert_eq!(depth(4), 4);
        assert_eq!(depth(11), 10);

        let plain = CallGraphParams::parse(&req(0), &limits()).unwrap();
        assert_eq!(plain.max_depth, 0);
        assert!(plain.include_external);
        assert!(!CallGraphParams::parse_enhanced(&req(1), &limits()).unwrap().include_external);
    }

    #[test]
    fn test_dependency_type() {
        let req = |t: &str| {
            ToolRequest::new("find_dependencies")
                .arg("entity_name", "main")
                .arg("dependency_type", t)
        };
        let parse = |t| FindDependenciesParams::parse(&req(t), &limits());
        assert_eq!(parse("CALLERS").unwrap().dependency_type, DependencyType::Callers);
        assert_eq!(parse("").unwrap().dependency_type, DependencyType::Both);
        assert_eq!(
            parse("everything").unwrap_err().detail(),
            "invalid dependency_type 'everything': must be 'callees', 'callers', or 'both'"
        );
        let missing = ToolRequest::new("find_dependencies").arg("entity_name", "main");
        assert_eq!(
            FindDependenciesParams::parse(&missing, &limits()).unwrap().dependency_type,
            DependencyType::Both
        );
    }

    #[test]
    fn test_context_lines_clamped() {
        let req = |n: i64| {
            ToolRequest::new("get_function_context")
                .arg("function_name", "main")
                .arg("context_lines", n)
        };
        let lines = |n| FunctionContextParams::parse(&req(n), &limits()).unwrap().context_lines;
        assert_eq!(lines(0), 5);
        assert_eq!(lines(12), 12);
        assert_eq!(lines(80), 50);
    }

    #[test]
    fn test_list_pagination_floors_negative() {
        let req = ToolRequest::new("list_functions")
            .arg("limit", -1)
            .arg("offset", 3);
        let params = ListEntitiesParams::parse(&req, &limits()).unwrap();
        assert_eq!(params.limit, 0);
        assert_eq!(params.offset, 3);
        assert!(params.include_signatures);
    }

    #[test]
    fn test_every_budgeted_record_reports_its_ceiling() {
        let l = limits();
        let ceiling = |req: ToolRequest| req.arg("max_tokens", 700);

        let call_graph = CallGraphParams::parse(
            &ceiling(ToolRequest::new("get_call_graph"))
                .arg("function_name", "main")
                .arg("include_callees", true),
            &l,
        )
        .unwrap();
        assert_eq!(call_graph.token_ceiling(), Some(700));
        assert_eq!(
            call_graph.inclusion(),
            Inclusion { callers: false, callees: true, types: false }
        );

        let function = FunctionContextParams::parse(
            &ceiling(ToolRequest::new("get_function_context")).arg("function_name", "main"),
            &l,
        )
        .unwrap();
        assert_eq!(function.token_ceiling(), Some(700));
        assert_eq!(
            function.inclusion(),
            Inclusion { callers: true, callees: true, types: true }
        );

        let type_ctx = TypeContextParams::parse(
            &ceiling(ToolRequest::new("get_type_context")).arg("type_name", "Config"),
            &l,
        )
        .unwrap();
        assert_eq!(type_ctx.token_ceiling(), Some(700));
        assert_eq!(
            type_ctx.inclusion(),
            Inclusion { callers: false, callees: false, types: true }
        );

        let pattern = QueryByPatternParams::parse(
            &ceiling(ToolRequest::new("query_by_pattern"))
                .arg("pattern", "Get*")
                .arg("include_types", true),
            &l,
        )
        .unwrap();
        assert_eq!(pattern.token_ceiling(), Some(700));
        assert!(pattern.inclusion().types);

        let deps = FindDependenciesParams::parse(
            &ceiling(ToolRequest::new("find_dependencies")).arg("entity_name", "main"),
            &l,
        )
        .unwrap();
        assert_eq!(deps.token_ceiling(), Some(700));
        assert_eq!(deps.inclusion(), Inclusion::default());

        let list = ListEntitiesParams::parse(&ceiling(ToolRequest::new("list_types")), &l).unwrap();
        assert_eq!(list.token_ceiling(), Some(700));
    }

    #[test]
    fn test_repository_params_have_no_ceiling() {
        let params = RepositoryParams::parse(&ToolRequest::new("build_index"), &limits()).unwrap();
        assert_eq!(params.token_ceiling(), None);
        assert_eq!(params.path, None);
    }
}
