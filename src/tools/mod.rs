//! Tool surface: declarations, parameter parsing, the generic pipeline, the
//! concrete tools and the server registry that dispatches to them.
//!
//! Each tool implements [`ToolOperation`]; [`pipeline::execute`] supplies
//! precondition checks, error envelopes, recovery and token shaping.

pub mod callgraph;
pub mod catalog;
pub mod context;
pub mod dependencies;
pub mod listing;
pub mod params;
pub mod pipeline;
pub mod query;
pub mod repository;
pub mod request;
pub mod response;
pub mod results;
pub mod server;

pub use catalog::{ParamDef, ParamType, ToolCatalog, ToolDeclaration};
pub use pipeline::{format_error, format_success, DynTool, Preconditions, ToolContext, ToolOperation};
pub use request::ToolRequest;
pub use response::{ToolContent, ToolResponse};
pub use results::{
    BuildIndexResult, DependencyAnalysisResult, FunctionContextResult, TypeContextResult,
};
pub use server::{RepoContextServer, ServerConfiguration};
