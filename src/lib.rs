//! # typegraph - dependency-ordered type graphs
//!
//! Resolves a type into the sequence of types it is built from, leaves first
//! and the root last, so codecs and validators can handle embedded types
//! before the types that embed them. Recursive types are cut with
//! placeholder nodes instead of looping forever.

pub mod cli;
pub mod cli_handlers;
pub mod core;
pub mod error;
pub mod graph;
pub mod models;
pub mod registry;
pub mod schema;

pub use crate::core::{OrderedTypes, TypeGraphService};
pub use error::{Result, TypeGraphError};
pub use graph::{TypeGraph, build_type_graph, iter_types};
pub use models::*;
pub use registry::{Introspect, Resolve, TypeRegistry};
