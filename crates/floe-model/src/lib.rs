#![forbid(unsafe_code)]

//! Hierarchical dataflow-graph document model (headless).
//!
//! Design goals:
//! - deterministic, testable structures (ids are indices; iteration order is
//!   insertion order everywhere it is observable)
//! - no behavior beyond lightweight queries; layout and interaction live in
//!   sibling crates and treat this model as authoritative input
//! - parent/scope links are id lookups only, never owning references

pub mod cutout;
pub mod document;
pub mod edit;
pub mod error;
pub mod expr;
pub mod geom;
pub mod json;
pub mod traverse;
pub mod uuid;

pub use cutout::{Selection, cutout};
pub use document::{
    DataDescriptor, DocumentError, Edge, GraphDocument, InterstateEdge, Memlet, Node, NodeId,
    NodeKind, State, StateId, SymbolType,
};
pub use error::{Error, Result};
pub use expr::{Expr, ExprError, SymbolMap};
pub use uuid::ElementUuid;
