#![forbid(unsafe_code)]

//! Layered layout for hierarchical dataflow-graph documents.
//!
//! Design goals:
//! - deterministic output for a fixed document and collapse state
//! - graceful degradation: malformed elements are skipped, missing sizes
//!   default, oversized graphs fall back to a cheaper ranker
//! - nested documents are laid out bottom-up and report sizes upward

pub mod graph;
pub mod model;
pub mod order;
pub mod pipeline;
pub mod position;
pub mod rank;
pub mod sizing;

pub use graph::DiGraph;
pub use model::{
    ElementRef, LayerEdge, LayerGraph, LayerNode, PositionedGraph, PositionedNode,
    PositionedState, RoutedEdge, ShortcutEdge,
};
pub use pipeline::{LayoutOptions, layout_document};
pub use rank::Ranker;
