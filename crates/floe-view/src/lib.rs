#![forbid(unsafe_code)]

//! Interactive view layer for hierarchical dataflow-graph documents.
//!
//! The host owns the windowing system and the drawing backend; this crate
//! owns everything in between: the pan/zoom transform and animated view
//! changes, the render session and its frame loop, per-kind level-of-detail
//! drawing over a backend-neutral [`Canvas`], the pointer/keyboard
//! interaction machine, overlays, and symbol resolution. Single-threaded and
//! cooperative throughout; the host calls in, events flow back out as
//! [`HostEvent`]s.

pub mod canvas;
pub mod draw;
pub mod events;
pub mod interaction;
pub mod overlay;
pub mod render;
pub mod symbols;
pub mod transform;

pub use canvas::{Canvas, Color, DrawOp, RecordingCanvas, Stroke, TextAlign};
pub use draw::VisualState;
pub use events::{HostEvent, PositionChangeKind};
pub use interaction::{AddKind, Interaction, Key, Mode, Modifiers};
pub use overlay::{BadnessCenter, Overlay, OverlayContext, RuntimeMetricsOverlay};
pub use render::RenderSession;
pub use symbols::{SymbolPrompt, SymbolResolver};
pub use transform::{ViewAnimation, ViewTransform};
