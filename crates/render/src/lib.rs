//! Rendering Adapter: the presenter interface for live cells.
//!
//! # Invariants
//! - A presenter cannot mutate world truth; it only receives cell views.
//! - Every visual is keyed by a [`RenderHandle`](gridmerge_common::RenderHandle)
//!   minted by the active-cell cache.
//!
//! Ships a text presenter for the CLI and a null presenter for headless runs.
//! Swap in a map-backed implementation without changing consumers.

mod renderer;

pub use renderer::{CellPresenter, CellView, NullPresenter, RenderError, TextPresenter, status_line};
