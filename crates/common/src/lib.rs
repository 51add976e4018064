//! Shared types: grid geometry, tokens, render handles and startup configuration.
//!
//! # Invariants
//! - A [`Token`] is always a positive power of two.
//! - Cell addressing is a pure function of position, origin and tile size.

pub mod config;
pub mod grid;
pub mod types;

pub use config::{ConfigError, GameConfig};
pub use grid::{CoordParseError, GeoBounds, GridCoord, GridSpec, LatLng};
pub use types::{RenderHandle, Token, TokenError};
