//! Marble-drop puzzle board simulation engine.
//!
//! Simulates a pegboard of ramps, crossovers, interceptors, and
//! gear-linked bits on a fixed odd-sized grid: one ball at a time enters
//! at the top, falls row by row, and is redirected by whatever piece
//! occupies the slot it lands on until it exits the bottom or is
//! intercepted.
//!
//! The [`core::Engine`] drives everything through a strict state machine
//! and exposes read-only snapshots for presentation layers; rendering,
//! animation geometry, and persistence live outside this crate.

pub mod core;
pub mod error;
pub mod types;

pub use crate::core::{
    Ball, Board, BoardConfig, ChangeEvent, Engine, EngineConfig, EngineSnapshot, GearSetManager,
    Piece, PieceKind,
};
pub use crate::error::EngineError;
