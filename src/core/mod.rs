//! Core module - the simulation engine proper
//!
//! Grid and placement rules live in [`board`], per-piece ball behavior
//! in [`piece`], the meshed-gear partition in [`gears`], and the run
//! state machine plus tick loop in [`engine`]. No UI, networking, or
//! I/O concerns here.

pub mod ball;
pub mod board;
pub mod engine;
pub mod gears;
pub mod piece;
pub mod snapshot;

pub use ball::Ball;
pub use board::{Board, BoardConfig};
pub use engine::{ChangeEvent, Engine, EngineConfig, ObserverId};
pub use gears::{GearId, GearSetManager, SetId};
pub use piece::{Piece, PieceKind};
pub use snapshot::{BallSnapshot, EngineSnapshot, GearSetSnapshot, PieceSnapshot};
