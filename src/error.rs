//! Error types for the simulation engine.
//!
//! One closed enum covers the whole taxonomy. Everything here is fatal to
//! the operation that raised it and propagates to the caller, with one
//! exception: [`EngineError::IllegalStateTransition`] is recoverable by
//! design — a rejected request simply has no effect on engine state.

use std::error::Error;
use std::fmt;

use crate::core::gears::GearId;
use crate::types::{CellType, EngineState, StateTransition};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// Board construction rejected an even width or height.
    InvalidDimensions { width: i16, height: i16 },
    /// Piece placement on a cell of the wrong type, or an occupied cell.
    InvalidPlacement {
        x: i16,
        y: i16,
        reason: &'static str,
    },
    /// Coordinate access outside the grid extent.
    OutOfBounds { x: i16, y: i16 },
    /// A crossover was reached vertically; crossovers only make sense
    /// reached diagonally.
    InvalidApproach { x: i16, y: i16 },
    /// A drivetrain-only gear was asked to handle a ball.
    UnreachablePiece { x: i16, y: i16 },
    /// A turn was requested on a gear that belongs to no set.
    UngroupedGear { gear: GearId },
    /// The active ball came to rest on a non-playable cell. Indicates a
    /// grid-construction bug, not a recoverable condition.
    InvalidBallPosition { x: i16, y: i16, cell: CellType },
    /// The tick found the active ball on an empty slot cell.
    NoPieceAtSlot { x: i16, y: i16 },
    /// The requested transition is not in the table for the current
    /// state. Rejected and reported; state unchanged.
    IllegalStateTransition {
        from: EngineState,
        transition: StateTransition,
    },
    /// Structural mutation attempted outside the SETUP state.
    WrongPhaseOperation { state: EngineState },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimensions { width, height } => {
                write!(f, "board dimensions must be odd, got {width}x{height}")
            }
            Self::InvalidPlacement { x, y, reason } => {
                write!(f, "invalid placement at ({x}, {y}): {reason}")
            }
            Self::OutOfBounds { x, y } => write!(f, "coordinate ({x}, {y}) out of bounds"),
            Self::InvalidApproach { x, y } => {
                write!(f, "crossover at ({x}, {y}) reached vertically")
            }
            Self::UnreachablePiece { x, y } => {
                write!(f, "drivetrain gear at ({x}, {y}) cannot handle a ball")
            }
            Self::UngroupedGear { gear } => {
                write!(f, "gear {} does not belong to any set", gear.index())
            }
            Self::InvalidBallPosition { x, y, cell } => {
                write!(f, "ball resting on {} cell at ({x}, {y})", cell.as_str())
            }
            Self::NoPieceAtSlot { x, y } => write!(f, "no piece at slot ({x}, {y})"),
            Self::IllegalStateTransition { from, transition } => {
                write!(
                    f,
                    "illegal transition '{}' from state {}",
                    transition.as_str(),
                    from.as_str()
                )
            }
            Self::WrongPhaseOperation { state } => {
                write!(
                    f,
                    "board mutation is only allowed in SETUP, current state is {}",
                    state.as_str()
                )
            }
        }
    }
}

impl Error for EngineError {}
