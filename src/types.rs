//! Core types shared across the crate
//!
//! This module contains pure data types with no behavior beyond small
//! helpers: cell classification, piece orientation, gear rotation, ball
//! colour, and the engine's state-machine vocabulary.

use serde::{Deserialize, Serialize};

/// Default board dimensions (must be odd)
pub const DEFAULT_BOARD_WIDTH: i16 = 11;
pub const DEFAULT_BOARD_HEIGHT: i16 = 11;

/// Default entry columns: a fixed offset from each edge
pub const LEFT_ENTRY_OFFSET: i16 = 3;
pub const RIGHT_ENTRY_OFFSET: i16 = 4;

/// Default number of queued balls per side
pub const DEFAULT_BALLS_PER_SIDE: usize = 20;

/// Classification of a single grid cell, fixed at board construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Blank,
    /// Pass-through lattice vertex; only drivetrain gears may sit here
    Peg,
    /// Piece slot and ball resting position
    SlotPeg,
    LeftExit,
    RightExit,
}

impl CellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Blank => "blank",
            CellType::Peg => "peg",
            CellType::SlotPeg => "slot_peg",
            CellType::LeftExit => "left_exit",
            CellType::RightExit => "right_exit",
        }
    }
}

/// Board side, used for entry columns and ball queues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Ball colours; reds enter from the left, blues from the right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallColour {
    Red,
    Blue,
}

impl BallColour {
    /// The side this colour's queue feeds from
    pub fn side(&self) -> Side {
        match self {
            BallColour::Red => Side::Left,
            BallColour::Blue => Side::Right,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BallColour::Red => "red",
            BallColour::Blue => "blue",
        }
    }
}

/// Orientation of a flippable piece (ramp or bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Left,
    Right,
}

impl Orientation {
    pub fn flipped(&self) -> Self {
        match self {
            Orientation::Left => Orientation::Right,
            Orientation::Right => Orientation::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Left => "left",
            Orientation::Right => "right",
        }
    }
}

/// Rotation of a gear piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GearRotation {
    Clockwise,
    Counterclockwise,
}

impl GearRotation {
    pub fn opposite(&self) -> Self {
        match self {
            GearRotation::Clockwise => GearRotation::Counterclockwise,
            GearRotation::Counterclockwise => GearRotation::Clockwise,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GearRotation::Clockwise => "clockwise",
            GearRotation::Counterclockwise => "counterclockwise",
        }
    }
}

/// Engine run states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Init,
    Setup,
    Running,
    Frozen,
    Finished,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Init => "INIT",
            EngineState::Setup => "SETUP",
            EngineState::Running => "RUNNING",
            EngineState::Frozen => "FROZEN",
            EngineState::Finished => "FINISHED",
        }
    }
}

/// Requests against the engine state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateTransition {
    InitDone,
    Play,
    Pause,
    Stop,
    Step,
    TerminalState,
}

impl StateTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateTransition::InitDone => "init_done",
            StateTransition::Play => "play",
            StateTransition::Pause => "pause",
            StateTransition::Stop => "stop",
            StateTransition::Step => "step",
            StateTransition::TerminalState => "terminal_state",
        }
    }
}
