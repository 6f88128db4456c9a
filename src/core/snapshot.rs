//! Snapshot module - read-only state exports
//!
//! Everything the rendering/animation collaborator needs, captured as
//! plain serializable data. The collaborator never writes engine state;
//! all mutation goes through the engine's own methods.

use serde::{Deserialize, Serialize};

use crate::core::ball::Ball;
use crate::core::engine::Engine;
use crate::core::piece::PieceKind;
use crate::types::{BallColour, EngineState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub colour: BallColour,
    pub x: i16,
    pub y: i16,
}

impl From<&Ball> for BallSnapshot {
    fn from(ball: &Ball) -> Self {
        Self {
            colour: ball.colour,
            x: ball.x,
            y: ball.y,
        }
    }
}

/// One occupied cell; gear kinds carry their live rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceSnapshot {
    pub x: i16,
    pub y: i16,
    pub kind: PieceKind,
}

/// One gear set: id plus member gear indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearSetSnapshot {
    pub id: u32,
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub state: EngineState,
    pub tick: u64,
    pub left_queue: usize,
    pub right_queue: usize,
    pub active: Option<BallSnapshot>,
    pub finished: Vec<BallSnapshot>,
    pub pieces: Vec<PieceSnapshot>,
    pub gear_sets: Vec<GearSetSnapshot>,
}

impl EngineSnapshot {
    pub(crate) fn capture(engine: &Engine) -> Self {
        let board = engine.board();
        Self {
            state: engine.state(),
            tick: engine.current_tick(),
            left_queue: engine.left_queue_len(),
            right_queue: engine.right_queue_len(),
            active: engine.active_ball().map(BallSnapshot::from),
            finished: engine.finished_balls().iter().map(BallSnapshot::from).collect(),
            pieces: board
                .pieces()
                .into_iter()
                .map(|p| PieceSnapshot {
                    x: p.x,
                    y: p.y,
                    kind: p.kind,
                })
                .collect(),
            gear_sets: board
                .gears()
                .sets()
                .map(|(id, members)| GearSetSnapshot {
                    id: id.value(),
                    members: members.iter().map(|m| m.index()).collect(),
                })
                .collect(),
        }
    }
}
