//! Piece module - the closed set of board pieces and their ball behavior
//!
//! Piece kinds form a fixed vocabulary, so dispatch is an exhaustive match
//! rather than dynamic dispatch: placement validation and the tick loop
//! both get missing-case checking for free.

use serde::{Deserialize, Serialize};

use crate::core::ball::Ball;
use crate::core::gears::GearId;
use crate::error::EngineError;
use crate::types::{GearRotation, Orientation};

/// Piece kinds. For gears the embedded rotation is the *requested initial*
/// rotation: on placement the gear-set manager may override it to satisfy
/// the meshing constraint, and owns it from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    /// Deflects the ball one column toward its orientation. Flippable.
    Ramp(Orientation),
    /// Structurally identical to the ramp's flip/redirect contract.
    Bit(Orientation),
    /// Passes the ball down and away from its entry side.
    Crossover,
    /// Terminal: holds the ball and ends the run.
    Interceptor,
    /// Gear-linked bit; deflects by rotation and advances its gear train.
    GearBit(GearRotation),
    /// Drivetrain-only gear; never on a ball path.
    NormalGear(GearRotation),
}

impl PieceKind {
    /// Whether this kind participates in a gear set
    pub fn is_gear(&self) -> bool {
        matches!(self, PieceKind::GearBit(_) | PieceKind::NormalGear(_))
    }

    /// Whether the user can flip this kind's orientation
    pub fn is_flippable(&self) -> bool {
        matches!(self, PieceKind::Ramp(_) | PieceKind::Bit(_))
    }
}

/// A piece bound to a grid coordinate for its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub x: i16,
    pub y: i16,
    pub kind: PieceKind,
}

impl Piece {
    pub fn new(x: i16, y: i16, kind: PieceKind) -> Self {
        Self { x, y, kind }
    }

    pub fn ramp(x: i16, y: i16, orientation: Orientation) -> Self {
        Self::new(x, y, PieceKind::Ramp(orientation))
    }

    pub fn bit(x: i16, y: i16, orientation: Orientation) -> Self {
        Self::new(x, y, PieceKind::Bit(orientation))
    }

    pub fn crossover(x: i16, y: i16) -> Self {
        Self::new(x, y, PieceKind::Crossover)
    }

    pub fn interceptor(x: i16, y: i16) -> Self {
        Self::new(x, y, PieceKind::Interceptor)
    }

    pub fn gear_bit(x: i16, y: i16, rotation: GearRotation) -> Self {
        Self::new(x, y, PieceKind::GearBit(rotation))
    }

    pub fn normal_gear(x: i16, y: i16, rotation: GearRotation) -> Self {
        Self::new(x, y, PieceKind::NormalGear(rotation))
    }

    /// Copy of this piece with its orientation flipped. Non-flippable
    /// kinds are returned unchanged.
    pub fn flipped(&self) -> Self {
        let kind = match self.kind {
            PieceKind::Ramp(o) => PieceKind::Ramp(o.flipped()),
            PieceKind::Bit(o) => PieceKind::Bit(o.flipped()),
            other => other,
        };
        Self { kind, ..*self }
    }

    /// Redirect the ball resting on this piece.
    ///
    /// The interceptor leaves the ball in place; the engine detects the
    /// terminal condition itself. Gear-bit set turning is likewise the
    /// engine's responsibility, after this call returns.
    pub fn handle_ball(&self, ball: &mut Ball) -> Result<(), EngineError> {
        match self.kind {
            // Purely orientation-based, independent of approach direction
            PieceKind::Ramp(orientation) | PieceKind::Bit(orientation) => {
                let dx = match orientation {
                    Orientation::Left => -1,
                    Orientation::Right => 1,
                };
                ball.move_to(self.x + dx, self.y + 1);
                Ok(())
            }
            PieceKind::Crossover => {
                if ball.prev_x < self.x {
                    ball.move_to(self.x + 1, self.y + 1);
                    Ok(())
                } else if ball.prev_x > self.x {
                    ball.move_to(self.x - 1, self.y + 1);
                    Ok(())
                } else {
                    Err(EngineError::InvalidApproach {
                        x: self.x,
                        y: self.y,
                    })
                }
            }
            PieceKind::Interceptor => Ok(()),
            PieceKind::GearBit(rotation) => {
                match rotation {
                    GearRotation::Clockwise => ball.move_to(self.x - 1, self.y + 1),
                    GearRotation::Counterclockwise => ball.move_to(self.x + 1, self.y + 1),
                }
                Ok(())
            }
            PieceKind::NormalGear(_) => Err(EngineError::UnreachablePiece {
                x: self.x,
                y: self.y,
            }),
        }
    }
}

/// Internal board occupant. Gears are stored by their arena id; the
/// gear-set manager holds the authoritative rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Ramp(Orientation),
    Bit(Orientation),
    Crossover,
    Interceptor,
    GearBit(GearId),
    NormalGear(GearId),
}

impl Slot {
    pub(crate) fn gear_id(&self) -> Option<GearId> {
        match self {
            Slot::GearBit(id) | Slot::NormalGear(id) => Some(*id),
            _ => None,
        }
    }
}
