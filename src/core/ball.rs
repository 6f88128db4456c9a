//! Ball module - position record for the single ball in transit
//!
//! A ball remembers its previous cell so that direction-dependent pieces
//! (the crossover) can infer which side it approached from. Queued balls
//! sit at (-1, -1) until they are dropped onto the board.

use log::debug;

use crate::types::BallColour;

/// A single ball: colour, current cell, and the cell it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ball {
    pub colour: BallColour,
    pub x: i16,
    pub y: i16,
    pub prev_x: i16,
    pub prev_y: i16,
}

impl Ball {
    /// Create a queued ball. The prior-position sentinel encodes the entry
    /// side: reds approach from far left, blues from far right, so the
    /// first direction-dependent piece they meet sees the right approach.
    pub fn new(colour: BallColour) -> Self {
        let prev_x = match colour {
            BallColour::Red => -1,
            BallColour::Blue => i16::MAX,
        };
        Self {
            colour,
            x: -1,
            y: -1,
            prev_x,
            prev_y: -1,
        }
    }

    /// Move to a new cell, recording the current cell as previous
    pub fn move_to(&mut self, x: i16, y: i16) {
        self.prev_x = self.x;
        self.prev_y = self.y;
        self.x = x;
        self.y = y;
        debug!("ball moved to ({}, {})", self.x, self.y);
    }
}
