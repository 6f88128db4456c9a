//! Board module - spatial authority over the grid
//!
//! Owns the immutable cell-type grid, the mutable piece occupancy grid,
//! the entry/exit geometry, and the gear-set manager. All placement
//! validation happens here; the engine drives every mutation through this
//! API.
//!
//! Grid layout for a `width x height` board (both odd):
//! - rows `0..height`: a checkerboard of Peg/SlotPeg by coordinate
//!   parity, with the two top corner cells on each side and the single
//!   top-middle cell forced Blank (the entry funnel)
//! - row `height`: the first exit row — LeftExit left of centre,
//!   RightExit right of it, the centre cell stays SlotPeg
//! - row `height + 1`: the second exit row — the two cells flanking the
//!   centre are LeftExit/RightExit, everything else Blank
//!
//! The piece grid is one row taller than the cell grid so the exit rows'
//! target cells are addressable without bounds errors.

use arrayvec::ArrayVec;

use crate::core::gears::{GearId, GearSetManager};
use crate::core::piece::{Piece, PieceKind, Slot};
use crate::error::EngineError;
use crate::types::{
    CellType, GearRotation, Side, DEFAULT_BOARD_HEIGHT, DEFAULT_BOARD_WIDTH, LEFT_ENTRY_OFFSET,
    RIGHT_ENTRY_OFFSET,
};

/// Board construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    pub width: i16,
    pub height: i16,
    pub start_side: Side,
    /// Entry column overrides; `None` uses the fixed edge offsets
    pub left_entry_x: Option<i16>,
    pub right_entry_x: Option<i16>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_BOARD_WIDTH,
            height: DEFAULT_BOARD_HEIGHT,
            start_side: Side::Left,
            left_entry_x: None,
            right_entry_x: None,
        }
    }
}

/// The puzzle board: static cell classification plus piece occupancy
#[derive(Debug, Clone)]
pub struct Board {
    width: i16,
    height: i16,
    start_side: Side,
    left_entry_x: i16,
    right_entry_x: i16,
    /// Cell types, row-major, `height + 2` rows
    cells: Vec<CellType>,
    /// Piece occupancy, row-major, one row taller than the cell grid
    pieces: Vec<Option<Slot>>,
    gears: GearSetManager,
}

impl Board {
    /// Build a board. Width and height must both be odd.
    pub fn new(config: BoardConfig) -> Result<Self, EngineError> {
        let BoardConfig { width, height, .. } = config;
        if width % 2 == 0 || height % 2 == 0 || width < 1 || height < 1 {
            return Err(EngineError::InvalidDimensions { width, height });
        }

        let cell_rows = (height + 2) as usize;
        let piece_rows = cell_rows + 1;
        let w = width as usize;
        let centre = width / 2;

        let mut cells = Vec::with_capacity(cell_rows * w);
        for y in 0..height {
            for x in 0..width {
                if x % 2 == y % 2 {
                    cells.push(CellType::Peg);
                } else {
                    cells.push(CellType::SlotPeg);
                }
            }
        }
        // Entry funnel: blank the top corners and the top-middle cell
        for x in [0, 1, width - 2, width - 1, centre] {
            if (0..width).contains(&x) {
                cells[x as usize] = CellType::Blank;
            }
        }
        // First exit row: everything drains away from the centre slot
        for x in 0..width {
            cells.push(match x.cmp(&centre) {
                std::cmp::Ordering::Less => CellType::LeftExit,
                std::cmp::Ordering::Equal => CellType::SlotPeg,
                std::cmp::Ordering::Greater => CellType::RightExit,
            });
        }
        // Second exit row: only the cells flanking the centre are exits
        for x in 0..width {
            cells.push(if x == centre - 1 {
                CellType::LeftExit
            } else if x == centre + 1 {
                CellType::RightExit
            } else {
                CellType::Blank
            });
        }

        Ok(Self {
            width,
            height,
            start_side: config.start_side,
            left_entry_x: config.left_entry_x.unwrap_or(LEFT_ENTRY_OFFSET),
            right_entry_x: config.right_entry_x.unwrap_or(width - RIGHT_ENTRY_OFFSET),
            cells,
            pieces: vec![None; piece_rows * w],
            gears: GearSetManager::new(),
        })
    }

    pub fn width(&self) -> i16 {
        self.width
    }

    /// Height of the checkerboard region; the full cell grid has two
    /// extra exit rows below it
    pub fn height(&self) -> i16 {
        self.height
    }

    pub fn start_side(&self) -> Side {
        self.start_side
    }

    pub fn left_entry_x(&self) -> i16 {
        self.left_entry_x
    }

    pub fn right_entry_x(&self) -> i16 {
        self.right_entry_x
    }

    pub fn gears(&self) -> &GearSetManager {
        &self.gears
    }

    fn cell_index(&self, x: i16, y: i16) -> Option<usize> {
        if x < 0 || x >= self.width || y < 0 || y >= self.height + 2 {
            return None;
        }
        Some((y as usize) * (self.width as usize) + (x as usize))
    }

    fn piece_index(&self, x: i16, y: i16) -> Option<usize> {
        if x < 0 || x >= self.width || y < 0 || y >= self.height + 3 {
            return None;
        }
        Some((y as usize) * (self.width as usize) + (x as usize))
    }

    /// Cell classification at (x, y)
    pub fn cell_type(&self, x: i16, y: i16) -> Result<CellType, EngineError> {
        self.cell_index(x, y)
            .map(|idx| self.cells[idx])
            .ok_or(EngineError::OutOfBounds { x, y })
    }

    /// The piece occupying (x, y), if any. Gear pieces carry their live
    /// rotation as read from the gear-set manager.
    pub fn piece_at(&self, x: i16, y: i16) -> Result<Option<Piece>, EngineError> {
        let idx = self
            .piece_index(x, y)
            .ok_or(EngineError::OutOfBounds { x, y })?;
        Ok(self.pieces[idx].map(|slot| self.resolve(x, y, slot)))
    }

    fn resolve(&self, x: i16, y: i16, slot: Slot) -> Piece {
        let kind = match slot {
            Slot::Ramp(orientation) => PieceKind::Ramp(orientation),
            Slot::Bit(orientation) => PieceKind::Bit(orientation),
            Slot::Crossover => PieceKind::Crossover,
            Slot::Interceptor => PieceKind::Interceptor,
            // The slot grid and the gear arena are kept in sync by
            // place/remove, so the lookup cannot miss
            Slot::GearBit(id) => {
                PieceKind::GearBit(self.gears.rotation(id).unwrap_or(GearRotation::Clockwise))
            }
            Slot::NormalGear(id) => {
                PieceKind::NormalGear(self.gears.rotation(id).unwrap_or(GearRotation::Clockwise))
            }
        };
        Piece { x, y, kind }
    }

    /// Validate and apply a placement.
    ///
    /// Every kind except the drivetrain gear requires a SlotPeg cell; the
    /// drivetrain gear accepts Peg as well. The target cell must be
    /// unoccupied. Gear pieces are registered with the gear-set manager
    /// *before* being written into the grid, since set assignment reads
    /// neighbour state that must not yet include the new piece.
    pub fn place_piece(&mut self, piece: Piece) -> Result<(), EngineError> {
        let Piece { x, y, kind } = piece;
        let cell = self.cell_type(x, y)?;
        let cell_ok = match kind {
            PieceKind::NormalGear(_) => matches!(cell, CellType::Peg | CellType::SlotPeg),
            _ => cell == CellType::SlotPeg,
        };
        if !cell_ok {
            return Err(EngineError::InvalidPlacement {
                x,
                y,
                reason: "cell type does not accept this piece kind",
            });
        }
        let idx = self
            .piece_index(x, y)
            .ok_or(EngineError::OutOfBounds { x, y })?;
        if self.pieces[idx].is_some() {
            return Err(EngineError::InvalidPlacement {
                x,
                y,
                reason: "cell is already occupied",
            });
        }

        let slot = match kind {
            PieceKind::Ramp(orientation) => Slot::Ramp(orientation),
            PieceKind::Bit(orientation) => Slot::Bit(orientation),
            PieceKind::Crossover => Slot::Crossover,
            PieceKind::Interceptor => Slot::Interceptor,
            PieceKind::GearBit(rotation) => {
                let id = self.register_gear(x, y, rotation)?;
                Slot::GearBit(id)
            }
            PieceKind::NormalGear(rotation) => {
                let id = self.register_gear(x, y, rotation)?;
                Slot::NormalGear(id)
            }
        };
        self.pieces[idx] = Some(slot);
        Ok(())
    }

    fn register_gear(
        &mut self,
        x: i16,
        y: i16,
        rotation: GearRotation,
    ) -> Result<GearId, EngineError> {
        let adjacent = self.adjacent_gears(x, y);
        let id = self.gears.create_gear(rotation);
        match self.gears.add_gear(id, &adjacent) {
            Ok(()) => Ok(id),
            Err(err) => {
                self.gears.remove_gear(id);
                Err(err)
            }
        }
    }

    /// Gear occupants of the four orthogonal neighbour cells, in a fixed
    /// N/S/W/E scan order (the merge tie-break depends on this order)
    fn adjacent_gears(&self, x: i16, y: i16) -> ArrayVec<GearId, 4> {
        let mut adjacent = ArrayVec::new();
        for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
            let Some(idx) = self.piece_index(x + dx, y + dy) else {
                continue;
            };
            if let Some(id) = self.pieces[idx].and_then(|slot| slot.gear_id()) {
                adjacent.push(id);
            }
        }
        adjacent
    }

    /// Clear the cell at (x, y), returning the removed piece if one was
    /// present. A removed gear is forgotten by the gear-set manager; the
    /// rotation invariant is not rebalanced for the set's survivors.
    pub fn remove_piece(&mut self, x: i16, y: i16) -> Result<Option<Piece>, EngineError> {
        let idx = self
            .piece_index(x, y)
            .ok_or(EngineError::OutOfBounds { x, y })?;
        let Some(slot) = self.pieces[idx] else {
            return Ok(None);
        };
        let removed = self.resolve(x, y, slot);
        if let Some(id) = slot.gear_id() {
            self.gears.remove_gear(id);
        }
        self.pieces[idx] = None;
        Ok(Some(removed))
    }

    /// Turn the whole gear set of the gear at (x, y). No effect on
    /// non-gear occupants.
    pub fn turn_gear_at(&mut self, x: i16, y: i16) -> Result<(), EngineError> {
        let idx = self
            .piece_index(x, y)
            .ok_or(EngineError::OutOfBounds { x, y })?;
        let Some(slot) = self.pieces[idx] else {
            return Err(EngineError::NoPieceAtSlot { x, y });
        };
        match slot.gear_id() {
            Some(id) => self.gears.turn_set(id),
            None => Ok(()),
        }
    }

    /// All placed pieces, with live gear rotations
    pub fn pieces(&self) -> Vec<Piece> {
        let w = self.width as usize;
        self.pieces
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                slot.map(|slot| self.resolve((idx % w) as i16, (idx / w) as i16, slot))
            })
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        // The default configuration is always valid
        match Self::new(BoardConfig::default()) {
            Ok(board) => board,
            Err(_) => unreachable!("default board configuration is odd-sized"),
        }
    }
}
