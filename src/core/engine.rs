//! Engine module - run state machine and tick loop
//!
//! The engine owns the board, the ball queues, and the single active
//! ball, and drives every mutation. Everything is synchronous and
//! single-threaded: a public operation runs to completion before
//! returning, and at most one ball is ever in transit (enforced by the
//! `Option<Ball>` active slot).
//!
//! Subscribers are notified synchronously once per committed mutation,
//! after it is fully applied. Callbacks must not re-enter engine
//! mutation methods; the observer list is taken out of the engine for
//! the duration of a notification, so re-entrant subscriptions are lost.

use log::{debug, warn};

use crate::core::ball::Ball;
use crate::core::board::{Board, BoardConfig};
use crate::core::piece::{Piece, PieceKind};
use crate::core::snapshot::EngineSnapshot;
use crate::error::EngineError;
use crate::types::{
    BallColour, CellType, EngineState, Side, StateTransition, DEFAULT_BALLS_PER_SIDE,
};

/// Engine construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub red_balls: usize,
    pub blue_balls: usize,
    pub board: BoardConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            red_balls: DEFAULT_BALLS_PER_SIDE,
            blue_balls: DEFAULT_BALLS_PER_SIDE,
            board: BoardConfig::default(),
        }
    }
}

/// Committed-mutation notification payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    PieceAdded { x: i16, y: i16 },
    PieceRemoved { x: i16, y: i16 },
    PieceToggled { x: i16, y: i16 },
    Stepped { tick: u64 },
}

/// Handle returned by [`Engine::subscribe`]
pub type ObserverId = u64;

type ObserverCallback = Box<dyn FnMut(ChangeEvent)>;

struct Observer {
    id: ObserverId,
    callback: ObserverCallback,
}

/// Legal transitions; everything not listed is rejected
fn transition_target(from: EngineState, transition: StateTransition) -> Option<EngineState> {
    use EngineState::*;
    use StateTransition::*;
    match (from, transition) {
        (Init, InitDone) => Some(Setup),
        (Setup, Play) => Some(Running),
        (Setup, Step) => Some(Frozen),
        (Running, Pause) => Some(Frozen),
        (Running, Stop) => Some(Setup),
        (Running, TerminalState) => Some(Finished),
        (Frozen, Play) => Some(Running),
        (Frozen, Stop) => Some(Setup),
        (Frozen, Step) => Some(Frozen),
        (Frozen, TerminalState) => Some(Finished),
        (Finished, Stop) => Some(Setup),
        _ => None,
    }
}

/// The simulation engine
pub struct Engine {
    state: EngineState,
    current_tick: u64,
    board: Board,
    /// Start queues pop from the end: last pushed drops first
    left_start_queue: Vec<Ball>,
    right_start_queue: Vec<Ball>,
    active: Option<Ball>,
    finished: Vec<Ball>,
    observers: Vec<Observer>,
    next_observer_id: ObserverId,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let mut engine = Self {
            state: EngineState::Init,
            current_tick: 0,
            board: Board::new(config.board)?,
            left_start_queue: populate_queue(BallColour::Red, config.red_balls),
            right_start_queue: populate_queue(BallColour::Blue, config.blue_balls),
            active: None,
            finished: Vec::new(),
            observers: Vec::new(),
            next_observer_id: 0,
        };
        engine.transition(StateTransition::InitDone)?;
        Ok(engine)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn left_queue_len(&self) -> usize {
        self.left_start_queue.len()
    }

    pub fn right_queue_len(&self) -> usize {
        self.right_start_queue.len()
    }

    pub fn active_ball(&self) -> Option<&Ball> {
        self.active.as_ref()
    }

    /// Balls that have left the board, in completion order
    pub fn finished_balls(&self) -> &[Ball] {
        &self.finished
    }

    /// Read-only snapshot for the rendering collaborator
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::capture(self)
    }

    /// Place a piece on the board. Only valid in SETUP.
    pub fn add_piece(&mut self, piece: Piece) -> Result<(), EngineError> {
        self.require_setup()?;
        self.board.place_piece(piece)?;
        self.notify(ChangeEvent::PieceAdded {
            x: piece.x,
            y: piece.y,
        });
        Ok(())
    }

    /// Remove the piece at (x, y), if any. Only valid in SETUP.
    pub fn remove_piece(&mut self, x: i16, y: i16) -> Result<(), EngineError> {
        self.require_setup()?;
        if self.board.remove_piece(x, y)?.is_some() {
            self.notify(ChangeEvent::PieceRemoved { x, y });
        }
        Ok(())
    }

    /// Toggle the piece at (x, y). Only valid in SETUP.
    ///
    /// Flippable pieces are removed and re-placed with the opposite
    /// orientation, re-running placement validation. A gear bit is
    /// *not* re-placed — that would rebuild its adjacency from scratch
    /// and could cascade rotation changes through the whole chain —
    /// instead its set is turned in place, preserving membership.
    /// Other kinds, and empty cells, are a no-op.
    pub fn toggle_piece(&mut self, x: i16, y: i16) -> Result<(), EngineError> {
        self.require_setup()?;
        let Some(piece) = self.board.piece_at(x, y)? else {
            return Ok(());
        };
        match piece.kind {
            PieceKind::Ramp(_) | PieceKind::Bit(_) => {
                self.board.remove_piece(x, y)?;
                self.board.place_piece(piece.flipped())?;
            }
            PieceKind::GearBit(_) => {
                self.board.turn_gear_at(x, y)?;
            }
            PieceKind::Crossover | PieceKind::Interceptor | PieceKind::NormalGear(_) => {
                return Ok(());
            }
        }
        self.notify(ChangeEvent::PieceToggled { x, y });
        Ok(())
    }

    /// Request the `play` transition
    pub fn play(&mut self) -> Result<(), EngineError> {
        self.transition(StateTransition::Play)
    }

    /// Request the `pause` transition
    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.transition(StateTransition::Pause)
    }

    /// Request the `stop` transition. A pure state change: the board,
    /// queues, and tick counter are left as they are.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.transition(StateTransition::Stop)
    }

    /// Force the FROZEN state and execute exactly one tick
    pub fn step(&mut self) -> Result<(), EngineError> {
        self.transition(StateTransition::Step)?;
        self.tick()?;
        self.notify(ChangeEvent::Stepped {
            tick: self.current_tick,
        });
        Ok(())
    }

    /// Drive ticks while RUNNING. Terminates: every tick either moves
    /// the ball strictly downward or consumes a queued ball, and the
    /// terminal transition fires when the queues run dry or an
    /// interceptor is hit.
    pub fn run(&mut self) -> Result<(), EngineError> {
        while self.state == EngineState::Running {
            self.tick()?;
            self.notify(ChangeEvent::Stepped {
                tick: self.current_tick,
            });
        }
        Ok(())
    }

    /// Register an observer. Returns a handle for [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&mut self, callback: ObserverCallback) -> ObserverId {
        let id = self.next_observer_id;
        self.next_observer_id += 1;
        self.observers.push(Observer { id, callback });
        id
    }

    /// Drop an observer. Returns whether the handle was known.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id != id);
        self.observers.len() != before
    }

    /// Invoke every observer with the event. The list is taken out of
    /// the engine for the duration, so callbacks that re-enter
    /// `subscribe`/`unsubscribe` cannot corrupt the iteration; such
    /// re-entrant registrations are dropped when the list is restored.
    fn notify(&mut self, event: ChangeEvent) {
        let mut observers = std::mem::take(&mut self.observers);
        for observer in &mut observers {
            (observer.callback)(event);
        }
        self.observers = observers;
    }

    fn require_setup(&self) -> Result<(), EngineError> {
        if self.state == EngineState::Setup {
            Ok(())
        } else {
            Err(EngineError::WrongPhaseOperation { state: self.state })
        }
    }

    fn transition(&mut self, transition: StateTransition) -> Result<(), EngineError> {
        match transition_target(self.state, transition) {
            Some(next) => {
                debug!(
                    "transition '{}': {} -> {}",
                    transition.as_str(),
                    self.state.as_str(),
                    next.as_str()
                );
                self.state = next;
                Ok(())
            }
            None => {
                warn!(
                    "rejected transition '{}' from state {}",
                    transition.as_str(),
                    self.state.as_str()
                );
                Err(EngineError::IllegalStateTransition {
                    from: self.state,
                    transition,
                })
            }
        }
    }

    /// Advance the simulation by one ball-step.
    ///
    /// Tick 0 only drops the first ball from the configured start side;
    /// there is no piece interaction on the entry tick. Later ticks
    /// dispatch on the active ball's cell type.
    fn tick(&mut self) -> Result<(), EngineError> {
        if self.current_tick == 0 {
            let side = self.board.start_side();
            if !self.drop_next_ball(side) {
                // Nothing to play with
                let _ = self.transition(StateTransition::TerminalState);
            }
            self.current_tick += 1;
            return Ok(());
        }

        let Some(ball) = self.active else {
            // No ball in transit and nothing scheduled: the run is over
            let _ = self.transition(StateTransition::TerminalState);
            self.current_tick += 1;
            return Ok(());
        };

        let (bx, by) = (ball.x, ball.y);
        match self.board.cell_type(bx, by)? {
            CellType::SlotPeg => {
                let piece = self
                    .board
                    .piece_at(bx, by)?
                    .ok_or(EngineError::NoPieceAtSlot { x: bx, y: by })?;
                if piece.kind == PieceKind::Interceptor {
                    // The whole run ends; the intercepted ball never
                    // reaches the finished list
                    self.transition(StateTransition::TerminalState)?;
                } else {
                    if let Some(active) = self.active.as_mut() {
                        piece.handle_ball(active)?;
                    }
                    if matches!(piece.kind, PieceKind::GearBit(_)) {
                        // The gear train advances one step as a side
                        // effect of the ball passing through
                        self.board.turn_gear_at(bx, by)?;
                    }
                }
            }
            cell @ (CellType::LeftExit | CellType::RightExit) => {
                if let Some(done) = self.active.take() {
                    self.finished.push(done);
                }
                let side = if cell == CellType::LeftExit {
                    Side::Left
                } else {
                    Side::Right
                };
                if !self.drop_next_ball(side) {
                    self.transition(StateTransition::TerminalState)?;
                }
            }
            cell => {
                // Unreachable under correct grid construction
                return Err(EngineError::InvalidBallPosition {
                    x: bx,
                    y: by,
                    cell,
                });
            }
        }

        self.current_tick += 1;
        Ok(())
    }

    /// Pop the next ball from the given side's queue and drop it in at
    /// that side's entry column. Returns false if the queue was empty.
    fn drop_next_ball(&mut self, side: Side) -> bool {
        debug_assert!(self.active.is_none(), "at most one active ball");
        let (queue, entry_x) = match side {
            Side::Left => (&mut self.left_start_queue, self.board.left_entry_x()),
            Side::Right => (&mut self.right_start_queue, self.board.right_entry_x()),
        };
        match queue.pop() {
            Some(mut ball) => {
                // Entry sets the position directly: `move_to` would
                // clobber the side sentinel in `prev_x`, and a crossover
                // sitting on the entry cell needs it intact
                ball.x = entry_x;
                ball.y = 0;
                self.active = Some(ball);
                true
            }
            None => false,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        match Self::new(EngineConfig::default()) {
            Ok(engine) => engine,
            Err(_) => unreachable!("default engine configuration is valid"),
        }
    }
}

fn populate_queue(colour: BallColour, count: usize) -> Vec<Ball> {
    (0..count).map(|_| Ball::new(colour)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Orientation;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine() -> Engine {
        Engine::default()
    }

    #[test]
    fn test_new_engine_reaches_setup() {
        let engine = engine();
        assert_eq!(engine.state(), EngineState::Setup);
        assert_eq!(engine.current_tick(), 0);
        assert_eq!(engine.left_queue_len(), DEFAULT_BALLS_PER_SIDE);
        assert_eq!(engine.right_queue_len(), DEFAULT_BALLS_PER_SIDE);
        assert!(engine.active_ball().is_none());
        assert!(engine.finished_balls().is_empty());
    }

    #[test]
    fn test_transition_table() {
        use EngineState::*;
        use StateTransition::*;
        assert_eq!(transition_target(Init, InitDone), Some(Setup));
        assert_eq!(transition_target(Setup, Play), Some(Running));
        assert_eq!(transition_target(Setup, Step), Some(Frozen));
        assert_eq!(transition_target(Running, Pause), Some(Frozen));
        assert_eq!(transition_target(Running, Stop), Some(Setup));
        assert_eq!(transition_target(Running, TerminalState), Some(Finished));
        assert_eq!(transition_target(Frozen, Play), Some(Running));
        assert_eq!(transition_target(Frozen, Stop), Some(Setup));
        assert_eq!(transition_target(Frozen, Step), Some(Frozen));
        assert_eq!(transition_target(Frozen, TerminalState), Some(Finished));
        assert_eq!(transition_target(Finished, Stop), Some(Setup));
        // A sample of the rejected ones
        assert_eq!(transition_target(Init, Play), None);
        assert_eq!(transition_target(Setup, Pause), None);
        assert_eq!(transition_target(Running, Step), None);
        assert_eq!(transition_target(Finished, Play), None);
    }

    #[test]
    fn test_illegal_transition_leaves_state_unchanged() {
        let mut engine = engine();
        let err = engine.pause();
        assert_eq!(
            err,
            Err(EngineError::IllegalStateTransition {
                from: EngineState::Setup,
                transition: StateTransition::Pause,
            })
        );
        assert_eq!(engine.state(), EngineState::Setup);
    }

    #[test]
    fn test_play_then_stop_round_trip() {
        let mut engine = engine();
        engine.play().unwrap();
        assert_eq!(engine.state(), EngineState::Running);
        engine.stop().unwrap();
        assert_eq!(engine.state(), EngineState::Setup);
    }

    #[test]
    fn test_mutation_rejected_outside_setup() {
        let mut engine = engine();
        engine.play().unwrap();
        assert_eq!(
            engine.add_piece(Piece::ramp(3, 2, Orientation::Left)),
            Err(EngineError::WrongPhaseOperation {
                state: EngineState::Running
            })
        );
        assert_eq!(
            engine.remove_piece(3, 2),
            Err(EngineError::WrongPhaseOperation {
                state: EngineState::Running
            })
        );
        assert_eq!(
            engine.toggle_piece(3, 2),
            Err(EngineError::WrongPhaseOperation {
                state: EngineState::Running
            })
        );
    }

    #[test]
    fn test_step_forces_frozen_and_drops_first_ball() {
        let mut engine = engine();
        engine.step().unwrap();
        assert_eq!(engine.state(), EngineState::Frozen);
        assert_eq!(engine.current_tick(), 1);

        let ball = engine.active_ball().expect("ball in play");
        assert_eq!(ball.colour, BallColour::Red);
        assert_eq!((ball.x, ball.y), (engine.board().left_entry_x(), 0));
        assert_eq!(engine.left_queue_len(), DEFAULT_BALLS_PER_SIDE - 1);
    }

    #[test]
    fn test_toggle_flips_ramp_in_place() {
        let mut engine = engine();
        engine.add_piece(Piece::ramp(3, 2, Orientation::Left)).unwrap();
        engine.toggle_piece(3, 2).unwrap();
        assert_eq!(
            engine.board().piece_at(3, 2).unwrap(),
            Some(Piece::ramp(3, 2, Orientation::Right))
        );
        engine.toggle_piece(3, 2).unwrap();
        assert_eq!(
            engine.board().piece_at(3, 2).unwrap(),
            Some(Piece::ramp(3, 2, Orientation::Left))
        );
    }

    #[test]
    fn test_toggle_gear_bit_turns_whole_set() {
        use crate::types::GearRotation;
        let mut engine = engine();
        engine
            .add_piece(Piece::gear_bit(5, 4, GearRotation::Clockwise))
            .unwrap();
        engine
            .add_piece(Piece::normal_gear(4, 4, GearRotation::Clockwise))
            .unwrap();

        engine.toggle_piece(5, 4).unwrap();
        let bit = engine.board().piece_at(5, 4).unwrap().unwrap();
        let gear = engine.board().piece_at(4, 4).unwrap().unwrap();
        assert_eq!(bit.kind, PieceKind::GearBit(GearRotation::Counterclockwise));
        assert_eq!(gear.kind, PieceKind::NormalGear(GearRotation::Clockwise));
        // Membership untouched
        assert_eq!(engine.board().gears().sets().count(), 1);
    }

    #[test]
    fn test_toggle_empty_and_inert_cells_is_noop() {
        let mut engine = engine();
        engine.toggle_piece(3, 2).unwrap();
        engine.add_piece(Piece::crossover(5, 2)).unwrap();
        engine.toggle_piece(5, 2).unwrap();
        assert_eq!(
            engine.board().piece_at(5, 2).unwrap(),
            Some(Piece::crossover(5, 2))
        );
    }

    #[test]
    fn test_observers_notified_once_per_mutation() {
        let mut engine = engine();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let id = engine.subscribe(Box::new(move |event| sink.borrow_mut().push(event)));

        engine.add_piece(Piece::ramp(3, 2, Orientation::Left)).unwrap();
        engine.toggle_piece(3, 2).unwrap();
        engine.remove_piece(3, 2).unwrap();
        // Removing an empty cell commits nothing
        engine.remove_piece(3, 2).unwrap();
        engine.step().unwrap();

        assert_eq!(
            *events.borrow(),
            vec![
                ChangeEvent::PieceAdded { x: 3, y: 2 },
                ChangeEvent::PieceToggled { x: 3, y: 2 },
                ChangeEvent::PieceRemoved { x: 3, y: 2 },
                ChangeEvent::Stepped { tick: 1 },
            ]
        );

        assert!(engine.unsubscribe(id));
        assert!(!engine.unsubscribe(id));
        engine.stop().unwrap();
        engine.add_piece(Piece::ramp(3, 2, Orientation::Left)).unwrap();
        assert_eq!(events.borrow().len(), 4);
    }

    #[test]
    fn test_empty_queues_finish_immediately() {
        let config = EngineConfig {
            red_balls: 0,
            blue_balls: 0,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(config).unwrap();
        engine.step().unwrap();
        assert_eq!(engine.state(), EngineState::Finished);
    }
}
