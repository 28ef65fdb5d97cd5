use serde::{Deserialize, Serialize};
use tsify::Tsify;

use crate::board::Board;
use crate::kicks;
use crate::log;
use crate::piece::{ActivePiece, BONUS_COLOR, Tetromino};
use crate::scoring::{Scoring, SpeedCurve, THEMES};
use crate::spawner::{BonusPolicy, Spawner, SpawnerKind};
use crate::{COLS, ROWS};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub speed: SpeedCurve,
    pub bonus: BonusPolicy,
    /// Points for each cleared row holding a bonus block.
    pub bonus_points: u32,
    pub spawner: SpawnerKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            speed: SpeedCurve::default(),
            bonus: BonusPolicy::default(),
            bonus_points: 100,
            spawner: SpawnerKind::TrueRandom,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Tsify, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GameState {
    Running,
    Paused,
    GameOver,
}

/// Player commands. Also accepts the short key-handler names.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    #[serde(alias = "left")]
    MoveLeft,
    #[serde(alias = "right")]
    MoveRight,
    #[serde(alias = "down")]
    SoftDrop,
    Rotate,
    #[serde(alias = "drop")]
    HardDrop,
    Pause,
}

/// Discrete notifications for the UI and audio layers, drained once per frame.
#[derive(Clone, Serialize, Tsify, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameEvent {
    ScoreChanged {
        score: u32,
    },
    #[serde(rename_all = "camelCase")]
    LevelChanged {
        level: u32,
        theme_index: usize,
    },
    LinesCleared {
        count: u32,
        tetris: bool,
    },
    #[serde(rename_all = "camelCase")]
    GameOver {
        final_score: u32,
    },
    PauseChanged {
        paused: bool,
    },
    NextPiece {
        piece: Tetromino,
    },
    PieceMoved,
    PieceRotated,
    PieceLocked,
}

#[derive(Clone, Serialize, Tsify, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PieceView {
    pub kind: Tetromino,
    pub shape: Vec<Vec<u8>>,
    pub color: String,
    pub x: i32,
    pub y: i32,
    pub rotation: u8,
}

impl From<&ActivePiece> for PieceView {
    fn from(p: &ActivePiece) -> Self {
        Self {
            kind: p.kind,
            shape: p.shape.rows().to_vec(),
            color: p.color().to_string(),
            x: p.x,
            y: p.y,
            rotation: p.rotation,
        }
    }
}

#[derive(Clone, Serialize, Tsify, Debug, PartialEq)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct FrameView {
    pub rows: usize,
    pub cols: usize,
    /// Row-major grid codes, row 0 first.
    pub field: Vec<u8>,
    /// Fill for bonus cells, both code 8 in `field` and 2 in piece shapes.
    pub bonus_color: String,
    pub active: PieceView,
    pub shadow_y: i32,
    pub next: PieceView,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub interval_ms: u32,
    pub state: GameState,
    pub theme_index: usize,
    pub theme: String,
    pub events: Vec<GameEvent>,
}

/// One game from first spawn to game over. All engine state lives here and is
/// mutated only through these methods.
pub struct Session {
    config: EngineConfig,
    board: Board,
    spawner: Spawner,
    current: ActivePiece,
    next: ActivePiece,
    scoring: Scoring,
    state: GameState,
    fall_accum: f32,
    events: Vec<GameEvent>,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        let spawner = Spawner::new(config.spawner.clone(), config.bonus);
        Self::with_spawner(config, spawner)
    }

    pub fn seeded(config: EngineConfig, seed: u64) -> Self {
        let spawner = Spawner::seeded(config.spawner.clone(), config.bonus, seed);
        Self::with_spawner(config, spawner)
    }

    fn with_spawner(config: EngineConfig, mut spawner: Spawner) -> Self {
        let current = spawner.next();
        let next = spawner.next();
        let mut session = Self {
            scoring: Scoring::new(config.speed, config.bonus_points),
            config,
            board: Board::new(),
            spawner,
            current,
            next,
            state: GameState::Running,
            fall_accum: 0.0,
            events: Vec::new(),
        };
        session.announce_start();
        session
    }

    /// Throws away the current game and starts over from an empty grid.
    pub fn restart(&mut self) {
        self.board = Board::new();
        self.scoring = Scoring::new(self.config.speed, self.config.bonus_points);
        self.current = self.spawner.next();
        self.next = self.spawner.next();
        self.state = GameState::Running;
        self.fall_accum = 0.0;
        self.events.clear();
        self.announce_start();
    }

    fn announce_start(&mut self) {
        self.events.extend([
            GameEvent::ScoreChanged { score: 0 },
            GameEvent::LevelChanged {
                level: 1,
                theme_index: 0,
            },
            GameEvent::PauseChanged { paused: false },
            GameEvent::NextPiece {
                piece: self.next.kind,
            },
        ]);
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current(&self) -> &ActivePiece {
        &self.current
    }

    pub fn next_piece(&self) -> &ActivePiece {
        &self.next
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == GameState::Running
    }

    pub fn current_score(&self) -> u32 {
        self.scoring.score()
    }

    pub fn level(&self) -> u32 {
        self.scoring.level()
    }

    pub fn lines_cleared(&self) -> u32 {
        self.scoring.lines()
    }

    pub fn fall_interval_ms(&self) -> u32 {
        self.scoring.interval_ms()
    }

    /// Row the current piece would land on if dropped straight down.
    pub fn shadow_y(&self) -> i32 {
        self.current.y + self.board.drop_distance(&self.current)
    }

    /// Advances the fall timer by `dt_ms`; once a full interval has built up
    /// the piece falls one row, or locks if it cannot.
    pub fn tick(&mut self, dt_ms: f32) {
        if !self.is_running() {
            return;
        }
        self.fall_accum += dt_ms.max(0.0);
        if self.fall_accum < self.scoring.interval_ms() as f32 {
            return;
        }
        self.fall_accum = 0.0;
        if !self.try_shift(0, 1) {
            self.settle();
        }
    }

    pub fn handle(&mut self, action: Action) {
        match action {
            Action::MoveLeft => {
                self.move_left();
            }
            Action::MoveRight => {
                self.move_right();
            }
            Action::SoftDrop => {
                self.soft_drop();
            }
            Action::Rotate => {
                self.rotate();
            }
            Action::HardDrop => {
                self.hard_drop();
            }
            Action::Pause => self.toggle_pause(),
        }
    }

    pub fn move_left(&mut self) -> bool {
        self.shift_by_player(-1)
    }

    pub fn move_right(&mut self) -> bool {
        self.shift_by_player(1)
    }

    fn shift_by_player(&mut self, dx: i32) -> bool {
        if !self.is_running() || !self.try_shift(dx, 0) {
            return false;
        }
        self.events.push(GameEvent::PieceMoved);
        true
    }

    pub fn rotate(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        match kicks::rotate(&self.board, &self.current) {
            Some(rotated) => {
                self.current = rotated;
                self.events.push(GameEvent::PieceRotated);
                true
            }
            None => false,
        }
    }

    /// One row down, restarting the fall timer. A blocked soft drop locks the
    /// piece at once; returns whether the piece moved.
    pub fn soft_drop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        if self.try_shift(0, 1) {
            self.fall_accum = 0.0;
            true
        } else {
            self.settle();
            false
        }
    }

    /// Drops to the shadow row, scoring a point per row, and locks.
    pub fn hard_drop(&mut self) -> u32 {
        if !self.is_running() {
            return 0;
        }
        let rows = self.board.drop_distance(&self.current);
        self.current.y += rows;
        if rows > 0 {
            self.scoring.add_drop_points(rows as u32);
            self.events.push(GameEvent::ScoreChanged {
                score: self.scoring.score(),
            });
        }
        self.settle();
        rows as u32
    }

    pub fn toggle_pause(&mut self) {
        self.state = match self.state {
            GameState::Running => GameState::Paused,
            GameState::Paused => {
                // no catch-up fall right after resuming
                self.fall_accum = 0.0;
                GameState::Running
            }
            GameState::GameOver => return,
        };
        self.events.push(GameEvent::PauseChanged {
            paused: self.state == GameState::Paused,
        });
    }

    fn try_shift(&mut self, dx: i32, dy: i32) -> bool {
        let test = self.current.moved(dx, dy);
        if !self.board.fits(&test) {
            return false;
        }
        self.current = test;
        true
    }

    /// Lock, clear, then bring in the next piece.
    fn settle(&mut self) {
        self.board.lock_piece(&self.current);
        self.events.push(GameEvent::PieceLocked);

        let clear = self.board.clear_full_lines();
        if let Some(outcome) = self.scoring.award(clear) {
            self.events.push(GameEvent::ScoreChanged {
                score: self.scoring.score(),
            });
            if let Some(level) = outcome.level_up {
                log(&format!("level up: {level}"));
                self.events.push(GameEvent::LevelChanged {
                    level,
                    theme_index: self.scoring.theme_index(),
                });
            }
            self.events.push(GameEvent::LinesCleared {
                count: outcome.lines,
                tetris: outcome.tetris,
            });
        }
        self.spawn_next();
    }

    fn spawn_next(&mut self) {
        let following = self.spawner.next();
        self.current = std::mem::replace(&mut self.next, following);
        self.fall_accum = 0.0;
        self.events.push(GameEvent::NextPiece {
            piece: self.next.kind,
        });
        if !self.board.fits(&self.current) {
            self.state = GameState::GameOver;
            log(&format!("game over at {} points", self.scoring.score()));
            self.events.push(GameEvent::GameOver {
                final_score: self.scoring.score(),
            });
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Render state plus every event queued since the last frame.
    pub fn frame(&mut self) -> FrameView {
        let events = self.drain_events();
        FrameView {
            events,
            ..self.snapshot()
        }
    }

    pub fn snapshot(&self) -> FrameView {
        let theme_index = self.scoring.theme_index();
        FrameView {
            rows: ROWS,
            cols: COLS,
            field: self.board.field(),
            bonus_color: BONUS_COLOR.to_string(),
            active: PieceView::from(&self.current),
            shadow_y: self.shadow_y(),
            next: PieceView::from(&self.next),
            score: self.scoring.score(),
            level: self.scoring.level(),
            lines: self.scoring.lines(),
            interval_ms: self.scoring.interval_ms(),
            state: self.state,
            theme_index,
            theme: THEMES[theme_index].to_string(),
            events: Vec::new(),
        }
    }
}
