use serde_wasm_bindgen::from_value;
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use web_sys::console;

pub mod board;
pub mod kicks;
#[cfg(not(target_arch = "wasm32"))]
pub mod leaderboard;
pub mod piece;
pub mod scoring;
pub mod session;
pub mod spawner;

pub use board::Board;
pub use piece::{ActivePiece, Shape, Tetromino};
pub use session::{Action, EngineConfig, FrameView, GameEvent, GameState, Session};

pub const COLS: usize = 10;
pub const ROWS: usize = 20;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
}

pub(crate) fn log(msg: &str) {
    #[cfg(target_arch = "wasm32")]
    console::log_1(&JsValue::from_str(msg));
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("{msg}");
}

/// Browser handle on one game session. The page calls `frame` from
/// `requestAnimationFrame` and forwards key presses to `handleInput`.
#[wasm_bindgen]
pub struct GameClient {
    session: Session,
    last_time: Option<f64>,
}

#[wasm_bindgen]
impl GameClient {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> GameClient {
        let config: EngineConfig = from_value(config).unwrap_or_default();
        Self {
            session: Session::new(config),
            last_time: None,
        }
    }

    /// Advances by the time elapsed since the previous call. The first call
    /// after construction, restart or resume only records the timestamp.
    #[wasm_bindgen(js_name = frame)]
    pub fn frame(&mut self, now_ms: f64) -> FrameView {
        let dt = self.last_time.map_or(0.0, |last| (now_ms - last).max(0.0));
        self.last_time = Some(now_ms);
        self.session.tick(dt as f32);
        self.session.frame()
    }

    #[wasm_bindgen(js_name = tick)]
    pub fn tick(&mut self, dt_ms: f32) -> FrameView {
        self.session.tick(dt_ms);
        self.session.frame()
    }

    #[wasm_bindgen(js_name = handleInput)]
    pub fn handle_input(&mut self, action: JsValue) -> Result<FrameView, JsValue> {
        let action: Action = from_value(action)
            .map_err(|e| js_sys::Error::new(&format!("unknown action: {e}")))?;
        self.session.handle(action);
        if action == Action::Pause {
            self.last_time = None;
        }
        Ok(self.session.frame())
    }

    #[wasm_bindgen(js_name = togglePause)]
    pub fn toggle_pause(&mut self) -> FrameView {
        self.session.toggle_pause();
        self.last_time = None;
        self.session.frame()
    }

    pub fn restart(&mut self) -> FrameView {
        self.session.restart();
        self.last_time = None;
        self.session.frame()
    }

    pub fn snapshot(&self) -> FrameView {
        self.session.snapshot()
    }

    #[wasm_bindgen(js_name = currentScore)]
    pub fn current_score(&self) -> u32 {
        self.session.current_score()
    }

    #[wasm_bindgen(js_name = isGameOver)]
    pub fn is_game_over(&self) -> bool {
        self.session.state() == GameState::GameOver
    }

    #[wasm_bindgen(js_name = isPaused)]
    pub fn is_paused(&self) -> bool {
        self.session.state() == GameState::Paused
    }
}
