use crate::piece::{ActivePiece, BLOCK_BONUS, Shape};
use crate::{COLS, ROWS};

pub const CELL_EMPTY: u8 = 0;
pub const CELL_BONUS: u8 = 8;

/// Outcome of one line-clear scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineClear {
    pub lines: u32,
    /// Cleared rows that held at least one bonus cell.
    pub bonus_rows: u32,
}

/// Locked blocks, row 0 at the top. Cells are `CELL_EMPTY`, a piece color id
/// (1-7) or `CELL_BONUS`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    cells: [[u8; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [[CELL_EMPTY; COLS]; ROWS],
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> u8 {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, code: u8) {
        self.cells[row][col] = code;
    }

    pub fn rows(&self) -> &[[u8; COLS]; ROWS] {
        &self.cells
    }

    /// Row-major copy of every cell, for the renderer.
    pub fn field(&self) -> Vec<u8> {
        self.cells.iter().flatten().copied().collect()
    }

    /// Whether `shape` with its top-left at (`x`, `y`) stays inside the side
    /// walls and the floor without overlapping a locked cell. Cells above
    /// row 0 are allowed.
    pub fn is_valid_placement(&self, x: i32, y: i32, shape: &Shape) -> bool {
        for (dx, dy, _) in shape.blocks() {
            let bx = x + dx;
            let by = y + dy;
            if bx < 0 || bx >= COLS as i32 {
                return false;
            }
            if by >= ROWS as i32 {
                return false;
            }
            if by >= 0 && self.cells[by as usize][bx as usize] != CELL_EMPTY {
                return false;
            }
        }
        true
    }

    pub fn fits(&self, piece: &ActivePiece) -> bool {
        self.is_valid_placement(piece.x, piece.y, &piece.shape)
    }

    /// Rows the piece can still fall before landing.
    pub fn drop_distance(&self, piece: &ActivePiece) -> i32 {
        let mut dist = 0;
        while self.is_valid_placement(piece.x, piece.y + dist + 1, &piece.shape) {
            dist += 1;
        }
        dist
    }

    pub fn lock_piece(&mut self, piece: &ActivePiece) {
        let color = piece.kind.color_id();
        for (dx, dy, block) in piece.shape.blocks() {
            let bx = piece.x + dx;
            let by = piece.y + dy;
            if bx >= 0 && bx < COLS as i32 && by >= 0 && by < ROWS as i32 {
                self.cells[by as usize][bx as usize] =
                    if block == BLOCK_BONUS { CELL_BONUS } else { color };
            }
        }
    }

    /// Removes every full row, bottom to top, dropping the rows above it and
    /// opening an empty row at the top each time.
    pub fn clear_full_lines(&mut self) -> LineClear {
        let mut clear = LineClear::default();
        let mut y = ROWS;
        while y > 0 {
            let row = y - 1;
            if self.cells[row].iter().all(|&c| c != CELL_EMPTY) {
                clear.lines += 1;
                if self.cells[row].contains(&CELL_BONUS) {
                    clear.bonus_rows += 1;
                }
                for pull in (1..=row).rev() {
                    self.cells[pull] = self.cells[pull - 1];
                }
                self.cells[0] = [CELL_EMPTY; COLS];
                // same index again: it now holds the row that was above
            } else {
                y -= 1;
            }
        }
        clear
    }
}
