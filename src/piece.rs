use serde::{Deserialize, Serialize};

pub const BLOCK_EMPTY: u8 = 0;
pub const BLOCK_NORMAL: u8 = 1;
pub const BLOCK_BONUS: u8 = 2;

pub const BONUS_COLOR: &str = "gold";

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum Tetromino {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl Tetromino {
    pub fn all() -> [Tetromino; 7] {
        [
            Tetromino::I,
            Tetromino::J,
            Tetromino::L,
            Tetromino::O,
            Tetromino::S,
            Tetromino::T,
            Tetromino::Z,
        ]
    }

    /// Grid code written for this kind's normal cells when it locks.
    pub fn color_id(self) -> u8 {
        match self {
            Tetromino::I => 1,
            Tetromino::J => 2,
            Tetromino::L => 3,
            Tetromino::O => 4,
            Tetromino::S => 5,
            Tetromino::T => 6,
            Tetromino::Z => 7,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Tetromino::I => "cyan",
            Tetromino::J => "blue",
            Tetromino::L => "orange",
            Tetromino::O => "yellow",
            Tetromino::S => "lime",
            Tetromino::T => "purple",
            Tetromino::Z => "red",
        }
    }

    fn catalog(self) -> &'static [&'static [u8]] {
        match self {
            Tetromino::I => &[&[1, 1, 1, 1]],
            Tetromino::J => &[&[1, 0, 0], &[1, 1, 1]],
            Tetromino::L => &[&[0, 0, 1], &[1, 1, 1]],
            Tetromino::O => &[&[1, 1], &[1, 1]],
            Tetromino::S => &[&[0, 1, 1], &[1, 1, 0]],
            Tetromino::T => &[&[0, 1, 0], &[1, 1, 1]],
            Tetromino::Z => &[&[1, 1, 0], &[0, 1, 1]],
        }
    }

    /// Fresh copy of the spawn-orientation shape.
    pub fn shape(self) -> Shape {
        Shape::from_rows(self.catalog().iter().map(|row| row.to_vec()).collect())
    }
}

/// Rectangular matrix of block kinds (`BLOCK_EMPTY`, `BLOCK_NORMAL`, `BLOCK_BONUS`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    rows: Vec<Vec<u8>>,
}

impl Shape {
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Self {
        debug_assert!(!rows.is_empty() && rows.iter().all(|r| r.len() == rows[0].len()));
        Self { rows }
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.rows[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, block: u8) {
        self.rows[row][col] = block;
    }

    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }

    /// Occupied cells as `(dx, dy, block)` relative to the bounding box's top-left.
    pub fn blocks(&self) -> impl Iterator<Item = (i32, i32, u8)> + '_ {
        self.rows.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &b)| b != BLOCK_EMPTY)
                .map(move |(x, &b)| (x as i32, y as i32, b))
        })
    }

    pub fn has_bonus(&self) -> bool {
        self.blocks().any(|(_, _, b)| b == BLOCK_BONUS)
    }

    /// 90° clockwise: an R×C matrix becomes C×R, block kinds carried over.
    pub fn rotated_cw(&self) -> Shape {
        let h = self.height();
        let w = self.width();
        let mut rows = vec![vec![BLOCK_EMPTY; h]; w];
        for y in 0..h {
            for x in 0..w {
                rows[x][h - 1 - y] = self.rows[y][x];
            }
        }
        Shape { rows }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivePiece {
    pub kind: Tetromino,
    pub shape: Shape,
    /// Rotation-state index, 0-3.
    pub rotation: u8,
    pub x: i32,
    pub y: i32,
}

impl ActivePiece {
    pub fn new(kind: Tetromino, shape: Shape, x: i32) -> Self {
        Self {
            kind,
            shape,
            rotation: 0,
            x,
            y: 0,
        }
    }

    pub fn color(&self) -> &'static str {
        self.kind.color()
    }

    pub fn has_bonus(&self) -> bool {
        self.shape.has_bonus()
    }

    pub fn moved(&self, dx: i32, dy: i32) -> ActivePiece {
        ActivePiece {
            x: self.x + dx,
            y: self.y + dy,
            ..self.clone()
        }
    }
}
