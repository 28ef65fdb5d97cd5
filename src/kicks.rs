use crate::board::Board;
use crate::piece::{ActivePiece, Tetromino};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KickClass {
    Long,
    Standard,
}

impl From<Tetromino> for KickClass {
    fn from(t: Tetromino) -> Self {
        match t {
            Tetromino::I => KickClass::Long,
            _ => KickClass::Standard,
        }
    }
}

// Offsets are in grid coordinates (y grows downward), keyed by the rotation
// state the piece is leaving.
const LONG: [[(i32, i32); 5]; 4] = [
    [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)],
    [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)],
    [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)],
    [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)],
];

const STANDARD: [[(i32, i32); 5]; 4] = [
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
];

pub struct KickTable;

impl KickTable {
    /// Ordered candidates to try after a clockwise rotation out of `rotation`.
    pub fn kicks(class: KickClass, rotation: u8) -> &'static [(i32, i32); 5] {
        let idx = (rotation % 4) as usize;
        match class {
            KickClass::Long => &LONG[idx],
            KickClass::Standard => &STANDARD[idx],
        }
    }
}

/// Clockwise rotation with wall kicks. Returns the first placement the board
/// accepts, or `None` when every candidate is blocked.
pub fn rotate(board: &Board, piece: &ActivePiece) -> Option<ActivePiece> {
    let shape = piece.shape.rotated_cw();
    KickTable::kicks(piece.kind.into(), piece.rotation)
        .iter()
        .find(|&&(dx, dy)| board.is_valid_placement(piece.x + dx, piece.y + dy, &shape))
        .map(|&(dx, dy)| ActivePiece {
            kind: piece.kind,
            rotation: (piece.rotation + 1) % 4,
            x: piece.x + dx,
            y: piece.y + dy,
            shape,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_i_at_left_wall() -> ActivePiece {
        ActivePiece {
            kind: Tetromino::I,
            shape: Tetromino::I.shape().rotated_cw(),
            rotation: 1,
            x: 0,
            y: 5,
        }
    }

    #[test]
    fn long_class_is_only_the_i_piece() {
        assert_eq!(KickClass::from(Tetromino::I), KickClass::Long);
        for t in [Tetromino::J, Tetromino::L, Tetromino::O, Tetromino::S, Tetromino::T, Tetromino::Z] {
            assert_eq!(KickClass::from(t), KickClass::Standard);
        }
    }

    #[test]
    fn every_list_tries_in_place_first() {
        for rot in 0..4 {
            assert_eq!(KickTable::kicks(KickClass::Long, rot)[0], (0, 0));
            assert_eq!(KickTable::kicks(KickClass::Standard, rot)[0], (0, 0));
        }
        assert_eq!(
            KickTable::kicks(KickClass::Long, 0),
            &[(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)]
        );
        assert_eq!(
            KickTable::kicks(KickClass::Standard, 3),
            &[(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)]
        );
    }

    #[test]
    fn open_rotation_uses_no_kick() {
        let board = Board::new();
        let piece = ActivePiece::new(Tetromino::T, Tetromino::T.shape(), 4);
        let rotated = rotate(&board, &piece).unwrap();
        assert_eq!((rotated.x, rotated.y, rotated.rotation), (4, 0, 1));
        assert_eq!((rotated.shape.width(), rotated.shape.height()), (2, 3));
    }

    #[test]
    fn four_rotations_cycle_state_and_shape() {
        let board = Board::new();
        let start = ActivePiece::new(Tetromino::L, Tetromino::L.shape(), 4).moved(0, 5);
        let mut piece = start.clone();
        for _ in 0..4 {
            piece = rotate(&board, &piece).unwrap();
        }
        assert_eq!(piece.rotation, 0);
        assert_eq!(piece.shape, start.shape);
    }

    #[test]
    fn i_piece_kicks_off_left_wall_stack() {
        let mut board = Board::new();
        board.set(5, 1, 3);
        let piece = vertical_i_at_left_wall();

        let rotated = rotate(&board, &piece).unwrap();
        // (0,0) and (-1,0) are blocked, (2,0) is the first legal candidate
        assert_eq!((rotated.x, rotated.y), (2, 5));
        assert_eq!(rotated.rotation, 2);
        assert!(board.fits(&rotated));
    }

    #[test]
    fn blocked_rotation_returns_none() {
        let mut board = Board::new();
        board.set(5, 3, 3);
        board.set(4, 3, 3);
        let piece = vertical_i_at_left_wall();
        assert!(rotate(&board, &piece).is_none());
    }
}
