use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::COLS;
use crate::piece::{ActivePiece, BLOCK_BONUS, BLOCK_NORMAL, Tetromino};

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub enum SpawnerKind {
    #[default]
    TrueRandom,
    SinglePiece { piece: Tetromino },
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct BonusPolicy {
    /// Chance that a new piece tries to carry a bonus block.
    pub chance: f64,
    /// Random cell picks before giving up on this piece.
    pub attempts: u32,
}

impl Default for BonusPolicy {
    fn default() -> Self {
        Self {
            chance: 0.15,
            attempts: 10,
        }
    }
}

pub struct Spawner {
    kind: SpawnerKind,
    bonus: BonusPolicy,
    rng: StdRng,
}

impl Spawner {
    pub fn new(kind: SpawnerKind, bonus: BonusPolicy) -> Self {
        Self::with_rng(kind, bonus, StdRng::from_entropy())
    }

    pub fn seeded(kind: SpawnerKind, bonus: BonusPolicy, seed: u64) -> Self {
        Self::with_rng(kind, bonus, StdRng::seed_from_u64(seed))
    }

    fn with_rng(kind: SpawnerKind, bonus: BonusPolicy, rng: StdRng) -> Self {
        Self { kind, bonus, rng }
    }

    fn next_kind(&mut self) -> Tetromino {
        match self.kind {
            SpawnerKind::TrueRandom => *Tetromino::all()
                .choose(&mut self.rng)
                .unwrap_or(&Tetromino::I),
            SpawnerKind::SinglePiece { piece } => piece,
        }
    }

    /// New piece at row 0, horizontally centered over the grid.
    pub fn next(&mut self) -> ActivePiece {
        let kind = self.next_kind();
        let mut shape = kind.shape();
        let chance = if self.bonus.chance.is_nan() {
            0.0
        } else {
            self.bonus.chance.clamp(0.0, 1.0)
        };
        if self.rng.gen_bool(chance) {
            // Best effort: a miss on every attempt leaves the piece plain.
            for _ in 0..self.bonus.attempts {
                let row = self.rng.gen_range(0..shape.height());
                let col = self.rng.gen_range(0..shape.width());
                if shape.get(row, col) == BLOCK_NORMAL {
                    shape.set(row, col, BLOCK_BONUS);
                    break;
                }
            }
        }
        let x = (COLS / 2) as i32 - (shape.width() / 2) as i32;
        ActivePiece::new(kind, shape, x)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::piece::BLOCK_EMPTY;

    #[test]
    fn draws_every_kind() {
        let mut spawner = Spawner::seeded(SpawnerKind::TrueRandom, BonusPolicy::default(), 42);
        let seen: HashSet<Tetromino> = (0..300).map(|_| spawner.next().kind).collect();
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn spawn_origin_is_centered_on_row_zero() {
        for kind in Tetromino::all() {
            let mut spawner = Spawner::seeded(
                SpawnerKind::SinglePiece { piece: kind },
                BonusPolicy { chance: 0.0, attempts: 10 },
                1,
            );
            let piece = spawner.next();
            let expected = match kind {
                Tetromino::I => 3,
                _ => 4,
            };
            assert_eq!((piece.x, piece.y, piece.rotation), (expected, 0, 0));
            assert_eq!(piece.shape, kind.shape());
        }
    }

    #[test]
    fn bonus_replaces_at_most_one_normal_block() {
        let policy = BonusPolicy { chance: 1.0, attempts: 10 };
        let mut spawner = Spawner::seeded(SpawnerKind::TrueRandom, policy, 7);
        let mut with_bonus = 0;
        for _ in 0..200 {
            let piece = spawner.next();
            let catalog = piece.kind.shape();
            let bonus = piece.shape.blocks().filter(|&(_, _, b)| b == BLOCK_BONUS).count();
            assert!(bonus <= 1);
            with_bonus += bonus;
            for (row, cells) in catalog.rows().iter().enumerate() {
                for (col, &block) in cells.iter().enumerate() {
                    if block == BLOCK_EMPTY {
                        assert_eq!(piece.shape.get(row, col), BLOCK_EMPTY);
                    }
                }
            }
        }
        assert!(with_bonus > 150);
    }

    #[test]
    fn default_policy_marks_about_one_piece_in_seven() {
        let policy = BonusPolicy::default();
        assert_eq!(policy.attempts, 10);
        let mut spawner = Spawner::seeded(SpawnerKind::TrueRandom, policy, 2024);
        let draws = 4000;
        let marked = (0..draws).filter(|_| spawner.next().has_bonus()).count();
        let rate = marked as f64 / draws as f64;
        assert!((0.12..0.18).contains(&rate), "bonus rate {rate}");
    }

    #[test]
    fn single_attempt_miss_leaves_piece_plain() {
        let policy = BonusPolicy { chance: 1.0, attempts: 1 };
        let kind = SpawnerKind::SinglePiece { piece: Tetromino::T };
        let mut spawner = Spawner::seeded(kind, policy, 11);
        let mut plain = 0;
        for _ in 0..400 {
            let piece = spawner.next();
            let bonus = piece.shape.blocks().filter(|&(_, _, b)| b == BLOCK_BONUS).count();
            assert!(bonus <= 1);
            plain += 1 - bonus;
        }
        // T fills 4 of 6 cells, so a lone pick misses about a third of the time.
        assert!((80..190).contains(&plain), "plain pieces {plain}");
    }

    #[test]
    fn zero_attempts_never_places_bonus() {
        let policy = BonusPolicy { chance: 1.0, attempts: 0 };
        let mut spawner = Spawner::seeded(SpawnerKind::TrueRandom, policy, 3);
        assert!((0..50).all(|_| !spawner.next().has_bonus()));
    }

    #[test]
    fn zero_chance_never_places_bonus() {
        let mut spawner = Spawner::seeded(
            SpawnerKind::TrueRandom,
            BonusPolicy { chance: 0.0, attempts: 10 },
            3,
        );
        assert!((0..50).all(|_| !spawner.next().has_bonus()));
    }
}
