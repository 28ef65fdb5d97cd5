use serde::{Deserialize, Serialize};

use crate::board::LineClear;

/// Score needed to reach each level; index 0 is level 1.
pub const LEVEL_THRESHOLDS: [u32; 10] = [0, 500, 1500, 3000, 5000, 8000, 12000, 18000, 25000, 35000];

/// Stage names the UI shows (and picks background art by) per level.
pub const THEMES: [&str; 10] = [
    "Gastronomy",
    "Green Building",
    "Furnishings",
    "Renewable Energy",
    "Nursery",
    "Agriculture",
    "Technology",
    "Craftsmanship",
    "Tourism",
    "Grand Finale",
];

pub fn base_points(lines: u32) -> u32 {
    match lines {
        1 => 40,
        2 => 100,
        3 => 300,
        4 => 1200,
        _ => 0,
    }
}

pub fn level_for_score(score: u32) -> u32 {
    LEVEL_THRESHOLDS
        .iter()
        .rposition(|&threshold| score >= threshold)
        .map_or(1, |idx| idx as u32 + 1)
}

pub fn theme_index(level: u32) -> usize {
    (level.max(1) as usize - 1).min(THEMES.len() - 1)
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeedCurve {
    pub initial_ms: u32,
    pub step_ms: u32,
    pub min_ms: u32,
}

impl Default for SpeedCurve {
    fn default() -> Self {
        Self {
            initial_ms: 1000,
            step_ms: 75,
            min_ms: 100,
        }
    }
}

impl SpeedCurve {
    pub fn interval_for(&self, level: u32) -> u32 {
        let reduction = level.saturating_sub(1).saturating_mul(self.step_ms);
        self.initial_ms.saturating_sub(reduction).max(self.min_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClearOutcome {
    pub lines: u32,
    pub points: u32,
    pub tetris: bool,
    /// New level, when this clear raised it.
    pub level_up: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct Scoring {
    score: u32,
    level: u32,
    lines: u32,
    interval_ms: u32,
    curve: SpeedCurve,
    bonus_per_line: u32,
}

impl Scoring {
    pub fn new(curve: SpeedCurve, bonus_per_line: u32) -> Self {
        Self {
            score: 0,
            level: 1,
            lines: 0,
            interval_ms: curve.interval_for(1),
            curve,
            bonus_per_line,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn theme_index(&self) -> usize {
        theme_index(self.level)
    }

    /// One point per row of a hard drop.
    pub fn add_drop_points(&mut self, rows: u32) {
        self.score = self.score.saturating_add(rows);
    }

    /// Scores a line clear. Bonus rows pay a flat amount each, however many
    /// bonus cells they held. Returns `None` when nothing was cleared.
    pub fn award(&mut self, clear: LineClear) -> Option<ClearOutcome> {
        if clear.lines == 0 {
            return None;
        }
        let points = base_points(clear.lines)
            .saturating_mul(self.level)
            .saturating_add(clear.bonus_rows.saturating_mul(self.bonus_per_line));
        self.score = self.score.saturating_add(points);
        self.lines += clear.lines;

        let level = level_for_score(self.score);
        let level_up = if level > self.level {
            self.level = level;
            self.interval_ms = self.curve.interval_for(level);
            Some(level)
        } else {
            None
        };
        Some(ClearOutcome {
            lines: clear.lines,
            points,
            tetris: clear.lines == 4,
            level_up,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoring() -> Scoring {
        Scoring::new(SpeedCurve::default(), 100)
    }

    #[test]
    fn base_points_are_super_linear() {
        assert_eq!(
            (1..=4).map(base_points).collect::<Vec<_>>(),
            vec![40, 100, 300, 1200]
        );
        assert_eq!(base_points(0), 0);
        assert_eq!(base_points(5), 0);
    }

    #[test]
    fn tetris_at_level_one_scores_1200() {
        let mut s = scoring();
        let outcome = s.award(LineClear { lines: 4, bonus_rows: 0 }).unwrap();
        assert_eq!(s.score(), 1200);
        assert!(outcome.tetris);
        assert_eq!(s.lines(), 4);
        assert_eq!(outcome.level_up, Some(2));
    }

    #[test]
    fn exactly_500_reaches_level_two() {
        assert_eq!(level_for_score(499), 1);
        assert_eq!(level_for_score(500), 2);
        assert_eq!(level_for_score(1_000_000), 10);

        let mut s = scoring();
        s.add_drop_points(460);
        let outcome = s.award(LineClear { lines: 1, bonus_rows: 0 }).unwrap();
        assert_eq!(s.score(), 500);
        assert_eq!(outcome.level_up, Some(2));
        assert_eq!(s.level(), 2);
        assert_eq!(s.interval_ms(), 925);
    }

    #[test]
    fn points_scale_with_level_and_bonus_is_flat() {
        let mut s = scoring();
        s.add_drop_points(1500);
        s.award(LineClear { lines: 1, bonus_rows: 0 }).unwrap();
        assert_eq!(s.level(), 3);
        let before = s.score();
        let outcome = s.award(LineClear { lines: 2, bonus_rows: 2 }).unwrap();
        assert_eq!(outcome.points, 100 * 3 + 200);
        assert_eq!(s.score(), before + 500);
        assert!(!outcome.tetris);
    }

    #[test]
    fn no_lines_changes_nothing() {
        let mut s = scoring();
        assert!(s.award(LineClear::default()).is_none());
        assert_eq!((s.score(), s.level(), s.lines()), (0, 1, 0));
    }

    #[test]
    fn interval_bottoms_out_at_floor() {
        let curve = SpeedCurve::default();
        assert_eq!(curve.interval_for(1), 1000);
        assert_eq!(curve.interval_for(10), 325);
        assert_eq!(curve.interval_for(40), 100);
    }

    #[test]
    fn themes_follow_level_and_cap() {
        assert_eq!(THEMES[theme_index(1)], "Gastronomy");
        assert_eq!(theme_index(10), 9);
        assert_eq!(theme_index(15), 9);
    }
}
