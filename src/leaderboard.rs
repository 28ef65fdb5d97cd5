//! File-backed high-score table shared by every request the score server
//! handles. Each append happens under an exclusive lock file.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const HEADER: &str = "name,score,timestamp";
pub const MAX_LISTED: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("malformed score submission: {0}")]
    Malformed(serde_json::Error),
    #[error("score file is locked by another writer")]
    LockBusy,
    #[error("score file I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Caused by the caller's input rather than by storage.
    pub fn is_rejection(&self) -> bool {
        matches!(self, StoreError::EmptyName | StoreError::Malformed(_))
    }
}

/// Body of a score submission: a non-blank name and a non-negative whole score.
#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
pub struct ScoreSubmission {
    pub name: String,
    pub score: u64,
}

impl ScoreSubmission {
    pub fn parse(body: &str) -> Result<Self, StoreError> {
        let submission: Self = serde_json::from_str(body).map_err(StoreError::Malformed)?;
        if submission.name.trim().is_empty() {
            return Err(StoreError::EmptyName);
        }
        Ok(submission)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LockPolicy {
    pub retries: u32,
    pub factor: f64,
    pub min_timeout: Duration,
    pub max_timeout: Duration,
    pub randomize: bool,
    /// A lock file older than this is left over from a dead writer.
    pub stale: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            factor: 3.0,
            min_timeout: Duration::from_millis(100),
            max_timeout: Duration::from_millis(3000),
            randomize: true,
            stale: Duration::from_secs(15),
        }
    }
}

impl LockPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let mut ms = self.min_timeout.as_millis() as f64 * self.factor.powi(attempt as i32);
        if self.randomize {
            ms *= rand::thread_rng().gen_range(1.0..2.0);
        }
        Duration::from_millis(ms as u64).min(self.max_timeout)
    }
}

/// Removes the lock file when dropped.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            eprintln!("failed to release {}: {}", self.path.display(), e);
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ScoreRecord {
    pub name: String,
    pub score: u64,
    pub date: DateTime<Utc>,
}

pub struct ScoreStore {
    path: PathBuf,
    lock_path: PathBuf,
    policy: LockPolicy,
}

impl ScoreStore {
    pub fn new(data_dir: &Path, policy: LockPolicy) -> Self {
        let path = data_dir.join("scores.csv");
        let lock_path = data_dir.join("scores.csv.lock");
        Self {
            path,
            lock_path,
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Creates the data directory and a header-only score file when missing,
    /// then checks the file can be appended to.
    pub fn init(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        if !self.path.exists() {
            fs::write(&self.path, format!("{HEADER}\n"))?;
        }
        OpenOptions::new().append(true).open(&self.path)?;
        Ok(())
    }

    pub fn lock(&self) -> Result<LockGuard, StoreError> {
        for attempt in 0..=self.policy.retries {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.lock_path)
            {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{}", std::process::id()) {
                        eprintln!(
                            "could not record owner in {}: {}",
                            self.lock_path.display(),
                            e
                        );
                    }
                    return Ok(LockGuard {
                        path: self.lock_path.clone(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if self.lock_is_stale() {
                        eprintln!("removing stale lock {}", self.lock_path.display());
                        let _ = fs::remove_file(&self.lock_path);
                        continue;
                    }
                    if attempt < self.policy.retries {
                        thread::sleep(self.policy.backoff(attempt));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::LockBusy)
    }

    fn lock_is_stale(&self) -> bool {
        fs::metadata(&self.lock_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age > self.policy.stale)
    }

    /// Appends one record stamped with the current time. Commas and line
    /// breaks in the name become semicolons so the record stays one line of
    /// three fields.
    pub fn append(&self, name: &str, score: u64) -> Result<ScoreRecord, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let record = ScoreRecord {
            name: name.replace([',', '\r', '\n'], ";"),
            score,
            date: Utc::now(),
        };
        let _guard = self.lock()?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(
            file,
            "{},{},{}",
            record.name,
            record.score,
            record.date.to_rfc3339_opts(SecondsFormat::Millis, true)
        )?;
        Ok(record)
    }

    /// Best scores first, at most `MAX_LISTED`. A missing file is recreated
    /// empty.
    pub fn top(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.init()?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let mut records: Vec<ScoreRecord> = text.lines().filter_map(parse_line).collect();
        records.sort_by(|a, b| b.score.cmp(&a.score));
        records.truncate(MAX_LISTED);
        Ok(records)
    }
}

/// `None` for the header, blank lines and lines without a numeric score. A
/// missing or unreadable timestamp reads as now.
fn parse_line(line: &str) -> Option<ScoreRecord> {
    let line = line.trim();
    if line.is_empty() || line == HEADER {
        return None;
    }
    let mut fields = line.split(',');
    let name = fields.next()?.replace('"', "");
    let score = fields.next()?.trim().parse::<u64>().ok()?;
    let date = fields
        .next()
        .and_then(|d| DateTime::parse_from_rfc3339(d.trim()).ok())
        .map_or_else(Utc::now, |d| d.with_timezone(&Utc));
    Some(ScoreRecord { name, score, date })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_and_skips_noise() {
        assert!(parse_line(HEADER).is_none());
        assert!(parse_line("   ").is_none());
        assert!(parse_line("bob,notanumber,2024-01-01T00:00:00Z").is_none());

        let r = parse_line("\"ann\",420,2024-05-01T10:00:00.000Z").unwrap();
        assert_eq!(r.name, "ann");
        assert_eq!(r.score, 420);
        assert_eq!(r.date.to_rfc3339_opts(SecondsFormat::Secs, true), "2024-05-01T10:00:00Z");

        let undated = parse_line("cid,7").unwrap();
        assert_eq!(undated.score, 7);
    }

    #[test]
    fn submissions_need_name_and_whole_positive_score() {
        let ok = ScoreSubmission::parse(r#"{"name":" ann ","score":1200}"#).unwrap();
        assert_eq!(ok.score, 1200);
        assert!(matches!(
            ScoreSubmission::parse(r#"{"name":"  ","score":5}"#),
            Err(StoreError::EmptyName)
        ));
        for body in [
            r#"{"name":"ann","score":-1}"#,
            r#"{"name":"ann","score":"12"}"#,
            r#"{"name":"ann","score":1.5}"#,
            r#"{"name":42,"score":1}"#,
            r#"{"score":1}"#,
            "not json",
        ] {
            let err = ScoreSubmission::parse(body).unwrap_err();
            assert!(err.is_rejection(), "{body}");
        }
        assert!(!StoreError::LockBusy.is_rejection());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = LockPolicy {
            randomize: false,
            ..LockPolicy::default()
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(300));
        assert_eq!(policy.backoff(2), Duration::from_millis(900));
        assert_eq!(policy.backoff(3), Duration::from_millis(2700));
        assert_eq!(policy.backoff(4), Duration::from_millis(3000));

        let jittered = LockPolicy::default().backoff(1);
        assert!(jittered >= Duration::from_millis(300) && jittered <= Duration::from_millis(600));
    }
}
