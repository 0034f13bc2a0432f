use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use itertools::Itertools;
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use thiserror::Error;

use crate::app_dirs::AppDirs;
use crate::games::GameKind;
use crate::session::{SessionOutcome, SessionSummary};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unable to create history directory: {0}")]
    Io(#[from] io::Error),
    #[error("unable to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("no state directory available for the history database")]
    NoStateDir,
}

/// A finished session as stored on disk
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: i64,
    pub trigger: String,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub games: Vec<GameKind>,
    pub completed: usize,
    pub outcome: SessionOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistorySummary {
    pub sessions: usize,
    pub completed: usize,
    pub abandoned: usize,
    pub games_played: usize,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    started_at: String,
    ended_at: String,
    trigger: &'a str,
    outcome: String,
    completed: usize,
    game_count: usize,
    games: String,
}

/// Log of finished exercise sessions
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    pub fn open_default() -> Result<Self, HistoryError> {
        let path = AppDirs::history_path().ok_or(HistoryError::NoStateDir)?;
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(&path)?)
    }

    pub fn in_memory() -> Result<Self, HistoryError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trigger TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                games TEXT NOT NULL,
                game_count INTEGER NOT NULL,
                completed INTEGER NOT NULL,
                outcome TEXT NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at)",
            [],
        )?;
        Ok(Self { conn })
    }

    pub fn record(&self, summary: &SessionSummary) -> Result<i64, HistoryError> {
        self.conn.execute(
            r#"
            INSERT INTO sessions
            (trigger, started_at, ended_at, games, game_count, completed, outcome)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                summary.trigger.to_string(),
                summary.started_at.to_rfc3339(),
                summary.ended_at.to_rfc3339(),
                summary.sequence.iter().join(","),
                summary.game_count() as i64,
                summary.completed as i64,
                summary.outcome.to_string(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionRecord>, HistoryError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, trigger, started_at, ended_at, games, completed, outcome
            FROM sessions
            ORDER BY started_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let records = stmt
            .query_map([limit as i64], Self::read_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn summary(&self) -> Result<HistorySummary, HistoryError> {
        let (sessions, completed, abandoned, games_played): (i64, i64, i64, i64) =
            self.conn.query_row(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN outcome = 'completed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN outcome = 'abandoned' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(completed), 0)
                FROM sessions
                "#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        Ok(HistorySummary {
            sessions: sessions as usize,
            completed: completed as usize,
            abandoned: abandoned as usize,
            games_played: games_played as usize,
        })
    }

    /// Writes every session, oldest first; returns the number of rows
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize, HistoryError> {
        let mut records = self.recent(usize::MAX >> 1)?;
        records.reverse();

        let mut csv = csv::Writer::from_writer(writer);
        for record in &records {
            csv.serialize(CsvRow {
                started_at: record.started_at.to_rfc3339(),
                ended_at: record.ended_at.to_rfc3339(),
                trigger: &record.trigger,
                outcome: record.outcome.to_string(),
                completed: record.completed,
                game_count: record.games.len(),
                games: record.games.iter().join(" "),
            })?;
        }
        csv.flush()?;
        Ok(records.len())
    }

    fn read_record(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
        let outcome: String = row.get(6)?;
        let games: String = row.get(4)?;
        let completed: i64 = row.get(5)?;

        Ok(SessionRecord {
            id: row.get(0)?,
            trigger: row.get(1)?,
            started_at: parse_timestamp(row, 2)?,
            ended_at: parse_timestamp(row, 3)?,
            games: games
                .split(',')
                .filter_map(|name| {
                    GameKind::ALL
                        .into_iter()
                        .find(|kind| kind.to_string() == name)
                })
                .collect(),
            completed: completed.max(0) as usize,
            outcome: if outcome == SessionOutcome::Completed.to_string() {
                SessionOutcome::Completed
            } else {
                SessionOutcome::Abandoned
            },
        })
    }
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Local))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })
}
