use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

pub mod models;
use models::*;

/// Thread-safe SQLite connection (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Team & event snapshots ───────────────────────────────────────────────

    /// Record the team statistics used for a scoring pass. Best-effort:
    /// callers log failures and keep scoring.
    pub fn save_team_snapshot(&self, team: &TeamSnapshot) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO team_snapshots (
                name, wins, losses, points_for, points_against,
                recent_results, injured_starters, home_advantage, recorded_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                team.name,
                team.wins,
                team.losses,
                team.points_for,
                team.points_against,
                team.recent_results
                    .as_ref()
                    .map(|r| serde_json::to_string(r).unwrap_or_default()),
                team.injured_starters,
                team.home_advantage,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    /// Record an upcoming event with its posted odds. Best-effort.
    pub fn save_event_snapshot(&self, event: &UpcomingEvent) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO event_snapshots (
                event_id, starts_at, home_team, away_team,
                home_moneyline, away_moneyline,
                home_spread, home_spread_odds, away_spread_odds,
                total_line, over_odds, under_odds, recorded_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
            params![
                event.event_id,
                event.starts_at,
                event.home.name,
                event.away.name,
                event.odds.home_moneyline,
                event.odds.away_moneyline,
                event.odds.home_spread,
                event.odds.home_spread_odds,
                event.odds.away_spread_odds,
                event.odds.total_line,
                event.odds.over_odds,
                event.odds.under_odds,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    // ── Picks ────────────────────────────────────────────────────────────────

    /// Insert a new pick, returning its row id
    pub fn insert_pick(&self, pick: &Pick) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO picks (
                event_id, home_team, away_team, market, side, odds, line,
                confidence, prediction, reasoning, created_at, result
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
            params![
                pick.event_id,
                pick.home_team,
                pick.away_team,
                pick.market.as_str(),
                pick.side.as_str(),
                pick.odds,
                pick.line,
                pick.confidence,
                pick.prediction,
                pick.reasoning,
                pick.created_at,
                pick.result.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List most recent picks
    pub fn list_recent_picks(&self, limit: i64) -> Result<Vec<Pick>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, event_id, home_team, away_team, market, side, odds, line,
                    confidence, prediction, reasoning, created_at, result
             FROM picks ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let picks = stmt
            .query_map(params![limit], map_pick)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(picks)
    }

    /// Grade a pick. Called by the external result resolver, never by the
    /// scoring core.
    pub fn update_pick_result(&self, id: i64, result: PickResult) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE picks SET result=?1 WHERE id=?2",
            params![result.as_str(), id],
        )?;
        Ok(())
    }

    // ── Model weights (secondary store) ──────────────────────────────────────

    /// Upsert serialized model weights under a name
    pub fn save_model_weights(&self, name: &str, payload: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO model_weights (name, payload, saved_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
                payload=excluded.payload,
                saved_at=excluded.saved_at",
            params![name, payload, Utc::now()],
        )?;
        Ok(())
    }

    /// Load serialized model weights by name, `None` when absent
    pub fn load_model_weights(&self, name: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let payload = conn
            .query_row(
                "SELECT payload FROM model_weights WHERE name=?1",
                params![name],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(payload)
    }

    // ── Stats ────────────────────────────────────────────────────────────────

    /// Aggregate pick record for the outward summary
    pub fn get_record(&self) -> Result<PickRecord> {
        let conn = self.conn.lock().unwrap();
        let graded: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM picks WHERE result IN ('won','lost')",
                [],
                |r| r.get(0),
            )
            .unwrap_or(0);
        let won: i64 = conn
            .query_row("SELECT COUNT(*) FROM picks WHERE result='won'", [], |r| {
                r.get(0)
            })
            .unwrap_or(0);
        let pending: i64 = conn
            .query_row("SELECT COUNT(*) FROM picks WHERE result='pending'", [], |r| {
                r.get(0)
            })
            .unwrap_or(0);
        Ok(PickRecord {
            graded,
            won,
            pending,
        })
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_pick(row: &rusqlite::Row) -> rusqlite::Result<Pick> {
    let market: String = row.get(4)?;
    let side: String = row.get(5)?;
    let result: String = row.get(12)?;
    Ok(Pick {
        id: row.get(0)?,
        event_id: row.get(1)?,
        home_team: row.get(2)?,
        away_team: row.get(3)?,
        market: Market::from_str(&market),
        side: Side::from_str(&side),
        odds: row.get(6)?,
        line: row.get(7)?,
        confidence: row.get::<_, i64>(8)? as u8,
        prediction: row.get(9)?,
        reasoning: row.get(10)?,
        created_at: row.get(11)?,
        result: PickResult::from_str(&result),
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS team_snapshots (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT    NOT NULL,
    wins             INTEGER NOT NULL,
    losses           INTEGER NOT NULL,
    points_for       REAL,
    points_against   REAL,
    recent_results   TEXT,
    injured_starters INTEGER NOT NULL DEFAULT 0,
    home_advantage   REAL,
    recorded_at      TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS event_snapshots (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id         TEXT    NOT NULL,
    starts_at        TEXT    NOT NULL,
    home_team        TEXT    NOT NULL,
    away_team        TEXT    NOT NULL,
    home_moneyline   INTEGER NOT NULL,
    away_moneyline   INTEGER NOT NULL,
    home_spread      REAL    NOT NULL,
    home_spread_odds INTEGER NOT NULL,
    away_spread_odds INTEGER NOT NULL,
    total_line       REAL    NOT NULL,
    over_odds        INTEGER NOT NULL,
    under_odds       INTEGER NOT NULL,
    recorded_at      TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS picks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id    TEXT    NOT NULL,
    home_team   TEXT    NOT NULL,
    away_team   TEXT    NOT NULL,
    market      TEXT    NOT NULL,
    side        TEXT    NOT NULL,
    odds        INTEGER NOT NULL,
    line        REAL,
    confidence  INTEGER NOT NULL,
    prediction  TEXT    NOT NULL,
    reasoning   TEXT    NOT NULL,
    created_at  TEXT    NOT NULL,
    result      TEXT    NOT NULL DEFAULT 'pending'
);

CREATE TABLE IF NOT EXISTS model_weights (
    name     TEXT PRIMARY KEY,
    payload  TEXT NOT NULL,
    saved_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_picks_result ON picks(result);
CREATE INDEX IF NOT EXISTS idx_picks_event ON picks(event_id);
CREATE INDEX IF NOT EXISTS idx_event_snapshots_event ON event_snapshots(event_id);
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickRecord {
    pub graded: i64,
    pub won: i64,
    pub pending: i64,
}
