use anyhow::Result;
use rusqlite::Connection;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS doses (
            id               TEXT PRIMARY KEY,
            subject_id       TEXT NOT NULL,
            name             TEXT NOT NULL,
            dosage           REAL NOT NULL,
            dosage_unit      TEXT NOT NULL,
            given_at         TEXT NOT NULL,
            interval_minutes INTEGER,
            is_recurring     INTEGER NOT NULL DEFAULT 0,
            active           INTEGER NOT NULL DEFAULT 1,
            notes            TEXT,
            tags             TEXT,
            created_at       TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_doses_subject_ts ON doses(subject_id, given_at);
        CREATE INDEX IF NOT EXISTS idx_doses_subject_name_ts ON doses(subject_id, name, given_at);",
    )?;
    Ok(())
}
