use std::path::Path;

use rusqlite::{Connection, params};

use crate::crawler::RecordSink;
use crate::types::MandateRecord;

#[derive(Debug, thiserror::Error)]
#[error("SQLite error: {0}")]
pub struct StoreError(#[from] rusqlite::Error);

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS data (
    id TEXT NOT NULL,
    name TEXT NOT NULL,
    birth_date TEXT NOT NULL,
    death_date TEXT NOT NULL,
    source TEXT NOT NULL,
    image TEXT NOT NULL,
    term TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    area TEXT NOT NULL,
    faction TEXT NOT NULL,
    UNIQUE (id, term, faction, start_date)
)";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self { conn })
    }

    pub fn upsert(&self, record: &MandateRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO data
                (id, name, birth_date, death_date, source, image, term, start_date, end_date, area, faction)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id,
                record.name,
                record.birth_date,
                record.death_date,
                record.source,
                record.image,
                record.term,
                record.start_date,
                record.end_date,
                record.area,
                record.faction,
            ],
        )?;
        Ok(())
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM data", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn records(&self) -> Result<Vec<MandateRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, birth_date, death_date, source, image, term, start_date, end_date, area, faction
             FROM data ORDER BY id, start_date",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(MandateRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                birth_date: row.get(2)?,
                death_date: row.get(3)?,
                source: row.get(4)?,
                image: row.get(5)?,
                term: row.get(6)?,
                start_date: row.get(7)?,
                end_date: row.get(8)?,
                area: row.get(9)?,
                faction: row.get(10)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

impl RecordSink for SqliteStore {
    fn upsert(&mut self, record: &MandateRecord) -> Result<(), StoreError> {
        SqliteStore::upsert(self, record)
    }
}
