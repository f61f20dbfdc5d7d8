use chrono::NaiveDateTime;
use rusqlite::{params, Row};
use serde::Serialize;

use crate::db::DbPool;

#[derive(Debug, Serialize, Clone)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub ip_hash: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Subscriber {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Subscriber {
            id: row.get("id")?,
            email: row.get("email")?,
            ip_hash: row.get("ip_hash")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Insert a subscriber. Returns `Ok(None)` when the address is already
    /// subscribed.
    pub fn create(pool: &DbPool, email: &str, ip_hash: Option<&str>) -> Result<Option<i64>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO subscribers (email, ip_hash) VALUES (?1, ?2)",
                params![email.trim(), ip_hash],
            )
            .map_err(|e| e.to_string())?;
        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(conn.last_insert_rowid()))
    }

    pub fn find_by_email(pool: &DbPool, email: &str) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM subscribers WHERE email = ?1",
            params![email.trim()],
            Self::from_row,
        )
        .ok()
    }

    pub fn count(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row("SELECT COUNT(*) FROM subscribers", [], |row| row.get(0))
            .unwrap_or(0)
    }

    pub fn list(pool: &DbPool, limit: i64, offset: i64) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn
            .prepare("SELECT * FROM subscribers ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2")
        {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map(params![limit, offset], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn delete(pool: &DbPool, email: &str) -> Result<bool, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let n = conn
            .execute("DELETE FROM subscribers WHERE email = ?1", params![email.trim()])
            .map_err(|e| e.to_string())?;
        Ok(n > 0)
    }
}
