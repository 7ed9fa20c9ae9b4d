//! SQLite setup and connection management.

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Wrapper owning the SQLite connection. Repositories clone the handle.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Create or open the database file, creating parent directories as needed.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init()?;
        Ok(db)
    }

    /// In-memory database, used by the test suites.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS medicine (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                image_path TEXT,
                medicine_name TEXT,
                expiry_date TEXT,
                dosage_info TEXT,
                detected_time TEXT
            );

            CREATE TABLE IF NOT EXISTS reminder (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                medicine_id INTEGER,
                reminder_time TEXT,
                frequency TEXT,
                status TEXT,
                FOREIGN KEY(medicine_id) REFERENCES medicine(id)
            );

            CREATE TABLE IF NOT EXISTS scan (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                medicine_id INTEGER,
                image_hash TEXT,
                image_path TEXT,
                predicted_label TEXT,
                confidence REAL,
                ocr_text TEXT,
                scanned_at TEXT,
                FOREIGN KEY(medicine_id) REFERENCES medicine(id)
            );
            "#,
        )?;
        Ok(())
    }

    /// Get a reference to the connection
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}
