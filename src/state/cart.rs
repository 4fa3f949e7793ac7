use chrono::Utc;
use rusqlite::{Connection, Result as SqlResult};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::commerce::{CartError, CartLine, CartService, CartSummary};

/// The CartStore keeps the shopper's cart in a SQLite database.
///
/// The connection sits behind a mutex so one store can be shared
/// between every card on screen and background tasks.
pub struct CartStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl CartStore {
    /// Open (or create) the cart database at `db_path`
    pub fn open(db_path: &Path) -> SqlResult<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Could not create {}: {}", parent.display(), e);
            }
        }

        let conn = Connection::open(db_path)?;
        log::info!("Cart database initialized at: {}", db_path.display());

        let store = CartStore {
            conn: Mutex::new(conn),
            db_path: Some(db_path.to_path_buf()),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// In-memory cart (nothing persisted)
    pub fn open_in_memory() -> SqlResult<Self> {
        let store = CartStore {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> SqlResult<()> {
        self.lock().execute(
            "CREATE TABLE IF NOT EXISTS cart_lines (
                merchandise_id  TEXT PRIMARY KEY,
                quantity        INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// A poisoned lock only means another writer panicked mid-call;
    /// SQLite keeps the data consistent, so keep going.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of distinct lines in the cart
    pub fn line_count(&self) -> SqlResult<i64> {
        self.lock()
            .query_row("SELECT COUNT(*) FROM cart_lines", [], |row| row.get(0))
    }

    /// Total units across all lines
    pub fn total_quantity(&self) -> SqlResult<i64> {
        self.lock().query_row(
            "SELECT COALESCE(SUM(quantity), 0) FROM cart_lines",
            [],
            |row| row.get(0),
        )
    }

    pub fn quantity_of(&self, merchandise_id: &str) -> SqlResult<u32> {
        let quantity = self
            .lock()
            .query_row(
                "SELECT quantity FROM cart_lines WHERE merchandise_id = ?1",
                [merchandise_id],
                |row| row.get(0),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(0),
                other => Err(other),
            })?;
        Ok(quantity)
    }

    /// Upsert every line in one transaction
    fn write_lines(&self, lines: &[CartLine]) -> SqlResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let now = Utc::now().timestamp();

        for line in lines {
            tx.execute(
                "INSERT INTO cart_lines (merchandise_id, quantity, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(merchandise_id)
                 DO UPDATE SET quantity = quantity + excluded.quantity,
                               updated_at = excluded.updated_at",
                rusqlite::params![&line.merchandise_id, line.quantity, now],
            )?;
        }

        tx.commit()?;
        log::debug!("Cart updated with {} line(s)", lines.len());
        Ok(())
    }
}

impl CartService for CartStore {
    /// Existing lines grow by the given quantity
    fn add_lines(&self, lines: &[CartLine]) -> Result<CartSummary, CartError> {
        self.write_lines(lines)?;

        let updated = lines
            .iter()
            .map(|line| {
                Ok(CartLine {
                    quantity: self.quantity_of(&line.merchandise_id)?,
                    merchandise_id: line.merchandise_id.clone(),
                })
            })
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(CartSummary {
            updated,
            line_count: self.line_count()?,
            total_quantity: self.total_quantity()?,
        })
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}
