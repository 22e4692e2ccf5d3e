//! SQLite storage implementation.

use std::collections::BTreeSet;
use std::path::Path;

use color_eyre::eyre::WrapErr as _;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;

use crate::models::NewSetEntry;
use crate::schema::set_entries;
use crate::traits::SetStore;

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// Milliseconds a connection waits on a lock held by another process.
const BUSY_TIMEOUT_MS: u32 = 5000;

#[derive(Debug)]
struct BusyTimeout;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for BusyTimeout {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        diesel::sql_query(format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"))
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;
        Ok(())
    }
}

/// SQLite-based storage.
///
/// Several processes may share one database file; every read goes to the file, so
/// writes made elsewhere are visible on the next call.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database URL.
    pub fn new(database_url: &str) -> color_eyre::eyre::Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(4)
            .connection_customizer(Box::new(BusyTimeout))
            .build(manager)
            .wrap_err("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Open the database file at `path`, creating it and its parent directory if
    /// needed, and bring the schema up to date.
    pub fn open(path: &Path) -> color_eyre::eyre::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
        }

        let storage = Self::new(&path.to_string_lossy())?;
        storage.run_migrations()?;

        tracing::debug!(path = %path.display(), "opened blocklist database");
        Ok(storage)
    }

    /// Run migrations.
    pub fn run_migrations(&self) -> color_eyre::eyre::Result<()> {
        use diesel_migrations::MigrationHarness as _;

        let mut conn = self
            .pool
            .get()
            .wrap_err("failed to get connection for migrations")?;

        conn.run_pending_migrations(crate::MIGRATIONS)
            .map_err(|e| color_eyre::eyre::eyre!("migration failed: {}", e))?;

        Ok(())
    }

    fn conn(
        &self,
    ) -> color_eyre::eyre::Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>>
    {
        self.pool
            .get()
            .wrap_err("failed to get database connection")
    }
}

impl SetStore for SqliteStorage {
    fn load_set(&self, namespace: &str, key: &str) -> color_eyre::eyre::Result<BTreeSet<String>> {
        let mut conn = self.conn()?;

        let values: Vec<String> = set_entries::table
            .filter(set_entries::namespace.eq(namespace))
            .filter(set_entries::set_key.eq(key))
            .select(set_entries::value)
            .load(&mut conn)
            .wrap_err_with(|| format!("failed to load {namespace}/{key}"))?;

        Ok(values.into_iter().collect())
    }

    fn store_set(
        &self,
        namespace: &str,
        key: &str,
        values: &BTreeSet<String>,
    ) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::delete(
                set_entries::table
                    .filter(set_entries::namespace.eq(namespace))
                    .filter(set_entries::set_key.eq(key)),
            )
            .execute(conn)?;

            for value in values {
                diesel::insert_into(set_entries::table)
                    .values(NewSetEntry {
                        namespace,
                        set_key: key,
                        value,
                    })
                    .execute(conn)?;
            }

            Ok(())
        })
        .wrap_err_with(|| format!("failed to store {namespace}/{key}"))?;

        Ok(())
    }

    fn clear_set(&self, namespace: &str, key: &str) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;

        diesel::delete(
            set_entries::table
                .filter(set_entries::namespace.eq(namespace))
                .filter(set_entries::set_key.eq(key)),
        )
        .execute(&mut conn)
        .wrap_err_with(|| format!("failed to clear {namespace}/{key}"))?;

        Ok(())
    }
}
