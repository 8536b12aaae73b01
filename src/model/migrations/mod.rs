use lazy_static::lazy_static;
use rusqlite_migration::{Migrations, M};

use crate::error::Error;

// Test migrations
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_test() {
        assert!(MIGRATIONS.validate().is_ok());
    }

    #[test]
    fn bootstrap_is_repeatable() {
        let mut connection = rusqlite::Connection::open_in_memory().unwrap();
        migrate_to_latest(&mut connection).unwrap();
        migrate_to_latest(&mut connection).unwrap();
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM clientes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}

lazy_static! {
    pub static ref MIGRATIONS: Migrations<'static> = Migrations::new(vec![
        M::up(include_str!("sql/0001-up.sql")).down(include_str!("sql/0001-down.sql")),
    ]);
}

/// Creates the `clientes` table on a fresh database; a no-op afterwards.
pub fn migrate_to_latest(connection: &mut rusqlite::Connection) -> Result<(), Error> {
    MIGRATIONS.to_latest(connection)?;
    Ok(())
}
