//! SQL statement variants per database engine

/// Database engine behind a [`SqlStore`](super::SqlStore)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MySql,
}

const SQLITE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        username VARCHAR(255) PRIMARY KEY,
        pin TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blends (
        code VARCHAR(255) PRIMARY KEY,
        product TEXT NOT NULL,
        tablets_amount BIGINT NOT NULL DEFAULT 0,
        kilos_to_produce REAL NOT NULL DEFAULT 0,
        tablet_size VARCHAR(255) NOT NULL DEFAULT '',
        tablet_weight REAL NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lot_images (
        blend_code VARCHAR(255) NOT NULL,
        lot_number BIGINT NOT NULL,
        image_path TEXT NOT NULL,
        confirmed_by VARCHAR(255) NOT NULL DEFAULT '',
        FOREIGN KEY (blend_code) REFERENCES blends(code)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_lot_images_blend_lot
        ON lot_images (blend_code, lot_number)
    "#,
];

// MySQL cannot default TEXT columns, and has no CREATE INDEX IF NOT EXISTS,
// so the index is declared inline.
const MYSQL_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        username VARCHAR(255) PRIMARY KEY,
        pin TEXT NOT NULL
    ) ENGINE=InnoDB
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blends (
        code VARCHAR(255) PRIMARY KEY,
        product TEXT NOT NULL,
        tablets_amount BIGINT NOT NULL DEFAULT 0,
        kilos_to_produce DOUBLE NOT NULL DEFAULT 0,
        tablet_size VARCHAR(255) NOT NULL DEFAULT '',
        tablet_weight DOUBLE NOT NULL DEFAULT 0
    ) ENGINE=InnoDB
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS lot_images (
        blend_code VARCHAR(255) NOT NULL,
        lot_number BIGINT NOT NULL,
        image_path TEXT NOT NULL,
        confirmed_by VARCHAR(255) NOT NULL DEFAULT '',
        INDEX idx_lot_images_blend_lot (blend_code, lot_number),
        FOREIGN KEY (blend_code) REFERENCES blends(code)
    ) ENGINE=InnoDB
    "#,
];

impl Dialect {
    /// Idempotent schema statements, in execution order
    pub fn create_table_statements(self) -> &'static [&'static str] {
        match self {
            Dialect::Sqlite => SQLITE_TABLES,
            Dialect::MySql => MYSQL_TABLES,
        }
    }

    /// Insert a blend, or update every field of an existing blend with the same code
    ///
    /// Binds: code, product, tablets_amount, kilos_to_produce, tablet_size, tablet_weight
    pub fn upsert_blend(self) -> &'static str {
        match self {
            Dialect::Sqlite => {
                r#"
                INSERT INTO blends (code, product, tablets_amount, kilos_to_produce, tablet_size, tablet_weight)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(code) DO UPDATE SET
                    product = excluded.product,
                    tablets_amount = excluded.tablets_amount,
                    kilos_to_produce = excluded.kilos_to_produce,
                    tablet_size = excluded.tablet_size,
                    tablet_weight = excluded.tablet_weight
                "#
            }
            Dialect::MySql => {
                r#"
                INSERT INTO blends (code, product, tablets_amount, kilos_to_produce, tablet_size, tablet_weight)
                VALUES (?, ?, ?, ?, ?, ?)
                ON DUPLICATE KEY UPDATE
                    product = VALUES(product),
                    tablets_amount = VALUES(tablets_amount),
                    kilos_to_produce = VALUES(kilos_to_produce),
                    tablet_size = VALUES(tablet_size),
                    tablet_weight = VALUES(tablet_weight)
                "#
            }
        }
    }

    /// Insert a user, or replace the PIN of an existing user
    ///
    /// Binds: username, pin
    pub fn upsert_user(self) -> &'static str {
        match self {
            Dialect::Sqlite => {
                "INSERT INTO users (username, pin) VALUES (?, ?) \
                 ON CONFLICT(username) DO UPDATE SET pin = excluded.pin"
            }
            Dialect::MySql => {
                "INSERT INTO users (username, pin) VALUES (?, ?) \
                 ON DUPLICATE KEY UPDATE pin = VALUES(pin)"
            }
        }
    }
}
