//! SQL persistence for SQLite and MySQL/MariaDB
//!
//! Both backends share one set of queries. Statements whose syntax differs
//! between the two engines (DDL, upserts) come from [`Dialect`].

pub mod dialect;
pub mod init;
pub mod queries;

pub use dialect::Dialect;
pub use init::{connect_mysql, connect_sqlite, create_tables};
pub use queries::{SqlPool, SqlStore};
