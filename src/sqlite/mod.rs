// SQLite backend built on rusqlite
//
// - config: provider options and connection opening
// - connection: the `DbConnection` implementation with JDBC-style auto-commit
// - params: conversion from `RowValues` into rusqlite values
// - query: result extraction

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder, SqliteProvider};
pub use connection::SqliteConnection;
pub use params::Params;
pub use query::build_result_set;
