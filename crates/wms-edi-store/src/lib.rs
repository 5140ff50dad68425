//! # wms-edi-store
//!
//! libsql-backed persistence for the warehouse EDI integration: connection
//! pooling, versioned startup migrations, and a typed repository over the
//! warehouse schema (items, lists, item mappings, EDI inbox, apply errors
//! and audit, sync log).
//!
//! Schema changes happen only through [`Store::migrate`] at service
//! startup; request paths never create tables.

pub mod connection;
pub mod migrations;
pub mod records;
pub mod store;

pub use connection::{Db, DbConfig, DbTransaction};
pub use records::{
    ApplyErrorRow, ApplyStatus, AreaDetailRow, AuditRow, InboxRecord, InboxSummary, ItemMapping,
    ItemSummary, ListRecord, ListRowRecord, NewApplyError, NewItemMapping, NewList, NewListRow,
    SyncLogRow,
};
pub use store::Store;

use thiserror::Error;

/// Errors that can occur when working with the database.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("Connection error: {details}")]
    Connection { details: String },

    #[error("Libsql error during {context}: {source}")]
    Libsql {
        context: String,
        #[source]
        source: libsql::Error,
    },

    #[error("SQL error executing `{statement}`: {source}")]
    Sql {
        statement: String,
        #[source]
        source: libsql::Error,
    },

    #[error("Query error on `{table}`: {details}")]
    Query { table: String, details: String },

    #[error("Migration {version} failed: {details}")]
    Migration { version: i64, details: String },

    #[error("Transaction error: {details}")]
    Transaction { details: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn sql(statement: impl Into<String>, source: libsql::Error) -> Self {
        Self::Sql {
            statement: statement.into(),
            source,
        }
    }

    pub(crate) fn libsql(context: impl Into<String>, source: libsql::Error) -> Self {
        Self::Libsql {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
