//! `SQLite` infrastructure for the embedded vector store.
//!
//! - [`connection`]: opening and pragma configuration
//! - [`sql`]: filter clause building
//! - [`entry_row`]: row conversion and the shared upsert/fetch statements

mod connection;
mod entry_row;
mod sql;

pub use connection::{configure_connection, open_configured, open_connection};
pub use entry_row::{
    ENTRY_COLUMNS, EntryRow, decode_embedding, decode_metadata, encode_embedding,
    encode_metadata, fetch_chunks, fetch_entry, upsert_entry,
};
pub use sql::build_filter_clause_numbered;
