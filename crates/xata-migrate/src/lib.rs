//! Schema migration reconciliation for Xata branches.
//!
//! `xata-migrate` computes the operations between two logical schema
//! snapshots, stores them as a checksummed, append-only migration history,
//! and reconciles that history with the one held by the remote branch.
//!
//! # Architecture
//!
//! - **Column types** - Logical column types and their PostgreSQL mapping:
//!   physical names, derived CHECK constraints, metadata comments, backfill
//!   values
//! - **Operations** - The closed vocabulary of schema edits, each validated
//!   at parse time and reversible where that is meaningful
//! - **Autodetector** - Diffs two schemas into an ordered operation list
//! - **State** - Replays operations onto a schema
//! - **Migrations** - Legacy and versioned migration units, hash-chained
//! - **History** - The migrations directory and its ledger
//! - **Reconcile** - Pull, rebase and push planning against a remote history
//!
//! # Example
//!
//! ```rust,ignore
//! use xata_migrate::prelude::*;
//!
//! let source = LogicalSchema::new();
//! let target = LogicalSchema::new().table(
//!     LogicalTable::new("users")
//!         .column(LogicalColumn::new("email", ColumnType::Email).unique())
//!         .column(LogicalColumn::new("active", ColumnType::Bool).not_null()),
//! );
//!
//! let operations = diff(&source, &target);
//! let unit = MigrationUnit::versioned(generate_migration_id(), None, operations);
//!
//! let dir = MigrationDirectory::new(".xata/migrations");
//! dir.write(&[unit])?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show the operations between two schema snapshots
//! xata-migrate diff --from old.json --to new.json
//!
//! # Record them as a new migration
//! xata-migrate new --from old.json --to new.json
//!
//! # Compare local migrations with a remote history
//! xata-migrate status --remote remote.json
//!
//! # Replace local migrations with the remote history
//! xata-migrate pull --remote remote.json --force
//! ```

pub mod autodetector;
pub mod column_type;
pub mod error;
pub mod history;
pub mod ledger;
pub mod migration;
pub mod operations;
pub mod reconcile;
pub mod schema;
pub mod state;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::autodetector::{diff, Autodetector, AutodetectorOptions};
    pub use crate::column_type::{
        comment_for, constraint_for, from_physical_type, requires_up_argument, to_physical_type,
        zero_value_for, CheckConstraint, ColumnType, TypeName,
    };
    pub use crate::error::{IntegrityWarning, MigrateError, Result};
    pub use crate::history::{LocalHistory, MigrationDirectory};
    pub use crate::ledger::{Ledger, LedgerEntry};
    pub use crate::migration::{
        compute_checksum, generate_migration_id, MigrationFormat, MigrationType, MigrationUnit,
    };
    pub use crate::operations::{ColumnDefinition, ForeignKeyReference, Operation};
    pub use crate::reconcile::{plan_push, pull, rebase, reconcile, PushPlan, SyncStatus};
    pub use crate::schema::{LogicalColumn, LogicalSchema, LogicalTable};
    pub use crate::state::SchemaState;
}
