//! Error types for the migration engine.

use std::path::PathBuf;

/// Command that discards local migration files and re-fetches the remote history.
pub const FORCE_RESYNC_COMMAND: &str = "xata-migrate pull --force";

/// Errors that can occur while diffing, storing or reconciling migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A payload does not have the expected shape.
    #[error("Invalid {context}: {message}")]
    Validation {
        /// What was being validated (operation kind, file, ledger line).
        context: String,
        /// Which field is wrong and why.
        message: String,
    },

    /// A file in the migrations directory is not tracked by the ledger.
    #[error("Migration file '{file}' is not listed in the ledger. Run `{remediation}` to resync")]
    Desync {
        /// Name of the offending file.
        file: String,
        /// Command the user has to run.
        remediation: String,
    },

    /// A ledger entry points at a file that does not exist.
    #[error("Migration '{id}' is listed in the ledger but {path} is missing")]
    MissingMigrationFile {
        /// Migration identifier.
        id: String,
        /// Expected location of the file.
        path: PathBuf,
    },

    /// Local history mixes formats, or local and remote formats differ.
    #[error(
        "Migration format mismatch (local: {local}, remote: {remote}). Run `{remediation}` to resync"
    )]
    FormatMismatch {
        /// Format(s) found locally.
        local: String,
        /// Format(s) found remotely.
        remote: String,
        /// Command the user has to run.
        remediation: String,
    },

    /// A logical column type this build does not know about.
    #[error("Unsupported column type '{0}'")]
    UnsupportedType(String),

    /// Local and remote histories branched; no merge is attempted.
    #[error("Local migration '{local}' conflicts with remote migration '{remote}'")]
    UnresolvedConflict {
        /// First local-only migration involved.
        local: String,
        /// Remote migration it collides with.
        remote: String,
    },

    /// Replaying operations onto a schema failed.
    #[error("Invalid migration state: {0}")]
    InvalidState(String),

    /// IO error (reading/writing migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a migration file.
    #[error("Failed to parse migration file '{path}': {message}")]
    ParseError {
        /// Path to the migration file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Creates a validation error.
    pub fn validation(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Creates a desync error for the given file name.
    pub fn desync(file: impl Into<String>) -> Self {
        Self::Desync {
            file: file.into(),
            remediation: FORCE_RESYNC_COMMAND.to_string(),
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

/// A stored checksum that does not match the recomputed one.
///
/// Reported, never raised: the on-disk data is still returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityWarning {
    /// Migration identifier.
    pub id: String,
    /// File the migration was read from.
    pub file: String,
    /// Checksum recorded in the ledger or in the file.
    pub expected: String,
    /// Checksum recomputed from the file contents.
    pub actual: String,
}

impl std::fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "checksum mismatch for migration '{}' ({}): expected {}, found {}",
            self.id, self.file, self.expected, self.actual
        )
    }
}
