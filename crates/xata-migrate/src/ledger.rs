//! The migrations ledger.
//!
//! A plain-text file listing, one per line and in application order, the
//! `{id}_{checksum8}` key of every migration stored in the directory. The
//! ledger is the source of truth for which files belong to the history.

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::{MigrateError, Result};
use crate::migration::{short_checksum, CHECKSUM_PREFIX_LEN};

/// Ledger file name inside the migrations directory.
pub const LEDGER_FILE: &str = ".ledger";

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerEntry {
    /// Migration identifier.
    pub id: String,
    /// Checksum prefix.
    pub checksum: String,
}

impl LedgerEntry {
    /// Creates an entry, keeping only the checksum prefix.
    #[must_use]
    pub fn new(id: impl Into<String>, checksum: &str) -> Self {
        Self {
            id: id.into(),
            checksum: short_checksum(checksum).to_string(),
        }
    }

    /// Parses a `{id}_{checksum8}` key. The id may itself contain underscores.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (id, checksum) = line.rsplit_once('_').ok_or_else(|| {
            MigrateError::validation("ledger entry", format!("'{line}' has no checksum suffix"))
        })?;
        if id.is_empty() {
            return Err(MigrateError::validation(
                "ledger entry",
                format!("'{line}' has an empty id"),
            ));
        }
        let valid = checksum.len() == CHECKSUM_PREFIX_LEN
            && checksum
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !valid {
            return Err(MigrateError::validation(
                "ledger entry",
                format!("'{line}' does not end with {CHECKSUM_PREFIX_LEN} lowercase hex characters"),
            ));
        }
        Ok(Self {
            id: id.to_string(),
            checksum: checksum.to_string(),
        })
    }

    /// Name of the file holding this migration.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{self}.json")
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.id, self.checksum)
    }
}

/// Ordered list of ledger entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses ledger contents. Blank lines are ignored; duplicate ids are not.
    pub fn parse(content: &str) -> Result<Self> {
        let mut ledger = Self::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            ledger.push(LedgerEntry::parse(line)?)?;
        }
        Ok(ledger)
    }

    /// Reads the ledger of a directory. A missing ledger is empty.
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(LEDGER_FILE);
        if !path.exists() {
            return Ok(Self::new());
        }
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Replaces the ledger of a directory, through a temporary file.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let tmp = dir.join(format!("{LEDGER_FILE}.tmp"));
        fs::write(&tmp, self.to_string())?;
        fs::rename(tmp, dir.join(LEDGER_FILE))?;
        Ok(())
    }

    /// Appends entries to the ledger file of a directory.
    pub fn append(dir: &Path, entries: &[LedgerEntry]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LEDGER_FILE))?;
        for entry in entries {
            writeln!(file, "{entry}")?;
        }
        file.sync_all()?;
        Ok(())
    }

    /// Adds an entry at the end.
    pub fn push(&mut self, entry: LedgerEntry) -> Result<()> {
        if self.contains(&entry.id) {
            return Err(MigrateError::validation(
                "ledger",
                format!("migration '{}' is listed twice", entry.id),
            ));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Returns the entries in order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Returns true if a migration is listed.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// File names of every listed migration.
    #[must_use]
    pub fn file_names(&self) -> HashSet<String> {
        self.entries.iter().map(LedgerEntry::file_name).collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}
