//! Local migration history.
//!
//! A migrations directory holds one JSON file per migration plus the
//! [`Ledger`] listing them in order. Reads verify the checksum chain and
//! report mismatches without failing; untracked or missing files are errors.
//! Appends never touch existing files, and wholesale rewrites are staged in a
//! sibling directory and swapped in by rename.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{IntegrityWarning, MigrateError, Result};
use crate::ledger::{Ledger, LedgerEntry, LEDGER_FILE};
use crate::migration::{compute_checksum, short_checksum, MigrationUnit};

/// Default location of the migrations directory.
pub const DEFAULT_MIGRATIONS_DIR: &str = ".xata/migrations";

/// Migrations read from disk, with any checksum mismatches found.
#[derive(Debug, Clone, Default)]
pub struct LocalHistory {
    /// Migrations in ledger order.
    pub migrations: Vec<MigrationUnit>,
    /// Recomputed checksum of each migration.
    pub checksums: Vec<String>,
    /// Checksum mismatches. The migrations are returned regardless.
    pub warnings: Vec<IntegrityWarning>,
}

impl LocalHistory {
    /// Checksum of the last migration, the parent of the next one.
    #[must_use]
    pub fn head_checksum(&self) -> Option<&str> {
        self.checksums.last().map(String::as_str)
    }
}

/// A directory of checksummed migration files.
#[derive(Debug, Clone)]
pub struct MigrationDirectory {
    dir: PathBuf,
}

impl MigrationDirectory {
    /// Creates a handle on a directory. Nothing is read or created yet.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Reads the ledger.
    pub fn ledger(&self) -> Result<Ledger> {
        Ledger::read(&self.dir)
    }

    /// Reads every migration listed in the ledger, in order.
    ///
    /// A migration file the ledger does not list fails with
    /// [`MigrateError::Desync`]; a listed file that is absent fails with
    /// [`MigrateError::MissingMigrationFile`]. Checksum mismatches are logged
    /// and returned as warnings.
    pub fn read(&self) -> Result<LocalHistory> {
        if !self.dir.exists() {
            return Ok(LocalHistory::default());
        }
        let ledger = self.ledger()?;
        self.check_untracked(&ledger)?;

        let mut history = LocalHistory::default();
        for entry in ledger.entries() {
            let file = entry.file_name();
            let path = self.dir.join(&file);
            if !path.exists() {
                return Err(MigrateError::MissingMigrationFile {
                    id: entry.id.clone(),
                    path,
                });
            }
            let unit = read_unit(&path)?;
            if unit.id() != entry.id {
                return Err(MigrateError::validation(
                    file,
                    format!("declares id '{}' but the ledger lists '{}'", unit.id(), entry.id),
                ));
            }

            let checksum = compute_checksum(&unit, history.head_checksum())?;
            let mut expected = vec![entry.checksum.as_str()];
            expected.extend(unit.stored_checksum());
            for stored in expected {
                if stored != checksum && stored != short_checksum(&checksum) {
                    warn!(
                        id = %entry.id,
                        file = %file,
                        expected = %stored,
                        actual = %short_checksum(&checksum),
                        "migration checksum mismatch"
                    );
                    history.warnings.push(IntegrityWarning {
                        id: entry.id.clone(),
                        file: file.clone(),
                        expected: stored.to_string(),
                        actual: checksum.clone(),
                    });
                }
            }

            history.checksums.push(checksum);
            history.migrations.push(unit);
        }

        debug!(
            dir = %self.dir.display(),
            migrations = history.migrations.len(),
            warnings = history.warnings.len(),
            "read local migrations"
        );
        Ok(history)
    }

    /// Appends migrations after the existing ones.
    ///
    /// Each unit is chained to the checksum of the one before it. Every unit
    /// is validated before anything is written. Files are written first and
    /// the ledger extended last; nothing already recorded is modified.
    pub fn write(&self, units: &[MigrationUnit]) -> Result<Vec<LedgerEntry>> {
        for unit in units {
            unit.validate()?;
        }
        fs::create_dir_all(&self.dir)?;
        let existing = self.read()?;
        let ledger = self.ledger()?;

        let mut parent = existing.head_checksum().map(str::to_string);
        let mut entries = Vec::with_capacity(units.len());
        for unit in units {
            if ledger.contains(unit.id()) || entries.iter().any(|e: &LedgerEntry| e.id == unit.id())
            {
                return Err(MigrateError::validation(
                    "migration",
                    format!("'{}' is already recorded", unit.id()),
                ));
            }
            let checksum = compute_checksum(unit, parent.as_deref())?;
            entries.push(write_unit(&self.dir, unit, &checksum)?);
            parent = Some(checksum);
        }

        Ledger::append(&self.dir, &entries)?;
        info!(dir = %self.dir.display(), count = entries.len(), "appended migrations");
        Ok(entries)
    }

    /// Replaces the whole history with `units`.
    ///
    /// The new files and ledger are written to a sibling staging directory,
    /// the current directory is moved aside, the staging directory takes its
    /// place, and only then is the old one removed.
    pub fn rewrite(&self, units: &[MigrationUnit]) -> Result<Vec<LedgerEntry>> {
        for unit in units {
            unit.validate()?;
        }
        let staging = self.sibling("staging")?;
        let backup = self.sibling("backup")?;
        if backup.exists() {
            return Err(MigrateError::validation(
                "migrations directory",
                format!(
                    "a previous rewrite left {} behind; inspect it before retrying",
                    backup.display()
                ),
            ));
        }
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let mut ledger = Ledger::new();
        let mut parent: Option<String> = None;
        for unit in units {
            let checksum = compute_checksum(unit, parent.as_deref())?;
            ledger.push(write_unit(&staging, unit, &checksum)?)?;
            parent = Some(checksum);
        }
        ledger.write(&staging)?;

        if self.dir.exists() {
            fs::rename(&self.dir, &backup)?;
        }
        if let Err(e) = fs::rename(&staging, &self.dir) {
            if backup.exists() {
                if let Err(restore) = fs::rename(&backup, &self.dir) {
                    warn!(
                        backup = %backup.display(),
                        error = %restore,
                        "could not restore the previous migrations directory"
                    );
                }
            }
            return Err(e.into());
        }
        if backup.exists() {
            fs::remove_dir_all(&backup)?;
        }

        info!(dir = %self.dir.display(), count = ledger.len(), "rewrote migration history");
        Ok(ledger.entries().to_vec())
    }

    /// Removes every migration and the ledger.
    pub fn reset(&self) -> Result<()> {
        self.rewrite(&[]).map(|_| ())
    }

    /// Fails on the first migration file the ledger does not list.
    fn check_untracked(&self, ledger: &Ledger) -> Result<()> {
        let tracked = ledger.file_names();
        let mut untracked: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| {
                name.ends_with(".json") && !name.starts_with('.') && !tracked.contains(name)
            })
            .collect();
        untracked.sort();
        match untracked.into_iter().next() {
            Some(file) => Err(MigrateError::desync(file)),
            None => Ok(()),
        }
    }

    fn sibling(&self, suffix: &str) -> Result<PathBuf> {
        let name = self
            .dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                MigrateError::validation(
                    "migrations directory",
                    format!("{} has no usable name", self.dir.display()),
                )
            })?;
        Ok(self.dir.with_file_name(format!("{name}.{suffix}")))
    }
}

fn read_unit(path: &Path) -> Result<MigrationUnit> {
    let content = fs::read_to_string(path)?;
    let parse_error = |message: String| MigrateError::ParseError {
        path: path.to_path_buf(),
        message,
    };
    let value = serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?;
    MigrationUnit::from_value(value).map_err(|e| parse_error(e.to_string()))
}

fn write_unit(dir: &Path, unit: &MigrationUnit, checksum: &str) -> Result<LedgerEntry> {
    let entry = LedgerEntry::new(unit.id(), checksum);
    let stored = unit.clone().with_checksum(checksum);
    let mut content = serde_json::to_string_pretty(&stored)?;
    content.push('\n');
    fs::write(dir.join(entry.file_name()), content)?;
    debug!(id = %unit.id(), file = %entry.file_name(), "wrote migration");
    Ok(entry)
}
