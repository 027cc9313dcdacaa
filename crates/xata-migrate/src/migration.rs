//! Migration units and their checksum chain.
//!
//! Two on-disk formats exist: the legacy one (`{id, parent, checksum,
//! operations}`) and the versioned one produced by the online migration
//! service (`{name, parent, done, migrationType, startedAt, migration}`).
//! Both hash the same way: the canonical JSON of `{id, parentId,
//! parentChecksum, operations}`, chained through the parent checksum.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{MigrateError, Result};
use crate::operations::Operation;

/// Number of checksum hex characters kept in file names and ledger entries.
pub const CHECKSUM_PREFIX_LEN: usize = 8;

/// Storage format of a migration unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationFormat {
    /// `{id, parent, checksum, operations}`.
    Legacy,
    /// `{name, parent, done, migrationType, startedAt, migration}`.
    Versioned,
}

impl MigrationFormat {
    /// Detects the format of a raw unit: `migrationType` marks the versioned
    /// format, `id` the legacy one.
    #[must_use]
    pub fn detect(value: &Value) -> Option<Self> {
        if value.get("migrationType").is_some() {
            Some(Self::Versioned)
        } else if value.get("id").is_some() {
            Some(Self::Legacy)
        } else {
            None
        }
    }

    /// Returns the name of this format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Versioned => "versioned",
        }
    }
}

impl fmt::Display for MigrationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a versioned migration was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationType {
    /// Authored operations run by the online migration tool.
    Pgroll,
    /// Raw SQL captured outside the online migration tool.
    Inferred,
}

/// A migration in the legacy format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyMigration {
    /// Migration identifier.
    pub id: String,
    /// Identifier of the previous migration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Stored checksum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Operations, in application order.
    pub operations: Vec<Operation>,
}

/// Payload of a versioned migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationBody {
    /// Migration name, equal to the unit name.
    pub name: String,
    /// Operations, in application order.
    pub operations: Vec<Operation>,
}

/// A migration in the versioned format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedMigration {
    /// Migration identifier.
    pub name: String,
    /// Identifier of the previous migration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Whether the migration has been completed on the branch.
    #[serde(default)]
    pub done: bool,
    /// How the migration was produced.
    pub migration_type: MigrationType,
    /// When the migration was started.
    pub started_at: DateTime<Utc>,
    /// Operations.
    pub migration: MigrationBody,
}

/// One migration, in either format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MigrationUnit {
    /// Legacy format.
    Legacy(LegacyMigration),
    /// Versioned format.
    Versioned(VersionedMigration),
}

impl MigrationUnit {
    /// Creates a legacy unit.
    #[must_use]
    pub fn legacy(id: impl Into<String>, parent: Option<String>, operations: Vec<Operation>) -> Self {
        Self::Legacy(LegacyMigration {
            id: id.into(),
            parent,
            checksum: None,
            operations,
        })
    }

    /// Creates a versioned unit stamped with the current time.
    #[must_use]
    pub fn versioned(
        name: impl Into<String>,
        parent: Option<String>,
        operations: Vec<Operation>,
    ) -> Self {
        let name = name.into();
        Self::Versioned(VersionedMigration {
            name: name.clone(),
            parent,
            done: false,
            migration_type: MigrationType::Pgroll,
            started_at: Utc::now(),
            migration: MigrationBody { name, operations },
        })
    }

    /// Creates an inferred unit wrapping raw SQL that already ran.
    #[must_use]
    pub fn inferred(name: impl Into<String>, parent: Option<String>, sql: impl Into<String>) -> Self {
        let name = name.into();
        Self::Versioned(VersionedMigration {
            name: name.clone(),
            parent,
            done: true,
            migration_type: MigrationType::Inferred,
            started_at: Utc::now(),
            migration: MigrationBody {
                name,
                operations: vec![Operation::sql(sql, None)],
            },
        })
    }

    /// Parses a unit, detecting its format and validating every operation.
    pub fn from_value(value: Value) -> Result<Self> {
        let format = MigrationFormat::detect(&value).ok_or_else(|| {
            MigrateError::validation(
                "migration",
                "expected a `migrationType` (versioned) or an `id` (legacy) field",
            )
        })?;
        let unit = match format {
            MigrationFormat::Legacy => Self::Legacy(
                serde_json::from_value(value)
                    .map_err(|e| MigrateError::validation("legacy migration", e.to_string()))?,
            ),
            MigrationFormat::Versioned => Self::Versioned(
                serde_json::from_value(value)
                    .map_err(|e| MigrateError::validation("versioned migration", e.to_string()))?,
            ),
        };
        unit.validate()?;
        Ok(unit)
    }

    /// Validates every operation of the unit.
    pub fn validate(&self) -> Result<()> {
        self.operations().iter().try_for_each(Operation::validate)
    }

    /// Returns the migration identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Legacy(m) => &m.id,
            Self::Versioned(m) => &m.name,
        }
    }

    /// Returns the identifier of the previous migration.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        match self {
            Self::Legacy(m) => m.parent.as_deref(),
            Self::Versioned(m) => m.parent.as_deref(),
        }
    }

    /// Returns the operations.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        match self {
            Self::Legacy(m) => &m.operations,
            Self::Versioned(m) => &m.migration.operations,
        }
    }

    /// Returns the storage format.
    #[must_use]
    pub const fn format(&self) -> MigrationFormat {
        match self {
            Self::Legacy(_) => MigrationFormat::Legacy,
            Self::Versioned(_) => MigrationFormat::Versioned,
        }
    }

    /// Returns the migration type of versioned units.
    #[must_use]
    pub const fn migration_type(&self) -> Option<MigrationType> {
        match self {
            Self::Legacy(_) => None,
            Self::Versioned(m) => Some(m.migration_type),
        }
    }

    /// Returns the checksum recorded inside legacy files.
    #[must_use]
    pub fn stored_checksum(&self) -> Option<&str> {
        match self {
            Self::Legacy(m) => m.checksum.as_deref(),
            Self::Versioned(_) => None,
        }
    }

    /// Returns the unit with `checksum` recorded, for formats that store it.
    #[must_use]
    pub fn with_checksum(self, checksum: &str) -> Self {
        match self {
            Self::Legacy(m) => Self::Legacy(LegacyMigration {
                checksum: Some(checksum.to_string()),
                ..m
            }),
            other @ Self::Versioned(_) => other,
        }
    }

    /// Returns a human-readable one-line summary.
    #[must_use]
    pub fn description(&self) -> String {
        let count = self.operations().len();
        let kind = match self.migration_type() {
            Some(MigrationType::Inferred) => " (inferred)",
            _ => "",
        };
        format!(
            "{}{kind}: {count} operation{}",
            self.id(),
            if count == 1 { "" } else { "s" }
        )
    }
}

impl<'de> Deserialize<'de> for MigrationUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Serializes a value as compact JSON with object keys sorted at every level.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    sort_keys(value).to_string()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, sort_keys(v))).collect();
            let mut out = Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Computes the checksum of a unit chained to its parent's checksum.
///
/// Only the identity, parent link and operations are hashed; timestamps and
/// completion flags do not affect it.
pub fn compute_checksum(unit: &MigrationUnit, parent_checksum: Option<&str>) -> Result<String> {
    let payload = json!({
        "id": unit.id(),
        "parentId": unit.parent(),
        "parentChecksum": parent_checksum,
        "operations": serde_json::to_value(unit.operations())?,
    });
    let digest = Sha256::digest(canonical_json(&payload).as_bytes());
    Ok(format!("{digest:x}"))
}

/// Computes the checksum of every unit, chaining each to the previous one.
pub fn chain_checksums(units: &[MigrationUnit]) -> Result<Vec<String>> {
    let mut checksums: Vec<String> = Vec::with_capacity(units.len());
    for unit in units {
        let checksum = compute_checksum(unit, checksums.last().map(String::as_str))?;
        checksums.push(checksum);
    }
    Ok(checksums)
}

/// Returns the prefix of a checksum used in file names and the ledger.
#[must_use]
pub fn short_checksum(checksum: &str) -> &str {
    checksum.get(..CHECKSUM_PREFIX_LEN).unwrap_or(checksum)
}

/// Generates an identifier for a new migration.
#[must_use]
pub fn generate_migration_id() -> String {
    format!("mig_{}", Utc::now().format("%Y%m%d%H%M%S%3f"))
}
