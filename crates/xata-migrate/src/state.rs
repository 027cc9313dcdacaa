//! Schema reconstruction from migrations.
//!
//! Replays operations onto a [`LogicalSchema`], yielding the schema a
//! migration history produces. Column types and link metadata are recovered
//! from the physical definitions and their comments.

use std::collections::BTreeMap;

use crate::column_type::{
    constraint_name, from_physical_type, to_physical_type, ColumnComment, ColumnType,
};
use crate::error::{MigrateError, Result};
use crate::migration::MigrationUnit;
use crate::operations::{ColumnDefinition, ConstraintType, Operation};
use crate::schema::{
    CheckConstraintSchema, ForeignKeySchema, LinkTarget, LogicalColumn, LogicalSchema,
    LogicalTable, UniqueConstraint,
};

/// Reconstructs a logical schema by replaying operations.
#[derive(Debug, Default)]
pub struct SchemaState {
    schema: LogicalSchema,
    /// Index name to owning table.
    indexes: BTreeMap<String, String>,
}

impl SchemaState {
    /// Creates a new empty schema state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing schema.
    #[must_use]
    pub fn from_schema(schema: LogicalSchema) -> Self {
        Self {
            schema,
            indexes: BTreeMap::new(),
        }
    }

    /// Returns the current schema.
    #[must_use]
    pub fn schema(&self) -> &LogicalSchema {
        &self.schema
    }

    /// Consumes and returns the schema.
    #[must_use]
    pub fn into_schema(self) -> LogicalSchema {
        self.schema
    }

    /// Applies a migration's operations to the schema state.
    pub fn apply_migration(&mut self, migration: &MigrationUnit) -> Result<()> {
        self.apply_operations(migration.operations())
    }

    /// Applies operations in order, stopping at the first invalid one.
    pub fn apply_operations(&mut self, operations: &[Operation]) -> Result<()> {
        for operation in operations {
            self.apply_operation(operation)?;
        }
        Ok(())
    }

    /// Applies a single operation to the schema state.
    pub fn apply_operation(&mut self, operation: &Operation) -> Result<()> {
        match operation {
            Operation::CreateTable(op) => {
                if self.schema.get_table(&op.name).is_some() {
                    return Err(MigrateError::InvalidState(format!(
                        "Table '{}' already exists",
                        op.name
                    )));
                }
                let mut table = LogicalTable::new(op.name.clone());
                table.comment.clone_from(&op.comment);
                for definition in &op.columns {
                    table = table.column(logical_column(definition)?);
                }
                self.schema.tables.insert(op.name.clone(), table);
            }

            Operation::DropTable(op) => {
                if self.schema.tables.remove(&op.name).is_none() {
                    return Err(missing_table(&op.name));
                }
                self.indexes.retain(|_, table| *table != op.name);
            }

            Operation::RenameTable(op) => {
                if self.schema.get_table(&op.to).is_some() {
                    return Err(MigrateError::InvalidState(format!(
                        "Table '{}' already exists",
                        op.to
                    )));
                }
                let mut table = self
                    .schema
                    .tables
                    .remove(&op.from)
                    .ok_or_else(|| missing_table(&op.from))?;
                table.name.clone_from(&op.to);
                self.schema.tables.insert(op.to.clone(), table);
                for owner in self.indexes.values_mut() {
                    if *owner == op.from {
                        owner.clone_from(&op.to);
                    }
                }
            }

            Operation::AddColumn(op) => {
                let table = self.table_mut(&op.table)?;
                if table.get_column(&op.column.name).is_some() {
                    return Err(MigrateError::InvalidState(format!(
                        "Column '{}' already exists in table '{}'",
                        op.column.name, op.table
                    )));
                }
                let column = logical_column(&op.column)?;
                table.columns.insert(column.name.clone(), column);
            }

            Operation::DropColumn(op) => {
                let table = self.table_mut(&op.table)?;
                if table.columns.remove(&op.column).is_none() {
                    return Err(missing_column(&op.column, &op.table));
                }
            }

            Operation::RenameColumn(op) => {
                let table = self.table_mut(&op.table)?;
                if table.get_column(&op.to).is_some() {
                    return Err(MigrateError::InvalidState(format!(
                        "Column '{}' already exists in table '{}'",
                        op.to, op.table
                    )));
                }
                let mut column = table
                    .columns
                    .remove(&op.from)
                    .ok_or_else(|| missing_column(&op.from, &op.table))?;
                column.name.clone_from(&op.to);
                table.columns.insert(op.to.clone(), column);
            }

            Operation::AlterColumn(op) => {
                let table = self.table_mut(&op.table)?;
                let column = table
                    .columns
                    .get_mut(&op.column)
                    .ok_or_else(|| missing_column(&op.column, &op.table))?;

                let physical = op
                    .column_type
                    .clone()
                    .unwrap_or_else(|| to_physical_type(&column.column_type));
                if let Some(comment) = &op.comment {
                    column.column_type = from_physical_type(&physical, Some(comment.as_str()))?;
                    apply_comment(column, Some(comment.as_str()));
                } else if op.column_type.is_some() {
                    column.column_type = from_physical_type(&physical, column.comment.as_deref())?;
                }
                if let Some(nullable) = op.nullable {
                    column.nullable = nullable;
                }
                if let Some(unique) = op.unique {
                    column.unique = unique;
                }
            }

            Operation::CreateIndex(op) => {
                self.table_mut(&op.table)?;
                if self.indexes.contains_key(&op.name) {
                    return Err(MigrateError::InvalidState(format!(
                        "Index '{}' already exists",
                        op.name
                    )));
                }
                self.indexes.insert(op.name.clone(), op.table.clone());
            }

            Operation::DropIndex(op) => {
                if self.indexes.remove(&op.name).is_none() {
                    return Err(MigrateError::InvalidState(format!(
                        "Index '{}' does not exist",
                        op.name
                    )));
                }
            }

            Operation::CreateConstraint(op) => {
                let table = self.table_mut(&op.table)?;
                if op.constraint_type == ConstraintType::Check && is_derived_check(table, &op.name) {
                    return Ok(());
                }
                if has_constraint(table, &op.name) {
                    return Err(MigrateError::InvalidState(format!(
                        "Constraint '{}' already exists in table '{}'",
                        op.name, op.table
                    )));
                }
                match op.constraint_type {
                    ConstraintType::Unique => {
                        table.unique_constraints.insert(
                            op.name.clone(),
                            UniqueConstraint {
                                name: op.name.clone(),
                                columns: op.columns.clone(),
                            },
                        );
                    }
                    ConstraintType::Check => {
                        table.check_constraints.insert(
                            op.name.clone(),
                            CheckConstraintSchema {
                                name: op.name.clone(),
                                columns: op.columns.clone(),
                                definition: op.check.clone().unwrap_or_default(),
                            },
                        );
                    }
                    ConstraintType::ForeignKey => {
                        let references = op.references.as_ref().ok_or_else(|| {
                            MigrateError::InvalidState(format!(
                                "Foreign key '{}' has no referenced table",
                                op.name
                            ))
                        })?;
                        table.foreign_keys.insert(
                            op.name.clone(),
                            ForeignKeySchema {
                                name: op.name.clone(),
                                columns: op.columns.clone(),
                                referenced_table: references.table.clone(),
                                referenced_columns: references.columns.clone(),
                                on_delete: references.on_delete.clone(),
                            },
                        );
                    }
                }
            }

            Operation::DropConstraint(op) => {
                let table = self.table_mut(&op.table)?;
                let removed = table.unique_constraints.remove(&op.name).is_some()
                    || table.check_constraints.remove(&op.name).is_some()
                    || table.foreign_keys.remove(&op.name).is_some();
                if !removed && !is_derived_check(table, &op.name) {
                    return Err(MigrateError::InvalidState(format!(
                        "Constraint '{}' does not exist in table '{}'",
                        op.name, op.table
                    )));
                }
            }

            Operation::Sql(_) => {
                // Raw SQL doesn't affect the tracked schema state
            }
        }

        Ok(())
    }

    /// Applies multiple migrations in order.
    pub fn apply_migrations(&mut self, migrations: &[MigrationUnit]) -> Result<()> {
        for migration in migrations {
            self.apply_migration(migration)?;
        }
        Ok(())
    }

    /// Reconstructs schema from a list of migrations.
    pub fn from_migrations(migrations: &[MigrationUnit]) -> Result<Self> {
        let mut state = Self::new();
        state.apply_migrations(migrations)?;
        Ok(state)
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut LogicalTable> {
        self.schema
            .get_table_mut(name)
            .ok_or_else(|| missing_table(name))
    }
}

fn missing_table(name: &str) -> MigrateError {
    MigrateError::InvalidState(format!("Table '{name}' does not exist"))
}

fn missing_column(column: &str, table: &str) -> MigrateError {
    MigrateError::InvalidState(format!(
        "Column '{column}' does not exist in table '{table}'"
    ))
}

fn has_constraint(table: &LogicalTable, name: &str) -> bool {
    table.unique_constraints.contains_key(name)
        || table.check_constraints.contains_key(name)
        || table.foreign_keys.contains_key(name)
}

/// Derived CHECK constraints belong to their column's logical type and are
/// not tracked as table constraints.
fn is_derived_check(table: &LogicalTable, name: &str) -> bool {
    table.columns.keys().any(|column| {
        ColumnType::ALL
            .into_iter()
            .any(|t| constraint_name(&table.name, column, t) == name)
    })
}

/// Replaces the column's metadata with what `comment` encodes. Free-form
/// comments are kept as is, an empty one clears it.
fn apply_comment(column: &mut LogicalColumn, comment: Option<&str>) {
    column.comment = None;
    column.link = None;
    column.vector_dimension = None;
    column.file_default_public_access = None;
    match comment.filter(|c| !c.is_empty()).map(|c| (c, ColumnComment::parse(c))) {
        Some((_, Some(meta))) => {
            column.link = meta.link.map(|table| LinkTarget { table });
            column.vector_dimension = meta.dimension;
            column.file_default_public_access = meta.file_default_public_access;
        }
        Some((raw, None)) => column.comment = Some(raw.to_string()),
        None => {}
    }
}

/// Lifts a physical definition back to a logical column. Metadata comments
/// are decoded into the column's fields, free-form comments are kept.
fn logical_column(definition: &ColumnDefinition) -> Result<LogicalColumn> {
    let column_type = from_physical_type(&definition.column_type, definition.comment.as_deref())?;
    let mut column = LogicalColumn::new(definition.name.clone(), column_type);
    column.nullable = definition.nullable;
    column.unique = definition.unique;
    column.default.clone_from(&definition.default);
    apply_comment(&mut column, definition.comment.as_deref());
    Ok(column)
}
