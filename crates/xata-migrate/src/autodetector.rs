//! Schema differ.
//!
//! Compares two logical schema snapshots and produces the ordered operations
//! that transform the source into the target. Platform-maintained columns
//! never take part in the comparison.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::column_type::{comment_for, constraint_for, to_physical_type, zero_value_for};
use crate::operations::{AlterColumnOp, ColumnDefinition, ForeignKeyReference, Operation};
use crate::schema::{LogicalColumn, LogicalSchema, LogicalTable};

/// Options for the autodetector.
#[derive(Debug, Clone)]
pub struct AutodetectorOptions {
    /// Whether to detect renamed tables (heuristic).
    pub detect_renames: bool,
    /// Similarity threshold for rename detection (0.0 to 1.0).
    pub rename_threshold: f64,
}

impl Default for AutodetectorOptions {
    fn default() -> Self {
        Self {
            detect_renames: false,
            rename_threshold: 0.7,
        }
    }
}

impl AutodetectorOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables rename detection.
    #[must_use]
    pub fn with_rename_detection(mut self) -> Self {
        self.detect_renames = true;
        self
    }

    /// Sets the column-name similarity required to call a table renamed.
    #[must_use]
    pub fn rename_threshold(mut self, threshold: f64) -> Self {
        self.rename_threshold = threshold;
        self
    }
}

/// Detects schema changes and generates migration operations.
#[derive(Debug, Default)]
pub struct Autodetector {
    options: AutodetectorOptions,
}

/// Per-table operations, grouped so each group is emitted across all tables
/// before the next one starts.
#[derive(Default)]
struct TableChanges {
    added: Vec<Operation>,
    dropped: Vec<Operation>,
    altered: Vec<Operation>,
}

impl Autodetector {
    /// Creates a new autodetector with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new autodetector with custom options.
    #[must_use]
    pub fn with_options(options: AutodetectorOptions) -> Self {
        Self { options }
    }

    /// Compares two schemas and returns the operations needed to transform
    /// `source` into `target`.
    ///
    /// Emission order is fixed: table renames, then column additions, column
    /// drops and column alterations of existing tables, then table drops and
    /// finally table creations. Names are visited in lexicographic order,
    /// except that a new table is created after the new tables it links to.
    #[must_use]
    pub fn diff(&self, source: &LogicalSchema, target: &LogicalSchema) -> Vec<Operation> {
        let source_names: BTreeSet<&str> = source.table_names().collect();
        let target_names: BTreeSet<&str> = target.table_names().collect();

        let mut created: BTreeSet<&str> =
            target_names.difference(&source_names).copied().collect();
        let mut dropped: BTreeSet<&str> =
            source_names.difference(&target_names).copied().collect();

        let renames = if self.options.detect_renames {
            self.detect_renames(source, target, &dropped, &created)
        } else {
            BTreeMap::new()
        };
        for (old, new) in &renames {
            dropped.remove(old);
            created.remove(new);
        }

        // (source table, target table) pairs compared column by column.
        let mut pairs: Vec<(&LogicalTable, &LogicalTable)> = source_names
            .intersection(&target_names)
            .filter_map(|name| Some((source.get_table(name)?, target.get_table(name)?)))
            .collect();
        for (old, new) in &renames {
            if let (Some(from), Some(to)) = (source.get_table(old), target.get_table(new)) {
                pairs.push((from, to));
            }
        }
        pairs.sort_by(|a, b| a.1.name.cmp(&b.1.name));

        let mut changes = TableChanges::default();
        for (from, to) in pairs {
            self.diff_table(from, to, target, &mut changes);
        }

        let mut operations: Vec<Operation> = renames
            .iter()
            .map(|(old, new)| Operation::rename_table(*old, *new))
            .collect();
        operations.extend(changes.added);
        operations.extend(changes.dropped);
        operations.extend(changes.altered);
        operations.extend(dropped.iter().map(|name| Operation::drop_table(*name)));
        operations.extend(
            creation_order(&created, target)
                .into_iter()
                .filter_map(|name| target.get_table(name))
                .map(|table| create_table(table, target)),
        );

        debug!(
            operations = operations.len(),
            renamed = renames.len(),
            "computed schema diff"
        );
        operations
    }

    /// Collects column-level changes between two versions of a table.
    fn diff_table(
        &self,
        from: &LogicalTable,
        to: &LogicalTable,
        target: &LogicalSchema,
        changes: &mut TableChanges,
    ) {
        let table = to.name.as_str();
        let from_cols: BTreeMap<&str, &LogicalColumn> =
            from.user_columns().map(|c| (c.name.as_str(), c)).collect();
        let to_cols: BTreeMap<&str, &LogicalColumn> =
            to.user_columns().map(|c| (c.name.as_str(), c)).collect();

        for (name, column) in &to_cols {
            if !from_cols.contains_key(name) {
                if column.link_target().is_some() && !column.nullable && column.default.is_none() {
                    warn!(
                        table,
                        column = %column.name,
                        "NOT NULL link without a default: existing rows cannot be backfilled"
                    );
                }
                let mut definition = ColumnDefinition::derived(table, column);
                definition.check = None;
                definition.references = link_reference(column, target);
                changes.added.push(Operation::add_column(table, definition));
            }
        }

        for name in from_cols.keys() {
            if !to_cols.contains_key(name) {
                changes.dropped.push(Operation::drop_column(table, *name));
            }
        }

        for (name, from_col) in &from_cols {
            if let Some(to_col) = to_cols.get(name) {
                changes
                    .altered
                    .extend(self.diff_column(table, from_col, to_col));
            }
        }
    }

    /// Compares two columns. Returns an alteration carrying only the changed
    /// facets, followed by the swap of the derived CHECK constraint when the
    /// logical type (or vector dimension) changed.
    #[allow(clippy::unused_self)]
    fn diff_column(&self, table: &str, from: &LogicalColumn, to: &LogicalColumn) -> Vec<Operation> {
        let mut alter = AlterColumnOp::new(table, to.name.clone());
        let quoted = format!("\"{}\"", to.name);
        let mut up: Option<String> = None;
        let mut down: Option<String> = None;

        let from_type = to_physical_type(&from.column_type);
        let to_type = to_physical_type(&to.column_type);
        if from_type != to_type {
            up = Some(format!("CAST({quoted} AS {to_type})"));
            down = Some(format!("CAST({quoted} AS {from_type})"));
            alter.column_type = Some(to_type);
        }

        if from.nullable != to.nullable {
            alter.nullable = Some(to.nullable);
            if to.nullable {
                let value = down.take().unwrap_or_else(|| quoted.clone());
                let zero = zero_value_for(&from.column_type, from.default.as_deref());
                down = Some(format!("COALESCE({value}, {zero})"));
            } else {
                let value = up.take().unwrap_or_else(|| quoted.clone());
                let zero = zero_value_for(&to.column_type, to.default.as_deref());
                up = Some(format!("COALESCE({value}, {zero})"));
            }
        }

        if from.unique != to.unique {
            alter.unique = Some(to.unique);
        }

        // Derived metadata only exists for logical types; physical
        // pass-through columns keep whatever the database has.
        let mut checks = Vec::new();
        if from.column_type.logical().is_some() && to.column_type.logical().is_some() {
            let from_comment = comment_for(from).or_else(|| from.comment.clone());
            let to_comment = comment_for(to).or_else(|| to.comment.clone());
            if from_comment != to_comment {
                alter.comment = Some(to_comment.unwrap_or_default());
            }

            let from_check = constraint_for(table, from);
            let to_check = constraint_for(table, to);
            if from_check != to_check {
                if let Some(old) = from_check {
                    checks.push(Operation::drop_constraint(table, old.name));
                }
                if let Some(new) = to_check {
                    checks.push(Operation::create_check(table, to.name.clone(), new));
                }
            }
        }

        alter.up = up;
        alter.down = down;
        let mut operations = Vec::with_capacity(checks.len() + 1);
        if !alter.is_empty() {
            operations.push(Operation::AlterColumn(alter));
        }
        operations.extend(checks);
        operations
    }

    /// Pairs dropped and created tables whose column names overlap enough.
    fn detect_renames<'a>(
        &self,
        source: &'a LogicalSchema,
        target: &'a LogicalSchema,
        dropped: &BTreeSet<&'a str>,
        created: &BTreeSet<&'a str>,
    ) -> BTreeMap<&'a str, &'a str> {
        let mut renames = BTreeMap::new();
        let mut taken = BTreeSet::new();
        for &old in dropped {
            let Some(old_table) = source.get_table(old) else {
                continue;
            };
            for &new in created {
                if taken.contains(new) {
                    continue;
                }
                let Some(new_table) = target.get_table(new) else {
                    continue;
                };
                if self.tables_similar(old_table, new_table) {
                    renames.insert(old, new);
                    taken.insert(new);
                    break;
                }
            }
        }
        renames
    }

    /// Checks if two tables are similar (for rename detection).
    #[allow(clippy::cast_precision_loss)]
    fn tables_similar(&self, a: &LogicalTable, b: &LogicalTable) -> bool {
        let a_cols: BTreeSet<&str> = a.user_columns().map(|c| c.name.as_str()).collect();
        let b_cols: BTreeSet<&str> = b.user_columns().map(|c| c.name.as_str()).collect();

        let common = a_cols.intersection(&b_cols).count();
        let total = a_cols.union(&b_cols).count();

        if total == 0 {
            return false;
        }

        let similarity = common as f64 / total as f64;
        similarity >= self.options.rename_threshold
    }
}

/// Computes the operations transforming `source` into `target` with default
/// options.
#[must_use]
pub fn diff(source: &LogicalSchema, target: &LogicalSchema) -> Vec<Operation> {
    Autodetector::new().diff(source, target)
}

/// Orders new tables so that link targets among them are created first.
/// Ties, and tables caught in a link cycle, fall back to name order.
fn creation_order<'a>(created: &BTreeSet<&'a str>, target: &LogicalSchema) -> Vec<&'a str> {
    let links: BTreeMap<&str, BTreeSet<String>> = created
        .iter()
        .map(|&name| {
            let targets = target
                .get_table(name)
                .map(|table| {
                    table
                        .user_columns()
                        .filter_map(LogicalColumn::link_target)
                        .filter(|linked| linked != name && created.contains(linked.as_str()))
                        .collect()
                })
                .unwrap_or_default();
            (name, targets)
        })
        .collect();

    let mut pending = created.clone();
    let mut ordered = Vec::with_capacity(created.len());
    while !pending.is_empty() {
        let ready = pending.iter().copied().find(|name| {
            links
                .get(name)
                .map_or(true, |targets| targets.iter().all(|t| !pending.contains(t.as_str())))
        });
        let Some(next) = ready.or_else(|| pending.iter().next().copied()) else {
            break;
        };
        pending.remove(next);
        ordered.push(next);
    }
    ordered
}

fn create_table(table: &LogicalTable, target: &LogicalSchema) -> Operation {
    let columns = table
        .user_columns()
        .map(|column| {
            let mut definition = ColumnDefinition::derived(&table.name, column);
            definition.references = link_reference(column, target);
            definition
        })
        .collect();
    let comment = table.comment.clone().filter(|c| !c.is_empty());
    Operation::create_table(table.name.clone(), comment, columns)
}

/// Foreign key for a link column, only when its target table exists.
fn link_reference(column: &LogicalColumn, target: &LogicalSchema) -> Option<ForeignKeyReference> {
    let linked = column.link_target()?;
    if target.get_table(&linked).is_none() {
        debug!(column = %column.name, table = %linked, "link target not found, no reference emitted");
        return None;
    }
    Some(ForeignKeyReference::link(&column.name, linked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_type::ColumnType;
    use crate::schema::LogicalColumn;

    fn detector() -> Autodetector {
        Autodetector::new()
    }

    fn users() -> LogicalTable {
        LogicalTable::new("users")
            .column(LogicalColumn::new("xata_id", ColumnType::Text).not_null().unique())
            .column(LogicalColumn::new("name", ColumnType::String))
    }

    #[test]
    fn test_diff_is_empty_for_identical_schemas() {
        let schema = LogicalSchema::new().table(users()).table(
            LogicalTable::new("posts")
                .column(LogicalColumn::new("title", ColumnType::Text))
                .column(LogicalColumn::new("author", ColumnType::Link).link("users")),
        );
        assert!(detector().diff(&schema, &schema).is_empty());
    }

    #[test]
    fn test_add_and_drop_columns() {
        let from = LogicalSchema::new().table(
            LogicalTable::new("one")
                .column(LogicalColumn::new("id", "integer").unique())
                .column(LogicalColumn::new("colToDelete", ColumnType::Text)),
        );
        let to = LogicalSchema::new().table(
            LogicalTable::new("one")
                .column(LogicalColumn::new("id", "integer").unique())
                .column(LogicalColumn::new("newCol", ColumnType::Text)),
        );

        let ops = detector().diff(&from, &to);
        assert_eq!(ops.len(), 2);
        match &ops[0] {
            Operation::AddColumn(op) => {
                assert_eq!(op.table, "one");
                assert_eq!(op.column.name, "newCol");
                assert_eq!(op.column.column_type, "text");
                assert!(op.column.nullable);
                assert!(!op.column.unique);
                assert!(op.column.check.is_none());
                assert!(op.up.is_none());
            }
            _ => panic!("Expected AddColumn"),
        }
        assert_eq!(ops[1], Operation::drop_column("one", "colToDelete"));
    }

    #[test]
    fn test_detect_new_table() {
        let to = LogicalSchema::new().table(
            LogicalTable::new("one")
                .column(LogicalColumn::new("xata_id", ColumnType::Text).not_null())
                .column(LogicalColumn::new("xata_version", ColumnType::Int).not_null())
                .column(LogicalColumn::new("id", "integer").unique())
                .column(LogicalColumn::new("a", ColumnType::Text).unique()),
        );

        let ops = detector().diff(&LogicalSchema::new(), &to);
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            Operation::CreateTable(op) => {
                assert_eq!(op.name, "one");
                let names: Vec<&str> = op.columns.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, vec!["a", "id"]);
                assert!(op.columns.iter().all(|c| c.unique));
                assert_eq!(op.columns[1].column_type, "integer");
                assert_eq!(
                    op.columns[0].check.as_ref().map(|c| c.name.as_str()),
                    Some("one_xata_text_length_a")
                );
            }
            _ => panic!("Expected CreateTable"),
        }
    }

    #[test]
    fn test_detect_dropped_table() {
        let from = LogicalSchema::new().table(users());
        let ops = detector().diff(&from, &LogicalSchema::new());
        assert_eq!(ops, vec![Operation::drop_table("users")]);
    }

    #[test]
    fn test_internal_columns_are_ignored() {
        let from = LogicalSchema::new().table(
            LogicalTable::new("users").column(LogicalColumn::new("name", ColumnType::String)),
        );
        let to = LogicalSchema::new().table(users().column(
            LogicalColumn::new("xata_updatedat", ColumnType::Datetime).not_null(),
        ));
        assert!(detector().diff(&from, &to).is_empty());
    }

    #[test]
    fn test_alter_carries_only_changed_facets() {
        let from = LogicalSchema::new().table(users());
        let to = LogicalSchema::new().table(
            users().column(LogicalColumn::new("name", ColumnType::String).unique()),
        );

        let ops = detector().diff(&from, &to);
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            Operation::AlterColumn(op) => {
                assert_eq!(op.unique, Some(true));
                assert!(op.nullable.is_none());
                assert!(op.column_type.is_none());
                assert!(op.up.is_none());
            }
            _ => panic!("Expected AlterColumn"),
        }
    }

    #[test]
    fn test_set_not_null_backfills() {
        let from = LogicalSchema::new().table(users());
        let to = LogicalSchema::new().table(
            users().column(LogicalColumn::new("name", ColumnType::String).not_null()),
        );

        let ops = detector().diff(&from, &to);
        match &ops[0] {
            Operation::AlterColumn(op) => {
                assert_eq!(op.nullable, Some(false));
                assert_eq!(op.up.as_deref(), Some("COALESCE(\"name\", '')"));
                assert!(ops[0].validate().is_ok());
            }
            _ => panic!("Expected AlterColumn"),
        }
    }

    #[test]
    fn test_type_change_carries_casts() {
        let from = LogicalSchema::new().table(
            LogicalTable::new("users").column(LogicalColumn::new("age", ColumnType::Text)),
        );
        let to = LogicalSchema::new().table(
            LogicalTable::new("users").column(LogicalColumn::new("age", ColumnType::Int)),
        );

        let ops = detector().diff(&from, &to);
        match &ops[0] {
            Operation::AlterColumn(op) => {
                assert_eq!(op.column_type.as_deref(), Some("bigint"));
                assert_eq!(op.up.as_deref(), Some("CAST(\"age\" AS bigint)"));
                assert_eq!(op.down.as_deref(), Some("CAST(\"age\" AS text)"));
            }
            _ => panic!("Expected AlterColumn"),
        }
    }

    #[test]
    fn test_same_physical_type_is_not_a_change() {
        let from = LogicalSchema::new().table(
            LogicalTable::new("users").column(LogicalColumn::new("bio", ColumnType::Text)),
        );
        let to = LogicalSchema::new().table(
            LogicalTable::new("users").column(LogicalColumn::new("bio", "text")),
        );
        assert!(detector().diff(&from, &to).is_empty());
    }

    #[test]
    fn test_logical_type_change_on_shared_physical_type() {
        let from = LogicalSchema::new().table(
            LogicalTable::new("users").column(LogicalColumn::new("contact", ColumnType::String)),
        );
        let to = LogicalSchema::new().table(
            LogicalTable::new("users").column(LogicalColumn::new("contact", ColumnType::Email)),
        );

        let ops = detector().diff(&from, &to);
        assert_eq!(ops.len(), 3);
        match &ops[0] {
            Operation::AlterColumn(op) => {
                assert!(op.column_type.is_none());
                assert_eq!(op.comment.as_deref(), Some(r#"{"xata.type":"email"}"#));
            }
            _ => panic!("Expected AlterColumn"),
        }
        assert_eq!(
            ops[1],
            Operation::drop_constraint("users", "users_xata_string_length_contact")
        );
        match &ops[2] {
            Operation::CreateConstraint(op) => {
                assert_eq!(op.name, "users_xata_email_length_contact");
                assert_eq!(op.columns, vec!["contact"]);
                assert_eq!(
                    op.check.as_deref(),
                    Some("xata_private.is_valid_email(\"contact\")")
                );
            }
            _ => panic!("Expected CreateConstraint"),
        }
        assert!(ops.iter().all(|op| op.validate().is_ok()));

        // Back to plain text clears the type tag.
        let to = LogicalSchema::new().table(
            LogicalTable::new("users").column(LogicalColumn::new("contact", ColumnType::Text)),
        );
        match &detector().diff(&from, &to)[0] {
            Operation::AlterColumn(op) => assert_eq!(op.comment.as_deref(), Some("")),
            _ => panic!("Expected AlterColumn"),
        }
    }

    #[test]
    fn test_vector_dimension_change_swaps_check() {
        let column = LogicalColumn::new("embedding", ColumnType::Vector);
        let from = LogicalSchema::new()
            .table(LogicalTable::new("docs").column(column.clone().vector_dimension(3)));
        let to = LogicalSchema::new()
            .table(LogicalTable::new("docs").column(column.vector_dimension(4)));

        let kinds: Vec<&str> = detector().diff(&from, &to).iter().map(Operation::kind).collect();
        assert_eq!(kinds, vec!["alter_column", "drop_constraint", "create_constraint"]);
    }

    #[test]
    fn test_drop_not_null_keeps_backfill_for_rollback() {
        let from = LogicalSchema::new().table(
            users().column(LogicalColumn::new("name", ColumnType::String).not_null()),
        );
        let to = LogicalSchema::new().table(users());

        let ops = detector().diff(&from, &to);
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            Operation::AlterColumn(op) => {
                assert_eq!(op.nullable, Some(true));
                assert!(op.up.is_none());
                assert_eq!(op.down.as_deref(), Some("COALESCE(\"name\", '')"));
            }
            _ => panic!("Expected AlterColumn"),
        }
        let reversed = ops[0].reverse().unwrap();
        assert!(reversed.validate().is_ok());
    }

    #[test]
    fn test_internal_only_table_is_created_empty() {
        let to = LogicalSchema::new().table(
            LogicalTable::new("events")
                .column(LogicalColumn::new("xata_id", ColumnType::Text).not_null())
                .column(LogicalColumn::new("xata_version", ColumnType::Int).not_null()),
        );

        let ops = detector().diff(&LogicalSchema::new(), &to);
        assert_eq!(ops, vec![Operation::create_table("events", None, Vec::new())]);
        assert!(ops[0].validate().is_ok());
    }

    #[test]
    fn test_not_null_link_is_still_emitted() {
        let from = LogicalSchema::new()
            .table(users())
            .table(LogicalTable::new("teams"));
        let to = LogicalSchema::new().table(users()).table(
            LogicalTable::new("teams")
                .column(LogicalColumn::new("owner", ColumnType::Link).link("users").not_null()),
        );

        let ops = detector().diff(&from, &to);
        match &ops[0] {
            Operation::AddColumn(op) => {
                assert!(!op.column.nullable);
                assert_eq!(op.up.as_deref(), Some("null"));
                assert!(op.column.references.is_some());
            }
            _ => panic!("Expected AddColumn"),
        }
        assert!(ops[0].validate().is_ok());
    }

    #[test]
    fn test_new_tables_follow_their_link_targets() {
        let link = |name: &str, table: &str| LogicalColumn::new(name, ColumnType::Link).link(table);
        let to = LogicalSchema::new()
            .table(LogicalTable::new("users").column(link("team", "teams")))
            .table(LogicalTable::new("posts").column(link("author", "users")))
            .table(LogicalTable::new("teams").column(LogicalColumn::new("n", ColumnType::Text)))
            .table(LogicalTable::new("audit").column(link("parent", "audit")));

        let ops = detector().diff(&LogicalSchema::new(), &to);
        let created: Vec<&str> = ops.iter().filter_map(Operation::table).collect();
        assert_eq!(created, vec!["audit", "teams", "users", "posts"]);

        // A cycle cannot be ordered; name order decides.
        let to = LogicalSchema::new()
            .table(LogicalTable::new("a").column(link("b_ref", "b")))
            .table(LogicalTable::new("b").column(link("a_ref", "a")));
        let ops = detector().diff(&LogicalSchema::new(), &to);
        let created: Vec<&str> = ops.iter().filter_map(Operation::table).collect();
        assert_eq!(created, vec!["a", "b"]);
    }

    #[test]
    fn test_link_reference_requires_target_table() {
        let posts = LogicalTable::new("posts")
            .column(LogicalColumn::new("author", ColumnType::Link).link("users"));

        let ops = detector().diff(&LogicalSchema::new(), &LogicalSchema::new().table(posts.clone()));
        match &ops[0] {
            Operation::CreateTable(op) => assert!(op.columns[0].references.is_none()),
            _ => panic!("Expected CreateTable"),
        }

        let target = LogicalSchema::new().table(users()).table(posts);
        let ops = detector().diff(&LogicalSchema::new(), &target);
        let Some(Operation::CreateTable(op)) = ops.iter().find(|op| op.table() == Some("posts"))
        else {
            panic!("Expected CreateTable for posts");
        };
        let reference = op.columns[0].references.as_ref().unwrap();
        assert_eq!(reference.name, "author_link");
        assert_eq!(reference.table, "users");
        assert_eq!(
            op.columns[0].comment.as_deref(),
            Some(r#"{"xata.link":"users"}"#)
        );
    }

    #[test]
    fn test_emission_order() {
        let from = LogicalSchema::new()
            .table(LogicalTable::new("b").column(LogicalColumn::new("old", ColumnType::Int)))
            .table(LogicalTable::new("gone").column(LogicalColumn::new("x", ColumnType::Int)));
        let to = LogicalSchema::new()
            .table(LogicalTable::new("a").column(LogicalColumn::new("x", ColumnType::Int)))
            .table(
                LogicalTable::new("b")
                    .column(LogicalColumn::new("old", ColumnType::Int).not_null().default("1"))
                    .column(LogicalColumn::new("new", ColumnType::Int)),
            );

        let kinds: Vec<&str> = detector().diff(&from, &to).iter().map(Operation::kind).collect();
        assert_eq!(
            kinds,
            vec!["add_column", "alter_column", "drop_table", "create_table"]
        );
    }

    #[test]
    fn test_diff_is_deterministic() {
        let from = LogicalSchema::new().table(users());
        let to = LogicalSchema::new()
            .table(LogicalTable::new("z").column(LogicalColumn::new("a", ColumnType::Json)))
            .table(LogicalTable::new("m").column(LogicalColumn::new("b", ColumnType::Email)));

        let first = detector().diff(&from, &to);
        for _ in 0..10 {
            assert_eq!(detector().diff(&from, &to), first);
        }
    }

    #[test]
    fn test_detect_table_rename() {
        let from = LogicalSchema::new().table(users());
        let to = LogicalSchema::new().table(LogicalTable {
            name: "accounts".to_string(),
            ..users()
        });

        let detector =
            Autodetector::with_options(AutodetectorOptions::new().with_rename_detection());
        let ops = detector.diff(&from, &to);
        assert_eq!(ops, vec![Operation::rename_table("users", "accounts")]);

        // Off by default.
        let ops = Autodetector::new().diff(&from, &to);
        let kinds: Vec<&str> = ops.iter().map(Operation::kind).collect();
        assert_eq!(kinds, vec!["drop_table", "create_table"]);
    }
}
