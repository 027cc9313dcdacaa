//! Integration tests for the migration engine.
//!
//! These tests diff schema snapshots given as JSON, store the resulting
//! migrations in a real directory, and reconcile that directory with a
//! remote history.

use std::fs;

use serde_json::json;
use xata_migrate::prelude::*;

fn schema(value: serde_json::Value) -> LogicalSchema {
    serde_json::from_value(value).unwrap()
}

fn scratch() -> (tempfile::TempDir, MigrationDirectory) {
    let tmp = tempfile::tempdir().unwrap();
    let dir = MigrationDirectory::new(tmp.path().join("migrations"));
    (tmp, dir)
}

fn ids(units: &[MigrationUnit]) -> Vec<&str> {
    units.iter().map(MigrationUnit::id).collect()
}

// =============================================================================
// Diffing remote schema snapshots
// =============================================================================

#[test]
fn test_add_and_drop_columns_from_json_snapshots() {
    let source = schema(json!({"tables": {"one": {
        "name": "one",
        "columns": {
            "id": {"name": "id", "type": "integer", "nullable": false, "unique": true},
            "colToDelete": {"name": "colToDelete", "type": "text", "nullable": true, "unique": false}
        },
        "comment": "",
        "primaryKey": ["id"]
    }}}));
    let target = schema(json!({"tables": {"one": {
        "name": "one",
        "columns": {
            "id": {"name": "id", "type": "integer", "nullable": false, "unique": true},
            "newCol": {"name": "newCol", "type": "text", "nullable": true, "unique": false}
        },
        "comment": "",
        "primaryKey": ["id"]
    }}}));

    let operations = serde_json::to_value(diff(&source, &target)).unwrap();
    assert_eq!(
        operations,
        json!([
            {"add_column": {
                "table": "one",
                "column": {"name": "newCol", "type": "text", "nullable": true, "unique": false}
            }},
            {"drop_column": {"table": "one", "column": "colToDelete"}}
        ])
    );
}

#[test]
fn test_internal_columns_never_produce_operations() {
    let source = schema(json!({"tables": {"users": {
        "name": "users",
        "columns": {"name": {"name": "name", "type": "string"}}
    }}}));
    let target = schema(json!({"tables": {"users": {
        "name": "users",
        "columns": {
            "name": {"name": "name", "type": "string"},
            "xata_id": {"name": "xata_id", "type": "text", "nullable": false, "unique": true},
            "xata_version": {"name": "xata_version", "type": "integer", "nullable": false},
            "xata_createdat": {"name": "xata_createdat", "type": "datetime", "nullable": false},
            "xata_updatedat": {"name": "xata_updatedat", "type": "datetime", "nullable": false}
        }
    }}}));

    assert!(diff(&source, &target).is_empty());
    assert!(diff(&target, &source).is_empty());
    assert!(diff(&target, &target).is_empty());
}

/// Schema pairs covering the edges of the differ: empty and internal-only
/// tables, logical type changes on a shared physical type, type changes that
/// tighten nullability, link columns and derived metadata.
fn edge_schemas() -> Vec<(LogicalSchema, LogicalSchema)> {
    let internal = |table: LogicalTable| {
        table
            .column(LogicalColumn::new("xata_id", ColumnType::Text).not_null().unique())
            .column(LogicalColumn::new("xata_version", ColumnType::Int).not_null())
    };
    let users = || internal(LogicalTable::new("users"));

    vec![
        (
            LogicalSchema::new(),
            LogicalSchema::new().table(internal(LogicalTable::new("events"))),
        ),
        (
            LogicalSchema::new().table(LogicalTable::new("empty")),
            LogicalSchema::new().table(
                LogicalTable::new("empty").column(LogicalColumn::new("note", ColumnType::Text)),
            ),
        ),
        (
            LogicalSchema::new().table(
                users()
                    .column(LogicalColumn::new("contact", ColumnType::String))
                    .column(LogicalColumn::new("age", ColumnType::Text)),
            ),
            LogicalSchema::new().table(
                users()
                    .column(LogicalColumn::new("contact", ColumnType::Email).not_null())
                    .column(LogicalColumn::new("age", ColumnType::Int).not_null())
                    .column(LogicalColumn::new("joined", ColumnType::Datetime).not_null()),
            ),
        ),
        (
            LogicalSchema::new().table(users()),
            LogicalSchema::new()
                .table(users().column(LogicalColumn::new("tags", ColumnType::Multiple).not_null()))
                .table(
                    LogicalTable::new("posts")
                        .column(LogicalColumn::new("author", ColumnType::Link).link("users").not_null())
                        .column(LogicalColumn::new("cover", ColumnType::File).not_null()),
                )
                .table(
                    LogicalTable::new("docs")
                        .column(LogicalColumn::new("embedding", ColumnType::Vector).vector_dimension(3))
                        .column(LogicalColumn::new("files", ColumnType::FileArray)),
                ),
        ),
        (
            LogicalSchema::new().table(
                LogicalTable::new("docs")
                    .column(LogicalColumn::new("embedding", ColumnType::Vector).vector_dimension(3))
                    .column(LogicalColumn::new("score", ColumnType::Float).not_null().unique()),
            ),
            LogicalSchema::new().table(
                LogicalTable::new("docs")
                    .column(LogicalColumn::new("embedding", ColumnType::Vector).vector_dimension(4))
                    .column(LogicalColumn::new("score", ColumnType::String)),
            ),
        ),
    ]
}

#[test]
fn test_generated_operations_survive_the_whole_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let mut case = 0;
    for (a, b) in edge_schemas() {
        for (source, target) in [(&a, &b), (&b, &a)] {
            case += 1;
            let operations = diff(source, target);

            for operation in &operations {
                assert!(operation.validate().is_ok(), "case {case}: {operation:?}");
                let value = serde_json::to_value(operation).unwrap();
                assert_eq!(&Operation::from_value(value).unwrap(), operation);

                assert_eq!(operation.is_reversible(), operation.reverse().is_some());
                if let Some(reversed) = operation.reverse() {
                    assert!(
                        reversed.validate().is_ok(),
                        "case {case}: {operation:?} reversed to {reversed:?}"
                    );
                }
            }

            let dir = MigrationDirectory::new(tmp.path().join(format!("case_{case}")));
            let unit = MigrationUnit::versioned("mig_a", None, operations.clone());
            dir.write(std::slice::from_ref(&unit)).unwrap();
            let history = dir.read().unwrap();
            assert!(history.warnings.is_empty());
            assert_eq!(history.migrations, vec![unit]);

            let mut state = SchemaState::from_schema(source.clone());
            state.apply_operations(&operations).unwrap();
            assert!(
                diff(state.schema(), target).is_empty(),
                "case {case}: replay left {:?}",
                diff(state.schema(), target)
            );
        }
    }
}

// =============================================================================
// Migrations directory
// =============================================================================

#[test]
fn test_untracked_file_is_reported_by_name() {
    let (_tmp, dir) = scratch();
    dir.write(&[MigrationUnit::versioned("mig_a", None, vec![Operation::drop_table("t")])])
        .unwrap();
    fs::write(dir.path().join("mig_abc123_def45678.json"), "{}\n").unwrap();

    match dir.read().unwrap_err() {
        MigrateError::Desync { file, .. } => assert_eq!(file, "mig_abc123_def45678.json"),
        other => panic!("Expected Desync, got {other:?}"),
    }
}

#[test]
fn test_checksums_survive_the_file_round_trip() {
    let (_tmp, dir) = scratch();
    let units = vec![
        MigrationUnit::versioned(
            "mig_a",
            None,
            diff(
                &LogicalSchema::new(),
                &LogicalSchema::new().table(
                    LogicalTable::new("users")
                        .column(LogicalColumn::new("email", ColumnType::Email).unique()),
                ),
            ),
        ),
        MigrationUnit::inferred("mig_b", Some("mig_a".into()), "ALTER TABLE users ADD x int"),
    ];
    dir.write(&units).unwrap();

    let history = dir.read().unwrap();
    assert!(history.warnings.is_empty());
    assert_eq!(history.migrations, units);

    for unit in &units {
        let reparsed: MigrationUnit =
            serde_json::from_str(&serde_json::to_string(unit).unwrap()).unwrap();
        assert_eq!(
            compute_checksum(&reparsed, None).unwrap(),
            compute_checksum(unit, None).unwrap()
        );
    }
}

#[test]
fn test_file_layout() {
    let (_tmp, dir) = scratch();
    let entries = dir
        .write(&[MigrationUnit::legacy("mig_a", None, vec![Operation::drop_table("t")])])
        .unwrap();

    let ledger = fs::read_to_string(dir.path().join(".ledger")).unwrap();
    assert_eq!(ledger, format!("{}\n", entries[0]));

    let content = fs::read_to_string(dir.path().join(entries[0].file_name())).unwrap();
    assert!(content.ends_with("}\n"));
    let stored: serde_json::Value = serde_json::from_str(&content).unwrap();
    let checksum = stored["checksum"].as_str().unwrap();
    assert!(checksum.starts_with(&entries[0].checksum));
    assert_eq!(stored["operations"], json!([{"drop_table": {"name": "t"}}]));
}

// =============================================================================
// Reconciling with a remote history
// =============================================================================

#[test]
fn test_rebase_then_push() {
    let (_tmp, dir) = scratch();
    let a = MigrationUnit::versioned("mig_a", None, vec![Operation::drop_table("a")]);
    let b = MigrationUnit::versioned("mig_b", Some("mig_a".into()), vec![Operation::drop_table("b")]);
    let x = MigrationUnit::versioned("mig_x", Some("mig_a".into()), vec![Operation::drop_table("x")]);

    dir.write(&[a.clone(), x]).unwrap();
    let remote = vec![a, b];

    let local = dir.read().unwrap().migrations;
    assert!(matches!(
        plan_push(&local, &remote),
        Err(MigrateError::UnresolvedConflict { .. })
    ));

    dir.rewrite(&rebase(&local, &remote).unwrap()).unwrap();
    let local = dir.read().unwrap();
    assert!(local.warnings.is_empty());
    assert_eq!(ids(&local.migrations), vec!["mig_a", "mig_b", "mig_x"]);

    match plan_push(&local.migrations, &remote).unwrap() {
        PushPlan::Push(pending) => assert_eq!(ids(&pending), vec!["mig_x"]),
        PushPlan::UpToDate => panic!("Expected Push"),
    }
}

#[test]
fn test_identical_histories_are_a_noop() {
    let history = vec![
        MigrationUnit::versioned("mig_a", None, vec![Operation::drop_table("a")]),
        MigrationUnit::versioned("mig_b", Some("mig_a".into()), vec![Operation::drop_table("b")]),
    ];
    assert_eq!(reconcile(&history, &history).unwrap(), history);
    assert_eq!(plan_push(&history, &history).unwrap(), PushPlan::UpToDate);
}

#[test]
fn test_force_pull_recovers_from_desync_and_mixed_formats() {
    let (_tmp, dir) = scratch();
    dir.write(&[MigrationUnit::legacy("mig_old", None, vec![Operation::drop_table("t")])])
        .unwrap();
    fs::write(dir.path().join("stray_0badc0de.json"), "{}\n").unwrap();
    assert!(matches!(dir.read(), Err(MigrateError::Desync { .. })));

    let remote = vec![MigrationUnit::versioned("mig_new", None, vec![Operation::drop_table("t")])];
    assert!(matches!(
        reconcile(
            &[MigrationUnit::legacy("mig_old", None, Vec::new())],
            &remote
        ),
        Err(MigrateError::FormatMismatch { .. })
    ));

    dir.rewrite(&pull(&[], &remote, true).unwrap()).unwrap();
    let history = dir.read().unwrap();
    assert_eq!(ids(&history.migrations), vec!["mig_new"]);
}

#[test]
fn test_replaying_history_rebuilds_schema() {
    let v1 = LogicalSchema::new().table(
        LogicalTable::new("users").column(LogicalColumn::new("name", ColumnType::String)),
    );
    let v2 = LogicalSchema::new()
        .table(
            LogicalTable::new("users")
                .column(LogicalColumn::new("name", ColumnType::String).not_null())
                .column(LogicalColumn::new("score", ColumnType::Float)),
        )
        .table(
            LogicalTable::new("teams")
                .column(LogicalColumn::new("owner", ColumnType::Link).link("users")),
        );

    let history = vec![
        MigrationUnit::versioned("mig_1", None, diff(&LogicalSchema::new(), &v1)),
        MigrationUnit::versioned("mig_2", Some("mig_1".into()), diff(&v1, &v2)),
    ];
    let state = SchemaState::from_migrations(&history).unwrap();
    assert_eq!(state.schema(), &v2);
    assert!(diff(state.schema(), &v2).is_empty());
}
