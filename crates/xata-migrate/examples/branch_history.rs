//! Example: Keeping a branch's migration history in sync
//!
//! Diffs two versions of a blog schema, records the result in a scratch
//! migrations directory, and rebases it onto a remote history that moved on
//! in the meantime.
//!
//! Run with: cargo run --example branch_history -p xata-migrate

use xata_migrate::prelude::*;

fn users() -> LogicalTable {
    LogicalTable::new("users")
        .column(LogicalColumn::new("xata_id", ColumnType::Text).not_null().unique())
        .column(LogicalColumn::new("username", ColumnType::String).not_null().unique())
        .column(LogicalColumn::new("email", ColumnType::Email))
}

fn posts() -> LogicalTable {
    LogicalTable::new("posts")
        .column(LogicalColumn::new("title", ColumnType::String).not_null())
        .column(LogicalColumn::new("body", ColumnType::Text))
        .column(LogicalColumn::new("author", ColumnType::Link).link("users"))
        .column(LogicalColumn::new("cover", ColumnType::File))
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!(" XATA-MIGRATE: Branch History Example");
    println!("{}", "=".repeat(70));
    println!();

    let scratch = std::env::temp_dir().join(format!("xata-migrate-{}", std::process::id()));
    let dir = MigrationDirectory::new(scratch.join("migrations"));

    // Initial schema: users only
    println!("[1] Creating the users table...");
    let v1 = LogicalSchema::new().table(users());
    let initial = MigrationUnit::versioned("mig_0001_users", None, diff(&LogicalSchema::new(), &v1));
    dir.write(std::slice::from_ref(&initial))?;
    println!("    {}\n", initial.description());

    // Second schema: posts, and a flag on users
    println!("[2] Adding posts and an active flag...");
    let v2 = LogicalSchema::new()
        .table(users().column(LogicalColumn::new("active", ColumnType::Bool).not_null()))
        .table(posts());
    let operations = diff(&v1, &v2);
    println!("{}", serde_json::to_string_pretty(&operations)?);
    let local = MigrationUnit::versioned(
        "mig_0002_posts",
        Some(initial.id().to_string()),
        operations,
    );
    dir.write(std::slice::from_ref(&local))?;
    println!();

    // Meanwhile the remote branch got an inferred migration
    println!("[3] Rebasing onto the remote history...");
    let remote = vec![
        initial.clone(),
        MigrationUnit::inferred(
            "mig_0002_search",
            Some(initial.id().to_string()),
            "CREATE INDEX users_email_idx ON users (email)",
        ),
    ];
    match plan_push(&dir.read()?.migrations, &remote) {
        Err(e) => println!("    push refused: {e}"),
        Ok(plan) => println!("    unexpected plan: {plan:?}"),
    }
    let rebased = rebase(&dir.read()?.migrations, &remote)?;
    dir.rewrite(&rebased)?;

    let history = dir.read()?;
    for (unit, checksum) in history.migrations.iter().zip(&history.checksums) {
        println!("    {} [{}]", unit.description(), &checksum[..8]);
    }
    println!();

    // Replaying the history gives back the target schema
    println!("[4] Replaying the history...");
    let state = SchemaState::from_migrations(&history.migrations)?;
    println!(
        "    tables: {}",
        state.schema().table_names().collect::<Vec<_>>().join(", ")
    );

    std::fs::remove_dir_all(&scratch)?;
    Ok(())
}
