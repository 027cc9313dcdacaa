//! Reconciliation of local and remote migration histories.
//!
//! Histories are linear. The remote one is authoritative: reconciling keeps
//! it whole and replays the local-only suffix on top, unmodified. Anything
//! that is not a clean prefix relationship is reported as a conflict rather
//! than merged.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::error::{MigrateError, Result, FORCE_RESYNC_COMMAND};
use crate::migration::MigrationUnit;

/// What pushing local migrations would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushPlan {
    /// The remote already has every local migration.
    UpToDate,
    /// Local-only migrations to send, in order.
    Push(Vec<MigrationUnit>),
}

/// Where local and remote histories meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonPrefix {
    /// Index in the local history of the first remote migration.
    pub offset: usize,
    /// Number of migrations shared from there on.
    pub len: usize,
}

/// Local and remote histories compared by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Migrations known to both sides, counted from the anchor.
    pub common: usize,
    /// Local migrations after the common prefix.
    pub local_only: Vec<String>,
    /// Remote migrations after the common prefix.
    pub remote_only: Vec<String>,
}

impl SyncStatus {
    /// Returns true when neither side has anything the other lacks.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.local_only.is_empty() && self.remote_only.is_empty()
    }
}

/// Finds the longest run of remote migrations that also appears, in order,
/// in the local history.
///
/// The local history may start earlier than the remote one, so the run is
/// anchored at the local position of the first remote migration.
#[must_use]
pub fn common_prefix(local: &[MigrationUnit], remote: &[MigrationUnit]) -> CommonPrefix {
    let Some(first) = remote.first() else {
        return CommonPrefix { offset: 0, len: 0 };
    };
    let Some(offset) = local.iter().position(|u| u.id() == first.id()) else {
        return CommonPrefix { offset: 0, len: 0 };
    };
    let len = local[offset..]
        .iter()
        .zip(remote)
        .take_while(|(l, r)| l.id() == r.id())
        .count();
    CommonPrefix { offset, len }
}

/// Refuses mixed formats, within either history or across them.
pub fn check_formats(local: &[MigrationUnit], remote: &[MigrationUnit]) -> Result<()> {
    let local_formats = formats(local);
    let remote_formats = formats(remote);
    let mixed = local_formats.len() > 1
        || remote_formats.len() > 1
        || (!local_formats.is_empty()
            && !remote_formats.is_empty()
            && local_formats != remote_formats);
    if mixed {
        return Err(MigrateError::FormatMismatch {
            local: describe(&local_formats),
            remote: describe(&remote_formats),
            remediation: FORCE_RESYNC_COMMAND.to_string(),
        });
    }
    Ok(())
}

/// Combines the histories: everything local before the anchor, the remote
/// history, then the local migrations past the common prefix.
///
/// Fails with [`MigrateError::UnresolvedConflict`] when a local-only
/// migration also appears in the remote history outside the common prefix,
/// which means the two histories diverged.
pub fn reconcile(local: &[MigrationUnit], remote: &[MigrationUnit]) -> Result<Vec<MigrationUnit>> {
    check_formats(local, remote)?;
    let prefix = common_prefix(local, remote);
    let before = &local[..prefix.offset];
    let after = &local[prefix.offset + prefix.len..];

    let remote_ids: HashSet<&str> = remote.iter().map(MigrationUnit::id).collect();
    if let Some(unit) = before
        .iter()
        .chain(after)
        .find(|u| remote_ids.contains(u.id()))
    {
        let colliding = remote.get(prefix.len).map_or(unit.id(), MigrationUnit::id);
        return Err(MigrateError::UnresolvedConflict {
            local: unit.id().to_string(),
            remote: colliding.to_string(),
        });
    }

    debug!(
        common = prefix.len,
        anchor = prefix.offset,
        local_only = after.len(),
        "reconciled histories"
    );
    Ok(before
        .iter()
        .chain(remote)
        .chain(after)
        .cloned()
        .collect())
}

/// Brings the local history up to date with the remote one.
///
/// With `force`, local state is discarded and the remote history returned
/// verbatim, which is the way out of a desync or a format mismatch.
pub fn pull(
    local: &[MigrationUnit],
    remote: &[MigrationUnit],
    force: bool,
) -> Result<Vec<MigrationUnit>> {
    if force {
        info!(remote = remote.len(), "discarding local history in favour of remote");
        return Ok(remote.to_vec());
    }
    reconcile(local, remote)
}

/// Replays local migrations not yet known to the remote on top of it.
pub fn rebase(local: &[MigrationUnit], remote: &[MigrationUnit]) -> Result<Vec<MigrationUnit>> {
    let result = reconcile(local, remote)?;
    let rebased = result.len().saturating_sub(remote.len());
    info!(remote = remote.len(), rebased, "rebased local migrations onto remote");
    Ok(result)
}

/// Decides which local migrations a push would send.
///
/// The remote must not have advanced past the common prefix while local
/// migrations are pending; that situation needs a pull or a rebase first.
pub fn plan_push(local: &[MigrationUnit], remote: &[MigrationUnit]) -> Result<PushPlan> {
    check_formats(local, remote)?;
    let prefix = common_prefix(local, remote);
    let pending = &local[prefix.offset + prefix.len..];

    let Some(first_pending) = pending.first() else {
        debug!("no new migrations to push");
        return Ok(PushPlan::UpToDate);
    };
    if let Some(ahead) = remote.get(prefix.len) {
        return Err(MigrateError::UnresolvedConflict {
            local: first_pending.id().to_string(),
            remote: ahead.id().to_string(),
        });
    }
    Ok(PushPlan::Push(pending.to_vec()))
}

/// Compares the histories without changing anything.
#[must_use]
pub fn status(local: &[MigrationUnit], remote: &[MigrationUnit]) -> SyncStatus {
    let prefix = common_prefix(local, remote);
    SyncStatus {
        common: prefix.len,
        local_only: local[prefix.offset + prefix.len..]
            .iter()
            .map(|u| u.id().to_string())
            .collect(),
        remote_only: remote[prefix.len..]
            .iter()
            .map(|u| u.id().to_string())
            .collect(),
    }
}

fn formats(units: &[MigrationUnit]) -> BTreeSet<&'static str> {
    units.iter().map(|u| u.format().as_str()).collect()
}

fn describe(formats: &BTreeSet<&'static str>) -> String {
    if formats.is_empty() {
        "none".to_string()
    } else {
        formats.iter().copied().collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::Operation;

    fn unit(id: &str) -> MigrationUnit {
        MigrationUnit::legacy(id, None, vec![Operation::drop_table(format!("t_{id}"))])
    }

    fn units(ids: &[&str]) -> Vec<MigrationUnit> {
        ids.iter().map(|id| unit(id)).collect()
    }

    fn ids(units: &[MigrationUnit]) -> Vec<&str> {
        units.iter().map(MigrationUnit::id).collect()
    }

    #[test]
    fn test_reconcile_identical_is_noop() {
        for history in [units(&[]), units(&["a"]), units(&["a", "b", "c"])] {
            assert_eq!(reconcile(&history, &history).unwrap(), history);
        }
    }

    #[test]
    fn test_reconcile_preserves_local_suffix() {
        let result = reconcile(&units(&["a", "b", "c"]), &units(&["a", "b"])).unwrap();
        assert_eq!(ids(&result), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reconcile_replays_local_on_top_of_remote() {
        let result = reconcile(&units(&["a", "x"]), &units(&["a", "b", "c"])).unwrap();
        assert_eq!(ids(&result), vec!["a", "b", "c", "x"]);

        let result = reconcile(&units(&["x"]), &units(&["a"])).unwrap();
        assert_eq!(ids(&result), vec!["a", "x"]);

        let result = reconcile(&units(&[]), &units(&["a", "b"])).unwrap();
        assert_eq!(ids(&result), vec!["a", "b"]);
    }

    #[test]
    fn test_reconcile_tolerates_earlier_local_anchor() {
        let result = reconcile(&units(&["root", "a", "b", "c"]), &units(&["a", "b"])).unwrap();
        assert_eq!(ids(&result), vec!["root", "a", "b", "c"]);
    }

    #[test]
    fn test_reconcile_rejects_diverged_history() {
        let err = reconcile(&units(&["a", "c", "b"]), &units(&["a", "b", "c"])).unwrap_err();
        match err {
            MigrateError::UnresolvedConflict { local, remote } => {
                assert_eq!(local, "c");
                assert_eq!(remote, "b");
            }
            other => panic!("Expected UnresolvedConflict, got {other:?}"),
        }
    }

    #[test]
    fn test_mixed_formats_are_refused() {
        let versioned = MigrationUnit::versioned("v", None, vec![Operation::drop_table("t")]);

        let err = reconcile(&[unit("a"), versioned.clone()], &[]).unwrap_err();
        assert!(matches!(err, MigrateError::FormatMismatch { .. }));

        let err = reconcile(&[unit("a")], &[versioned.clone()]).unwrap_err();
        match err {
            MigrateError::FormatMismatch {
                local,
                remote,
                remediation,
            } => {
                assert_eq!(local, "legacy");
                assert_eq!(remote, "versioned");
                assert_eq!(remediation, FORCE_RESYNC_COMMAND);
            }
            other => panic!("Expected FormatMismatch, got {other:?}"),
        }

        // Forcing skips the check entirely.
        let result = pull(&[unit("a")], &[versioned.clone()], true).unwrap();
        assert_eq!(result, vec![versioned]);
    }

    #[test]
    fn test_pull_without_force_reconciles() {
        let result = pull(&units(&["a", "x"]), &units(&["a", "b"]), false).unwrap();
        assert_eq!(ids(&result), vec!["a", "b", "x"]);
        let result = rebase(&units(&["a", "x"]), &units(&["a", "b"])).unwrap();
        assert_eq!(ids(&result), vec!["a", "b", "x"]);
    }

    #[test]
    fn test_plan_push() {
        assert_eq!(
            plan_push(&units(&["a", "b"]), &units(&["a", "b"])).unwrap(),
            PushPlan::UpToDate
        );
        assert_eq!(
            plan_push(&units(&["a"]), &units(&["a", "b"])).unwrap(),
            PushPlan::UpToDate
        );

        match plan_push(&units(&["a", "b", "c"]), &units(&["a"])).unwrap() {
            PushPlan::Push(pending) => assert_eq!(ids(&pending), vec!["b", "c"]),
            PushPlan::UpToDate => panic!("Expected Push"),
        }
        match plan_push(&units(&["a", "b"]), &[]).unwrap() {
            PushPlan::Push(pending) => assert_eq!(ids(&pending), vec!["a", "b"]),
            PushPlan::UpToDate => panic!("Expected Push"),
        }

        let err = plan_push(&units(&["a", "x"]), &units(&["a", "b"])).unwrap_err();
        assert!(matches!(err, MigrateError::UnresolvedConflict { .. }));
    }

    #[test]
    fn test_status() {
        let status = status(&units(&["a", "b", "x"]), &units(&["a", "b", "c"]));
        assert_eq!(status.common, 2);
        assert_eq!(status.local_only, vec!["x"]);
        assert_eq!(status.remote_only, vec!["c"]);
        assert!(!status.is_synced());
    }
}
