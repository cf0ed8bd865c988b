mod common;

use common::*;
use dtx_recovery::{Context, RecoveryError};
use dtx_transaction::PreparedTx;

#[test]
fn test_read_all_redo_empty() {
    let (db, twopc) = create_twopc();
    db.add_query(&twopc.queries().read_all_redo, redo_result(&[]));

    let logs = twopc.read_all_redo(&Context::background()).unwrap();
    assert!(logs.prepared.is_empty());
    assert!(logs.failed.is_empty());
}

#[test]
fn test_read_all_redo_single_statement() {
    let (db, twopc) = create_twopc();
    db.add_query(
        &twopc.queries().read_all_redo,
        redo_result(&["dtid0|1|1|1|stmt01"]),
    );

    let logs = twopc.read_all_redo(&Context::background()).unwrap();
    assert_eq!(
        logs.prepared,
        vec![PreparedTx::new("dtid0", at(1)).with_queries(["stmt01"])]
    );
    assert!(logs.failed.is_empty());
}

#[test]
fn test_read_all_redo_groups_statements() {
    let (db, twopc) = create_twopc();
    db.add_query(
        &twopc.queries().read_all_redo,
        redo_result(&[
            "dtid0|1|1|1|stmt01",
            "dtid0|1|1|1|stmt02",
            "dtid1|1|1|1|stmt11",
        ]),
    );

    let logs = twopc.read_all_redo(&Context::background()).unwrap();
    assert_eq!(
        logs.prepared,
        vec![
            PreparedTx::new("dtid0", at(1)).with_queries(["stmt01", "stmt02"]),
            PreparedTx::new("dtid1", at(1)).with_queries(["stmt11"]),
        ]
    );
}

#[test]
fn test_read_all_redo_splits_failed() {
    let (db, twopc) = create_twopc();
    db.add_query(
        &twopc.queries().read_all_redo,
        redo_result(&[
            "dtid0|1|1|1|stmt01",
            "dtid0|1|1|1|stmt02",
            "dtid1|Failed|1|1|stmt11",
            "dtid2|Failed|1|1|stmt21",
            "dtid2|Failed|1|1|stmt22",
            "dtid3|1|1|1|stmt31",
        ]),
    );

    let logs = twopc.read_all_redo(&Context::background()).unwrap();
    assert_eq!(
        logs.prepared,
        vec![
            PreparedTx::new("dtid0", at(1)).with_queries(["stmt01", "stmt02"]),
            PreparedTx::new("dtid3", at(1)).with_queries(["stmt31"]),
        ]
    );
    assert_eq!(
        logs.failed,
        vec![
            PreparedTx::new("dtid1", at(1)).with_queries(["stmt11"]),
            PreparedTx::new("dtid2", at(1)).with_queries(["stmt21", "stmt22"]),
        ]
    );
}

#[test]
fn test_read_all_redo_unknown_state() {
    let (db, twopc) = create_twopc();
    db.add_query(
        &twopc.queries().read_all_redo,
        redo_result(&["dtid0|1|1|1|stmt01", "dtid1|Committed|1|1|stmt11"]),
    );

    let err = twopc.read_all_redo(&Context::background()).unwrap_err();
    assert!(matches!(
        err,
        RecoveryError::Decode { ref dtid, row: 1, .. } if dtid.as_deref() == Some("dtid1")
    ));
    assert_eq!(db.in_use(), 0);
}

#[test]
fn test_read_all_redo_connection_error() {
    let (db, twopc) = create_twopc();
    db.fail_query("redo_state", "lost connection to shard");

    let err = twopc.read_all_redo(&Context::background()).unwrap_err();
    assert!(matches!(err, RecoveryError::Connection(_)));
    assert!(err.to_string().contains("lost connection to shard"));
    assert_eq!(db.acquired(), 1);
    assert_eq!(db.released(), 1);
}

#[test]
fn test_read_all_redo_acquire_error() {
    let (db, twopc) = create_twopc();
    db.fail_acquire("pool closed");

    let err = twopc.read_all_redo(&Context::background()).unwrap_err();
    assert!(matches!(err, RecoveryError::Connection(_)));
    assert_eq!(db.acquired(), 0);
    assert_eq!(db.released(), 0);
}

#[test]
fn test_read_all_redo_cancelled_midway() {
    let (db, twopc) = create_twopc();
    db.add_query(
        &twopc.queries().read_all_redo,
        redo_result(&["dtid0|1|1|1|stmt01"]),
    );
    db.cancel_during_query();

    let ctx = Context::background();
    let err = twopc.read_all_redo(&ctx).unwrap_err();
    assert!(err.is_cancelled());
    assert!(ctx.is_done());
    assert_eq!(db.in_use(), 0);
}
