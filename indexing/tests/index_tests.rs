//! Index scans against a real libmdbx environment.

use common::{DbResult, SmsRecord};
use indexing::keys::{self, KeyRange};
use indexing::{add_entries, count_matching, remove_entries, scan_keys, Env, IndexName};
use tempfile::TempDir;

fn open_env(dir: &TempDir) -> Env {
    let mut options = libmdbx::DatabaseOptions::default();
    options.max_tables = Some(8);
    let env = Env::open_with_options(dir.path(), options).expect("Failed to open env");

    let txn = env.begin_rw_txn().expect("Failed to begin txn");
    for index in IndexName::ALL {
        txn.create_table(Some(index.table_name()), libmdbx::TableFlags::empty())
            .expect("Failed to create table");
    }
    txn.commit().expect("Failed to commit");
    env
}

fn index_all(env: &Env, records: &[SmsRecord]) -> DbResult<()> {
    let txn = env.begin_rw_txn()?;
    for record in records {
        add_entries(&txn, record)?;
    }
    txn.commit()?;
    Ok(())
}

fn with_id(mut record: SmsRecord, id: u64) -> SmsRecord {
    record.id = id;
    record
}

#[test]
fn test_sender_scan_matches_exact_value_only() {
    let dir = TempDir::new().unwrap();
    let env = open_env(&dir);
    index_all(
        &env,
        &[
            with_id(SmsRecord::received("+1", "a", 1), 1),
            with_id(SmsRecord::received("+15", "b", 2), 2),
            with_id(SmsRecord::received("+1", "c", 3), 3),
        ],
    )
    .unwrap();

    let txn = env.begin_ro_txn().unwrap();
    let range = KeyRange::only(&keys::encode_str("+1").unwrap());
    let ids = scan_keys(&txn, IndexName::Sender, &range, false).unwrap();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn test_timestamp_scan_both_directions() {
    let dir = TempDir::new().unwrap();
    let env = open_env(&dir);
    index_all(
        &env,
        &[
            with_id(SmsRecord::received("+1", "a", 300), 1),
            with_id(SmsRecord::received("+1", "b", -20), 2),
            with_id(SmsRecord::sent("+2", "c", 100), 3),
            with_id(SmsRecord::sent("+2", "d", 200), 4),
        ],
    )
    .unwrap();

    let txn = env.begin_ro_txn().unwrap();
    let all = KeyRange::timestamps(i64::MIN, i64::MAX);
    assert_eq!(
        scan_keys(&txn, IndexName::Timestamp, &all, false).unwrap(),
        vec![2, 3, 4, 1]
    );
    assert_eq!(
        scan_keys(&txn, IndexName::Timestamp, &all, true).unwrap(),
        vec![1, 4, 3, 2]
    );

    let window = KeyRange::timestamps(100, 200);
    assert_eq!(
        scan_keys(&txn, IndexName::Timestamp, &window, true).unwrap(),
        vec![4, 3]
    );
}

#[test]
fn test_reverse_scan_with_upper_beyond_last_key() {
    let dir = TempDir::new().unwrap();
    let env = open_env(&dir);
    index_all(
        &env,
        &[
            with_id(SmsRecord::received("+1", "a", 5), 1),
            with_id(SmsRecord::received("+1", "b", 6), 2),
        ],
    )
    .unwrap();

    let txn = env.begin_ro_txn().unwrap();
    let range = KeyRange::timestamps(0, 1_000);
    assert_eq!(
        scan_keys(&txn, IndexName::Timestamp, &range, true).unwrap(),
        vec![2, 1]
    );
}

#[test]
fn test_empty_range_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let env = open_env(&dir);
    index_all(&env, &[with_id(SmsRecord::received("+1", "a", 5), 1)]).unwrap();

    let txn = env.begin_ro_txn().unwrap();
    let range = KeyRange::timestamps(10, 1);
    assert!(scan_keys(&txn, IndexName::Timestamp, &range, false)
        .unwrap()
        .is_empty());
}

#[test]
fn test_remove_entries() {
    let dir = TempDir::new().unwrap();
    let env = open_env(&dir);
    let first = with_id(SmsRecord::sent("+2", "a", 5), 1);
    let second = with_id(SmsRecord::sent("+2", "b", 6), 2);
    index_all(&env, &[first.clone(), second]).unwrap();

    let txn = env.begin_rw_txn().unwrap();
    remove_entries(&txn, &first).unwrap();
    txn.commit().unwrap();

    let txn = env.begin_ro_txn().unwrap();
    assert_eq!(
        count_matching(&txn, IndexName::Id, &keys::encode_id(1)).unwrap(),
        0
    );
    assert_eq!(
        count_matching(&txn, IndexName::Receiver, &keys::encode_str("+2").unwrap()).unwrap(),
        1
    );
    assert_eq!(
        count_matching(&txn, IndexName::Delivery, &keys::encode_str("sent").unwrap()).unwrap(),
        1
    );
}
