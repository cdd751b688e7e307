//! Integration tests for the pull-based executor tree

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use quarry::buffer::BufferPoolManager;
use quarry::common::{QuarryError, ReplacerConfig, INVALID_RID};
use quarry::execution::{
    DeleteExecutor, Executor, FilterExecutor, InsertExecutor, MissingFieldPolicy,
    ProjectionExecutor, SeqScanExecutor, SortExecutor, UpdateExecutor,
};
use quarry::index::IndexHandle;
use quarry::record::{schema_of, DataType, Record, RecordSchema, Value};
use quarry::storage::disk::DiskManager;
use quarry::table::{StorageModel, TableHandle};

struct TestDb {
    bpm: Arc<BufferPoolManager>,
    _dir: tempfile::TempDir,
}

impl TestDb {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let disk = Arc::new(DiskManager::new(dir.path()).unwrap());
        let bpm = Arc::new(BufferPoolManager::new(
            disk,
            32,
            ReplacerConfig::LruK { k: 2 },
        ));
        Self { bpm, _dir: dir }
    }

    fn table(
        &self,
        name: &str,
        schema: Arc<RecordSchema>,
        rows: &[Vec<Value>],
    ) -> Arc<RwLock<TableHandle>> {
        let fid = self.bpm.disk().create_file(name).unwrap();
        let mut table =
            TableHandle::create(Arc::clone(&self.bpm), fid, schema, StorageModel::NAry).unwrap();
        for values in rows {
            let rec =
                Record::from_values(Arc::clone(table.schema()), values, INVALID_RID).unwrap();
            table.insert_record(&rec).unwrap();
        }
        Arc::new(RwLock::new(table))
    }
}

fn id_name_schema() -> Arc<RecordSchema> {
    schema_of(&[("id", DataType::Int), ("name", DataType::Char(16))])
}

fn id_val_schema() -> Arc<RecordSchema> {
    schema_of(&[("id", DataType::Int), ("val", DataType::Int)])
}

/// Drives the iterator protocol to completion and collects every record.
fn collect(exec: &mut dyn Executor) -> Vec<Record> {
    exec.init().unwrap();
    let mut out = Vec::new();
    while !exec.is_end() {
        if let Some(rec) = exec.record() {
            out.push(rec);
        }
        exec.next().unwrap();
    }
    out
}

/// Drives a one-shot DML executor and returns its single count record.
fn run_dml(exec: &mut dyn Executor) -> Record {
    exec.init().unwrap();
    exec.next().unwrap();
    assert!(exec.is_end());
    exec.record().expect("DML must report a count record")
}

fn int_at(rec: &Record, idx: usize) -> i32 {
    match rec.value_at(idx) {
        Value::Int(v) => v,
        other => panic!("expected int, got {:?}", other),
    }
}

#[test]
fn test_seq_scan_three_rows() {
    let db = TestDb::new();
    let table = db.table(
        "scan.tbl",
        id_name_schema(),
        &[
            vec![Value::Int(1), Value::from("a")],
            vec![Value::Int(2), Value::from("b")],
            vec![Value::Int(3), Value::from("c")],
        ],
    );

    let mut scan = SeqScanExecutor::new(table);
    let rows = collect(&mut scan);
    assert_eq!(rows.iter().map(|r| int_at(r, 0)).collect::<Vec<_>>(), [1, 2, 3]);
    assert!(scan.is_end());

    // A fresh init restarts from scratch
    let rows = collect(&mut scan);
    assert_eq!(rows.len(), 3);
}

#[test]
fn test_seq_scan_empty_table() {
    let db = TestDb::new();
    let table = db.table("empty.tbl", id_name_schema(), &[]);

    let mut scan = SeqScanExecutor::new(table);
    scan.init().unwrap();
    assert!(scan.is_end());
    assert!(scan.record().is_none());
}

#[test]
fn test_filter_even_ids() {
    let db = TestDb::new();
    let rows: Vec<Vec<Value>> = (1..=5)
        .map(|i| vec![Value::Int(i), Value::from(format!("r{}", i))])
        .collect();
    let table = db.table("filter.tbl", id_name_schema(), &rows);

    let scan = SeqScanExecutor::new(table);
    let mut filter = FilterExecutor::new(
        Box::new(scan),
        Box::new(|rec| matches!(rec.value_at(0), Value::Int(id) if id % 2 == 0)),
    );

    let rows = collect(&mut filter);
    assert_eq!(rows.iter().map(|r| int_at(r, 0)).collect::<Vec<_>>(), [2, 4]);
    assert!(filter.is_end());
}

#[test]
fn test_filter_rejecting_everything() {
    let db = TestDb::new();
    let table = db.table(
        "none.tbl",
        id_name_schema(),
        &[vec![Value::Int(1), Value::from("a")]],
    );

    let scan = SeqScanExecutor::new(table);
    let mut filter = FilterExecutor::new(Box::new(scan), Box::new(|_| false));
    assert!(collect(&mut filter).is_empty());
}

#[test]
fn test_projection_narrows_schema() {
    let db = TestDb::new();
    let table = db.table(
        "proj.tbl",
        id_name_schema(),
        &[
            vec![Value::Int(1), Value::from("a")],
            vec![Value::Int(2), Value::from("b")],
        ],
    );

    let out_schema = table
        .read()
        .schema()
        .project(&["name"])
        .map(Arc::new)
        .unwrap();
    let scan = SeqScanExecutor::new(table);
    let mut projection = ProjectionExecutor::new(Box::new(scan), Arc::clone(&out_schema));

    let rows = collect(&mut projection);
    assert_eq!(rows.len(), 2);
    for rec in &rows {
        assert_eq!(rec.schema().field_count(), 1);
        assert_eq!(rec.schema().field_at(0).name(), "name");
    }
    assert_eq!(rows[0].value_at(0), Value::from("a"));
    assert_eq!(rows[1].value_at(0), Value::from("b"));
    assert_eq!(projection.out_schema(), &out_schema);
}

#[test]
fn test_sort_descending_by_id() {
    let db = TestDb::new();
    let table = db.table(
        "sort.tbl",
        id_name_schema(),
        &[
            vec![Value::Int(3), Value::from("c")],
            vec![Value::Int(1), Value::from("a")],
            vec![Value::Int(2), Value::from("b")],
        ],
    );

    let key = table.read().schema().project(&["id"]).map(Arc::new).unwrap();
    let scan = SeqScanExecutor::new(table);
    let mut sort = SortExecutor::new(Box::new(scan), key, true);

    let rows = collect(&mut sort);
    assert_eq!(rows.iter().map(|r| int_at(r, 0)).collect::<Vec<_>>(), [3, 2, 1]);
}

#[test]
fn test_sort_ascending_with_ties_keeps_child_order() {
    let db = TestDb::new();
    let table = db.table(
        "ties.tbl",
        id_val_schema(),
        &[
            vec![Value::Int(1), Value::Int(5)],
            vec![Value::Int(2), Value::Int(3)],
            vec![Value::Int(3), Value::Int(5)],
            vec![Value::Int(4), Value::Int(3)],
        ],
    );

    let key = table.read().schema().project(&["val"]).map(Arc::new).unwrap();
    let scan = SeqScanExecutor::new(table);
    let mut sort = SortExecutor::new(Box::new(scan), key, false);

    let rows = collect(&mut sort);
    assert_eq!(
        rows.iter().map(|r| int_at(r, 0)).collect::<Vec<_>>(),
        [2, 4, 1, 3]
    );
}

#[test]
fn test_sort_empty_input() {
    let db = TestDb::new();
    let table = db.table("sortempty.tbl", id_val_schema(), &[]);

    let key = table.read().schema().project(&["val"]).map(Arc::new).unwrap();
    let scan = SeqScanExecutor::new(table);
    let mut sort = SortExecutor::new(Box::new(scan), key, false);
    assert!(collect(&mut sort).is_empty());
}

#[derive(Default)]
struct CountingIndex {
    inserts: AtomicUsize,
    deletes: AtomicUsize,
    updates: AtomicUsize,
}

impl IndexHandle for CountingIndex {
    fn insert_record(&self, _record: &Record) -> quarry::Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete_record(&self, _record: &Record) -> quarry::Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn update_record(&self, _old: &Record, _new: &Record) -> quarry::Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_update_count_and_effects() {
    let db = TestDb::new();
    let table = db.table(
        "upd.tbl",
        id_val_schema(),
        &[
            vec![Value::Int(1), Value::Int(10)],
            vec![Value::Int(2), Value::Int(20)],
            vec![Value::Int(3), Value::Int(30)],
        ],
    );
    let index = Arc::new(CountingIndex::default());

    let scan = SeqScanExecutor::new(Arc::clone(&table));
    let filter = FilterExecutor::new(
        Box::new(scan),
        Box::new(|rec| matches!(rec.value_at(0), Value::Int(id) if id >= 2)),
    );
    let mut update = UpdateExecutor::new(
        Box::new(filter),
        Arc::clone(&table),
        vec![Arc::clone(&index) as Arc<dyn IndexHandle>],
        vec![("val".to_string(), Value::Int(0))],
    );

    let result = run_dml(&mut update);
    assert_eq!(result.schema().field_at(0).name(), "updated");
    assert_eq!(int_at(&result, 0), 2);
    assert_eq!(index.updates.load(Ordering::SeqCst), 2);

    // A subsequent full scan sees (1,10),(2,0),(3,0)
    let mut scan = SeqScanExecutor::new(table);
    let rows = collect(&mut scan);
    let pairs: Vec<(i32, i32)> = rows.iter().map(|r| (int_at(r, 0), int_at(r, 1))).collect();
    assert_eq!(pairs, [(1, 10), (2, 0), (3, 0)]);
}

#[test]
fn test_update_unknown_field_policies() {
    let db = TestDb::new();
    let table = db.table(
        "updpol.tbl",
        id_val_schema(),
        &[vec![Value::Int(1), Value::Int(10)]],
    );

    // Default policy skips assignments to unknown fields
    let scan = SeqScanExecutor::new(Arc::clone(&table));
    let mut update = UpdateExecutor::new(
        Box::new(scan),
        Arc::clone(&table),
        Vec::new(),
        vec![("ghost".to_string(), Value::Int(0))],
    );
    assert_eq!(int_at(&run_dml(&mut update), 0), 1);

    // Strict policy aborts instead
    let scan = SeqScanExecutor::new(Arc::clone(&table));
    let mut strict = UpdateExecutor::new(
        Box::new(scan),
        Arc::clone(&table),
        Vec::new(),
        vec![("ghost".to_string(), Value::Int(0))],
    )
    .with_policy(MissingFieldPolicy::Error);
    strict.init().unwrap();
    assert!(matches!(strict.next(), Err(QuarryError::FieldMiss(_))));
}

#[test]
fn test_insert_executor_copies_between_tables() {
    let db = TestDb::new();
    let src = db.table(
        "src.tbl",
        id_val_schema(),
        &[
            vec![Value::Int(1), Value::Int(100)],
            vec![Value::Int(2), Value::Int(200)],
        ],
    );
    let dst = db.table("dst.tbl", id_val_schema(), &[]);
    let index = Arc::new(CountingIndex::default());

    let scan = SeqScanExecutor::new(src);
    let mut insert = InsertExecutor::new(
        Box::new(scan),
        Arc::clone(&dst),
        vec![Arc::clone(&index) as Arc<dyn IndexHandle>],
    );

    let result = run_dml(&mut insert);
    assert_eq!(result.schema().field_at(0).name(), "inserted");
    assert_eq!(int_at(&result, 0), 2);
    assert_eq!(index.inserts.load(Ordering::SeqCst), 2);

    let mut scan = SeqScanExecutor::new(dst);
    let rows = collect(&mut scan);
    assert_eq!(rows.iter().map(|r| int_at(r, 1)).collect::<Vec<_>>(), [100, 200]);
    // Inserted records carry real RIDs
    assert!(rows.iter().all(|r| !r.rid().is_invalid()));
}

#[test]
fn test_delete_executor_removes_matches() {
    let db = TestDb::new();
    let table = db.table(
        "del.tbl",
        id_val_schema(),
        &[
            vec![Value::Int(1), Value::Int(1)],
            vec![Value::Int(2), Value::Int(2)],
            vec![Value::Int(3), Value::Int(3)],
            vec![Value::Int(4), Value::Int(4)],
        ],
    );
    let index = Arc::new(CountingIndex::default());

    let scan = SeqScanExecutor::new(Arc::clone(&table));
    let filter = FilterExecutor::new(
        Box::new(scan),
        Box::new(|rec| matches!(rec.value_at(0), Value::Int(id) if id % 2 == 1)),
    );
    let mut delete = DeleteExecutor::new(
        Box::new(filter),
        Arc::clone(&table),
        vec![Arc::clone(&index) as Arc<dyn IndexHandle>],
    );

    let result = run_dml(&mut delete);
    assert_eq!(result.schema().field_at(0).name(), "deleted");
    assert_eq!(int_at(&result, 0), 2);
    assert_eq!(index.deletes.load(Ordering::SeqCst), 2);

    let mut scan = SeqScanExecutor::new(table);
    let rows = collect(&mut scan);
    assert_eq!(rows.iter().map(|r| int_at(r, 0)).collect::<Vec<_>>(), [2, 4]);
}

#[test]
fn test_operator_tree_composition() {
    // Sort(Projection(Filter(SeqScan))) end to end
    let db = TestDb::new();
    let rows: Vec<Vec<Value>> = (1..=10)
        .map(|i| vec![Value::Int(i), Value::Int(i * 11)])
        .collect();
    let table = db.table("tree.tbl", id_val_schema(), &rows);

    let out_schema = table.read().schema().project(&["val"]).map(Arc::new).unwrap();
    let key = Arc::clone(&out_schema);

    let scan = SeqScanExecutor::new(table);
    let filter = FilterExecutor::new(
        Box::new(scan),
        Box::new(|rec| matches!(rec.value_at(0), Value::Int(id) if id > 5)),
    );
    let projection = ProjectionExecutor::new(Box::new(filter), out_schema);
    let mut sort = SortExecutor::new(Box::new(projection), key, true);

    let rows = collect(&mut sort);
    assert_eq!(
        rows.iter().map(|r| int_at(r, 0)).collect::<Vec<_>>(),
        [110, 99, 88, 77, 66]
    );
}
