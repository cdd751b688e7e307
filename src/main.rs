use std::sync::Arc;

use parking_lot::RwLock;

use quarry::buffer::BufferPoolManager;
use quarry::common::{PageId, DEFAULT_BUFFER_POOL_SIZE, DEFAULT_REPLACER, INVALID_RID};
use quarry::execution::{
    Executor, FilterExecutor, ProjectionExecutor, SeqScanExecutor, SortExecutor,
};
use quarry::record::{schema_of, DataType, Record, Value};
use quarry::storage::disk::DiskManager;
use quarry::table::{StorageModel, TableHandle};

fn main() {
    env_logger::init();

    println!("Quarry - a paged relational storage core");
    println!("========================================\n");

    let dir = std::env::temp_dir().join("quarry-demo");
    let disk = Arc::new(DiskManager::new(&dir).expect("failed to create disk manager"));
    println!("Database directory: {}", dir.display());

    let file_name = format!("demo-{}.tbl", std::process::id());
    let fid = disk.create_file(&file_name).expect("failed to create table file");

    let bpm = Arc::new(BufferPoolManager::new(
        disk,
        DEFAULT_BUFFER_POOL_SIZE,
        DEFAULT_REPLACER,
    ));
    println!("Buffer pool: {} frames\n", bpm.pool_size());

    // A small PAX table
    let schema = schema_of(&[
        ("id", DataType::Int),
        ("name", DataType::Char(16)),
        ("score", DataType::Float),
    ]);
    let mut table =
        TableHandle::create(bpm, fid, schema, StorageModel::Pax).expect("failed to create table");

    let rows = [
        (3, "carol", 71.0),
        (1, "alice", 88.5),
        (4, "dave", 64.25),
        (2, "bob", 95.0),
        (5, "erin", 79.5),
    ];
    for (id, name, score) in rows {
        let rec = Record::from_values(
            Arc::clone(table.schema()),
            &[Value::Int(id), Value::from(name), Value::Float(score)],
            INVALID_RID,
        )
        .expect("failed to build record");
        let rid = table.insert_record(&rec).expect("insert failed");
        println!("inserted ({}, {:8}, {:6}) at {}", id, name, score, rid);
    }

    // One column straight off the page
    let id_only = table.schema().project(&["id"]).map(Arc::new).unwrap();
    let chunk = table
        .get_chunk(PageId::new(1), &id_only)
        .expect("chunk scan failed");
    println!("\npage 1 id column: {:?}", chunk.column(0));

    // Sort(Projection(Filter(SeqScan))): names of scores >= 70, best first
    let table = Arc::new(RwLock::new(table));
    let scan = SeqScanExecutor::new(Arc::clone(&table));
    let filter = FilterExecutor::new(
        Box::new(scan),
        Box::new(|rec| matches!(rec.value_at(2), Value::Float(s) if s >= 70.0)),
    );
    let out_schema = table
        .read()
        .schema()
        .project(&["name", "score"])
        .map(Arc::new)
        .unwrap();
    let projection = ProjectionExecutor::new(Box::new(filter), out_schema);
    let key = table
        .read()
        .schema()
        .project(&["score"])
        .map(Arc::new)
        .unwrap();
    let mut sort = SortExecutor::new(Box::new(projection), key, true);

    println!("\nscores >= 70, descending:");
    sort.init().expect("query failed");
    while !sort.is_end() {
        if let Some(rec) = sort.record() {
            println!("  {} {}", rec.value_at(0), rec.value_at(1));
        }
        sort.next().expect("query failed");
    }
}
