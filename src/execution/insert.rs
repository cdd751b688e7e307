use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{Result, INVALID_RID};
use crate::index::IndexHandle;
use crate::record::{schema_of, DataType, Record, RecordSchema, Value};
use crate::table::TableHandle;

use super::{BoxedExecutor, Executor};

/// One-shot DML: inserts every record the child yields and reports a single
/// row with the count of inserted tuples in an `inserted` field. Works like
/// [`UpdateExecutor`](super::UpdateExecutor): everything happens on the first
/// `next`, and a failure aborts with prior inserts left in place.
pub struct InsertExecutor {
    child: BoxedExecutor,
    table: Arc<RwLock<TableHandle>>,
    indexes: Vec<Arc<dyn IndexHandle>>,
    out_schema: Arc<RecordSchema>,
    record: Option<Record>,
    is_end: bool,
}

impl InsertExecutor {
    pub fn new(
        child: BoxedExecutor,
        table: Arc<RwLock<TableHandle>>,
        indexes: Vec<Arc<dyn IndexHandle>>,
    ) -> Self {
        Self {
            child,
            table,
            indexes,
            out_schema: schema_of(&[("inserted", DataType::Int)]),
            record: None,
            is_end: false,
        }
    }
}

impl Executor for InsertExecutor {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        if self.is_end {
            return Ok(());
        }

        let mut count = 0i32;
        self.child.init()?;
        while !self.child.is_end() {
            let Some(mut rec) = self.child.record() else {
                self.child.next()?;
                continue;
            };

            let rid = self.table.write().insert_record(&rec)?;
            rec.set_rid(rid);
            for index in &self.indexes {
                index.insert_record(&rec)?;
            }
            count += 1;

            self.child.next()?;
        }

        log::debug!("insert executor stored {} records", count);
        self.record = Some(Record::from_values(
            Arc::clone(&self.out_schema),
            &[Value::Int(count)],
            INVALID_RID,
        )?);
        self.is_end = true;
        Ok(())
    }

    fn record(&self) -> Option<Record> {
        self.record.clone()
    }

    fn is_end(&self) -> bool {
        self.is_end
    }

    fn out_schema(&self) -> &Arc<RecordSchema> {
        &self.out_schema
    }
}
