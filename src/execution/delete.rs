use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{Result, INVALID_RID};
use crate::index::IndexHandle;
use crate::record::{schema_of, DataType, Record, RecordSchema, Value};
use crate::table::TableHandle;

use super::{BoxedExecutor, Executor};

/// One-shot DML: deletes every record the child yields (by the RID each
/// record carries) and reports a single row with the count in a `deleted`
/// field. Same execution shape and atomicity caveats as
/// [`UpdateExecutor`](super::UpdateExecutor).
pub struct DeleteExecutor {
    child: BoxedExecutor,
    table: Arc<RwLock<TableHandle>>,
    indexes: Vec<Arc<dyn IndexHandle>>,
    out_schema: Arc<RecordSchema>,
    record: Option<Record>,
    is_end: bool,
}

impl DeleteExecutor {
    pub fn new(
        child: BoxedExecutor,
        table: Arc<RwLock<TableHandle>>,
        indexes: Vec<Arc<dyn IndexHandle>>,
    ) -> Self {
        Self {
            child,
            table,
            indexes,
            out_schema: schema_of(&[("deleted", DataType::Int)]),
            record: None,
            is_end: false,
        }
    }
}

impl Executor for DeleteExecutor {
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
            let Some(rec) = self.child.record() else {
                self.child.next()?;
                continue;
            };

            for index in &self.indexes {
                index.delete_record(&rec)?;
            }
            self.table.write().delete_record(rec.rid())?;
            count += 1;

            self.child.next()?;
        }

        log::debug!("delete executor removed {} records", count);
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
