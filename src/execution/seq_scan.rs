use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{Result, Rid, INVALID_RID};
use crate::record::{Record, RecordSchema};
use crate::table::TableHandle;

use super::Executor;

/// Leaf executor: yields a table's records in `(page_id, slot_id)` order.
pub struct SeqScanExecutor {
    table: Arc<RwLock<TableHandle>>,
    out_schema: Arc<RecordSchema>,
    rid: Rid,
    record: Option<Record>,
    is_end: bool,
}

impl SeqScanExecutor {
    pub fn new(table: Arc<RwLock<TableHandle>>) -> Self {
        let out_schema = Arc::clone(table.read().schema());
        Self {
            table,
            out_schema,
            rid: INVALID_RID,
            record: None,
            is_end: true,
        }
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> Result<()> {
        let table = self.table.read();
        self.rid = table.first_rid()?;
        self.is_end = self.rid.is_invalid();
        self.record = if self.is_end {
            None
        } else {
            Some(table.get_record(self.rid)?)
        };
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        self.record = None;
        if self.is_end {
            return Ok(());
        }

        let table = self.table.read();
        self.rid = table.next_rid(self.rid)?;
        if self.rid.is_invalid() {
            self.is_end = true;
        } else {
            self.record = Some(table.get_record(self.rid)?);
        }
        Ok(())
    }

    fn record(&self) -> Option<Record> {
        self.record.clone()
    }

    fn is_end(&self) -> bool {
        self.is_end || self.record.is_none()
    }

    fn out_schema(&self) -> &Arc<RecordSchema> {
        &self.out_schema
    }
}
