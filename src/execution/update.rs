use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{QuarryError, Result, INVALID_RID};
use crate::index::IndexHandle;
use crate::record::{schema_of, DataType, Record, RecordSchema, Value};
use crate::table::TableHandle;

use super::{BoxedExecutor, Executor};

/// What to do when an update names a field the child schema does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFieldPolicy {
    /// Silently skip the assignment
    #[default]
    Skip,
    /// Abort the operator with `FieldMiss`
    Error,
}

/// One-shot DML: rewrites every record the child yields, applying a list of
/// `(field, value)` assignments, and reports a single row with the count of
/// updated tuples in an `updated` field.
///
/// All work happens on the first `next` call, which drives the child itself
/// (`init` on this executor is a no-op). Index entries are updated before the
/// table; a failure anywhere aborts the operator and already-applied
/// mutations persist, as there is no transaction layer to roll them back.
pub struct UpdateExecutor {
    child: BoxedExecutor,
    table: Arc<RwLock<TableHandle>>,
    indexes: Vec<Arc<dyn IndexHandle>>,
    updates: Vec<(String, Value)>,
    policy: MissingFieldPolicy,
    out_schema: Arc<RecordSchema>,
    record: Option<Record>,
    is_end: bool,
}

impl UpdateExecutor {
    pub fn new(
        child: BoxedExecutor,
        table: Arc<RwLock<TableHandle>>,
        indexes: Vec<Arc<dyn IndexHandle>>,
        updates: Vec<(String, Value)>,
    ) -> Self {
        Self {
            child,
            table,
            indexes,
            updates,
            policy: MissingFieldPolicy::default(),
            out_schema: schema_of(&[("updated", DataType::Int)]),
            record: None,
            is_end: false,
        }
    }

    pub fn with_policy(mut self, policy: MissingFieldPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Executor for UpdateExecutor {
    fn init(&mut self) -> Result<()> {
        // One-shot DML initializes its child itself in next()
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        if self.is_end {
            return Ok(());
        }

        let mut count = 0i32;
        self.child.init()?;
        while !self.child.is_end() {
            let Some(old) = self.child.record() else {
                self.child.next()?;
                continue;
            };

            let schema = Arc::clone(old.schema());
            let old_rid = old.rid();

            let mut values = old.values();
            for (name, value) in &self.updates {
                match schema.field_index(name) {
                    Some(i) => values[i] = value.clone(),
                    None => match self.policy {
                        MissingFieldPolicy::Skip => {}
                        MissingFieldPolicy::Error => {
                            return Err(QuarryError::FieldMiss(name.clone()));
                        }
                    },
                }
            }
            let new_rec = Record::from_values(schema, &values, old_rid)?;

            for index in &self.indexes {
                index.update_record(&old, &new_rec)?;
            }
            self.table.write().update_record(old_rid, &new_rec)?;
            count += 1;

            self.child.next()?;
        }

        log::debug!("update executor rewrote {} records", count);
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
