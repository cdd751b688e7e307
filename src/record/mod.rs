mod chunk;
mod data_type;
mod record;
mod schema;
mod value;

pub use chunk::Chunk;
pub use data_type::DataType;
pub use record::Record;
pub use schema::{schema_of, Field, RecordSchema};
pub use value::Value;
