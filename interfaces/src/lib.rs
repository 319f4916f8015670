pub mod defs;
pub mod empty;

pub use defs::{Email, EmailSource, RecordFields, RecordSink, COMMON_EXPORT_FIELDS};
pub use empty::{EmptySource, StaticSource};
