//! File formats for the postmort pipeline: collector CSV in, tagged CSV and
//! JSON reports out. Readers and writers come in path-based and
//! stream-based flavours; the stream variants exist so callers (and tests)
//! can work against in-memory buffers.

pub mod error;
pub mod read;
pub mod write;

pub use error::DatasetError;
pub use read::{read_records, read_records_from, IngestReport, RawRow};
pub use write::{
    read_tagged, read_tagged_from, write_json, write_tagged, write_tagged_to, TaggedRow,
};
