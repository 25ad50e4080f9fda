pub mod defs;

pub use defs::{FetchedDocument, ItemSink, StreamItem, Transport};
