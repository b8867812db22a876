pub mod aggregation;
pub mod extraction;
pub mod normalizer;
pub mod record_sink;

pub use aggregation::{AggregationEngine, BatchTotals, InvoiceTotals};
pub use extraction::{Extractor, OpenAiExtractor};
pub use normalizer::normalize;
pub use record_sink::{MemorySink, RecordSink};
