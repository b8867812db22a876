pub mod batch;
pub mod invoice;
pub mod raw;

pub use batch::{BatchItem, BatchResult};
pub use invoice::{InvoiceRecord, LineItem, RecordStatus, UNSPECIFIED};
pub use raw::{RawInvoice, RawLineItem};
