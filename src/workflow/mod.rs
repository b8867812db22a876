pub mod invoice_flow;
pub mod item_ctx;

pub use invoice_flow::InvoiceFlow;
pub use item_ctx::ItemCtx;
