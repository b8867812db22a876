pub mod artifact;
pub mod composer;
pub mod xlsx;

pub use artifact::Artifact;
pub use composer::{detail_sheet_name, ExportComposer, ExportFailure, SeparateExport};
pub use xlsx::{serialize_workbook, NamedSheet};
