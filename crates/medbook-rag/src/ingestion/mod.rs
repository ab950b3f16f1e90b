//! PDF ingestion: page extraction, recursive splitting and batched upsert

mod parser;
mod pipeline;
mod splitter;

pub use parser::{cleanup_pdf_text, PdfLoader};
pub use pipeline::{IngestPipeline, IngestReport, PreparedBook};
pub use splitter::RecursiveTextSplitter;
