pub mod batch;
pub mod builder;
pub mod config;
pub mod extract;
pub mod index;
pub mod models;
pub mod retriever;
pub mod utils;

pub use batch::{BatchProcessor, ExtractionJob, JobStatus, Progress};
pub use builder::{DirectoryReport, IndexBuilder, UpdateReport};
pub use config::Config;
pub use extract::{ContentSource, Extraction, ExtractorFactory, FileContent, FileType};
pub use index::FileIndex;
pub use models::{FileHash, FileRecord, IndexSnapshot, IndexSummary};
pub use retriever::{
    CombinedRetriever, DocumentSource, IndexedDocument, KeywordRetriever, RetrievedDocument,
    Retriever,
};
