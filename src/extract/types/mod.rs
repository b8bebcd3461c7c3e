pub mod csv;
pub mod docx;
pub mod json;
pub mod pdf;
pub mod txt;

pub use csv::CsvFile;
pub use docx::DocxFile;
pub use json::JsonFile;
pub use pdf::PdfFile;
pub use txt::TextFile;
