//! xlsxpic - Locate and extract cell-anchored images from XLSX workbooks
//!
//! This crate reads an OOXML spreadsheet package, associates each embedded picture
//! with the product reference ("REF") of the row it is anchored to, and returns the
//! raw image bytes ready to be handed to a file store under `<REF>.jpg`.
//!
//! Images are located with an ordered chain of strategies: drawing anchors first,
//! then (in loose mode) adjacent-cell evidence, and finally a sequential pairing of
//! media files with reference rows when the package carries no anchor metadata.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use xlsxpic::ExtractorBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Target column H, reference column and start row auto-detected
//!     let extractor = ExtractorBuilder::new().build()?;
//!
//!     let report = extractor.extract(File::open("catalogo.xlsx")?)?;
//!     println!(
//!         "{} of {} rows have an image",
//!         report.images_found(),
//!         report.total_refs()
//!     );
//!
//!     for image in report.images() {
//!         println!("{} -> {}", image.reference, image.remote_file_name());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Delivering Images
//!
//! ```rust,no_run
//! use xlsxpic::{deliver, DirectorySink, ExtractorBuilder, MatchMode};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = ExtractorBuilder::new()
//!         .with_reference_column("A")
//!         .with_start_row(4)
//!         .with_match_mode(MatchMode::Loose)
//!         .build()?;
//!
//!     let report = extractor.extract_path("catalogo.xlsx")?;
//!     let mut sink = DirectorySink::new("out/images");
//!     let stats = deliver(&report, &mut sink);
//!     println!("{} stored, {} failed", stats.successful, stats.failed);
//!
//!     println!("{}", report.to_json()?);
//!     Ok(())
//! }
//! ```
//!
//! # Row-by-row Extraction
//!
//! Image bytes are read lazily; stop iterating to stop reading.
//!
//! ```rust,no_run
//! use std::fs::File;
//! use xlsxpic::{ExtractorBuilder, RowOutcome};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = ExtractorBuilder::new().build()?;
//!     let session = extractor.open(File::open("catalogo.xlsx")?)?;
//!
//!     for outcome in session.take(10) {
//!         if let RowOutcome::Extracted(image) = outcome {
//!             println!("row {}: {} bytes", image.row, image.bytes.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
mod engine;
mod error;
mod locator;
mod package;
mod parser;
mod report;
mod scanner;
mod security;
mod transfer;
mod types;

// 公開API
pub use api::{MatchMode, ReferenceVocabulary, SheetSelector};
pub use builder::{Extractor, ExtractorBuilder};
pub use engine::{ExtractionSession, Phase};
pub use error::XlsxPicError;
pub use locator::Strategy;
pub use package::WorkbookPackage;
pub use parser::{parse_anchors, parse_relationships, RelationshipMap};
pub use report::{
    ExtractionReport, FailureSummary, ImageSummary, MediaUsage, ReportSummary, RowOutcome,
};
pub use scanner::{LayoutOrigin, ReferenceLayout};
pub use transfer::{deliver, remote_file_name, DeliveryStats, DirectorySink, ImageSink};
pub use types::{
    column_index, column_letter, AnchorKind, AnchorRecord, ImageRecord, ImageSource,
    ReferenceEntry,
};
