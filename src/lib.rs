//! Credit-Card Statement Converter Library
//!
//! A library for converting bank-issued credit-card transaction exports
//! (CSV and Excel dialects) into standardized bank statement formats.
//!
//! # Supported Banks
//!
//! - **Rabobank** (legacy `;`-delimited and new `,`-delimited CSV)
//! - **ING** credit-card CSV
//! - **ICS** credit-card CSV
//! - **AMEX** Excel exports
//! - **Generic Excel** template
//!
//! # Output Formats
//!
//! - **MT940**: SWIFT-like bank statements
//! - **CAMT.053**: ISO 20022 XML format
//!
//! # Examples
//!
//! ## Converting a Rabobank CSV export to MT940
//!
//! ```no_run
//! use cardconv::processor::{ConvertOptions, OutputFormat, TransactionProcessor};
//!
//! let data = std::fs::read("export.csv")?;
//! let processor = TransactionProcessor::new();
//! let mt940 = processor.convert(
//!     &data,
//!     "rabobank_old",
//!     OutputFormat::Mt940,
//!     &ConvertOptions::default(),
//! )?;
//! println!("{mt940}");
//! # Ok::<(), cardconv::Error>(())
//! ```
//!
//! ## Inspecting a file before conversion
//!
//! ```no_run
//! use cardconv::processor::TransactionProcessor;
//!
//! let data = std::fs::read("export.csv")?;
//! let processor = TransactionProcessor::new();
//! let report = processor.validate(&data, "ics")?;
//! if report.valid {
//!     let summary = processor.summarize(&data, "ics")?;
//!     println!("{} transactions, net {}", summary.transaction_count, summary.net_total);
//! }
//! # Ok::<(), cardconv::Error>(())
//! ```

pub mod camt053;
pub mod decode;
pub mod error;
pub mod mt940;
pub mod normalize;
pub mod parsers;
pub mod processor;
pub mod rules;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use processor::{ConvertOptions, OutputFormat, TransactionProcessor};
pub use types::{AccountStatement, Transaction, TransactionType};
