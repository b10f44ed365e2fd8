//! # bescript-xlsx
//!
//! XLSX-backed storage for compiled named formulas.
//!
//! [`FormulaBook`] implements [`bescript_compiler::NamedFormulaStore`] over
//! a workbook file: open a book (or create an empty one), publish a
//! compiled table into it, save it back. Everything in the container
//! except the defined-names section is preserved byte-for-byte.

pub mod book;
pub mod error;

pub use book::{DefinedFormula, FormulaBook};
pub use error::{XlsxError, XlsxResult};
