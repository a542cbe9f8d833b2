//! # Scena Parser
//!
//! Parser for the Scena composition language. This crate turns source
//! text into the typed document tree defined in [`scena_core`], deriving
//! expression analysis (referenced identifiers and recognized call
//! signatures) along the way.
//!
//! ## Usage
//!
//! ```
//! let source = r#"
//!     <composition width={1920} height={1080}>
//!       <title class="headline">Launch day</title>
//!     </composition>
//! "#;
//!
//! let doc = scena_parser::parse(source).expect("well-formed document");
//! assert_eq!(doc.root().tag(), "composition");
//! ```
//!
//! Parsing is a pure function. Malformed input fails with a
//! [`ParseError`] carrying span and line/column information; a partial
//! tree is never returned.

pub mod error;
pub mod expression;

mod parser;

pub use error::ParseError;

use log::{debug, trace};
use winnow::Parser as _;
use winnow::stream::LocatingSlice;

use scena_core::document::Document;

/// Parse source text into a composition document.
///
/// # Arguments
///
/// * `source` - The composition document source text
///
/// # Errors
///
/// Returns a [`ParseError`] with location information when the input has
/// unbalanced delimiters, an unterminated literal, a missing or
/// mismatched closing tag, or trailing content after the root element.
pub fn parse(source: &str) -> Result<Document, ParseError> {
    debug!(source_len = source.len(); "Parsing composition document");

    let doc = parser::document
        .parse(LocatingSlice::new(source))
        .map_err(|err| parser::into_parse_error(err, source))?;

    trace!(nodes = doc.node_count(); "Parsed composition document");
    Ok(doc)
}
