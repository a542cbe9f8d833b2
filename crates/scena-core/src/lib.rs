//! Scena Core Types and Definitions
//!
//! This crate provides the foundational types for the Scena composition
//! language. It includes:
//!
//! - **Identifiers**: Efficient string-interned identifiers ([`identifier::Id`])
//! - **Spans**: Byte-offset source spans and line/column mapping ([`span`] module)
//! - **Document**: The composition document tree model ([`document`] module)
//! - **Roles**: Semantic classification of attribute names ([`role`] module)
//! - **Diagnostics**: The layered diagnostic system ([`diagnostic`] module)
//! - **Timeline**: Timed intervals extracted from transform calls ([`timeline`] module)

pub mod diagnostic;
pub mod document;
pub mod identifier;
pub mod role;
pub mod span;
pub mod timeline;
