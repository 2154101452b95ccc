#![warn(rust_2018_idioms)]

//! Charstring interpretation and CFF font reading and writing.
//!
//! The [charstring] module interprets Type 1 and Type 2 glyph programs, producing widths,
//! bounding boxes and normalized programs that can be merged with [charstring::seac] and
//! re-encoded. The [cff] module reads CFF font sets and writes new ones with
//! [cff::compile].

/// Reading and writing of binary data.
pub mod binary;
pub mod cff;
pub mod charstring;
pub mod error;
pub mod outline;
pub mod size;
/// Shared test code.
#[cfg(test)]
pub mod tests;

pub use pathfinder_geometry;
