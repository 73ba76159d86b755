//! This crate decodes and analyzes time-base-corrected (TBC) LaserDisc captures: raw 16-bit
//! composite video samples per field, plus sidecar per-field metadata.
//!
//! The building blocks:
//!
//! - [`field`]: the monotonic [`field::FieldId`] coordinate space every time-varying datum is
//!   addressed by.
//! - [`repr`]: the polymorphic [`repr::FieldRepresentation`] and its wrappers, backed
//!   concretely by [`tbc::TbcFieldRepresentation`].
//! - [`obs`] and [`observers`]: per-field signal analyzers (biphase VBI, field parity, PAL
//!   phase, pulldown, lead-in/out, quality metrics) publishing into a schema-validated,
//!   namespaced observation store.
//! - [`dag`]: the pipeline model and topological executor threading shared representations
//!   between stages.
//! - [`analysis`]: the field-mapping analyzer reconstructing an ordered, de-duplicated,
//!   gap-padded programme sequence as a [`analysis::MappingSpec`], plus frame/timecode lookup
//!   and parallel signal sweeps.
//!
//! The `tbc-process` binary wires these together behind a [`pipeline`] description file.

pub mod analysis;
pub mod cache;
pub mod dag;
mod error;
pub mod field;
pub mod hints;
pub mod ioutil;
pub mod obs;
pub mod observers;
pub mod params;
pub mod pipeline;
pub mod repr;
pub mod tbc;
pub mod video;

pub use error::ErrorKind;

#[cfg(test)]
pub(crate) mod testutil;
