//! # artcov Common Library
//!
//! Shared code for the artcov tools including:
//! - Typed identifiers and the validated data layer
//! - The outer-links scoring algorithm
//! - The computed model that caches per-article scores and the C_nu aggregate
//! - The score grid adapter used by editing surfaces
//! - Event types (ModelEvent) and the EventBus
//! - JSON/CSV import and export
//! - Configuration loading

pub mod algorithm;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod formats;
pub mod grid;
pub mod ids;
pub mod model;

pub use algorithm::ComputedData;
pub use data::{Article, RawData, Subject, ValidationError, VerifiedData};
pub use error::{Error, Result};
pub use ids::{ArticleId, IdGenerator, SubjectId};
pub use model::{ComputedModel, ModelError};
