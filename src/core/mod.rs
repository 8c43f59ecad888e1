pub mod etl;
pub mod field_map;
pub mod pipeline;
pub mod record_mapper;
pub mod script;
pub mod sheet;
pub mod transfer;

pub use crate::domain::model::{CanonicalRecord, OutputRow, RawRow, Sheet, TransformResult};
pub use crate::domain::ports::{PaymentPlatform, Pipeline, RowTransform, ScriptFunction, Storage};
pub use crate::utils::error::Result;
