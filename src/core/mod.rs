pub mod etl;

pub use crate::domain::model::{FieldBag, Table, TransformResult, YearHistogram};
pub use crate::domain::ports::{Pipeline, SecretsProvider, Storage};
pub use crate::utils::error::Result;
