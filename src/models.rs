mod case_convention;
mod insert_location;
mod model;

pub use case_convention::CaseConvention;
pub use insert_location::InsertLocation;
pub use model::{MODEL_CATALOG, ModelDescriptor, ModelFeature};
