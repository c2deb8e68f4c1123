pub mod extractor;
pub mod slices;
pub mod transform;

pub use extractor::{Extractor, GAMES_PATH};
pub use slices::{ExtractionSlice, SeasonType, plan_slices, week_slices};
pub use transform::{normalize_keys, shape_records, to_snake_case};
