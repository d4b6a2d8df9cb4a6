pub mod material;

pub use material::{Material, MaterialDownload, MaterialSummary, is_released};
