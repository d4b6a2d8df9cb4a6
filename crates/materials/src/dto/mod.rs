pub mod material;

pub use material::{UpdateMaterialRequest, UploadedFile};
