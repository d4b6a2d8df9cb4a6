pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{MaterialError, StoreError};
pub use service::MaterialsService;
pub use store::{FakeMaterialStore, MaterialChanges, MaterialStore, PgMaterialStore};
