//! Infrastructure layer: persistence gateway, settings, read models and the
//! inventory service that ties them to the domain.

pub mod gateway;
pub mod locks;
pub mod projections;
pub mod read_model;
pub mod service;
pub mod settings;

pub use gateway::{GatewayError, InMemoryGateway, PersistenceGateway, TransactionReportRow};
pub use locks::ItemLocks;
pub use projections::{StockLevel, StockLevelProjection};
pub use read_model::{InMemoryReadModelStore, ReadModelStore};
pub use service::{InventoryService, ServiceError, ServiceResult};
pub use settings::{BackendSettings, RuntimeSettings, Settings, SettingsError, SettingsProvider};
