pub mod coordinator;
pub mod ingress;

pub use crate::domain::model::{
    Association, BindResponse, BindResult, Hanger, Item, PairingSnapshot, ScanEvent, ScanOutcome,
};
pub use crate::domain::ports::{ConfigProvider, EntityStore};
pub use crate::utils::error::Result;
