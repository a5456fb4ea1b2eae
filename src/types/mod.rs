//! Core identifier types shared by the GitHub and webhook modules.

pub mod ids;

pub use ids::{AppId, DeliveryId, InstallationId};
