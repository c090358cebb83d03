//! Session lifecycle control

pub mod controller;
pub mod service;

pub use controller::SessionController;
pub use service::ServiceDescriptor;
