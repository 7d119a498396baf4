pub mod registry;
pub mod serialization;
pub mod session;
