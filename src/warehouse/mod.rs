//! Warehouse abstraction over the analytical store.

pub mod base;
pub mod memory;

pub use base::Warehouse;
pub use memory::MemoryWarehouse;
