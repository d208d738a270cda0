pub mod factory;
pub mod judge;
pub mod tools;
