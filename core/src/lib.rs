pub mod api;
pub mod change;
pub mod config;
pub mod convert;
pub mod error;
pub mod judge;
pub mod policy;
pub mod tool;
pub mod validator;
