pub mod archive;
pub mod backup_set;
pub mod config;
pub mod constants;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod service;

#[cfg(test)]
mod testing;

pub use error::{Result, StackError};
