#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod batch;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;
pub mod vector_math;

pub use error::{Error, Result};
