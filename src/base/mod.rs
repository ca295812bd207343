//! Implements the base structures for a modal response analysis

mod config;
mod constants;
mod enums;
mod modal_data;
mod parameters;
mod sample_data;
pub use crate::base::config::*;
pub use crate::base::constants::*;
pub use crate::base::enums::*;
pub use crate::base::modal_data::*;
pub use crate::base::parameters::*;
pub use crate::base::sample_data::*;
