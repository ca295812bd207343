//! Implements material curves and elastic-plastic notch corrections

mod correction;
mod curve;
mod database;
mod glinka;
mod incremental;
mod neuber;
pub use crate::material::correction::*;
pub use crate::material::curve::*;
pub use crate::material::database::*;
pub use crate::material::glinka::*;
pub use crate::material::incremental::*;
pub use crate::material::neuber::*;
