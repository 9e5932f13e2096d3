pub mod traits;

mod consts;
mod registry;

pub use crate::{consts::*, registry::*};
