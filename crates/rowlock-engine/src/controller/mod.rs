//! Population controller module
pub mod population;

pub use self::population::{EpochReport, PopulationController};
