//! 2D rendering for the flight scene: canvas abstraction, a CPU raster
//! backend, a recording backend and the ship sprite cache.

pub mod canvas;
pub mod font;
pub mod raster;
pub mod recorder;
pub mod sprite;

pub use canvas::*;
pub use raster::*;
pub use recorder::*;
pub use sprite::*;
