pub mod geom;
pub mod math;
pub mod unit;
