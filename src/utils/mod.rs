pub mod math;

pub use math::to_base_units;
