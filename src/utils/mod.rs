pub mod display;
pub mod paths;
