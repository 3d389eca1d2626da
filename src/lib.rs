pub mod light_probe;
pub mod logger;
