pub mod algo;
pub mod cmd_helper;
pub mod collector;
pub mod fs;
