pub mod backend;
pub mod runner;
