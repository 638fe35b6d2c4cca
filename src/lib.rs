pub mod backend;
pub mod cases;
pub mod config;
pub mod errors;
pub mod logging;
pub mod office;
pub mod web;
