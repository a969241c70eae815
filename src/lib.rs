// Library exports for the Vigil supervision core

pub mod config;
pub mod error;
pub mod history;
pub mod process;
pub mod scheduler;
pub mod trigger;
