pub mod check;
pub mod config;
pub mod identity;
pub mod run;
