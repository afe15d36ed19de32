pub mod amccalculator;
pub mod config;
pub mod multilegengine;
pub mod pathvalue;
