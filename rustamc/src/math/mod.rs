pub mod basis;
pub mod regression;
