pub mod cashflow;
pub mod cashflowinfo;
pub mod currency;
pub mod timegrid;
