pub mod gaussianmodel;
pub mod montecarlomodel;
pub mod sequences;
