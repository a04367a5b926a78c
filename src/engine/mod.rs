pub mod confidence;
pub mod filter;
pub mod scoring;
pub mod selection;
