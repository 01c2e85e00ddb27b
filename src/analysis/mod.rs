pub mod ecg;
pub mod filter;
