pub mod download;
pub mod fsutil;
