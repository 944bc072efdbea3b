pub mod replicate;
pub mod storage;
pub mod tracker;
