pub mod colorize;
pub mod job;
pub mod reference;
