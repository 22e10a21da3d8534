pub mod job;
pub mod records;
