pub mod intake;
pub mod policy;
pub mod records;
