pub mod budget;
pub mod payer;
pub mod report;
pub mod scoping;
