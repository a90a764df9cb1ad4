pub mod dashboard;
pub mod enquiry;
pub mod export;
pub mod user;
