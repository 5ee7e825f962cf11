pub mod error;
pub mod job_service;
pub mod quote_service;
