pub mod jobdtos;
pub mod quotedtos;
