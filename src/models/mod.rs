pub mod jobmodel;
pub mod quotemodel;
