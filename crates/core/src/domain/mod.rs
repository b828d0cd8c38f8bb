pub mod bill;
pub mod form;
