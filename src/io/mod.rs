pub mod bus;
pub mod dummy;
