pub mod excel;
pub mod session;
