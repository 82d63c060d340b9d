pub mod event;
pub mod finance;
