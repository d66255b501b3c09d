pub mod compare;
pub mod domain;
pub mod harness;
