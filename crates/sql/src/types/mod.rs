//! Core type vocabulary shared by every statement kind

pub mod data_type;

pub use data_type::{TypeCode, TypeDescriptor};
