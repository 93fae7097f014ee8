#[macro_use]
pub mod fault;

pub mod arity;
pub mod boxed;
pub mod check;
pub mod compiler_support;
pub mod config;
pub mod intern;
pub mod layout;
pub mod num;
pub mod task;
pub mod word;
