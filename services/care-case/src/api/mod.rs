//! REST 接口层

mod rest;

pub use rest::*;
