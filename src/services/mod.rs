pub mod adapter;
pub mod headers;
pub mod naming;
pub mod storage;
