pub mod identity;
pub mod kv;
pub mod storage;
