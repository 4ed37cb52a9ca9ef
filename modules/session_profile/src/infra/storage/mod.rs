pub mod entity;
pub mod keys;
pub mod kv_repo;
pub mod mapper;

pub use kv_repo::KvUserDataRepository;
