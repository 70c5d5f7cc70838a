pub mod error;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod service;
