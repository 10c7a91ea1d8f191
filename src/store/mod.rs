pub mod repo;
pub mod sqlite;
