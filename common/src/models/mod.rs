pub mod account;
pub mod credit;
pub mod machine;
pub mod namespace;
pub mod repo;
pub mod token;
