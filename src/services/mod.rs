pub mod audit;
pub mod auth;
pub mod body_tee;
pub mod cache;
pub mod upstream;
