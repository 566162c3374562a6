pub mod advisory;
pub mod chat;
pub mod config;
pub mod db;
pub mod identity;
pub mod inference;
pub mod routes;
pub mod upload;
