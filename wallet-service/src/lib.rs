pub mod consumer;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod seed;
pub mod service;
