pub mod audit;
pub mod auth;
pub mod config;
pub mod crm;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod odata;
pub mod services;
pub mod types;
