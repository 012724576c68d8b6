pub mod clients;
pub mod dispatch;
pub mod server;
pub mod services;
pub mod web;
