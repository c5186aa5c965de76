pub mod auth;
pub mod csv;
pub mod data;
pub mod oai;
pub mod route;
