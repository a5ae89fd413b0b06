#![feature(int_roundings)]

pub mod auth;
pub mod calendar;
pub mod config;
pub mod engine;
pub mod http;
pub mod limits;
pub mod model;
pub mod observability;
pub mod wal;
