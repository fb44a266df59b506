mod common;
mod config;
