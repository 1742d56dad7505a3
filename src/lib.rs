pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod export;
pub mod model;
pub mod output;
pub mod pagination;
pub mod screen;

#[cfg(test)]
mod tests;
