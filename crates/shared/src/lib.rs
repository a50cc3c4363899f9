pub mod camera;
pub mod cluster;
pub mod config;
pub mod controller;
pub mod coverage;
pub mod extract;
pub mod geo;
pub mod models;
pub mod search;
pub mod selection;
pub mod viewport;
