pub mod buildings;
pub mod catalog;
pub mod composer;
pub mod config;
pub mod data;
pub mod environment;
pub mod error;
pub mod export;
pub mod foliage;
pub mod grid;
pub mod health;
pub mod intent;
pub mod jobs;
pub mod road;
pub mod service;
