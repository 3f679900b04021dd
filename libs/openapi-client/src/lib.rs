//! Wire models for the notebook build/deploy API

pub mod models;
