#![allow(non_snake_case)]

pub mod detection;
pub mod pipeline;
pub mod utils;
pub mod web;
