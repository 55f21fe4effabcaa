pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod normalization;
pub mod review;
pub mod storage;
pub mod tracker;
pub mod visibility;
pub mod workflow;
