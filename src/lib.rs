//! Streaming decoder and encoder for Redis RDB files

pub mod commands;
pub mod pipeline;
pub mod rdb;
