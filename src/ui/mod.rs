//! Terminal user interface

pub mod conversation;
