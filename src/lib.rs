pub mod config;
pub mod converter;
pub mod export;
pub mod tiddler;
pub mod transducer;
pub mod wiki;
