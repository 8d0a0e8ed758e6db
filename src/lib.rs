pub mod catalog;
pub mod config;
pub mod dashboards;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod writetos3;
