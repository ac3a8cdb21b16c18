pub mod allocation;
pub mod channels;
pub mod config;
pub mod error;
pub mod kpi;
pub mod model;
pub mod output {
    pub mod csv;
    pub mod json;
    pub mod table;
}
pub mod projector;
pub mod store;
