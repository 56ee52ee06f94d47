pub mod engine_adapter;
pub mod shell;
