//! File I/O for layer stacks, run configurations and results.

pub mod json;

pub use json::{
    read_config_json, read_layers_json, read_result_json, write_config_json, write_layers_json,
    write_result_json,
};
