pub mod build_cmd;
pub mod config_cmd;
pub mod doctor_cmd;
