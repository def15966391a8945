pub mod agents;
pub mod config_cmd;
pub mod run;
pub mod serve;
