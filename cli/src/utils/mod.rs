pub mod config;
pub mod proxy;
pub mod tool_validator;
pub mod validator;
