//! prospector-cli library - 暴露模块用于单元测试

pub mod commands;
pub mod events;
pub mod http;
