//! 命令行参数

use clap::Parser;

/// 模拟积分计算系统
#[derive(Parser, Debug)]
#[command(name = "mock-accrual")]
#[command(version, about = "积分计算系统模拟服务")]
pub struct Cli {
    /// 监听地址
    #[arg(short = 'a', long = "address", env = "RUN_ADDRESS", default_value = "0.0.0.0:8090")]
    pub address: String,

    /// 每个窗口允许的查询次数，0 表示不限流
    #[arg(long, default_value = "0")]
    pub rate_limit: u32,

    /// 限流窗口（秒）
    #[arg(long, default_value = "60")]
    pub window_secs: u64,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}
