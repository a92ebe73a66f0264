//! 命令行参数
//!
//! 与环境变量 RUN_ADDRESS / DATABASE_URI / ACCRUAL_SYSTEM_ADDRESS 对应，
//! 命令行参数优先于环境变量和配置文件。

use clap::Parser;
use loyalty_shared::config::LegacyOverrides;

/// 积分服务
#[derive(Parser, Debug, Default)]
#[command(name = "loyalty-api")]
#[command(version, about = "积分账本服务")]
pub struct Cli {
    /// 服务监听地址，如 localhost:8080 或 :8080
    #[arg(short = 'a', long = "address")]
    pub run_address: Option<String>,

    /// PostgreSQL 连接串
    #[arg(short = 'd', long = "database-uri")]
    pub database_uri: Option<String>,

    /// 积分计算系统地址
    #[arg(short = 'r', long = "accrual-address")]
    pub accrual_address: Option<String>,
}

impl Cli {
    /// 转换为配置覆盖项
    pub fn overrides(&self) -> LegacyOverrides {
        LegacyOverrides {
            run_address: self.run_address.clone(),
            database_uri: self.database_uri.clone(),
            accrual_address: self.accrual_address.clone(),
        }
    }
}
