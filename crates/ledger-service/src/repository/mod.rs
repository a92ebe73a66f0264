//! 账本存储层
//!
//! 订单、提现记录的唯一写入方。
//!
//! ## 设计原则
//!
//! - 余额相关的读改写在按所有者划分的临界区内完成，不同所有者互不阻塞
//! - 订单号去重依赖唯一约束，插入与归属判定在一次原子操作内完成
//! - 临界区只覆盖存储内的读改写，不跨越任何外部调用
//! - 定义 trait 接口以支持 mock 测试

mod memory_store;
mod pg_store;
mod traits;

pub use memory_store::MemoryLedgerStore;
pub use pg_store::PgLedgerStore;
pub use traits::*;
