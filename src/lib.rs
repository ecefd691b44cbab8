//! 呼叫中心面板核心库
//!
//! - [`upload`]：名单文件解析、上传队列与分批上传
//! - [`compare`]：名单比较与兼容数据分页导出
//! - [`dashboard`]：通话录音、名单统计与拨号列表查询
//! - [`api`]：远程数据源接口及 HTTP / 模拟实现

pub mod api;
pub mod app;
pub mod compare;
pub mod config;
pub mod dashboard;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod upload;

pub use api::{MailingApi, build_api};
pub use config::Config;
pub use error::{CallMetricsError, Result};
