//! 分发管理客户端核心
//!
//! 与浏览器无关的全部工作流逻辑：HTTP 抽象、重试、API 访问、会话、
//! 路由守卫、分发视图模型、选项缓存、地图同步与表单校验。
//! 浏览器相关的实现（fetch、LocalStorage、定时器、定位）由前端 crate 注入。

pub mod adapter;
pub mod api;
pub mod config;
pub mod distribution;
pub mod error;
pub mod guard;
pub mod map;
pub mod options;
pub mod request;
pub mod retry;
pub mod session;
pub mod validation;

pub use api::PlatApi;
pub use config::ClientConfig;
pub use distribution::{DistribusiFilter, DistribusiStats, DistribusiViewModel, MonthlyFlow, Scope};
pub use error::{ClientError, ClientErrorKind, ClientResult};
pub use guard::{AppRoute, GuardDecision, guard};
pub use map::{Bounds, DevicePosition, LatLng, MapSurface, MapSync, OsrmRouter};
pub use options::{OptionCache, OptionKind};
pub use request::{HttpClient, HttpError, HttpRequest, HttpResponse};
pub use retry::{RetryPolicy, Timer};
pub use session::{KeyValueStorage, Session, SessionStore, SessionUser};
pub use validation::{FieldErrors, SubmitError};
