//! 前端服务装配
//!
//! 配置在编译期从环境变量读取，缺省时使用核心库的默认值。
//! API、路线规划与视图模型都在这里用浏览器实现组装。

use std::time::Duration;

use platdist::config::{KEY_API_BASE, KEY_LOG_LEVEL, KEY_REQUEST_TIMEOUT_MS, KEY_ROUTING_BASE};
use platdist::{
    ClientConfig, DistribusiViewModel, OptionCache, OsrmRouter, PlatApi, Scope,
};

use crate::web::{BrowserHttpClient, BrowserTimer};

pub type Api = PlatApi<BrowserHttpClient>;
pub type DistribusiVm = DistribusiViewModel<BrowserHttpClient, BrowserTimer>;
pub type Options = OptionCache<BrowserHttpClient, BrowserTimer>;
pub type Router = OsrmRouter<BrowserHttpClient>;

fn compile_time_var(key: &str) -> Option<String> {
    let value = match key {
        KEY_API_BASE => option_env!("PLATDIST_API_BASE"),
        KEY_ROUTING_BASE => option_env!("PLATDIST_ROUTING_BASE"),
        KEY_REQUEST_TIMEOUT_MS => option_env!("PLATDIST_REQUEST_TIMEOUT_MS"),
        KEY_LOG_LEVEL => option_env!("PLATDIST_LOG_LEVEL"),
        _ => None,
    };
    value.map(str::to_string)
}

pub fn app_config() -> ClientConfig {
    ClientConfig::from_lookup(compile_time_var)
}

fn http_client(config: &ClientConfig) -> BrowserHttpClient {
    BrowserHttpClient::new(Duration::from_millis(config.request_timeout_ms))
}

/// 带可选令牌的 API 客户端
pub fn new_api(token: Option<&str>) -> Api {
    let config = app_config();
    let api = PlatApi::new(&config.api_base_url, http_client(&config));
    match token {
        Some(token) => api.with_token(token),
        None => api,
    }
}

pub fn new_distribusi_vm(api: Api, scope: Scope) -> DistribusiVm {
    DistribusiViewModel::new(api, BrowserTimer, app_config().list_policy(), scope)
}

pub fn new_option_cache(api: Api) -> Options {
    OptionCache::new(api, BrowserTimer, app_config().option_policy())
}

pub fn new_router() -> Router {
    let config = app_config();
    OsrmRouter::new(&config.routing_base_url, http_client(&config))
}
