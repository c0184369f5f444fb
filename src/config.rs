//! 客户端配置
//!
//! 所有模块共用同一个 API 入口地址。未设置的键使用默认值。

use serde::{Deserialize, Serialize};

use crate::retry::{RetryPolicy, RetrySettings};

// =========================================================
// 默认值
// =========================================================

pub const DEFAULT_API_BASE: &str = "http://localhost:3000";
pub const DEFAULT_ROUTING_BASE: &str = "https://router.project-osrm.org";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// 配置键（编译期环境变量或其他来源）
pub const KEY_API_BASE: &str = "PLATDIST_API_BASE";
pub const KEY_ROUTING_BASE: &str = "PLATDIST_ROUTING_BASE";
pub const KEY_REQUEST_TIMEOUT_MS: &str = "PLATDIST_REQUEST_TIMEOUT_MS";
pub const KEY_LOG_LEVEL: &str = "PLATDIST_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// REST API 的协议、主机与端口，路径统一以 `/api` 开头
    pub api_base_url: String,
    /// 路线规划服务 (OSRM) 地址
    pub routing_base_url: String,
    pub request_timeout_ms: u64,
    /// 分发列表读取：失败后最多再试 2 次，固定间隔
    pub list_retry: RetrySettings,
    /// 下拉选项读取：指数退避
    pub option_retry: RetrySettings,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            routing_base_url: DEFAULT_ROUTING_BASE.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            list_retry: RetrySettings {
                max_attempts: 3,
                base_delay_ms: 1000,
                multiplier: 1.0,
            },
            option_retry: RetrySettings {
                max_attempts: 3,
                base_delay_ms: 1000,
                multiplier: 1.5,
            },
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ClientConfig {
    /// 从键值来源读取配置，缺失或无法解析的键回退到默认值
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_base_url: read(KEY_API_BASE)
                .map(|v| normalize_base(&v))
                .unwrap_or(defaults.api_base_url),
            routing_base_url: read(KEY_ROUTING_BASE)
                .map(|v| normalize_base(&v))
                .unwrap_or(defaults.routing_base_url),
            request_timeout_ms: read(KEY_REQUEST_TIMEOUT_MS)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.request_timeout_ms),
            log_level: read(KEY_LOG_LEVEL)
                .map(|v| v.trim().to_ascii_lowercase())
                .unwrap_or(defaults.log_level),
            ..defaults
        }
    }

    pub fn list_policy(&self) -> RetryPolicy {
        self.list_retry.into()
    }

    pub fn option_policy(&self) -> RetryPolicy {
        self.option_retry.into()
    }
}

/// 去掉结尾的 `/` 以及误配置的 `/api` 后缀
pub fn normalize_base(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/api")
        .unwrap_or(trimmed)
        .to_string()
}

/// 拼接基础地址与路径
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_lookup_is_empty() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.list_policy().max_attempts(), 3);
    }

    #[test]
    fn test_lookup_overrides_and_normalizes() {
        let vars: HashMap<&str, &str> = [
            (KEY_API_BASE, "http://10.0.0.5:3001/api/"),
            (KEY_REQUEST_TIMEOUT_MS, "not-a-number"),
            (KEY_LOG_LEVEL, "DEBUG"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_base_url, "http://10.0.0.5:3001");
        assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h", "/api/plat"), "http://h/api/plat");
        assert_eq!(join_url("http://h", "api/plat"), "http://h/api/plat");
    }
}
