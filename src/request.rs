use platdist_shared::protocol::HttpMethod;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::VecDeque;

// =========================================================
// 核心抽象层 (HTTP Interface Abstraction)
// =========================================================

/// 传输层错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HttpError {
    /// 请求超过配置的超时时间
    #[error("request timed out")]
    Timeout,
    /// 网络请求失败
    #[error("network error: {0}")]
    Network(String),
    /// 请求构建失败
    #[error("failed to build request: {0}")]
    RequestBuild(String),
    /// 响应解析失败
    #[error("failed to read response: {0}")]
    ResponseParse(String),
}

/// 通用 HTTP 请求结构
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body.to_string());
        self.with_header("Content-Type", "application/json")
    }
}

/// 通用 HTTP 响应结构
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        // 204 等空响应按 JSON null 处理
        if self.body.trim().is_empty() {
            return serde_json::from_str("null");
        }
        serde_json::from_str(&self.body)
    }
}

/// HTTP 客户端特性 (Trait)
///
/// 浏览器环境下的 future 不是 Send 的，因此使用 `?Send`。
/// 实现方负责把超时映射为 `HttpError::Timeout`。
#[async_trait::async_trait(?Send)]
pub trait HttpClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, HttpError>;
}

#[async_trait::async_trait(?Send)]
impl<C: HttpClient + ?Sized> HttpClient for Rc<C> {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        (**self).send(req).await
    }
}

// =========================================================
// 测试工具: MockHttpClient
// =========================================================

#[cfg(test)]
type MockReply = Result<(u16, String), HttpError>;

/// 记录下来的请求
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

/// 按 (方法, URL) 排队的脚本化响应
///
/// 队列中只剩最后一个响应时会一直重复返回它，
/// 方便表达“前两次超时，之后一直成功”之类的场景。
#[cfg(test)]
pub struct MockHttpClient {
    responses: RefCell<HashMap<String, VecDeque<MockReply>>>,
    pub requests: RefCell<Vec<RecordedRequest>>,
}

#[cfg(test)]
impl MockHttpClient {
    pub fn new() -> Self {
        Self {
            responses: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn key(method: HttpMethod, url: &str) -> String {
        format!("{} {}", method.as_str(), url)
    }

    pub fn mock_response(&self, method: HttpMethod, url: &str, status: u16, body: serde_json::Value) {
        self.push(method, url, Ok((status, body.to_string())));
    }

    pub fn mock_error(&self, method: HttpMethod, url: &str, err: HttpError) {
        self.push(method, url, Err(err));
    }

    fn push(&self, method: HttpMethod, url: &str, reply: MockReply) {
        self.responses
            .borrow_mut()
            .entry(Self::key(method, url))
            .or_default()
            .push_back(reply);
    }

    pub fn count(&self, method: HttpMethod, url: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    pub fn total(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last(&self) -> Option<RecordedRequest> {
        self.requests.borrow().last().cloned()
    }
}

#[cfg(test)]
#[async_trait::async_trait(?Send)]
impl HttpClient for MockHttpClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.borrow_mut().push(RecordedRequest {
            method: req.method,
            url: req.url.clone(),
            headers: req.headers.clone(),
            body: req.body.clone(),
        });

        let mut responses = self.responses.borrow_mut();
        let reply = match responses.get_mut(&Self::key(req.method, &req.url)) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match reply {
            Some(Ok((status, body))) => Ok(HttpResponse { status, body }),
            Some(Err(err)) => Err(err),
            None => Ok(HttpResponse {
                status: 404,
                body: "Not Found".to_string(),
            }),
        }
    }
}
