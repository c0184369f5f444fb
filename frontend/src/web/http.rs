//! HTTP 请求封装模块
//!
//! 使用 `web_sys::fetch` 实现核心库的 `HttpClient`。
//! 超时通过 `AbortController` 中止请求并映射为 `HttpError::Timeout`。

use std::time::Duration;

use futures::FutureExt;
use futures::future::{Either, select};
use platdist::{HttpClient, HttpError, HttpRequest, HttpResponse};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Headers, Request, RequestInit, Response};

use super::timer::sleep;

/// 浏览器 fetch 客户端
///
/// 只保存超时配置，可以自由复制。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrowserHttpClient {
    timeout: Duration,
}

impl BrowserHttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn build_request(req: &HttpRequest, controller: &AbortController) -> Result<Request, HttpError> {
    let headers = Headers::new()
        .map_err(|e| HttpError::RequestBuild(format!("创建 Headers 失败: {:?}", e)))?;

    for (key, value) in &req.headers {
        headers
            .set(key, value)
            .map_err(|e| HttpError::RequestBuild(format!("设置 Header 失败: {:?}", e)))?;
    }

    let opts = RequestInit::new();
    opts.set_method(req.method.as_str());
    opts.set_headers(&headers.into());
    opts.set_signal(Some(&controller.signal()));

    if let Some(body) = &req.body {
        opts.set_body(&JsValue::from_str(body));
    }

    Request::new_with_str_and_init(&req.url, &opts)
        .map_err(|e| HttpError::RequestBuild(format!("{:?}", e)))
}

async fn fetch(request: Request) -> Result<HttpResponse, HttpError> {
    let window =
        web_sys::window().ok_or_else(|| HttpError::Network("无法获取 window 对象".to_string()))?;

    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| HttpError::Network(format!("{:?}", e)))?;

    let response: Response = resp_value
        .dyn_into()
        .map_err(|e| HttpError::ResponseParse(format!("Response 类型转换失败: {:?}", e)))?;

    let status = response.status();
    let promise = response
        .text()
        .map_err(|e| HttpError::ResponseParse(format!("{:?}", e)))?;
    let text = JsFuture::from(promise)
        .await
        .map_err(|e| HttpError::ResponseParse(format!("{:?}", e)))?;

    Ok(HttpResponse {
        status,
        body: text.as_string().unwrap_or_default(),
    })
}

#[async_trait::async_trait(?Send)]
impl HttpClient for BrowserHttpClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        let controller = AbortController::new()
            .map_err(|e| HttpError::RequestBuild(format!("{:?}", e)))?;
        let request = build_request(&req, &controller)?;

        let response = fetch(request).boxed_local();
        let deadline = sleep(self.timeout).boxed_local();

        match select(response, deadline).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => {
                controller.abort();
                tracing::debug!(url = %req.url, "request aborted after timeout");
                Err(HttpError::Timeout)
            }
        }
    }
}
