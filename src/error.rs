use std::fmt;

use crate::request::HttpError;

// =========================================================
// 错误类别
// =========================================================

/// 错误类别，决定是否重试以及如何提示用户
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// 请求超时（唯一可重试的类别）
    Timeout,
    /// 连接失败、DNS、CORS 等网络层错误
    Network,
    /// 401: 凭据缺失或失效
    Unauthorized,
    /// 403 或当前会话无权执行该操作
    Forbidden,
    /// 404: 资源不存在
    NotFound,
    /// 其余 4xx/5xx
    Server,
    /// 响应体无法解析为预期结构
    Decode,
    /// 不允许的状态迁移，未发出请求
    InvalidTransition,
}

impl ClientErrorKind {
    /// 超时类错误可以安全重试
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientErrorKind::Timeout)
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ClientErrorKind::Timeout => "TIMEOUT",
            ClientErrorKind::Network => "NETWORK_ERROR",
            ClientErrorKind::Unauthorized => "UNAUTHORIZED",
            ClientErrorKind::Forbidden => "FORBIDDEN",
            ClientErrorKind::NotFound => "RESOURCE_NOT_FOUND",
            ClientErrorKind::Server => "SERVER_ERROR",
            ClientErrorKind::Decode => "DECODE_ERROR",
            ClientErrorKind::InvalidTransition => "INVALID_TRANSITION",
        }
    }

    fn from_status(status: u16) -> Self {
        match status {
            401 => ClientErrorKind::Unauthorized,
            403 => ClientErrorKind::Forbidden,
            404 => ClientErrorKind::NotFound,
            _ => ClientErrorKind::Server,
        }
    }
}

// =========================================================
// 核心错误类型
// =========================================================

/// 客户端错误
///
/// - kind: 错误类别
/// - message: 面向用户的提示信息
/// - status: 服务端返回的 HTTP 状态码（如有）
/// - spans: 发生错误时经过的操作链，如 `distribusi.list -> GET(/api/distribusi)`
#[derive(Debug, Clone, PartialEq)]
pub struct ClientError {
    kind: ClientErrorKind,
    message: String,
    status: Option<u16>,
    spans: Vec<String>,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            spans: Vec::new(),
        }
    }

    // --- Convenience constructors ---

    pub fn timeout() -> Self {
        Self::new(
            ClientErrorKind::Timeout,
            "Permintaan melebihi batas waktu. Periksa koneksi Anda.",
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Network, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::NotFound, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Decode, message)
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::InvalidTransition, message)
    }

    /// 将非 2xx 响应转换为错误
    ///
    /// 优先使用响应体中的 `message`/`error` 字段，否则给出通用提示。
    pub fn from_response(status: u16, body: &str) -> Self {
        let server_message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                ["message", "error", "msg"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
            })
            .filter(|m| !m.trim().is_empty());

        let message = server_message.unwrap_or_else(|| match status {
            401 => "Sesi berakhir. Silakan login kembali.".to_string(),
            403 => "Anda tidak memiliki akses untuk tindakan ini.".to_string(),
            404 => "Data tidak ditemukan.".to_string(),
            _ => format!("Terjadi kesalahan pada server ({})", status),
        });

        Self {
            kind: ClientErrorKind::from_status(status),
            message,
            status: Some(status),
            spans: Vec::new(),
        }
    }

    // --- Context builders ---

    /// 添加操作追踪
    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(operation.into());
        self
    }

    // --- Accessors ---

    pub fn kind(&self) -> ClientErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// 面向用户的提示信息（不含追踪）
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spans(&self) -> &[String] {
        &self.spans
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.error_code(), self.message)?;
        if !self.spans.is_empty() {
            write!(f, " | trace: {}", self.spans.join(" -> "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ClientError {}

impl From<HttpError> for ClientError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout => ClientError::timeout(),
            HttpError::Network(detail) => ClientError::network(format!(
                "Tidak dapat terhubung ke server: {}",
                detail
            )),
            HttpError::RequestBuild(detail) => {
                ClientError::network(format!("Permintaan tidak valid: {}", detail))
            }
            HttpError::ResponseParse(detail) => {
                ClientError::decode(format!("Respons server tidak valid: {}", detail))
            }
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::decode(format!("Respons server tidak valid: {}", err))
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_is_preferred() {
        let err = ClientError::from_response(400, r#"{"message":"Stok tidak cukup"}"#);
        assert_eq!(err.kind(), ClientErrorKind::Server);
        assert_eq!(err.message(), "Stok tidak cukup");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_generic_fallback() {
        let err = ClientError::from_response(502, "<html>Bad Gateway</html>");
        assert_eq!(err.message(), "Terjadi kesalahan pada server (502)");
        assert!(!err.is_transient());

        let err = ClientError::from_response(404, "");
        assert_eq!(err.kind(), ClientErrorKind::NotFound);
    }

    #[test]
    fn test_only_timeout_is_transient() {
        assert!(ClientError::from(HttpError::Timeout).is_transient());
        assert!(!ClientError::from(HttpError::Network("refused".into())).is_transient());
    }

    #[test]
    fn test_display_includes_trace() {
        let err = ClientError::timeout()
            .in_op("GET /api/distribusi")
            .in_op("distribusi.list");
        assert_eq!(
            err.to_string(),
            "[TIMEOUT] Permintaan melebihi batas waktu. Periksa koneksi Anda. | trace: GET /api/distribusi -> distribusi.list"
        );
    }
}
