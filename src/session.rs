//! 会话管理
//!
//! 会话由访问令牌解码得到，保存在键值存储中（浏览器中为 LocalStorage）。
//! `SessionStore` 在构造时接收存储实现，对外只提供 `load/save/clear`，
//! 不存在全局可变状态。

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use platdist_shared::{Id, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapter::NumValue;

pub const STORAGE_TOKEN_KEY: &str = "token";
pub const STORAGE_USER_KEY: &str = "user";

// =========================================================
// 存储抽象
// =========================================================

/// 字符串键值存储
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Option<String>;
    /// 返回是否写入成功
    fn set(&self, key: &str, value: &str) -> bool;
    fn delete(&self, key: &str) -> bool;
}

/// 内存实现，测试用
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

#[cfg(test)]
impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.borrow_mut().remove(key);
        true
    }
}

// =========================================================
// 会话模型
// =========================================================

/// 当前登录用户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Id,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is not a three-part JWT")]
    Malformed,
    #[error("token payload is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("token claims are invalid: {0}")]
    Claims(#[from] serde_json::Error),
    #[error("token id is not numeric")]
    InvalidId,
    #[error("token expired")]
    Expired,
}

#[derive(Deserialize)]
struct TokenClaims {
    #[serde(alias = "ID_User", alias = "id_user", alias = "userId")]
    id: NumValue,
    #[serde(alias = "Username")]
    username: String,
    #[serde(alias = "Role")]
    role: Role,
    #[serde(default)]
    exp: Option<i64>,
}

/// 解码访问令牌的载荷部分（不校验签名，签名由服务端负责）
///
/// `now_secs` 用于判断 `exp`；令牌没有 `exp` 时视为长期有效。
pub fn decode_token(token: &str, now_secs: i64) -> Result<SessionUser, TokenError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(TokenError::Malformed),
    };

    // 部分服务端会带上 padding
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let claims: TokenClaims = serde_json::from_slice(&bytes)?;

    if let Some(exp) = claims.exp {
        if exp <= now_secs {
            return Err(TokenError::Expired);
        }
    }

    let id = match &claims.id {
        NumValue::Int(v) => *v,
        NumValue::Text(s) => s.trim().parse().map_err(|_| TokenError::InvalidId)?,
        NumValue::Float(_) => return Err(TokenError::InvalidId),
    };

    Ok(SessionUser {
        id,
        username: claims.username,
        role: claims.role,
    })
}

// =========================================================
// 会话存储
// =========================================================

pub struct SessionStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// 读取已保存的会话
    pub fn load(&self) -> Option<Session> {
        self.load_at(Utc::now().timestamp())
    }

    /// 令牌与用户必须同时存在；令牌无法解码或已过期时清除残留数据
    pub fn load_at(&self, now_secs: i64) -> Option<Session> {
        let token = self.storage.get(STORAGE_TOKEN_KEY);
        let user = self.storage.get(STORAGE_USER_KEY);

        let (token, user) = match (token, user) {
            (Some(token), Some(user)) => (token, user),
            (None, None) => return None,
            _ => {
                debug!("partial session in storage, clearing");
                self.clear();
                return None;
            }
        };

        if let Err(e) = decode_token(&token, now_secs) {
            warn!("stored token rejected: {}", e);
            self.clear();
            return None;
        }

        match serde_json::from_str::<SessionUser>(&user) {
            Ok(user) => Some(Session { token, user }),
            Err(e) => {
                warn!("stored user is unreadable: {}", e);
                self.clear();
                None
            }
        }
    }

    pub fn save(&self, session: &Session) -> bool {
        let user = match serde_json::to_string(&session.user) {
            Ok(user) => user,
            Err(_) => return false,
        };
        self.storage.set(STORAGE_TOKEN_KEY, &session.token)
            && self.storage.set(STORAGE_USER_KEY, &user)
    }

    pub fn clear(&self) {
        self.storage.delete(STORAGE_TOKEN_KEY);
        self.storage.delete(STORAGE_USER_KEY);
    }

    /// 解码登录得到的令牌并保存
    pub fn establish(&self, token: String) -> Result<Session, TokenError> {
        let user = decode_token(&token, Utc::now().timestamp())?;
        let session = Session { token, user };
        if !self.save(&session) {
            warn!("session could not be persisted; it will not survive a reload");
        }
        info!(user = %session.user.username, role = %session.user.role, "session established");
        Ok(session)
    }
}

#[cfg(test)]
pub(crate) fn make_token(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_numeric_role() {
        let token = make_token(json!({ "id": 7, "username": "sari", "role": 2 }));
        let user = decode_token(&token, 0).unwrap();
        assert_eq!(
            user,
            SessionUser {
                id: 7,
                username: "sari".into(),
                role: Role::User
            }
        );
    }

    #[test]
    fn test_decode_rejects_unknown_role_and_garbage() {
        let token = make_token(json!({ "id": 1, "username": "x", "role": 5 }));
        assert!(matches!(decode_token(&token, 0), Err(TokenError::Claims(_))));
        assert!(matches!(decode_token("abc", 0), Err(TokenError::Malformed)));
    }

    #[test]
    fn test_decode_honours_exp() {
        let token = make_token(json!({ "id": 1, "username": "x", "role": 1, "exp": 100 }));
        assert!(decode_token(&token, 99).is_ok());
        assert!(matches!(decode_token(&token, 100), Err(TokenError::Expired)));
    }

    #[test]
    fn test_save_load_clear_lifecycle() {
        let store = SessionStore::new(MemoryStorage::default());
        assert!(store.load_at(0).is_none());

        let token = make_token(json!({ "id": 1, "username": "admin", "role": 1 }));
        let session = store.establish(token).unwrap();
        assert_eq!(store.load_at(0), Some(session));

        store.clear();
        assert!(store.load_at(0).is_none());
    }

    #[test]
    fn test_missing_half_invalidates_session() {
        let storage = MemoryStorage::default();
        let token = make_token(json!({ "id": 1, "username": "admin", "role": 1 }));
        storage.set(STORAGE_TOKEN_KEY, &token);

        let store = SessionStore::new(storage);
        assert!(store.load_at(0).is_none());
        assert!(store.storage.get(STORAGE_TOKEN_KEY).is_none());
    }

    #[test]
    fn test_expired_token_is_cleared_on_load() {
        let store = SessionStore::new(MemoryStorage::default());
        let token = make_token(json!({ "id": 1, "username": "u", "role": 2, "exp": 50 }));
        store.save(&Session {
            token,
            user: SessionUser {
                id: 1,
                username: "u".into(),
                role: Role::User,
            },
        });

        assert!(store.load_at(10).is_some());
        assert!(store.load_at(60).is_none());
        assert!(store.load_at(10).is_none());
    }
}
