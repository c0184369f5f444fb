//! 认证模块
//!
//! 管理会话状态，与路由系统解耦。
//! 路由服务通过注入的会话信号执行守卫。

use leptos::prelude::*;
use platdist::session::{Session, SessionStore, SessionUser};
use platdist_shared::{RegisterRequest, Role};

use crate::api::{Api, new_api};
use crate::web::BrowserStorage;

/// 认证状态
#[derive(Clone, Default)]
pub struct AuthState {
    pub session: Option<Session>,
}

/// 认证上下文
///
/// 包含读写信号，通过 Context 在组件间共享。
#[derive(Clone, Copy)]
pub struct AuthContext {
    pub state: ReadSignal<AuthState>,
    pub set_state: WriteSignal<AuthState>,
}

impl AuthContext {
    pub fn new() -> Self {
        let (state, set_state) = signal(AuthState::default());
        Self { state, set_state }
    }

    /// 当前用户信号（用于路由服务注入）
    pub fn user_signal(&self) -> Signal<Option<SessionUser>> {
        let state = self.state;
        Signal::derive(move || state.with(|s| s.session.as_ref().map(|s| s.user.clone())))
    }

    pub fn user_untracked(&self) -> Option<SessionUser> {
        self.state
            .with_untracked(|s| s.session.as_ref().map(|s| s.user.clone()))
    }

    /// 携带当前令牌的 API 客户端
    pub fn api(&self) -> Api {
        self.state
            .with_untracked(|s| new_api(s.session.as_ref().map(|s| s.token.as_str())))
    }
}

fn store() -> SessionStore<BrowserStorage> {
    SessionStore::new(BrowserStorage)
}

/// 从 Context 获取认证上下文
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().expect("AuthContext should be provided")
}

/// 从 LocalStorage 恢复会话；令牌过期时会话被清除
pub fn init_auth(ctx: &AuthContext) {
    let session = store().load();
    if let Some(session) = &session {
        tracing::info!(user = %session.user.username, "session restored");
    }
    ctx.set_state.set(AuthState { session });
}

/// 登录并保存会话，返回错误提示
pub async fn login(ctx: &AuthContext, username: String, password: String) -> Result<SessionUser, String> {
    let token = new_api(None)
        .login(&username, &password)
        .await
        .map_err(|e| e.message().to_string())?;

    let session = store().establish(token).map_err(|e| {
        tracing::warn!("login token rejected: {}", e);
        "Token login tidak valid".to_string()
    })?;

    let user = session.user.clone();
    ctx.set_state.set(AuthState {
        session: Some(session),
    });
    Ok(user)
}

pub async fn register(username: String, password: String, role: Role) -> Result<(), String> {
    new_api(None)
        .register(RegisterRequest {
            username,
            password,
            role: role.code(),
        })
        .await
        .map_err(|e| e.message().to_string())
}

/// 注销并清除状态
///
/// 导航由路由服务监听会话变化自动处理。
pub fn logout(ctx: &AuthContext) {
    store().clear();
    ctx.set_state.set(AuthState::default());
    tracing::info!("logged out");
}
