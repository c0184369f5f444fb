//! 路由定义与守卫 - 领域模型
//!
//! 纯粹的业务逻辑层，不依赖 DOM。
//! 前端路由服务在每次导航（含浏览器后退/前进）时调用 `guard`。

use std::fmt::Display;

use platdist_shared::{Id, Role};

use crate::session::SessionUser;

/// 应用路由枚举
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppRoute {
    /// 登录页面 (默认路由)
    #[default]
    Login,
    Register,
    AdminDashboard,
    AdminItems,
    AdminLocations,
    AdminDistribusi,
    UserDashboard,
    UserDistribusi,
    /// 物品位置与当前设备位置的地图
    UserItemMap(Id),
    NotFound,
}

impl AppRoute {
    /// 将 URL path 解析为路由枚举
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("/");
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };

        match path {
            "/" | "/login" => Self::Login,
            "/register" => Self::Register,
            "/admin" => Self::AdminDashboard,
            "/admin/plat" => Self::AdminItems,
            "/admin/lokasi" => Self::AdminLocations,
            "/admin/distribusi" => Self::AdminDistribusi,
            "/user" => Self::UserDashboard,
            "/user/distribusi" => Self::UserDistribusi,
            other => other
                .strip_prefix("/user/peta/")
                .and_then(|id| id.parse().ok())
                .map(Self::UserItemMap)
                .unwrap_or(Self::NotFound),
        }
    }

    /// 获取路由对应的 URL path
    pub fn to_path(&self) -> String {
        match self {
            Self::Login => "/login".to_string(),
            Self::Register => "/register".to_string(),
            Self::AdminDashboard => "/admin".to_string(),
            Self::AdminItems => "/admin/plat".to_string(),
            Self::AdminLocations => "/admin/lokasi".to_string(),
            Self::AdminDistribusi => "/admin/distribusi".to_string(),
            Self::UserDashboard => "/user".to_string(),
            Self::UserDistribusi => "/user/distribusi".to_string(),
            Self::UserItemMap(id) => format!("/user/peta/{}", id),
            Self::NotFound => "/404".to_string(),
        }
    }

    /// **核心守卫逻辑：该路由要求的角色**
    ///
    /// 严格匹配，管理员不会自动满足普通用户路由。
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Self::AdminDashboard | Self::AdminItems | Self::AdminLocations | Self::AdminDistribusi => {
                Some(Role::Admin)
            }
            Self::UserDashboard | Self::UserDistribusi | Self::UserItemMap(_) => Some(Role::User),
            Self::Login | Self::Register | Self::NotFound => None,
        }
    }

    /// 已登录用户是否应该离开此路由（登录/注册页）
    pub fn should_redirect_when_authenticated(&self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }

    /// 认证失败时的重定向目标
    pub fn auth_failure_redirect() -> Self {
        Self::Login
    }

    /// 各角色的首页
    pub fn home_for(role: Role) -> Self {
        match role {
            Role::Admin => Self::AdminDashboard,
            Role::User => Self::UserDashboard,
        }
    }
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

/// 守卫结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(AppRoute),
}

impl GuardDecision {
    /// 最终会落到的路由
    pub fn resolve(self, target: AppRoute) -> AppRoute {
        match self {
            GuardDecision::Allow => target,
            GuardDecision::Redirect(route) => route,
        }
    }
}

/// 判断目标路由对当前会话是否可达
///
/// 需要角色的路由：会话存在且角色完全一致才放行，否则回到登录页。
pub fn guard(target: &AppRoute, session: Option<&SessionUser>) -> GuardDecision {
    match (target.required_role(), session) {
        (Some(required), Some(user)) if user.role == required => GuardDecision::Allow,
        (Some(_), _) => GuardDecision::Redirect(AppRoute::auth_failure_redirect()),
        (None, Some(user)) if target.should_redirect_when_authenticated() => {
            GuardDecision::Redirect(AppRoute::home_for(user.role))
        }
        (None, _) => GuardDecision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> SessionUser {
        SessionUser {
            id: 1,
            username: "u".into(),
            role,
        }
    }

    #[test]
    fn test_user_is_redirected_from_admin_route() {
        let decision = guard(&AppRoute::AdminItems, Some(&user(Role::User)));
        assert_eq!(decision, GuardDecision::Redirect(AppRoute::Login));
        assert_eq!(AppRoute::Login.to_path(), "/login");
    }

    #[test]
    fn test_admin_reaches_admin_route() {
        assert_eq!(
            guard(&AppRoute::AdminItems, Some(&user(Role::Admin))),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_role_match_is_exact() {
        assert_eq!(
            guard(&AppRoute::UserDashboard, Some(&user(Role::Admin))),
            GuardDecision::Redirect(AppRoute::Login)
        );
    }

    #[test]
    fn test_anonymous_is_redirected() {
        assert_eq!(
            guard(&AppRoute::UserItemMap(4), None),
            GuardDecision::Redirect(AppRoute::Login)
        );
        assert_eq!(guard(&AppRoute::Register, None), GuardDecision::Allow);
    }

    #[test]
    fn test_logged_in_user_leaves_login_page() {
        assert_eq!(
            guard(&AppRoute::Login, Some(&user(Role::User))).resolve(AppRoute::Login),
            AppRoute::UserDashboard
        );
    }

    #[test]
    fn test_path_round_trip_for_parameterized_route() {
        assert_eq!(AppRoute::from_path("/user/peta/12"), AppRoute::UserItemMap(12));
        assert_eq!(AppRoute::from_path("/user/peta/abc"), AppRoute::NotFound);
        assert_eq!(AppRoute::from_path("/admin/plat/?q=1"), AppRoute::AdminItems);
        assert_eq!(AppRoute::from_path("/"), AppRoute::Login);
    }
}
