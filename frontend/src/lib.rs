//! PlatDist 前端应用
//!
//! 采用 Context-Driven 的高内聚低耦合架构：
//! - `platdist::guard`: 路由定义与守卫规则（核心库）
//! - `web::router`: 路由服务（核心引擎）
//! - `auth`: 会话状态管理
//! - `components`: UI 组件层

pub mod api;
mod auth;
mod components {
    pub mod admin_dashboard;
    mod create_distribution_dialog;
    mod distribution_panel;
    mod field;
    mod icons;
    pub mod items;
    pub mod layout;
    pub mod locations;
    pub mod login;
    pub mod map_view;
    pub mod register;
    mod stats;
    pub mod user_dashboard;
}

use crate::auth::{AuthContext, init_auth};
use crate::components::admin_dashboard::{AdminDashboardPage, AdminDistribusiPage};
use crate::components::items::ItemsPage;
use crate::components::layout::{AppShell, Online};
use crate::components::locations::LocationsPage;
use crate::components::login::LoginPage;
use crate::components::map_view::MapPage;
use crate::components::register::RegisterPage;
use crate::components::user_dashboard::{UserDashboardPage, UserDistribusiPage};

use leptos::prelude::*;
use platdist::guard::AppRoute;

// 原生 Web API 封装模块
// 为核心库的抽象（HTTP、键值存储、定时器）提供基于 `web_sys` 的实现，
// 并封装定位、连接状态、日志与 History 路由。
pub(crate) mod web {
    pub mod connectivity;
    pub mod geolocation;
    mod http;
    pub mod logging;
    pub mod router;
    mod storage;
    mod timer;

    pub use http::BrowserHttpClient;
    pub use storage::BrowserStorage;
    pub use timer::BrowserTimer;
}

pub use web::logging::init as init_logging;

use web::connectivity::online_signal;
use web::router::{Router, RouterOutlet};

/// 路由匹配函数
///
/// 根据 AppRoute 枚举返回对应的视图组件。守卫已由路由服务执行。
fn route_matcher(route: AppRoute) -> AnyView {
    match route {
        AppRoute::Login => view! { <LoginPage /> }.into_any(),
        AppRoute::Register => view! { <RegisterPage /> }.into_any(),
        AppRoute::AdminDashboard => view! { <AppShell><AdminDashboardPage /></AppShell> }.into_any(),
        AppRoute::AdminItems => view! { <AppShell><ItemsPage /></AppShell> }.into_any(),
        AppRoute::AdminLocations => view! { <AppShell><LocationsPage /></AppShell> }.into_any(),
        AppRoute::AdminDistribusi => view! { <AppShell><AdminDistribusiPage /></AppShell> }.into_any(),
        AppRoute::UserDashboard => view! { <AppShell><UserDashboardPage /></AppShell> }.into_any(),
        AppRoute::UserDistribusi => view! { <AppShell><UserDistribusiPage /></AppShell> }.into_any(),
        AppRoute::UserItemMap(id) => view! { <AppShell><MapPage id=id /></AppShell> }.into_any(),
        AppRoute::NotFound => view! {
            <div class="flex items-center justify-center min-h-screen bg-base-200">
                <div class="text-center">
                    <h1 class="text-6xl font-bold text-error">"404"</h1>
                    <p class="text-xl mt-4">"Halaman tidak ditemukan"</p>
                </div>
            </div>
        }
        .into_any(),
    }
}

#[component]
pub fn App() -> impl IntoView {
    // 1. 创建认证上下文
    let auth_ctx = AuthContext::new();
    provide_context(auth_ctx);

    // 2. 从 LocalStorage 恢复会话（过期令牌会被清除）
    init_auth(&auth_ctx);

    // 3. 连接状态，供离线横幅使用
    provide_context(Online(online_signal()));

    // 4. 会话信号注入路由服务
    let session = auth_ctx.user_signal();

    view! {
        <Router session=session>
            <RouterOutlet matcher=route_matcher />
        </Router>
    }
}
