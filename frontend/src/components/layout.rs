//! 页面外壳：导航栏、离线横幅与通知提示

use leptos::prelude::*;
use platdist::guard::AppRoute;
use platdist::{ClientError, ClientErrorKind};
use platdist_shared::Role;

use crate::auth::{AuthContext, logout, use_auth};
use crate::components::icons::{LogOut, Package, WifiOff};
use crate::web::router::Link;

/// 浏览器连接状态（由 App 提供）
#[derive(Clone, Copy)]
pub struct Online(pub ReadSignal<bool>);

/// 页面内的通知提示
#[derive(Clone, Copy)]
pub struct Notifier {
    notice: RwSignal<Option<(String, bool)>>,
    auth: AuthContext,
}

impl Notifier {
    fn new(auth: AuthContext) -> Self {
        Self {
            notice: RwSignal::new(None),
            auth,
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notice.set(Some((message.into(), false)));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.notice.set(Some((message.into(), true)));
    }

    /// 显示错误；会话失效时同时注销
    pub fn error(&self, err: &ClientError) {
        tracing::warn!("{}", err);
        if err.kind() == ClientErrorKind::Unauthorized {
            logout(&self.auth);
        }
        self.warn(err.message());
    }
}

pub fn use_notifier() -> Notifier {
    use_context::<Notifier>().expect("Notifier should be provided by AppShell")
}

#[component]
fn Toast(notifier: Notifier) -> impl IntoView {
    let notice = notifier.notice;

    // 3秒后清除通知
    Effect::new(move |_| {
        if notice.get().is_some() {
            set_timeout(move || notice.set(None), std::time::Duration::from_secs(3));
        }
    });

    view! {
        {move || notice.get().map(|(message, is_err)| view! {
            <div class="toast toast-top toast-end z-50">
                <div class=if is_err { "alert alert-error shadow-lg" } else { "alert alert-success shadow-lg" }>
                    <span>{message}</span>
                </div>
            </div>
        })}
    }
}

#[component]
pub fn OfflineBanner() -> impl IntoView {
    let online = use_context::<Online>().map(|o| o.0);
    let offline = move || online.map(|o| !o.get()).unwrap_or(false);

    view! {
        <Show when=offline>
            <div role="alert" class="alert alert-warning rounded-none justify-center">
                <WifiOff attr:class="h-5 w-5" />
                <span>"Anda sedang offline. Data mungkin tidak terbaru."</span>
            </div>
        </Show>
    }
}

fn nav_links(role: Role) -> Vec<(AppRoute, &'static str)> {
    match role {
        Role::Admin => vec![
            (AppRoute::AdminDashboard, "Dashboard"),
            (AppRoute::AdminItems, "Plat"),
            (AppRoute::AdminLocations, "Lokasi"),
            (AppRoute::AdminDistribusi, "Distribusi"),
        ],
        Role::User => vec![
            (AppRoute::UserDashboard, "Dashboard"),
            (AppRoute::UserDistribusi, "Permintaan Saya"),
        ],
    }
}

/// 已登录页面的外壳
#[component]
pub fn AppShell(children: Children) -> impl IntoView {
    let auth = use_auth();
    let notifier = Notifier::new(auth);
    provide_context(notifier);

    let user = auth.user_signal();
    let on_logout = move |_| logout(&auth);

    view! {
        <div class="min-h-screen bg-base-200 font-sans">
            <OfflineBanner />
            <Toast notifier=notifier />
            <div class="p-4 md:p-8">
                <div class="max-w-7xl mx-auto space-y-8">
                    <div class="navbar bg-base-100 rounded-box shadow-xl">
                        <div class="flex-1 gap-2">
                            <Package attr:class="text-primary h-6 w-6" />
                            <span class="text-xl font-bold px-2">"PlatDist"</span>
                            {move || user.get().map(|u| {
                                nav_links(u.role)
                                    .into_iter()
                                    .map(|(route, label)| view! {
                                        <Link route=route class="btn btn-ghost btn-sm">{label}</Link>
                                    })
                                    .collect_view()
                            })}
                        </div>
                        <div class="flex-none gap-2">
                            <span class="badge badge-neutral hidden md:inline-flex">
                                {move || user.get().map(|u| format!("{} ({})", u.username, u.role)).unwrap_or_default()}
                            </span>
                            <button on:click=on_logout class="btn btn-outline btn-error btn-sm gap-2">
                                <LogOut attr:class="h-4 w-4" /> "Keluar"
                            </button>
                        </div>
                    </div>
                    {children()}
                </div>
            </div>
        </div>
    }
}
