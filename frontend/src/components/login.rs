use leptos::prelude::*;
use leptos::task::spawn_local;
use platdist::guard::AppRoute;

use crate::auth::{login, use_auth};
use crate::components::icons::Package;
use crate::components::layout::OfflineBanner;
use crate::web::router::Link;

/// 认证页共用的标题与卡片外框
#[component]
pub fn AuthCard(title: &'static str, subtitle: &'static str, children: Children) -> impl IntoView {
    view! {
        <div class="min-h-screen bg-base-200">
            <OfflineBanner />
            <div class="hero min-h-screen">
                <div class="hero-content flex-col w-full max-w-md">
                    <div class="text-center mb-4">
                        <div class="flex flex-col items-center gap-2">
                            <div class="p-3 bg-primary/10 rounded-2xl text-primary">
                                <Package attr:class="h-8 w-8" />
                            </div>
                            <h1 class="text-3xl font-bold">{title}</h1>
                            <p class="text-base-content/70">{subtitle}</p>
                        </div>
                    </div>
                    <div class="card shrink-0 w-full shadow-2xl bg-base-100">{children()}</div>
                </div>
            </div>
        </div>
    }
}

#[component]
pub fn ErrorAlert(message: ReadSignal<Option<String>>) -> impl IntoView {
    view! {
        {move || message.get().map(|m| view! {
            <div role="alert" class="alert alert-error text-sm py-2">
                <span>{m}</span>
            </div>
        })}
    }
}

#[component]
pub fn LoginPage() -> impl IntoView {
    let auth = use_auth();

    let (username, set_username) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    // 登录成功后由路由服务根据会话重定向到角色首页
    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let (user, pass) = (username.get(), password.get());
        if user.trim().is_empty() || pass.is_empty() {
            set_error_msg.set(Some("Username dan password wajib diisi".to_string()));
            return;
        }

        set_is_submitting.set(true);
        set_error_msg.set(None);

        spawn_local(async move {
            if let Err(message) = login(&auth, user.trim().to_string(), pass).await {
                set_error_msg.set(Some(message));
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <AuthCard title="PlatDist" subtitle="Masuk untuk mengelola distribusi plat">
            <form class="card-body" on:submit=on_submit>
                <ErrorAlert message=error_msg />

                <div class="form-control">
                    <label class="label" for="username">
                        <span class="label-text">"Username"</span>
                    </label>
                    <input
                        id="username"
                        type="text"
                        autocomplete="username"
                        on:input=move |ev| set_username.set(event_target_value(&ev))
                        prop:value=username
                        class="input input-bordered"
                        required
                    />
                </div>
                <div class="form-control">
                    <label class="label" for="password">
                        <span class="label-text">"Password"</span>
                    </label>
                    <input
                        id="password"
                        type="password"
                        autocomplete="current-password"
                        placeholder="••••••••"
                        on:input=move |ev| set_password.set(event_target_value(&ev))
                        prop:value=password
                        class="input input-bordered"
                        required
                    />
                </div>
                <div class="form-control mt-6">
                    <button class="btn btn-primary" disabled=move || is_submitting.get()>
                        {move || if is_submitting.get() {
                            view! { <span class="loading loading-spinner"></span> "Memproses..." }.into_any()
                        } else {
                            "Masuk".into_any()
                        }}
                    </button>
                </div>
                <p class="text-center text-sm">
                    "Belum punya akun? "
                    <Link route=AppRoute::Register class="link link-primary">"Daftar"</Link>
                </p>
            </form>
        </AuthCard>
    }
}
