use leptos::prelude::*;
use leptos::task::spawn_local;
use platdist::guard::AppRoute;
use platdist_shared::Role;

use crate::auth::register;
use crate::components::login::{AuthCard, ErrorAlert};
use crate::web::router::{Link, use_router};

const MIN_PASSWORD_LEN: usize = 6;

#[component]
pub fn RegisterPage() -> impl IntoView {
    let router = use_router();

    let (username, set_username) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (role, set_role) = signal(Role::User);
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let (user, pass) = (username.get().trim().to_string(), password.get());
        if user.is_empty() || pass.is_empty() {
            set_error_msg.set(Some("Username dan password wajib diisi".to_string()));
            return;
        }
        if pass.chars().count() < MIN_PASSWORD_LEN {
            set_error_msg.set(Some(format!("Password minimal {} karakter", MIN_PASSWORD_LEN)));
            return;
        }

        set_is_submitting.set(true);
        set_error_msg.set(None);

        let role = role.get();
        spawn_local(async move {
            match register(user, pass, role).await {
                Ok(()) => {
                    tracing::info!("account registered");
                    router.go(AppRoute::Login);
                }
                Err(message) => set_error_msg.set(Some(message)),
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <AuthCard title="Daftar Akun" subtitle="Buat akun baru untuk mengajukan distribusi">
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
                        autocomplete="new-password"
                        on:input=move |ev| set_password.set(event_target_value(&ev))
                        prop:value=password
                        class="input input-bordered"
                        required
                    />
                </div>
                <div class="form-control">
                    <label class="label" for="role">
                        <span class="label-text">"Peran"</span>
                    </label>
                    <select
                        id="role"
                        class="select select-bordered"
                        on:change=move |ev| {
                            if let Some(r) = Role::parse(&event_target_value(&ev)) {
                                set_role.set(r);
                            }
                        }
                    >
                        <option value=Role::User.as_str() selected=move || role.get() == Role::User>"User"</option>
                        <option value=Role::Admin.as_str() selected=move || role.get() == Role::Admin>"Admin"</option>
                    </select>
                </div>
                <div class="form-control mt-6">
                    <button class="btn btn-primary" disabled=move || is_submitting.get()>
                        {move || if is_submitting.get() {
                            view! { <span class="loading loading-spinner"></span> "Memproses..." }.into_any()
                        } else {
                            "Daftar".into_any()
                        }}
                    </button>
                </div>
                <p class="text-center text-sm">
                    "Sudah punya akun? "
                    <Link route=AppRoute::Login class="link link-primary">"Masuk"</Link>
                </p>
            </form>
        </AuthCard>
    }
}
