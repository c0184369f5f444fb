use leptos::prelude::*;
use leptos::task::spawn_local;
use platdist::guard::AppRoute;
use platdist::{ClientErrorKind, Scope};
use platdist_shared::{Plat, PlatStatus};

use crate::auth::use_auth;
use crate::components::distribution_panel::{DistribusiHandle, DistribusiPanel};
use crate::components::icons::{MapPin, RefreshCw};
use crate::components::items::load_plats;
use crate::components::layout::use_notifier;
use crate::components::stats::StatsCards;
use crate::web::router::Link;

/// 当前用户的分发范围；未登录时路由守卫不会渲染这些页面
fn own_scope() -> Option<Scope> {
    use_auth().user_untracked().map(|user| Scope::User(user.id))
}

/// 按批次号查找物品
#[component]
fn LotLookup() -> impl IntoView {
    let auth = use_auth();
    let notifier = use_notifier();
    let lot = RwSignal::new(String::new());
    let found = RwSignal::new(Option::<Plat>::None);
    let searching = RwSignal::new(false);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let value = lot.get_untracked().trim().to_string();
        if value.is_empty() {
            return;
        }
        let api = auth.api();
        searching.set(true);
        found.set(None);
        spawn_local(async move {
            match api.find_plat_by_lot(&value).await {
                Ok(plat) => found.set(Some(plat)),
                Err(e) if e.kind() == ClientErrorKind::NotFound => {
                    notifier.warn(format!("Lot {} tidak ditemukan", value));
                }
                Err(e) => notifier.error(&e),
            }
            searching.set(false);
        });
    };

    view! {
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <h3 class="card-title">"Cari Nomor Lot"</h3>
                <form class="join w-full" on:submit=on_submit>
                    <input type="search" placeholder="LOT-0001"
                        class="input input-bordered join-item w-full font-mono"
                        prop:value=lot
                        on:input=move |ev| lot.set(event_target_value(&ev))
                    />
                    <button type="submit" class="btn btn-primary join-item" disabled=move || searching.get()>"Cari"</button>
                </form>
                {move || found.get().map(|p| view! {
                    <div class="alert mt-2">
                        <div>
                            <div class="font-bold">{p.nama.clone()} " · " <span class="font-mono">{p.lot.clone()}</span></div>
                            <div class="text-sm">
                                "Stok " {p.jumlah} " di " {p.lokasi_nama.clone().unwrap_or_else(|| "-".to_string())}
                            </div>
                        </div>
                        <Link route=AppRoute::UserItemMap(p.id) class="btn btn-sm gap-1">
                            <MapPin attr:class="h-4 w-4" /> "Peta"
                        </Link>
                    </div>
                })}
            </div>
        </div>
    }
}

#[component]
pub fn UserDashboardPage() -> impl IntoView {
    let auth = use_auth();
    let notifier = use_notifier();
    let Some(scope) = own_scope() else {
        return ().into_any();
    };
    let handle = DistribusiHandle::new(auth.api(), scope);
    handle.reload(notifier);

    let plats = RwSignal::new(Vec::<Plat>::new());
    let loading = RwSignal::new(false);
    let reload = move || load_plats(auth.api(), notifier, plats, loading);
    reload();

    view! {
        <StatsCards handle=handle />
        <LotLookup />
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body p-0">
                <div class="flex items-center justify-between p-6 pb-2">
                    <h3 class="card-title">"Plat Tersedia"</h3>
                    <button on:click=move |_| reload() disabled=move || loading.get() class="btn btn-ghost btn-circle">
                        <RefreshCw attr:class=move || if loading.get() { "h-5 w-5 animate-spin" } else { "h-5 w-5" } />
                    </button>
                </div>
                <div class="overflow-x-auto w-full">
                    <table class="table table-zebra w-full">
                        <thead>
                            <tr>
                                <th>"Nama"</th>
                                <th>"Lot"</th>
                                <th>"Stok"</th>
                                <th class="hidden md:table-cell">"Lokasi"</th>
                                <th></th>
                            </tr>
                        </thead>
                        <tbody>
                            <For
                                each=move || plats.with(|list| list.iter().filter(|p| p.status == PlatStatus::Ready).cloned().collect::<Vec<_>>())
                                key=|p| (p.id, p.jumlah)
                                children=|p| view! {
                                    <tr class="hover">
                                        <td class="font-medium">{p.nama}</td>
                                        <td class="font-mono text-xs">{p.lot}</td>
                                        <td>{p.jumlah}</td>
                                        <td class="hidden md:table-cell">{p.lokasi_nama.unwrap_or_else(|| "-".to_string())}</td>
                                        <td class="text-right">
                                            <Link route=AppRoute::UserItemMap(p.id) class="btn btn-ghost btn-xs gap-1">
                                                <MapPin attr:class="h-4 w-4" /> "Peta"
                                            </Link>
                                        </td>
                                    </tr>
                                }
                            />
                        </tbody>
                    </table>
                </div>
            </div>
        </div>
    }
    .into_any()
}

#[component]
pub fn UserDistribusiPage() -> impl IntoView {
    own_scope().map(|scope| {
        let handle = DistribusiHandle::new(use_auth().api(), scope);
        view! { <DistribusiPanel handle=handle /> }
    })
}
