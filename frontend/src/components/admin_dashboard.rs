use leptos::prelude::*;
use platdist::Scope;
use platdist::guard::AppRoute;

use crate::auth::use_auth;
use crate::components::distribution_panel::{DistribusiHandle, DistribusiPanel};
use crate::components::layout::use_notifier;
use crate::components::stats::{MonthlyChart, StatsCards};
use crate::web::router::Link;

#[component]
pub fn AdminDashboardPage() -> impl IntoView {
    let notifier = use_notifier();
    let handle = DistribusiHandle::new(use_auth().api(), Scope::All);
    handle.reload(notifier);

    view! {
        <StatsCards handle=handle />
        <MonthlyChart handle=handle />
        <div class="flex flex-wrap gap-2">
            <Link route=AppRoute::AdminItems class="btn btn-outline">"Kelola Plat"</Link>
            <Link route=AppRoute::AdminLocations class="btn btn-outline">"Kelola Lokasi"</Link>
            <Link route=AppRoute::AdminDistribusi class="btn btn-primary">"Tinjau Distribusi"</Link>
        </div>
    }
}

#[component]
pub fn AdminDistribusiPage() -> impl IntoView {
    let handle = DistribusiHandle::new(use_auth().api(), Scope::All);

    view! {
        <StatsCards handle=handle />
        <DistribusiPanel handle=handle />
    }
}
