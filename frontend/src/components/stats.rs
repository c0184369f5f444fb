//! 统计卡片与月度流量

use leptos::prelude::*;
use platdist_shared::{DistribusiStatus, Timestamp};

use crate::components::distribution_panel::DistribusiHandle;

#[component]
pub fn StatsCards(handle: DistribusiHandle) -> impl IntoView {
    let stats = move || handle.stats();

    view! {
        <div class="stats shadow w-full stats-vertical md:stats-horizontal bg-base-100">
            <div class="stat">
                <div class="stat-title">"Total Permintaan"</div>
                <div class="stat-value text-primary">{move || stats().total()}</div>
            </div>
            {DistribusiStatus::ALL
                .iter()
                .map(|s| {
                    let s = *s;
                    view! {
                        <div class="stat">
                            <div class="stat-title">{s.label()}</div>
                            <div class="stat-value text-2xl">{move || stats().count(s)}</div>
                        </div>
                    }
                })
                .collect_view()}
        </div>
    }
}

/// 本年度每月的进出数量
#[component]
pub fn MonthlyChart(handle: DistribusiHandle) -> impl IntoView {
    let year = Timestamp::now().month_key().year;
    let flows = move || handle.monthly(year);
    let peak = move || {
        flows()
            .iter()
            .map(|f| f.masuk.max(f.keluar))
            .max()
            .unwrap_or(0)
            .max(1)
    };

    view! {
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <h3 class="card-title">"Arus Bulanan " {year}</h3>
                <div class="flex gap-4 text-sm">
                    <span class="badge badge-info">"Masuk"</span>
                    <span class="badge badge-success">"Keluar"</span>
                </div>
                <div class="grid grid-cols-12 gap-2 items-end h-48">
                    {move || {
                        let peak = peak() as f64;
                        flows()
                            .into_iter()
                            .map(|f| {
                                let masuk = format!("height: {:.0}%", f.masuk as f64 / peak * 100.0);
                                let keluar = format!("height: {:.0}%", f.keluar as f64 / peak * 100.0);
                                let title = format!("{}: masuk {}, keluar {}", f.month.label(), f.masuk, f.keluar);
                                view! {
                                    <div class="flex flex-col items-center h-full" title=title>
                                        <div class="flex items-end gap-0.5 flex-1 w-full">
                                            <div class="bg-info rounded-t flex-1" style=masuk></div>
                                            <div class="bg-success rounded-t flex-1" style=keluar></div>
                                        </div>
                                        <span class="text-xs text-base-content/70">{f.month.label()}</span>
                                    </div>
                                }
                            })
                            .collect_view()
                    }}
                </div>
            </div>
        </div>
    }
}
