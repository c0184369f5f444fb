//! 分发记录面板
//!
//! 视图模型不是 `Send`，放在 `StoredValue::new_local` 中；
//! `version` 信号在每次异步操作结束后递增，驱动重新渲染。

use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use platdist::{DistribusiFilter, DistribusiStats, MonthlyFlow, Scope};
use platdist_shared::{Distribusi, DistribusiStatus, Id};

use crate::api::{Api, DistribusiVm, new_distribusi_vm};
use crate::components::create_distribution_dialog::CreateDistribusiDialog;
use crate::components::icons::RefreshCw;
use crate::components::layout::{Notifier, use_notifier};

/// 页面内共享的分发视图模型句柄
#[derive(Clone, Copy)]
pub struct DistribusiHandle {
    vm: StoredValue<Rc<DistribusiVm>, LocalStorage>,
    version: RwSignal<u64>,
    busy: RwSignal<bool>,
}

impl DistribusiHandle {
    pub fn new(api: Api, scope: Scope) -> Self {
        Self {
            vm: StoredValue::new_local(Rc::new(new_distribusi_vm(api, scope))),
            version: RwSignal::new(0),
            busy: RwSignal::new(false),
        }
    }

    pub fn vm(&self) -> Rc<DistribusiVm> {
        self.vm.get_value()
    }

    pub fn scope(&self) -> Scope {
        self.vm.with_value(|vm| vm.scope())
    }

    fn touch(&self) {
        self.version.update(|v| *v += 1);
    }

    /// 在视图模型上读取数据并订阅其变化
    pub fn with<R>(&self, f: impl FnOnce(&DistribusiVm) -> R) -> R {
        self.version.track();
        self.vm.with_value(|vm| f(vm))
    }

    pub fn is_loading(&self) -> bool {
        self.busy.get() || self.with(|vm| vm.is_loading())
    }

    pub fn transitions(&self, record: &Distribusi) -> &'static [DistribusiStatus] {
        self.vm.with_value(|vm| vm.available_transitions(record))
    }

    pub fn stats(&self) -> DistribusiStats {
        self.with(|vm| vm.stats())
    }

    pub fn monthly(&self, year: i32) -> Vec<MonthlyFlow> {
        self.with(|vm| vm.monthly(year))
    }

    /// 重新拉取列表
    pub fn reload(&self, notifier: Notifier) {
        let handle = *self;
        let vm = self.vm();
        self.busy.set(true);
        spawn_local(async move {
            if let Err(e) = vm.list().await {
                notifier.error(&e);
            }
            handle.busy.set(false);
            handle.touch();
        });
    }

    pub fn set_status(&self, id: Id, next: DistribusiStatus, notifier: Notifier) {
        let handle = *self;
        let vm = self.vm();
        spawn_local(async move {
            match vm.set_status(id, next).await {
                Ok(()) => notifier.success(format!("Status diubah menjadi {}", next.label())),
                Err(e) => notifier.error(&e),
            }
            handle.touch();
        });
    }

    /// 创建请求后由对话框调用
    pub fn refreshed(&self) {
        self.touch();
    }
}

#[component]
pub fn StatusBadge(status: DistribusiStatus) -> impl IntoView {
    let class = match status {
        DistribusiStatus::Pending => "badge badge-ghost",
        DistribusiStatus::Diproses => "badge badge-info",
        DistribusiStatus::Terdistribusi => "badge badge-primary",
        DistribusiStatus::Disetujui => "badge badge-success",
        DistribusiStatus::Ditolak => "badge badge-error",
    };
    view! { <span class=class>{status.label()}</span> }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

#[component]
pub fn DistribusiPanel(handle: DistribusiHandle) -> impl IntoView {
    let notifier = use_notifier();
    let is_admin = matches!(handle.scope(), Scope::All);

    let status_filter = RwSignal::new(Option::<DistribusiStatus>::None);
    let query = RwSignal::new(String::new());

    // 首次加载
    handle.reload(notifier);

    let rows = move || {
        let filter = DistribusiFilter {
            status: status_filter.get(),
            query: query.get(),
        };
        handle.with(|vm| vm.filtered(&filter))
    };
    let loading = move || handle.is_loading();
    let columns = if is_admin { "8" } else { "7" };

    let title = if is_admin { "Semua Distribusi" } else { "Permintaan Saya" };

    view! {
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body p-0">
                <div class="flex flex-wrap items-center justify-between gap-2 p-6 pb-2">
                    <div>
                        <h3 class="card-title">{title}</h3>
                        <p class="text-base-content/70 text-sm">"Daftar permintaan distribusi plat."</p>
                    </div>
                    <div class="flex items-center gap-2">
                        <CreateDistribusiDialog handle=handle />
                        <button on:click=move |_| handle.reload(notifier) disabled=loading class="btn btn-ghost btn-circle">
                            <RefreshCw attr:class=move || if loading() { "h-5 w-5 animate-spin" } else { "h-5 w-5" } />
                        </button>
                    </div>
                </div>

                <div class="flex flex-wrap gap-2 px-6">
                    <input
                        type="search"
                        placeholder="Cari plat, lot, lokasi, pemohon"
                        class="input input-bordered input-sm w-full md:w-72"
                        prop:value=query
                        on:input=move |ev| query.set(event_target_value(&ev))
                    />
                    <select
                        class="select select-bordered select-sm"
                        on:change=move |ev| status_filter.set(DistribusiStatus::parse(&event_target_value(&ev)))
                    >
                        <option value="" selected=move || status_filter.get().is_none()>"Semua status"</option>
                        {DistribusiStatus::ALL
                            .iter()
                            .map(|s| {
                                let s = *s;
                                view! {
                                    <option value=s.as_str() selected=move || status_filter.get() == Some(s)>{s.label()}</option>
                                }
                            })
                            .collect_view()}
                    </select>
                </div>

                <div class="overflow-x-auto w-full">
                    <table class="table table-zebra w-full">
                        <thead>
                            <tr>
                                <th>"Tanggal"</th>
                                <th>"Plat"</th>
                                <th class="hidden md:table-cell">"Lot"</th>
                                <th>"Tujuan"</th>
                                {is_admin.then(|| view! { <th>"Pemohon"</th> })}
                                <th>"Jumlah"</th>
                                <th>"Status"</th>
                                <th></th>
                            </tr>
                        </thead>
                        <tbody>
                            <Show when=move || rows().is_empty()>
                                <tr>
                                    <td colspan=columns class="text-center py-8 text-base-content/50">
                                        {move || if loading() { "Memuat data..." } else { "Belum ada data distribusi." }}
                                    </td>
                                </tr>
                            </Show>
                            <For
                                each=rows
                                key=|d| (d.id, d.status)
                                children=move |d| {
                                    let id = d.id;
                                    let actions = handle.transitions(&d);
                                    view! {
                                        <tr class="hover">
                                            <td>{d.tanggal.as_ref().map(|t| t.display_date()).unwrap_or_else(|| "-".to_string())}</td>
                                            <td class="font-medium">{text(&d.plat_nama)}</td>
                                            <td class="hidden md:table-cell font-mono text-xs">{text(&d.lot)}</td>
                                            <td>{text(&d.lokasi_nama)}</td>
                                            {is_admin.then(|| view! { <td>{text(&d.username)}</td> })}
                                            <td>{d.jumlah}</td>
                                            <td><StatusBadge status=d.status /></td>
                                            <td class="text-right space-x-1">
                                                {actions
                                                    .iter()
                                                    .map(|next| {
                                                        let next = *next;
                                                        let class = if next == DistribusiStatus::Ditolak {
                                                            "btn btn-xs btn-error btn-outline"
                                                        } else {
                                                            "btn btn-xs btn-success btn-outline"
                                                        };
                                                        view! {
                                                            <button class=class on:click=move |_| handle.set_status(id, next, notifier)>
                                                                {next.label()}
                                                            </button>
                                                        }
                                                    })
                                                    .collect_view()}
                                            </td>
                                        </tr>
                                    }
                                }
                            />
                        </tbody>
                    </table>
                </div>
            </div>
        </div>
    }
}
