//! 物品（Plat）管理页

use leptos::prelude::*;
use leptos::task::spawn_local;
use platdist::validation::{FieldErrors, PlatForm, validate_plat_form};
use platdist_shared::{Id, Lokasi, Plat, PlatStatus};

use crate::api::{Api, app_config};
use crate::auth::use_auth;
use crate::components::field::FieldError;
use crate::components::icons::{Pencil, Plus, RefreshCw, Trash2};
use crate::components::layout::{Notifier, use_notifier};
use crate::web::BrowserTimer;

/// 带重试地拉取物品列表
pub fn load_plats(api: Api, notifier: Notifier, plats: RwSignal<Vec<Plat>>, loading: RwSignal<bool>) {
    loading.set(true);
    spawn_local(async move {
        let result = app_config()
            .list_policy()
            .run(&BrowserTimer, "plat.list", || api.list_plat())
            .await;
        match result {
            Ok(list) => plats.set(list),
            Err(e) => notifier.error(&e),
        }
        loading.set(false);
    });
}

#[derive(Clone, Copy)]
struct PlatFormState {
    nama: RwSignal<String>,
    lot: RwSignal<String>,
    jumlah: RwSignal<String>,
    lokasi_id: RwSignal<String>,
    status: RwSignal<String>,
    editing: RwSignal<Option<Id>>,
    errors: RwSignal<FieldErrors>,
}

impl PlatFormState {
    fn new() -> Self {
        Self {
            nama: RwSignal::new(String::new()),
            lot: RwSignal::new(String::new()),
            jumlah: RwSignal::new(String::new()),
            lokasi_id: RwSignal::new(String::new()),
            status: RwSignal::new(PlatStatus::Ready.as_str().to_string()),
            editing: RwSignal::new(None),
            errors: RwSignal::new(FieldErrors::default()),
        }
    }

    fn reset(&self) {
        self.nama.set(String::new());
        self.lot.set(String::new());
        self.jumlah.set(String::new());
        self.lokasi_id.set(String::new());
        self.status.set(PlatStatus::Ready.as_str().to_string());
        self.editing.set(None);
        self.errors.set(FieldErrors::default());
    }

    fn edit(&self, plat: &Plat) {
        self.nama.set(plat.nama.clone());
        self.lot.set(plat.lot.clone());
        self.jumlah.set(plat.jumlah.to_string());
        self.lokasi_id.set(plat.lokasi_id.to_string());
        self.status.set(plat.status.as_str().to_string());
        self.editing.set(Some(plat.id));
        self.errors.set(FieldErrors::default());
    }

    fn error(&self, field: &'static str) -> impl Fn() -> Option<String> + Send + Sync + 'static + use<> {
        let errors = self.errors;
        move || errors.with(|e| e.get(field).map(str::to_string))
    }

    fn to_form(&self) -> PlatForm {
        PlatForm {
            nama: self.nama.get_untracked(),
            lot: self.lot.get_untracked(),
            jumlah: self.jumlah.get_untracked(),
            lokasi_id: self.lokasi_id.get_untracked(),
            status: self.status.get_untracked(),
        }
    }
}

#[component]
pub fn ItemsPage() -> impl IntoView {
    let auth = use_auth();
    let notifier = use_notifier();

    let plats = RwSignal::new(Vec::<Plat>::new());
    let lokasis = RwSignal::new(Vec::<Lokasi>::new());
    let loading = RwSignal::new(false);
    let saving = RwSignal::new(false);
    let form = PlatFormState::new();

    let reload = move || {
        load_plats(auth.api(), notifier, plats, loading);
        let api = auth.api();
        spawn_local(async move {
            match api.list_lokasi().await {
                Ok(list) => lokasis.set(list),
                Err(e) => notifier.error(&e),
            }
        });
    };
    reload();

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let payload = match validate_plat_form(&form.to_form()) {
            Ok(payload) => payload,
            Err(errors) => {
                form.errors.set(errors);
                return;
            }
        };
        let api = auth.api();
        let refetch = auth.api();
        let editing = form.editing.get_untracked();
        saving.set(true);
        spawn_local(async move {
            let result = match editing {
                Some(id) => api.update_plat(id, payload).await,
                None => api.create_plat(payload).await,
            };
            match result {
                Ok(()) => {
                    notifier.success(if editing.is_some() { "Plat diperbarui" } else { "Plat ditambahkan" });
                    form.reset();
                    load_plats(refetch, notifier, plats, loading);
                }
                Err(e) => notifier.error(&e),
            }
            saving.set(false);
        });
    };

    let on_delete = move |id: Id| {
        let api = auth.api();
        spawn_local(async move {
            match api.delete_plat(id).await {
                Ok(()) => {
                    notifier.success("Plat dihapus");
                    plats.update(|list| list.retain(|p| p.id != id));
                }
                Err(e) => notifier.error(&e),
            }
        });
    };

    view! {
        <div class="grid gap-8 lg:grid-cols-3">
            <div class="card bg-base-100 shadow-xl">
                <div class="card-body">
                    <h3 class="card-title">
                        {move || if form.editing.get().is_some() { "Ubah Plat" } else { "Tambah Plat" }}
                    </h3>
                    <form on:submit=on_submit class="space-y-2" novalidate>
                        <div class="form-control">
                            <label for="nama" class="label"><span class="label-text">"Nama"</span></label>
                            <input id="nama" type="text" class="input input-bordered w-full"
                                prop:value=form.nama
                                on:input=move |ev| form.nama.set(event_target_value(&ev))
                            />
                            <FieldError message=form.error("nama") />
                        </div>
                        <div class="form-control">
                            <label for="lot" class="label"><span class="label-text">"Nomor Lot"</span></label>
                            <input id="lot" type="text" class="input input-bordered w-full font-mono"
                                prop:value=form.lot
                                on:input=move |ev| form.lot.set(event_target_value(&ev))
                            />
                            <FieldError message=form.error("lot") />
                        </div>
                        <div class="form-control">
                            <label for="stok" class="label"><span class="label-text">"Stok"</span></label>
                            <input id="stok" type="number" min="0" class="input input-bordered w-full"
                                prop:value=form.jumlah
                                on:input=move |ev| form.jumlah.set(event_target_value(&ev))
                            />
                            <FieldError message=form.error("jumlah") />
                        </div>
                        <div class="form-control">
                            <label for="lokasi" class="label"><span class="label-text">"Lokasi"</span></label>
                            <select id="lokasi" class="select select-bordered w-full"
                                prop:value=form.lokasi_id
                                on:change=move |ev| form.lokasi_id.set(event_target_value(&ev))
                            >
                                <option value="">"-- pilih lokasi --"</option>
                                <For
                                    each=move || lokasis.get()
                                    key=|l| l.id
                                    children=|l| view! { <option value=l.id.to_string()>{l.nama}</option> }
                                />
                            </select>
                            <FieldError message=form.error("lokasi_id") />
                        </div>
                        <div class="form-control">
                            <label for="status" class="label"><span class="label-text">"Status"</span></label>
                            <select id="status" class="select select-bordered w-full"
                                prop:value=form.status
                                on:change=move |ev| form.status.set(event_target_value(&ev))
                            >
                                {PlatStatus::ALL
                                    .iter()
                                    .map(|s| view! { <option value=s.as_str()>{s.as_str()}</option> })
                                    .collect_view()}
                            </select>
                            <FieldError message=form.error("status") />
                        </div>
                        <div class="card-actions justify-end pt-2">
                            <Show when=move || form.editing.get().is_some()>
                                <button type="button" class="btn btn-ghost" on:click=move |_| form.reset()>"Batal"</button>
                            </Show>
                            <button type="submit" class="btn btn-primary gap-2" disabled=move || saving.get()>
                                <Plus attr:class="h-4 w-4" /> "Simpan"
                            </button>
                        </div>
                    </form>
                </div>
            </div>

            <div class="card bg-base-100 shadow-xl lg:col-span-2">
                <div class="card-body p-0">
                    <div class="flex items-center justify-between p-6 pb-2">
                        <h3 class="card-title">"Daftar Plat"</h3>
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
                                    <th>"Status"</th>
                                    <th></th>
                                </tr>
                            </thead>
                            <tbody>
                                <Show when=move || plats.with(|p| p.is_empty()) && !loading.get()>
                                    <tr>
                                        <td colspan="6" class="text-center py-8 text-base-content/50">"Belum ada plat."</td>
                                    </tr>
                                </Show>
                                <For
                                    each=move || plats.get()
                                    key=|p| (p.id, p.jumlah, p.status)
                                    children=move |p| {
                                        let id = p.id;
                                        let for_edit = p.clone();
                                        let badge = match p.status {
                                            PlatStatus::Ready => "badge badge-success",
                                            PlatStatus::Unavailable => "badge badge-ghost",
                                        };
                                        view! {
                                            <tr class="hover">
                                                <td class="font-medium">{p.nama}</td>
                                                <td class="font-mono text-xs">{p.lot}</td>
                                                <td>{p.jumlah}</td>
                                                <td class="hidden md:table-cell">{p.lokasi_nama.unwrap_or_else(|| "-".to_string())}</td>
                                                <td><span class=badge>{p.status.as_str()}</span></td>
                                                <td class="text-right space-x-1">
                                                    <button class="btn btn-ghost btn-xs" on:click=move |_| form.edit(&for_edit)>
                                                        <Pencil attr:class="h-4 w-4" />
                                                    </button>
                                                    <button class="btn btn-ghost btn-xs text-error" on:click=move |_| on_delete(id)>
                                                        <Trash2 attr:class="h-4 w-4" />
                                                    </button>
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
        </div>
    }
}
