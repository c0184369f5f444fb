//! 位置（Lokasi）管理页

use leptos::prelude::*;
use leptos::task::spawn_local;
use platdist::validation::{FieldErrors, LokasiForm, validate_lokasi_form};
use platdist_shared::{Id, Lokasi};

use crate::api::app_config;
use crate::auth::use_auth;
use crate::components::field::FieldError;
use crate::components::icons::{Pencil, Plus, RefreshCw, Trash2};
use crate::components::layout::use_notifier;
use crate::web::BrowserTimer;

#[derive(Clone, Copy)]
struct LokasiFormState {
    nama: RwSignal<String>,
    latitude: RwSignal<String>,
    longitude: RwSignal<String>,
    editing: RwSignal<Option<Id>>,
    errors: RwSignal<FieldErrors>,
}

impl LokasiFormState {
    fn new() -> Self {
        Self {
            nama: RwSignal::new(String::new()),
            latitude: RwSignal::new(String::new()),
            longitude: RwSignal::new(String::new()),
            editing: RwSignal::new(None),
            errors: RwSignal::new(FieldErrors::default()),
        }
    }

    fn reset(&self) {
        self.nama.set(String::new());
        self.latitude.set(String::new());
        self.longitude.set(String::new());
        self.editing.set(None);
        self.errors.set(FieldErrors::default());
    }

    fn edit(&self, lokasi: &Lokasi) {
        self.nama.set(lokasi.nama.clone());
        self.latitude.set(lokasi.latitude.to_string());
        self.longitude.set(lokasi.longitude.to_string());
        self.editing.set(Some(lokasi.id));
        self.errors.set(FieldErrors::default());
    }

    fn error(&self, field: &'static str) -> impl Fn() -> Option<String> + Send + Sync + 'static + use<> {
        let errors = self.errors;
        move || errors.with(|e| e.get(field).map(str::to_string))
    }

    fn to_form(&self) -> LokasiForm {
        LokasiForm {
            nama: self.nama.get_untracked(),
            latitude: self.latitude.get_untracked(),
            longitude: self.longitude.get_untracked(),
        }
    }
}

#[component]
pub fn LocationsPage() -> impl IntoView {
    let auth = use_auth();
    let notifier = use_notifier();

    let lokasis = RwSignal::new(Vec::<Lokasi>::new());
    let loading = RwSignal::new(false);
    let saving = RwSignal::new(false);
    let form = LokasiFormState::new();

    let reload = move || {
        let api = auth.api();
        loading.set(true);
        spawn_local(async move {
            let result = app_config()
                .list_policy()
                .run(&BrowserTimer, "lokasi.list", || api.list_lokasi())
                .await;
            match result {
                Ok(list) => lokasis.set(list),
                Err(e) => notifier.error(&e),
            }
            loading.set(false);
        });
    };
    reload();

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let payload = match validate_lokasi_form(&form.to_form()) {
            Ok(payload) => payload,
            Err(errors) => {
                form.errors.set(errors);
                return;
            }
        };
        let api = auth.api();
        let editing = form.editing.get_untracked();
        saving.set(true);
        spawn_local(async move {
            let result = match editing {
                Some(id) => api.update_lokasi(id, payload).await,
                None => api.create_lokasi(payload).await,
            };
            match result {
                Ok(()) => {
                    notifier.success(if editing.is_some() { "Lokasi diperbarui" } else { "Lokasi ditambahkan" });
                    form.reset();
                    reload();
                }
                Err(e) => notifier.error(&e),
            }
            saving.set(false);
        });
    };

    let on_delete = move |id: Id| {
        let api = auth.api();
        spawn_local(async move {
            match api.delete_lokasi(id).await {
                Ok(()) => {
                    notifier.success("Lokasi dihapus");
                    lokasis.update(|list| list.retain(|l| l.id != id));
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
                        {move || if form.editing.get().is_some() { "Ubah Lokasi" } else { "Tambah Lokasi" }}
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
                        <div class="grid grid-cols-2 gap-4">
                            <div class="form-control">
                                <label for="latitude" class="label"><span class="label-text">"Latitude"</span></label>
                                <input id="latitude" type="text" inputmode="decimal" placeholder="-6.200000"
                                    class="input input-bordered w-full font-mono"
                                    prop:value=form.latitude
                                    on:input=move |ev| form.latitude.set(event_target_value(&ev))
                                />
                                <FieldError message=form.error("latitude") />
                            </div>
                            <div class="form-control">
                                <label for="longitude" class="label"><span class="label-text">"Longitude"</span></label>
                                <input id="longitude" type="text" inputmode="decimal" placeholder="106.816666"
                                    class="input input-bordered w-full font-mono"
                                    prop:value=form.longitude
                                    on:input=move |ev| form.longitude.set(event_target_value(&ev))
                                />
                                <FieldError message=form.error("longitude") />
                            </div>
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
                        <h3 class="card-title">"Daftar Lokasi"</h3>
                        <button on:click=move |_| reload() disabled=move || loading.get() class="btn btn-ghost btn-circle">
                            <RefreshCw attr:class=move || if loading.get() { "h-5 w-5 animate-spin" } else { "h-5 w-5" } />
                        </button>
                    </div>
                    <div class="overflow-x-auto w-full">
                        <table class="table table-zebra w-full">
                            <thead>
                                <tr>
                                    <th>"Nama"</th>
                                    <th>"Latitude"</th>
                                    <th>"Longitude"</th>
                                    <th></th>
                                </tr>
                            </thead>
                            <tbody>
                                <Show when=move || lokasis.with(|l| l.is_empty()) && !loading.get()>
                                    <tr>
                                        <td colspan="4" class="text-center py-8 text-base-content/50">"Belum ada lokasi."</td>
                                    </tr>
                                </Show>
                                <For
                                    each=move || lokasis.get()
                                    key=|l| (l.id, l.nama.clone(), l.latitude.to_bits(), l.longitude.to_bits())
                                    children=move |l| {
                                        let id = l.id;
                                        let for_edit = l.clone();
                                        view! {
                                            <tr class="hover">
                                                <td class="font-medium">{l.nama}</td>
                                                <td class="font-mono text-xs">{format!("{:.6}", l.latitude)}</td>
                                                <td class="font-mono text-xs">{format!("{:.6}", l.longitude)}</td>
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
