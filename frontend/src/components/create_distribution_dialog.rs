//! 新建分发请求对话框

mod form_state;

use std::rc::Rc;

use form_state::FormState;
use leptos::prelude::*;
use leptos::task::spawn_local;
use platdist::{Scope, SubmitError};

use crate::api::{Options, new_option_cache};
use crate::auth::use_auth;
use crate::components::distribution_panel::DistribusiHandle;
use crate::components::field::FieldError;
use crate::components::icons::Plus;
use crate::components::layout::use_notifier;

#[component]
pub fn CreateDistribusiDialog(handle: DistribusiHandle) -> impl IntoView {
    let auth = use_auth();
    let notifier = use_notifier();
    let scope = handle.scope();
    let is_admin = matches!(scope, Scope::All);

    let (open, set_open) = signal(false);
    let (loading, set_loading) = signal(false);
    let dialog_ref = NodeRef::<leptos::html::Dialog>::new();
    let form = FormState::new();

    let options = StoredValue::new_local(Rc::new(new_option_cache(auth.api())));
    let options_version = RwSignal::new(0u64);
    let read_options = move |f: &dyn Fn(&Options) -> AnyView| {
        options_version.track();
        options.with_value(|o| f(o.as_ref()))
    };

    Effect::new(move |_| {
        if let Some(dialog) = dialog_ref.get() {
            if open.get() {
                if !dialog.open() {
                    let _ = dialog.show_modal();
                }
            } else if dialog.open() {
                dialog.close();
            }
        }
    });

    // 打开时加载下拉选项
    let on_open = move |_| {
        set_open.set(true);
        let cache = options.get_value();
        spawn_local(async move {
            if let Err(e) = cache.ensure_all().await {
                notifier.error(&e);
            }
            options_version.update(|v| *v += 1);
        });
    };

    let close = move || {
        set_open.set(false);
        form.reset();
    };

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let request = form.to_form(scope);
        let vm = handle.vm();
        set_loading.set(true);
        spawn_local(async move {
            match vm.create(&request).await {
                Ok(()) => {
                    notifier.success("Permintaan distribusi dibuat");
                    close();
                    handle.refreshed();
                }
                Err(SubmitError::Invalid(errors)) => form.errors.set(errors),
                Err(SubmitError::Failed(e)) => notifier.error(&e),
            }
            set_loading.set(false);
        });
    };

    let plat_options = move || {
        read_options(&|o| {
            o.plats()
                .into_iter()
                .map(|p| {
                    let label = format!("{} ({}) - stok {}", p.nama, p.lot, p.jumlah);
                    view! { <option value=p.id.to_string()>{label}</option> }
                })
                .collect_view()
                .into_any()
        })
    };
    let lokasi_options = move || {
        read_options(&|o| {
            o.lokasis()
                .into_iter()
                .map(|l| view! { <option value=l.id.to_string()>{l.nama}</option> })
                .collect_view()
                .into_any()
        })
    };
    let requester_options = move || {
        read_options(&|o| {
            o.requesters()
                .into_iter()
                .map(|u| view! { <option value=u.id.to_string()>{u.username}</option> })
                .collect_view()
                .into_any()
        })
    };

    view! {
        <button class="btn btn-primary btn-sm gap-2" on:click=on_open>
            <Plus attr:class="h-4 w-4" /> "Ajukan Distribusi"
        </button>

        <dialog class="modal" node_ref=dialog_ref on:close=move |_| close()>
            <div class="modal-box">
                <h3 class="font-bold text-lg">"Permintaan Distribusi Baru"</h3>
                <p class="py-4 text-base-content/70">"Pilih plat, lokasi tujuan, dan jumlah."</p>

                <form on:submit=on_submit class="space-y-4" novalidate>
                    <div class="form-control">
                        <label for="plat_id" class="label">
                            <span class="label-text">"Plat"</span>
                        </label>
                        <select id="plat_id" class="select select-bordered w-full"
                            prop:value=form.plat_id
                            on:change=move |ev| form.plat_id.set(event_target_value(&ev))
                        >
                            <option value="">"-- pilih plat --"</option>
                            {plat_options}
                        </select>
                        <FieldError message=form.error("plat_id") />
                    </div>

                    <div class="form-control">
                        <label for="lokasi_id" class="label">
                            <span class="label-text">"Lokasi tujuan"</span>
                        </label>
                        <select id="lokasi_id" class="select select-bordered w-full"
                            prop:value=form.lokasi_id
                            on:change=move |ev| form.lokasi_id.set(event_target_value(&ev))
                        >
                            <option value="">"-- pilih lokasi --"</option>
                            {lokasi_options}
                        </select>
                        <FieldError message=form.error("lokasi_id") />
                    </div>

                    {is_admin.then(|| view! {
                        <div class="form-control">
                            <label for="user_id" class="label">
                                <span class="label-text">"Pemohon"</span>
                            </label>
                            <select id="user_id" class="select select-bordered w-full"
                                prop:value=form.user_id
                                on:change=move |ev| form.user_id.set(event_target_value(&ev))
                            >
                                <option value="">"-- pilih pemohon --"</option>
                                {requester_options}
                            </select>
                            <FieldError message=form.error("user_id") />
                        </div>
                    })}

                    <div class="form-control">
                        <label for="jumlah" class="label">
                            <span class="label-text">"Jumlah"</span>
                        </label>
                        <input id="jumlah"
                            type="number"
                            min="1"
                            placeholder="10"
                            on:input=move |ev| form.jumlah.set(event_target_value(&ev))
                            prop:value=form.jumlah
                            class="input input-bordered w-full"
                        />
                        <FieldError message=form.error("jumlah") />
                    </div>

                    <div class="modal-action">
                        <button type="button" class="btn" on:click=move |_| close()>"Batal"</button>
                        <button type="submit" class="btn btn-primary" disabled=loading>
                            {move || if loading.get() {
                                view! { <span class="loading loading-spinner"></span> }.into_any()
                            } else {
                                "Kirim".into_any()
                            }}
                        </button>
                    </div>
                </form>
            </div>
            <form method="dialog" class="modal-backdrop">
                <button>"close"</button>
            </form>
        </dialog>
    }
}
