use leptos::prelude::*;

/// 表单字段下方的错误提示
#[component]
pub fn FieldError<F>(message: F) -> impl IntoView
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    view! {
        {move || message().map(|m| view! {
            <label class="label">
                <span class="label-text-alt text-error">{m}</span>
            </label>
        })}
    }
}
