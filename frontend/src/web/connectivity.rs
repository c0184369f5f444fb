//! 网络连接状态
//!
//! 监听 `online` / `offline` 事件，驱动离线横幅。不拦截任何操作。

use leptos::prelude::*;
use wasm_bindgen::prelude::*;

fn navigator_online() -> bool {
    web_sys::window()
        .map(|w| w.navigator().on_line())
        .unwrap_or(true)
}

/// 返回随浏览器连接状态变化的信号
pub fn online_signal() -> ReadSignal<bool> {
    let (online, set_online) = signal(navigator_online());

    if let Some(window) = web_sys::window() {
        for (event, value) in [("online", true), ("offline", false)] {
            let closure = Closure::<dyn Fn()>::new(move || {
                tracing::info!(online = value, "connectivity changed");
                set_online.set(value);
            });
            let _ = window.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
            // 泄漏闭包以保持监听器存活
            closure.forget();
        }
    }

    online
}
