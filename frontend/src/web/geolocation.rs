//! 设备定位
//!
//! 一次性调用 `navigator.geolocation.getCurrentPosition`，结果经 oneshot 通道转为 future。

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use js_sys::Reflect;
use platdist::map::{DevicePosition, GeolocationFailure, GeolocationOptions, LatLng};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::PositionOptions;

fn number_at(value: &JsValue, key: &str) -> Option<f64> {
    Reflect::get(value, &JsValue::from_str(key)).ok()?.as_f64()
}

fn read_position(position: &JsValue) -> DevicePosition {
    let coords = Reflect::get(position, &JsValue::from_str("coords")).ok();
    match coords.as_ref().and_then(|c| Some((number_at(c, "latitude")?, number_at(c, "longitude")?))) {
        Some((lat, lng)) => DevicePosition::Available(LatLng::new(lat, lng)),
        None => DevicePosition::Unavailable(GeolocationFailure::PositionUnavailable),
    }
}

pub async fn current_position(options: GeolocationOptions) -> DevicePosition {
    let geolocation = match web_sys::window().and_then(|w| w.navigator().geolocation().ok()) {
        Some(geolocation) => geolocation,
        None => return DevicePosition::Unavailable(GeolocationFailure::Unsupported),
    };

    let (tx, rx) = oneshot::channel::<DevicePosition>();
    let tx = Rc::new(RefCell::new(Some(tx)));

    let on_success = {
        let tx = tx.clone();
        Closure::once(move |position: JsValue| {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(read_position(&position));
            }
        })
    };
    let on_error = Closure::once(move |error: JsValue| {
        let code = number_at(&error, "code").map(|c| c as u16).unwrap_or(2);
        if let Some(tx) = tx.borrow_mut().take() {
            let _ = tx.send(DevicePosition::Unavailable(GeolocationFailure::from_code(code)));
        }
    });

    let opts = PositionOptions::new();
    opts.set_enable_high_accuracy(options.enable_high_accuracy);
    opts.set_timeout(options.timeout_ms);
    opts.set_maximum_age(options.maximum_age_ms);

    if let Err(e) = geolocation.get_current_position_with_error_callback_and_options(
        on_success.as_ref().unchecked_ref(),
        Some(on_error.as_ref().unchecked_ref()),
        &opts,
    ) {
        tracing::warn!("getCurrentPosition rejected: {:?}", e);
        return DevicePosition::Unavailable(GeolocationFailure::Unsupported);
    }

    // 回调触发前闭包必须存活
    let position = rx
        .await
        .unwrap_or(DevicePosition::Unavailable(GeolocationFailure::PositionUnavailable));
    drop(on_success);
    drop(on_error);
    position
}
