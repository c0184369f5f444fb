//! 物品位置地图
//!
//! `SvgSurface` 实现核心库的 `MapSurface`，路线以折线叠加层绘制在内联 SVG 上。
//! `MapSync` 不是 `Send`，放在本地 `StoredValue` 中；每次变更后发布一份快照信号供视图渲染。

use leptos::prelude::*;
use leptos::task::spawn_local;
use platdist::map::{GeolocationOptions, LatLng, MapView, OverlayId, RoutePath, RouteRequest};
use platdist::{Bounds, MapSurface, MapSync};
use platdist_shared::Id;

use crate::api::{app_config, new_router};
use crate::auth::use_auth;
use crate::components::icons::MapPin;
use crate::components::layout::use_notifier;
use crate::web::BrowserTimer;
use crate::web::geolocation::current_position;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 480.0;

#[derive(Default)]
pub struct SvgSurface {
    next_id: u64,
    overlays: Vec<(OverlayId, Vec<LatLng>)>,
    viewport: Option<Bounds>,
}

impl MapSurface for SvgSurface {
    fn draw_route(&mut self, path: &RoutePath) -> OverlayId {
        self.next_id += 1;
        let id = OverlayId(self.next_id);
        self.overlays.push((id, path.points.clone()));
        id
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        self.overlays.retain(|(existing, _)| *existing != id);
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.viewport = Some(bounds);
    }
}

type MapState = StoredValue<MapSync<SvgSurface>, LocalStorage>;

/// 视图渲染所需的全部数据（已投影到画布坐标）
#[derive(Debug, Clone, Default, PartialEq)]
struct MapSnapshot {
    status: Option<String>,
    is_error: bool,
    device: Option<(f64, f64)>,
    target: Option<(f64, f64)>,
    route: Vec<String>,
    summary: Option<String>,
}

fn describe(path: &RoutePath) -> String {
    format!(
        "{:.1} km · sekitar {:.0} menit",
        path.distance_m / 1000.0,
        (path.duration_s / 60.0).ceil()
    )
}

fn take_snapshot(sync: &MapSync<SvgSurface>) -> MapSnapshot {
    let surface = sync.surface();
    let project = |viewport: &Bounds, p: &LatLng| viewport.project(p, WIDTH, HEIGHT);

    match sync.view() {
        MapView::Locating => MapSnapshot {
            status: Some("Mencari lokasi perangkat...".to_string()),
            ..MapSnapshot::default()
        },
        MapView::LocationUnavailable(failure) => MapSnapshot {
            status: Some(failure.message().to_string()),
            is_error: true,
            ..MapSnapshot::default()
        },
        MapView::AwaitingTarget(device) => {
            let viewport = Bounds::around([device]).map(|b| b.padded(0.5));
            MapSnapshot {
                status: Some("Memuat lokasi plat...".to_string()),
                device: viewport.map(|v| project(&v, &device)),
                ..MapSnapshot::default()
            }
        }
        MapView::TargetUnavailable(device) => {
            let viewport = Bounds::around([device]).map(|b| b.padded(0.5));
            MapSnapshot {
                status: Some("Lokasi plat tidak ditemukan.".to_string()),
                is_error: true,
                device: viewport.map(|v| project(&v, &device)),
                ..MapSnapshot::default()
            }
        }
        MapView::Ready {
            device,
            target,
            route,
            route_error,
        } => {
            let viewport = surface
                .viewport
                .or_else(|| Bounds::around([device, target]).map(|b| b.padded(0.1)));
            let Some(viewport) = viewport else {
                return MapSnapshot::default();
            };
            let status = match (route, route_error) {
                (_, Some(err)) => Some(format!("Rute tidak tersedia: {}", err)),
                (None, None) => Some("Menghitung rute...".to_string()),
                (Some(_), None) => None,
            };
            MapSnapshot {
                is_error: route_error.is_some(),
                status,
                device: Some(project(&viewport, &device)),
                target: Some(project(&viewport, &target)),
                route: surface
                    .overlays
                    .iter()
                    .map(|(_, points)| {
                        points
                            .iter()
                            .map(|p| {
                                let (x, y) = project(&viewport, p);
                                format!("{:.1},{:.1}", x, y)
                            })
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect(),
                summary: route.map(describe),
            }
        }
    }
}

fn publish(sync: MapState, snapshot: RwSignal<MapSnapshot>) {
    if let Some(next) = sync.try_with_value(take_snapshot) {
        snapshot.set(next);
    }
}

/// 请求路线并在返回后应用；过期结果由 `MapSync` 丢弃
fn plan_route(sync: MapState, snapshot: RwSignal<MapSnapshot>, req: Option<RouteRequest>) {
    publish(sync, snapshot);
    let Some(req) = req else {
        return;
    };
    spawn_local(async move {
        let result = new_router().route(req.from, req.to).await;
        sync.update_value(|s| {
            match result {
                Ok(path) => s.apply_route(&req, path),
                Err(e) => s.fail_route(&req, &e),
            };
        });
        publish(sync, snapshot);
    });
}

#[component]
pub fn MapPage(id: Id) -> impl IntoView {
    let auth = use_auth();
    let notifier = use_notifier();

    let sync: MapState = StoredValue::new_local(MapSync::new(SvgSurface::default()));
    let snapshot = RwSignal::new(MapSnapshot::default());
    let title = RwSignal::new(Option::<String>::None);
    publish(sync, snapshot);

    // 设备位置只在挂载时获取一次
    spawn_local(async move {
        let position = current_position(GeolocationOptions::default()).await;
        let req = sync.try_update_value(|s| s.set_device(position)).flatten();
        plan_route(sync, snapshot, req);
    });

    // 物品所在位置
    let api = auth.api();
    spawn_local(async move {
        let policy = app_config().list_policy();
        let target = async {
            let plat = policy
                .run(&BrowserTimer, "map.plat", || api.get_plat(id))
                .await?;
            let lokasis = policy
                .run(&BrowserTimer, "map.lokasi", || api.list_lokasi())
                .await?;
            let lokasi = lokasis.into_iter().find(|l| l.id == plat.lokasi_id);
            Ok::<_, platdist::ClientError>((plat, lokasi))
        };
        match target.await {
            Ok((plat, Some(lokasi))) => {
                title.set(Some(format!("{} ({}) · {}", plat.nama, plat.lot, lokasi.nama)));
                let point = LatLng::new(lokasi.latitude, lokasi.longitude);
                let req = sync.try_update_value(|s| s.set_target(Some(point))).flatten();
                plan_route(sync, snapshot, req);
            }
            Ok((plat, None)) => {
                title.set(Some(format!("{} ({})", plat.nama, plat.lot)));
                sync.update_value(|s| s.set_target_missing());
                publish(sync, snapshot);
            }
            Err(e) => {
                notifier.error(&e);
                sync.update_value(|s| s.set_target_missing());
                publish(sync, snapshot);
            }
        }
    });

    let view_box = format!("0 0 {} {}", WIDTH, HEIGHT);

    view! {
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <h3 class="card-title gap-2">
                    <MapPin attr:class="h-5 w-5 text-primary" />
                    {move || title.get().unwrap_or_else(|| "Peta Plat".to_string())}
                </h3>
                {move || snapshot.with(|s| s.status.clone().map(|status| {
                    let class = if s.is_error { "alert alert-warning" } else { "alert" };
                    view! { <div role="status" class=class><span>{status}</span></div> }
                }))}
                {move || snapshot.with(|s| s.summary.clone()).map(|summary| view! {
                    <div class="badge badge-primary badge-lg">{summary}</div>
                })}
                <svg class="w-full rounded-box bg-base-200" viewBox=view_box preserveAspectRatio="xMidYMid meet">
                    {move || snapshot.with(|s| s.route.clone()).into_iter().map(|points| view! {
                        <polyline points=points fill="none" stroke="currentColor" stroke-width="4" class="text-primary" />
                    }).collect_view()}
                    {move || snapshot.with(|s| s.device).map(|(x, y)| view! {
                        <circle cx=x.to_string() cy=y.to_string() r="8" class="fill-info" />
                    })}
                    {move || snapshot.with(|s| s.target).map(|(x, y)| view! {
                        <circle cx=x.to_string() cy=y.to_string() r="8" class="fill-error" />
                    })}
                </svg>
                <div class="flex gap-4 text-sm">
                    <span class="badge badge-info">"Posisi Anda"</span>
                    <span class="badge badge-error">"Lokasi Plat"</span>
                </div>
            </div>
        </div>
    }
}
