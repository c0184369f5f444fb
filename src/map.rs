//! 地图与定位同步
//!
//! 视图挂载时获取一次设备位置；设备位置与目标物品坐标都可用时，
//! 请求路线规划服务计算驾车路线并绘制，同时让视口包含两点。
//! 任一端点变化都会重新规划路线，旧路线在绘制新路线前移除。
//!
//! 绘制目标通过 `MapSurface` 抽象，前端用 SVG 实现，测试中记录调用。

use platdist_shared::protocol::HttpMethod;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::join_url;
use crate::error::{ClientError, ClientResult};
use crate::request::{HttpClient, HttpRequest};

// =========================================================
// 几何
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// 经纬度矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

/// 单点或重合点时的最小跨度（度）
const MIN_SPAN: f64 = 0.01;

/// 墨卡托投影的纬度上限
const LAT_LIMIT: f64 = 85.0;

impl Bounds {
    /// 包含所有点的最小矩形；没有点时返回 `None`
    pub fn around<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds {
            south: first.lat,
            west: first.lng,
            north: first.lat,
            east: first.lng,
        };
        for p in iter {
            bounds.south = bounds.south.min(p.lat);
            bounds.north = bounds.north.max(p.lat);
            bounds.west = bounds.west.min(p.lng);
            bounds.east = bounds.east.max(p.lng);
        }
        Some(bounds)
    }

    /// 四周各留出 `ratio` 倍跨度的边距
    ///
    /// 纬度限制在墨卡托可投影的 ±85° 内：先收缩半跨度，再平移中心，保证 `south <= north`。
    pub fn padded(&self, ratio: f64) -> Self {
        let center = self.center();
        let half_lat = ((self.north - self.south).max(MIN_SPAN) * (0.5 + ratio)).min(LAT_LIMIT);
        let half_lng = (self.east - self.west).max(MIN_SPAN) * (0.5 + ratio);
        let lat = center.lat.max(half_lat - LAT_LIMIT).min(LAT_LIMIT - half_lat);
        Bounds {
            south: (lat - half_lat).max(-LAT_LIMIT),
            west: center.lng - half_lng,
            north: (lat + half_lat).min(LAT_LIMIT),
            east: center.lng + half_lng,
        }
    }

    pub fn contains(&self, p: &LatLng) -> bool {
        (self.south..=self.north).contains(&p.lat) && (self.west..=self.east).contains(&p.lng)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }

    /// 墨卡托投影到 `width x height` 的画布坐标，y 轴向下
    pub fn project(&self, p: &LatLng, width: f64, height: f64) -> (f64, f64) {
        fn merc_y(lat: f64) -> f64 {
            let rad = lat.to_radians();
            (std::f64::consts::FRAC_PI_4 + rad / 2.0).tan().ln()
        }

        let lng_span = (self.east - self.west).max(f64::EPSILON);
        let top = merc_y(self.north);
        let y_span = (top - merc_y(self.south)).max(f64::EPSILON);

        let x = (p.lng - self.west) / lng_span * width;
        let y = (top - merc_y(p.lat)) / y_span * height;
        (x, y)
    }
}

// =========================================================
// 设备定位
// =========================================================

/// 一次性定位请求的参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeolocationOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u32,
    pub maximum_age_ms: u32,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: 5000,
            maximum_age_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationFailure {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    /// 浏览器不支持定位
    Unsupported,
}

impl GeolocationFailure {
    /// `GeolocationPositionError.code`
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationFailure::PermissionDenied,
            3 => GeolocationFailure::Timeout,
            _ => GeolocationFailure::PositionUnavailable,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            GeolocationFailure::PermissionDenied => "Izin lokasi ditolak. Aktifkan akses lokasi di browser.",
            GeolocationFailure::PositionUnavailable => "Lokasi perangkat tidak tersedia.",
            GeolocationFailure::Timeout => "Gagal mendapatkan lokasi dalam 5 detik.",
            GeolocationFailure::Unsupported => "Browser tidak mendukung geolokasi.",
        }
    }
}

/// 设备位置；`Unavailable` 是该视图的终态，不自动重试
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DevicePosition {
    Locating,
    Available(LatLng),
    Unavailable(GeolocationFailure),
}

// =========================================================
// 路线
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub generation: u64,
    pub from: LatLng,
    pub to: LatLng,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutePath {
    pub points: Vec<LatLng>,
    pub distance_m: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayId(pub u64);

/// 地图绘制目标
pub trait MapSurface {
    fn draw_route(&mut self, path: &RoutePath) -> OverlayId;
    fn remove_overlay(&mut self, id: OverlayId);
    fn fit_bounds(&mut self, bounds: Bounds);
}

/// 视图应显示的状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapView<'a> {
    Locating,
    LocationUnavailable(GeolocationFailure),
    /// 设备位置已知，目标坐标未到
    AwaitingTarget(LatLng),
    /// 目标物品没有可用的坐标，不会规划路线
    TargetUnavailable(LatLng),
    Ready {
        device: LatLng,
        target: LatLng,
        route: Option<&'a RoutePath>,
        route_error: Option<&'a str>,
    },
}

pub struct MapSync<S> {
    surface: S,
    device: DevicePosition,
    target: Option<LatLng>,
    target_missing: bool,
    generation: u64,
    overlay: Option<OverlayId>,
    route: Option<RoutePath>,
    route_error: Option<String>,
}

impl<S: MapSurface> MapSync<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            device: DevicePosition::Locating,
            target: None,
            target_missing: false,
            generation: 0,
            overlay: None,
            route: None,
            route_error: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn view(&self) -> MapView<'_> {
        match (self.device, self.target) {
            (DevicePosition::Locating, _) => MapView::Locating,
            (DevicePosition::Unavailable(failure), _) => MapView::LocationUnavailable(failure),
            (DevicePosition::Available(device), None) if self.target_missing => {
                MapView::TargetUnavailable(device)
            }
            (DevicePosition::Available(device), None) => MapView::AwaitingTarget(device),
            (DevicePosition::Available(device), Some(target)) => MapView::Ready {
                device,
                target,
                route: self.route.as_ref(),
                route_error: self.route_error.as_deref(),
            },
        }
    }

    /// 更新设备位置；端点变化且两点齐全时返回新的路线请求
    pub fn set_device(&mut self, position: DevicePosition) -> Option<RouteRequest> {
        if self.device == position {
            return None;
        }
        self.device = position;
        if let DevicePosition::Unavailable(failure) = position {
            warn!(?failure, "device position unavailable");
            self.invalidate();
            return None;
        }
        self.next_request()
    }

    pub fn set_target(&mut self, target: Option<LatLng>) -> Option<RouteRequest> {
        if self.target == target {
            return None;
        }
        self.target = target;
        self.target_missing = false;
        self.next_request()
    }

    /// 目标坐标无法获得（物品没有位置或加载失败）
    pub fn set_target_missing(&mut self) {
        warn!("target position unavailable");
        self.target = None;
        self.target_missing = true;
        self.invalidate();
    }

    fn endpoints(&self) -> Option<(LatLng, LatLng)> {
        match (self.device, self.target) {
            (DevicePosition::Available(from), Some(to)) => Some((from, to)),
            _ => None,
        }
    }

    /// 使进行中的请求失效并移除旧路线
    fn invalidate(&mut self) {
        self.generation += 1;
        if let Some(id) = self.overlay.take() {
            self.surface.remove_overlay(id);
        }
        self.route = None;
        self.route_error = None;
    }

    fn next_request(&mut self) -> Option<RouteRequest> {
        self.invalidate();
        let (from, to) = self.endpoints()?;
        debug!(generation = self.generation, "route requested");
        Some(RouteRequest {
            generation: self.generation,
            from,
            to,
        })
    }

    fn is_current(&self, req: &RouteRequest) -> bool {
        req.generation == self.generation && self.endpoints() == Some((req.from, req.to))
    }

    /// 绘制路线并调整视口；过期的请求返回 `false` 且不做任何改动
    pub fn apply_route(&mut self, req: &RouteRequest, path: RoutePath) -> bool {
        if !self.is_current(req) {
            debug!(generation = req.generation, "discarding stale route");
            return false;
        }
        if let Some(id) = self.overlay.take() {
            self.surface.remove_overlay(id);
        }
        self.overlay = Some(self.surface.draw_route(&path));

        let points = [req.from, req.to].into_iter().chain(path.points.iter().copied());
        if let Some(bounds) = Bounds::around(points) {
            self.surface.fit_bounds(bounds.padded(0.1));
        }
        info!(distance_m = path.distance_m, "route drawn");
        self.route = Some(path);
        self.route_error = None;
        true
    }

    /// 路线规划失败：显示提示，视口仍包含两点
    pub fn fail_route(&mut self, req: &RouteRequest, err: &ClientError) -> bool {
        if !self.is_current(req) {
            return false;
        }
        warn!("route failed: {}", err);
        if let Some(id) = self.overlay.take() {
            self.surface.remove_overlay(id);
        }
        if let Some(bounds) = Bounds::around([req.from, req.to]) {
            self.surface.fit_bounds(bounds.padded(0.1));
        }
        self.route = None;
        self.route_error = Some(err.message().to_string());
        true
    }
}

// =========================================================
// OSRM 路线规划
// =========================================================

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON 顺序为 [lng, lat]
    coordinates: Vec<[f64; 2]>,
}

pub struct OsrmRouter<C> {
    base_url: String,
    client: C,
}

impl<C: HttpClient> OsrmRouter<C> {
    pub fn new(base_url: &str, client: C) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn route_url(&self, from: LatLng, to: LatLng) -> String {
        join_url(
            &self.base_url,
            &format!(
                "/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
                from.lng, from.lat, to.lng, to.lat
            ),
        )
    }

    pub async fn route(&self, from: LatLng, to: LatLng) -> ClientResult<RoutePath> {
        const OP: &str = "routing.driving";
        let req = HttpRequest::new(&self.route_url(from, to), HttpMethod::Get);
        let resp = self
            .client
            .send(req)
            .await
            .map_err(|e| ClientError::from(e).in_op(OP))?;
        if !resp.is_success() {
            return Err(ClientError::from_response(resp.status, &resp.body).in_op(OP));
        }

        let body: OsrmResponse = resp.json().map_err(|e| ClientError::from(e).in_op(OP))?;
        if body.code != "Ok" {
            return Err(ClientError::not_found(
                body.message
                    .unwrap_or_else(|| "Rute tidak ditemukan".to_string()),
            )
            .in_op(OP));
        }
        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::not_found("Rute tidak ditemukan").in_op(OP))?;

        Ok(RoutePath {
            points: route
                .geometry
                .coordinates
                .into_iter()
                .map(|[lng, lat]| LatLng::new(lat, lng))
                .collect(),
            distance_m: route.distance,
            duration_s: route.duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientErrorKind;
    use crate::request::MockHttpClient;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingSurface {
        next_id: u64,
        live: Vec<OverlayId>,
        fitted: Vec<Bounds>,
    }

    impl MapSurface for RecordingSurface {
        fn draw_route(&mut self, _path: &RoutePath) -> OverlayId {
            self.next_id += 1;
            let id = OverlayId(self.next_id);
            self.live.push(id);
            id
        }

        fn remove_overlay(&mut self, id: OverlayId) {
            self.live.retain(|o| *o != id);
        }

        fn fit_bounds(&mut self, bounds: Bounds) {
            self.fitted.push(bounds);
        }
    }

    const DEVICE: LatLng = LatLng { lat: -6.2, lng: 106.8 };
    const TARGET: LatLng = LatLng { lat: -6.3, lng: 107.1 };

    fn path() -> RoutePath {
        RoutePath {
            points: vec![DEVICE, LatLng::new(-6.25, 106.95), TARGET],
            distance_m: 35_000.0,
            duration_s: 2400.0,
        }
    }

    #[test]
    fn test_route_requested_only_when_both_points_known() {
        let mut sync = MapSync::new(RecordingSurface::default());
        assert_eq!(sync.view(), MapView::Locating);
        assert!(sync.set_target(Some(TARGET)).is_none());

        let req = sync.set_device(DevicePosition::Available(DEVICE)).unwrap();
        assert_eq!((req.from, req.to), (DEVICE, TARGET));
        assert!(sync.set_device(DevicePosition::Available(DEVICE)).is_none());
    }

    #[test]
    fn test_overlays_never_accumulate() {
        let mut sync = MapSync::new(RecordingSurface::default());
        sync.set_device(DevicePosition::Available(DEVICE));
        let first = sync.set_target(Some(TARGET)).unwrap();
        assert!(sync.apply_route(&first, path()));

        let moved = LatLng::new(-6.21, 106.81);
        let second = sync.set_device(DevicePosition::Available(moved)).unwrap();
        assert!(sync.surface().live.is_empty());
        assert!(sync.apply_route(&second, path()));

        assert_eq!(sync.surface().live, vec![OverlayId(2)]);
        assert_eq!(sync.surface().fitted.len(), 2);
        let last = sync.surface().fitted[1];
        assert!(last.contains(&moved) && last.contains(&TARGET));
    }

    #[test]
    fn test_stale_route_is_ignored() {
        let mut sync = MapSync::new(RecordingSurface::default());
        sync.set_device(DevicePosition::Available(DEVICE));
        let old = sync.set_target(Some(TARGET)).unwrap();
        let new = sync.set_target(Some(LatLng::new(-6.4, 107.0))).unwrap();

        assert!(!sync.apply_route(&old, path()));
        assert!(sync.surface().live.is_empty());
        assert!(sync.apply_route(&new, path()));
    }

    #[test]
    fn test_route_failure_still_fits_both_points() {
        let mut sync = MapSync::new(RecordingSurface::default());
        sync.set_device(DevicePosition::Available(DEVICE));
        let req = sync.set_target(Some(TARGET)).unwrap();

        assert!(sync.fail_route(&req, &ClientError::network("offline")));

        let fitted = sync.surface().fitted[0];
        assert!(fitted.contains(&DEVICE) && fitted.contains(&TARGET));
        match sync.view() {
            MapView::Ready { route, route_error, .. } => {
                assert!(route.is_none());
                assert_eq!(route_error, Some("offline"));
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_location_failure_is_terminal_state() {
        let mut sync = MapSync::new(RecordingSurface::default());
        sync.set_target(Some(TARGET));
        let failure = GeolocationFailure::from_code(1);
        assert!(sync.set_device(DevicePosition::Unavailable(failure)).is_none());
        assert_eq!(
            sync.view(),
            MapView::LocationUnavailable(GeolocationFailure::PermissionDenied)
        );
    }

    #[test]
    fn test_bounds_projection_corners() {
        let bounds = Bounds::around([DEVICE, TARGET]).unwrap();
        let (x, y) = bounds.project(&LatLng::new(bounds.north, bounds.west), 400.0, 300.0);
        assert!(x.abs() < 1e-9 && y.abs() < 1e-9);
        let (x, y) = bounds.project(&LatLng::new(bounds.south, bounds.east), 400.0, 300.0);
        assert!((x - 400.0).abs() < 1e-6 && (y - 300.0).abs() < 1e-6);
        assert!(Bounds::around(std::iter::empty()).is_none());
    }

    #[test]
    fn test_padding_near_latitude_limit_keeps_points() {
        let a = LatLng::new(84.99, 10.0);
        let b = LatLng::new(84.995, 10.002);
        let padded = Bounds::around([a, b]).unwrap().padded(0.5);
        assert!(padded.south <= padded.north);
        assert!(padded.north <= 85.0);
        assert!(padded.contains(&a) && padded.contains(&b));

        let polar = Bounds::around([LatLng::new(-80.0, 0.0), LatLng::new(80.0, 1.0)])
            .unwrap()
            .padded(0.5);
        assert_eq!((polar.south, polar.north), (-85.0, 85.0));
    }

    #[test]
    fn test_missing_target_is_distinct_state() {
        let mut sync = MapSync::new(RecordingSurface::default());
        sync.set_device(DevicePosition::Available(DEVICE));
        assert_eq!(sync.view(), MapView::AwaitingTarget(DEVICE));

        sync.set_target_missing();
        assert_eq!(sync.view(), MapView::TargetUnavailable(DEVICE));
        assert!(sync.surface().live.is_empty());

        let req = sync.set_target(Some(TARGET)).unwrap();
        assert_eq!((req.from, req.to), (DEVICE, TARGET));
        assert!(matches!(sync.view(), MapView::Ready { .. }));
    }

    #[tokio::test]
    async fn test_osrm_route_parsing() {
        let router = OsrmRouter::new("https://osrm.test/", MockHttpClient::new());
        let url = router.route_url(DEVICE, TARGET);
        assert_eq!(
            url,
            "https://osrm.test/route/v1/driving/106.8,-6.2;107.1,-6.3?overview=full&geometries=geojson"
        );
        router.client().mock_response(
            HttpMethod::Get,
            &url,
            200,
            json!({
                "code": "Ok",
                "routes": [{
                    "geometry": { "type": "LineString", "coordinates": [[106.8, -6.2], [107.1, -6.3]] },
                    "distance": 35012.5,
                    "duration": 2410.0
                }]
            }),
        );

        let path = router.route(DEVICE, TARGET).await.unwrap();
        assert_eq!(path.points, vec![DEVICE, TARGET]);
        assert_eq!(path.distance_m, 35012.5);
    }

    #[tokio::test]
    async fn test_osrm_no_route() {
        let router = OsrmRouter::new("https://osrm.test", MockHttpClient::new());
        router.client().mock_response(
            HttpMethod::Get,
            &router.route_url(DEVICE, TARGET),
            200,
            json!({ "code": "NoRoute", "message": "Impossible route between points", "routes": [] }),
        );

        let err = router.route(DEVICE, TARGET).await.unwrap_err();
        assert_eq!(err.kind(), ClientErrorKind::NotFound);
        assert_eq!(err.spans(), ["routing.driving"]);
    }
}
