//! 下拉选项缓存
//!
//! 新建申请对话框需要物品、位置和可选申请人三组列表。
//! 已加载且非空的列表不会因为再次打开对话框而重新请求；
//! 强制刷新需要显式调用 `refresh`。

use std::cell::RefCell;

use platdist_shared::{Lokasi, Plat, Role, UserRecord};
use tracing::{debug, warn};

use crate::api::PlatApi;
use crate::error::{ClientErrorKind, ClientResult};
use crate::request::HttpClient;
use crate::retry::{RetryPolicy, Timer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Plat,
    Lokasi,
    /// role = 2 的账号
    Requester,
}

impl OptionKind {
    pub const ALL: [OptionKind; 3] = [OptionKind::Plat, OptionKind::Lokasi, OptionKind::Requester];

    fn op(&self) -> &'static str {
        match self {
            OptionKind::Plat => "options.plat",
            OptionKind::Lokasi => "options.lokasi",
            OptionKind::Requester => "options.requester",
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    loaded: bool,
    items: Vec<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            loaded: false,
            items: Vec::new(),
        }
    }
}

impl<T> Slot<T> {
    fn is_usable(&self) -> bool {
        self.loaded && !self.items.is_empty()
    }

    fn fill(&mut self, items: Vec<T>) {
        self.items = items;
        self.loaded = true;
    }
}

pub struct OptionCache<C, T> {
    api: PlatApi<C>,
    timer: T,
    policy: RetryPolicy,
    plat: RefCell<Slot<Plat>>,
    lokasi: RefCell<Slot<Lokasi>>,
    requester: RefCell<Slot<UserRecord>>,
}

impl<C: HttpClient, T: Timer> OptionCache<C, T> {
    pub fn new(api: PlatApi<C>, timer: T, policy: RetryPolicy) -> Self {
        Self {
            api,
            timer,
            policy,
            plat: RefCell::default(),
            lokasi: RefCell::default(),
            requester: RefCell::default(),
        }
    }

    pub fn plats(&self) -> Vec<Plat> {
        self.plat.borrow().items.clone()
    }

    pub fn lokasis(&self) -> Vec<Lokasi> {
        self.lokasi.borrow().items.clone()
    }

    pub fn requesters(&self) -> Vec<UserRecord> {
        self.requester.borrow().items.clone()
    }

    pub fn is_loaded(&self, kind: OptionKind) -> bool {
        match kind {
            OptionKind::Plat => self.plat.borrow().loaded,
            OptionKind::Lokasi => self.lokasi.borrow().loaded,
            OptionKind::Requester => self.requester.borrow().loaded,
        }
    }

    fn is_usable(&self, kind: OptionKind) -> bool {
        match kind {
            OptionKind::Plat => self.plat.borrow().is_usable(),
            OptionKind::Lokasi => self.lokasi.borrow().is_usable(),
            OptionKind::Requester => self.requester.borrow().is_usable(),
        }
    }

    /// 仅当列表未加载或为空时请求
    pub async fn ensure_loaded(&self, kind: OptionKind) -> ClientResult<()> {
        if self.is_usable(kind) {
            debug!(op = kind.op(), "option cache hit");
            return Ok(());
        }
        debug!(op = kind.op(), "option cache miss");
        self.refresh(kind).await
    }

    /// 无条件重新请求
    pub async fn refresh(&self, kind: OptionKind) -> ClientResult<()> {
        let op = kind.op();
        match kind {
            OptionKind::Plat => {
                let items = self.policy.run(&self.timer, op, || self.api.list_plat()).await?;
                self.plat.borrow_mut().fill(items);
            }
            OptionKind::Lokasi => {
                let items = self.policy.run(&self.timer, op, || self.api.list_lokasi()).await?;
                self.lokasi.borrow_mut().fill(items);
            }
            OptionKind::Requester => {
                let items = self.fetch_requesters().await?;
                self.requester.borrow_mut().fill(items);
            }
        }
        Ok(())
    }

    /// 先按角色查询；服务端不支持该接口（404 或响应结构不符）时退回全量用户列表。
    /// 两种来源都在本地再过滤一次角色。
    async fn fetch_requesters(&self) -> ClientResult<Vec<UserRecord>> {
        let op = OptionKind::Requester.op();
        let users = match self
            .policy
            .run(&self.timer, op, || self.api.list_users_by_role(Role::User))
            .await
        {
            Ok(users) => users,
            Err(err) if matches!(err.kind(), ClientErrorKind::NotFound | ClientErrorKind::Decode) => {
                warn!("role-filtered user list unavailable, falling back: {}", err);
                self.policy
                    .run(&self.timer, op, || self.api.list_users())
                    .await?
            }
            Err(err) => return Err(err),
        };
        Ok(users.into_iter().filter(|u| u.role == Role::User).collect())
    }

    /// 并发加载三组列表
    ///
    /// 每组独立成功或失败，返回第一个错误。
    pub async fn ensure_all(&self) -> ClientResult<()> {
        let (plat, lokasi, requester) = futures::join!(
            self.ensure_loaded(OptionKind::Plat),
            self.ensure_loaded(OptionKind::Lokasi),
            self.ensure_loaded(OptionKind::Requester),
        );
        plat.and(lokasi).and(requester)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{HttpError, MockHttpClient};
    use crate::retry::RecordingTimer;
    use platdist_shared::protocol::HttpMethod;
    use serde_json::json;
    use std::time::Duration;

    const PLAT_URL: &str = "http://api.test/api/plat";
    const LOKASI_URL: &str = "http://api.test/api/lokasi";
    const BY_ROLE_URL: &str = "http://api.test/api/user/by-role?role=2";
    const USERS_URL: &str = "http://api.test/api/user";

    fn cache() -> OptionCache<MockHttpClient, RecordingTimer> {
        OptionCache::new(
            PlatApi::new("http://api.test", MockHttpClient::new()),
            RecordingTimer::default(),
            RetryPolicy::exponential(3, Duration::from_millis(1000), 1.5),
        )
    }

    fn lokasi_json() -> serde_json::Value {
        json!([{ "id": 1, "nama": "Gudang A", "latitude": -6.2, "longitude": 106.8 }])
    }

    #[tokio::test]
    async fn test_loaded_list_is_not_refetched() {
        let cache = cache();
        cache
            .api
            .client()
            .mock_response(HttpMethod::Get, LOKASI_URL, 200, lokasi_json());

        cache.ensure_loaded(OptionKind::Lokasi).await.unwrap();
        cache.ensure_loaded(OptionKind::Lokasi).await.unwrap();
        assert_eq!(cache.api.client().count(HttpMethod::Get, LOKASI_URL), 1);

        cache.refresh(OptionKind::Lokasi).await.unwrap();
        assert_eq!(cache.api.client().count(HttpMethod::Get, LOKASI_URL), 2);
        assert_eq!(cache.lokasis().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_list_is_fetched_again() {
        let cache = cache();
        cache
            .api
            .client()
            .mock_response(HttpMethod::Get, PLAT_URL, 200, json!([]));

        cache.ensure_loaded(OptionKind::Plat).await.unwrap();
        assert!(cache.is_loaded(OptionKind::Plat));
        cache.ensure_loaded(OptionKind::Plat).await.unwrap();

        assert_eq!(cache.api.client().count(HttpMethod::Get, PLAT_URL), 2);
    }

    #[tokio::test]
    async fn test_timeouts_back_off_exponentially() {
        let cache = cache();
        let client = cache.api.client();
        client.mock_error(HttpMethod::Get, LOKASI_URL, HttpError::Timeout);
        client.mock_error(HttpMethod::Get, LOKASI_URL, HttpError::Timeout);
        client.mock_response(HttpMethod::Get, LOKASI_URL, 200, lokasi_json());

        cache.ensure_loaded(OptionKind::Lokasi).await.unwrap();

        assert_eq!(
            *cache.timer.delays.borrow(),
            vec![Duration::from_millis(1000), Duration::from_millis(1500)]
        );
    }

    #[tokio::test]
    async fn test_requesters_are_filtered_to_user_role() {
        let cache = cache();
        cache.api.client().mock_response(
            HttpMethod::Get,
            BY_ROLE_URL,
            200,
            json!([
                { "id": 1, "username": "admin", "role": 1 },
                { "id": 2, "username": "sari", "role": 2 }
            ]),
        );

        cache.ensure_loaded(OptionKind::Requester).await.unwrap();

        let names: Vec<_> = cache.requesters().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["sari"]);
        assert_eq!(cache.api.client().count(HttpMethod::Get, USERS_URL), 0);
    }

    #[tokio::test]
    async fn test_requesters_fall_back_to_full_user_list() {
        let cache = cache();
        cache
            .api
            .client()
            .mock_response(HttpMethod::Get, BY_ROLE_URL, 404, json!({}));
        cache.api.client().mock_response(
            HttpMethod::Get,
            USERS_URL,
            200,
            json!({ "data": [
                { "ID_User": 1, "Username": "admin", "Role": 1 },
                { "ID_User": 3, "Username": "budi", "Role": 2 }
            ]}),
        );

        cache.ensure_loaded(OptionKind::Requester).await.unwrap();

        assert_eq!(cache.requesters().len(), 1);
        assert_eq!(cache.requesters()[0].id, 3);
    }

    #[tokio::test]
    async fn test_ensure_all_loads_every_kind() {
        let cache = cache();
        let client = cache.api.client();
        client.mock_response(
            HttpMethod::Get,
            PLAT_URL,
            200,
            json!([{ "id": 1, "nama": "Plat", "lot": "L1", "jumlah": 3, "lokasi_id": 1 }]),
        );
        client.mock_response(HttpMethod::Get, LOKASI_URL, 200, lokasi_json());
        client.mock_response(
            HttpMethod::Get,
            BY_ROLE_URL,
            200,
            json!([{ "id": 2, "username": "sari", "role": 2 }]),
        );

        cache.ensure_all().await.unwrap();

        for kind in OptionKind::ALL {
            assert!(cache.is_loaded(kind));
        }
        assert_eq!(client.total(), 3);
    }
}
