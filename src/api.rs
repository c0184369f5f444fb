use platdist_shared::protocol::{
    CreateDistribusi, CreateLokasi, CreatePlat, DeleteLokasi, DeletePlat, Endpoint,
    FindPlatByLot, GetPlat, ListDistribusi, ListDistribusiForUser, ListLokasi, ListPlat,
    ListUsers, ListUsersByRole, Login, Register, UpdateDistribusiStatus, UpdateLokasi,
    UpdatePlat,
};
use platdist_shared::{
    BEARER_PREFIX, CreateDistribusiRequest, Credentials, Distribusi, DistribusiStatus,
    HEADER_AUTHORIZATION, Id, Lokasi, LokasiPayload, Plat, PlatPayload, RegisterRequest, Role,
    UserRecord,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::adapter::{self, Envelope, ItemBody, ListBody, RawDistribusi, RawLokasi, RawPlat, RawUser, TokenBody};
use crate::config::join_url;
use crate::error::{ClientError, ClientResult};
use crate::request::{HttpClient, HttpRequest, HttpResponse};

/// REST API 访问层
///
/// 每种资源一组类型化的函数。凭据由构造者传入，不读取任何全局状态。
/// 这一层不做重试：读操作的重试由调用方用 `RetryPolicy` 包裹，
/// 写操作从不重试以免重复提交。
#[derive(Clone, Debug)]
pub struct PlatApi<C> {
    base_url: String,
    token: Option<String>,
    client: C,
}

impl<C: HttpClient> PlatApi<C> {
    pub fn new(base_url: &str, client: C) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn send<E: Endpoint>(&self, endpoint: &E) -> ClientResult<HttpResponse> {
        let path = endpoint.path();
        let op = format!("{} {}", E::METHOD.as_str(), path);
        let mut req = HttpRequest::new(&join_url(&self.base_url, &path), E::METHOD)
            .with_header("Accept", "application/json");

        if E::AUTHENTICATED {
            if let Some(token) = &self.token {
                req = req.with_header(HEADER_AUTHORIZATION, &format!("{}{}", BEARER_PREFIX, token));
            }
        }
        if let Some(body) = endpoint.body() {
            req = req.with_body(body);
        }

        debug!(%op, "sending request");
        let resp = self
            .client
            .send(req)
            .await
            .map_err(|e| ClientError::from(e).in_op(op.clone()))?;

        if !resp.is_success() {
            debug!(%op, status = resp.status, "request rejected");
            return Err(ClientError::from_response(resp.status, &resp.body).in_op(op));
        }
        Ok(resp)
    }

    async fn fetch<E: Endpoint, T: DeserializeOwned>(&self, endpoint: &E) -> ClientResult<T> {
        let resp = self.send(endpoint).await?;
        resp.json::<T>()
            .map_err(|e| ClientError::from(e).in_op(endpoint.path()))
    }

    async fn fetch_list<E, R, T>(&self, endpoint: &E, convert: fn(R) -> ClientResult<T>) -> ClientResult<Vec<T>>
    where
        E: Endpoint,
        R: DeserializeOwned,
    {
        let body: ListBody<R> = self.fetch(endpoint).await?;
        adapter::convert_all(body.into_vec(), convert)
    }

    // =========================================================
    // Auth
    // =========================================================

    /// 用户名密码换取令牌
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<String> {
        let body: ItemBody<TokenBody> = self
            .fetch(&Login(Credentials {
                username: username.to_string(),
                password: password.to_string(),
            }))
            .await?;
        Ok(body.into_inner().token)
    }

    pub async fn register(&self, req: RegisterRequest) -> ClientResult<()> {
        self.send(&Register(req)).await.map(|_| ())
    }

    // =========================================================
    // Plat
    // =========================================================

    pub async fn list_plat(&self) -> ClientResult<Vec<Plat>> {
        self.fetch_list::<_, RawPlat, _>(&ListPlat, adapter::plat).await
    }

    pub async fn get_plat(&self, id: Id) -> ClientResult<Plat> {
        let body: ItemBody<RawPlat> = self.fetch(&GetPlat(id)).await?;
        adapter::plat(body.into_inner())
    }

    /// 按批次号查询；`success = false` 视为未找到
    pub async fn find_plat_by_lot(&self, lot: &str) -> ClientResult<Plat> {
        let envelope: Envelope<RawPlat> = self.fetch(&FindPlatByLot(lot.to_string())).await?;
        match (envelope.success, envelope.data) {
            (true, Some(raw)) => adapter::plat(raw),
            (_, _) => Err(ClientError::not_found(
                envelope
                    .message
                    .unwrap_or_else(|| format!("Plat dengan lot {} tidak ditemukan", lot)),
            )),
        }
    }

    pub async fn create_plat(&self, payload: PlatPayload) -> ClientResult<()> {
        self.send(&CreatePlat(payload)).await.map(|_| ())
    }

    pub async fn update_plat(&self, id: Id, payload: PlatPayload) -> ClientResult<()> {
        self.send(&UpdatePlat(id, payload)).await.map(|_| ())
    }

    pub async fn delete_plat(&self, id: Id) -> ClientResult<()> {
        self.send(&DeletePlat(id)).await.map(|_| ())
    }

    // =========================================================
    // Lokasi
    // =========================================================

    pub async fn list_lokasi(&self) -> ClientResult<Vec<Lokasi>> {
        self.fetch_list::<_, RawLokasi, _>(&ListLokasi, adapter::lokasi).await
    }

    pub async fn create_lokasi(&self, payload: LokasiPayload) -> ClientResult<()> {
        self.send(&CreateLokasi(payload)).await.map(|_| ())
    }

    pub async fn update_lokasi(&self, id: Id, payload: LokasiPayload) -> ClientResult<()> {
        self.send(&UpdateLokasi(id, payload)).await.map(|_| ())
    }

    pub async fn delete_lokasi(&self, id: Id) -> ClientResult<()> {
        self.send(&DeleteLokasi(id)).await.map(|_| ())
    }

    // =========================================================
    // Distribusi
    // =========================================================

    pub async fn list_distribusi(&self) -> ClientResult<Vec<Distribusi>> {
        self.fetch_list::<_, RawDistribusi, _>(&ListDistribusi, adapter::distribusi)
            .await
    }

    pub async fn list_distribusi_for_user(&self, user_id: Id) -> ClientResult<Vec<Distribusi>> {
        self.fetch_list::<_, RawDistribusi, _>(&ListDistribusiForUser(user_id), adapter::distribusi)
            .await
    }

    pub async fn create_distribusi(&self, req: CreateDistribusiRequest) -> ClientResult<()> {
        self.send(&CreateDistribusi(req)).await.map(|_| ())
    }

    pub async fn update_distribusi_status(&self, id: Id, status: DistribusiStatus) -> ClientResult<()> {
        self.send(&UpdateDistribusiStatus(id, status)).await.map(|_| ())
    }

    // =========================================================
    // Users
    // =========================================================

    pub async fn list_users(&self) -> ClientResult<Vec<UserRecord>> {
        let body: ListBody<RawUser> = self.fetch(&ListUsers).await?;
        collect_users(body)
    }

    pub async fn list_users_by_role(&self, role: Role) -> ClientResult<Vec<UserRecord>> {
        let body: ListBody<RawUser> = self.fetch(&ListUsersByRole(role)).await?;
        collect_users(body)
    }
}

fn collect_users(body: ListBody<RawUser>) -> ClientResult<Vec<UserRecord>> {
    let mut users = Vec::new();
    for raw in body.into_vec() {
        if let Some(user) = adapter::user(raw)? {
            users.push(user);
        }
    }
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientErrorKind;
    use crate::request::{HttpError, MockHttpClient};
    use platdist_shared::protocol::HttpMethod;
    use serde_json::json;

    const BASE: &str = "http://api.test";

    fn api() -> PlatApi<MockHttpClient> {
        PlatApi::new(BASE, MockHttpClient::new()).with_token("tok")
    }

    #[tokio::test]
    async fn test_bearer_header_attached() {
        let api = api();
        api.client()
            .mock_response(HttpMethod::Get, "http://api.test/api/lokasi", 200, json!([]));

        api.list_lokasi().await.unwrap();

        let req = api.client().last().unwrap();
        assert_eq!(req.headers.get("Authorization").unwrap(), "Bearer tok");
    }

    #[tokio::test]
    async fn test_login_does_not_send_token() {
        let api = api();
        api.client().mock_response(
            HttpMethod::Post,
            "http://api.test/api/user/login",
            200,
            json!({ "token": "abc" }),
        );

        let token = api.login("budi", "rahasia").await.unwrap();

        assert_eq!(token, "abc");
        let req = api.client().last().unwrap();
        assert!(!req.headers.contains_key("Authorization"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "username": "budi", "password": "rahasia" }));
    }

    #[tokio::test]
    async fn test_server_rejection_carries_message() {
        let api = api();
        api.client().mock_response(
            HttpMethod::Post,
            "http://api.test/api/distribusi",
            422,
            json!({ "message": "Stok tidak mencukupi" }),
        );

        let err = api
            .create_distribusi(CreateDistribusiRequest {
                plat_id: 1,
                lokasi_id: 2,
                user_id: 3,
                jumlah: 500,
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ClientErrorKind::Server);
        assert_eq!(err.message(), "Stok tidak mencukupi");
        assert_eq!(err.spans(), ["POST /api/distribusi"]);
    }

    #[tokio::test]
    async fn test_find_by_lot_envelope() {
        let api = api();
        api.client().mock_response(
            HttpMethod::Get,
            "http://api.test/api/plat/lot/LOT-9",
            200,
            json!({ "success": true, "data": {
                "id": 9, "nama": "Plat Besi", "lot": "LOT-9", "jumlah": 3, "lokasi_id": 1
            }}),
        );
        api.client().mock_response(
            HttpMethod::Get,
            "http://api.test/api/plat/lot/NONE",
            200,
            json!({ "success": false, "message": "Lot tidak terdaftar" }),
        );

        assert_eq!(api.find_plat_by_lot("LOT-9").await.unwrap().id, 9);
        let err = api.find_plat_by_lot("NONE").await.unwrap_err();
        assert_eq!(err.kind(), ClientErrorKind::NotFound);
        assert_eq!(err.message(), "Lot tidak terdaftar");
    }

    #[tokio::test]
    async fn test_transport_timeout_maps_to_timeout_kind() {
        let api = api();
        api.client().mock_error(
            HttpMethod::Get,
            "http://api.test/api/distribusi",
            HttpError::Timeout,
        );

        let err = api.list_distribusi().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_users_with_unknown_roles_are_skipped() {
        let api = api();
        api.client().mock_response(
            HttpMethod::Get,
            "http://api.test/api/user",
            200,
            json!({ "data": [
                { "ID_User": 1, "Username": "admin", "Role": 1 },
                { "ID_User": 2, "Username": "tamu", "Role": 7 }
            ]}),
        );

        let users = api.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
    }
}
