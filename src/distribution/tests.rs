use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use futures::channel::oneshot;
use platdist_shared::Timestamp;
use platdist_shared::protocol::HttpMethod;
use serde_json::{Value, json};

use super::*;
use crate::error::ClientErrorKind;
use crate::request::{HttpError, HttpRequest, HttpResponse, MockHttpClient};
use crate::retry::RecordingTimer;
use crate::validation::DistribusiForm;

const LIST_URL: &str = "http://api.test/api/distribusi";

fn row(id: i64, status: &str, jumlah: u32, tanggal: &str) -> Value {
    json!({
        "id": id,
        "plat_id": 1,
        "lokasi_id": 2,
        "user_id": 3,
        "jumlah": jumlah,
        "tanggal": tanggal,
        "status": status,
        "nama_plat": "Plat Baja",
        "lot": format!("LOT-{}", id),
        "nama_lokasi": "Gudang Bekasi",
        "username": "sari"
    })
}

fn vm(scope: Scope) -> DistribusiViewModel<MockHttpClient, RecordingTimer> {
    let api = PlatApi::new("http://api.test", MockHttpClient::new()).with_token("tok");
    DistribusiViewModel::new(
        api,
        RecordingTimer::default(),
        RetryPolicy::fixed(3, Duration::from_millis(1000)),
        scope,
    )
}

fn client<T>(vm: &DistribusiViewModel<MockHttpClient, T>) -> &MockHttpClient {
    vm.api.client()
}

fn filled_form() -> DistribusiForm {
    DistribusiForm {
        plat_id: "1".into(),
        lokasi_id: "2".into(),
        user_id: "3".into(),
        jumlah: "5".into(),
    }
}

#[tokio::test]
async fn test_list_retries_twice_on_timeout_then_succeeds() {
    let vm = vm(Scope::All);
    client(&vm).mock_error(HttpMethod::Get, LIST_URL, HttpError::Timeout);
    client(&vm).mock_error(HttpMethod::Get, LIST_URL, HttpError::Timeout);
    client(&vm).mock_response(
        HttpMethod::Get,
        LIST_URL,
        200,
        json!([row(1, "pending", 4, "2025-01-03T10:00:00Z")]),
    );

    vm.list().await.unwrap();

    assert_eq!(client(&vm).count(HttpMethod::Get, LIST_URL), 3);
    assert_eq!(vm.records().len(), 1);
    assert_eq!(vm.timer.delays.borrow().len(), 2);
    assert!(vm.last_error().is_none());
}

#[tokio::test]
async fn test_list_surfaces_timeout_after_three_attempts() {
    let vm = vm(Scope::All);
    client(&vm).mock_error(HttpMethod::Get, LIST_URL, HttpError::Timeout);

    let err = vm.list().await.unwrap_err();

    assert_eq!(err.kind(), ClientErrorKind::Timeout);
    assert_eq!(client(&vm).count(HttpMethod::Get, LIST_URL), 3);
    assert_eq!(vm.last_error().map(|e| e.kind()), Some(ClientErrorKind::Timeout));
    assert!(!vm.is_loading());
}

#[tokio::test]
async fn test_list_does_not_retry_server_errors() {
    let vm = vm(Scope::All);
    client(&vm).mock_response(HttpMethod::Get, LIST_URL, 500, json!({}));

    assert!(vm.list().await.is_err());
    assert_eq!(client(&vm).count(HttpMethod::Get, LIST_URL), 1);
}

#[tokio::test]
async fn test_user_scope_lists_own_requests() {
    let vm = vm(Scope::User(3));
    let url = "http://api.test/api/distribusi/user/3";
    client(&vm).mock_response(HttpMethod::Get, url, 200, json!({ "data": [] }));

    vm.list().await.unwrap();

    assert_eq!(client(&vm).count(HttpMethod::Get, url), 1);
}

#[tokio::test]
async fn test_create_with_empty_form_sends_nothing() {
    let vm = vm(Scope::All);

    let err = vm.create(&DistribusiForm::default()).await.unwrap_err();

    match err {
        SubmitError::Invalid(fields) => assert_eq!(fields.len(), 4),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(client(&vm).total(), 0);
}

#[tokio::test]
async fn test_create_refreshes_list_before_returning() {
    let vm = vm(Scope::All);
    let form = DistribusiForm {
        plat_id: "7".into(),
        lokasi_id: "8".into(),
        user_id: "9".into(),
        jumlah: "12".into(),
    };
    client(&vm).mock_response(HttpMethod::Post, LIST_URL, 201, json!({ "id": 10 }));
    client(&vm).mock_response(
        HttpMethod::Get,
        LIST_URL,
        200,
        json!([{
            "id": 10,
            "plat_id": 7,
            "lokasi_id": 8,
            "user_id": 9,
            "jumlah": 12,
            "tanggal": "2025-02-01T08:00:00Z",
            "status": "pending"
        }]),
    );

    vm.create(&form).await.unwrap();

    assert_eq!(client(&vm).count(HttpMethod::Post, LIST_URL), 1);
    assert_eq!(client(&vm).count(HttpMethod::Get, LIST_URL), 1);

    let post = client(&vm)
        .requests
        .borrow()
        .iter()
        .find(|r| r.method == HttpMethod::Post)
        .cloned()
        .unwrap();
    let body: Value = serde_json::from_str(post.body.as_deref().unwrap()).unwrap();
    assert_eq!(
        body,
        json!({ "plat_id": 7, "lokasi_id": 8, "user_id": 9, "jumlah": 12 })
    );

    let records = vm.records();
    assert_eq!(records.len(), 1);
    let created = &records[0];
    assert_eq!(created.id, 10);
    assert_eq!(created.plat_id, 7);
    assert_eq!(created.lokasi_id, 8);
    assert_eq!(created.user_id, 9);
    assert_eq!(created.jumlah, 12);
    assert_eq!(created.status, DistribusiStatus::Pending);
}

#[tokio::test]
async fn test_create_failure_leaves_list_untouched() {
    let vm = vm(Scope::All);
    client(&vm).mock_response(
        HttpMethod::Get,
        LIST_URL,
        200,
        json!([row(1, "pending", 4, "2025-01-03T10:00:00Z")]),
    );
    vm.list().await.unwrap();
    client(&vm).mock_response(
        HttpMethod::Post,
        LIST_URL,
        400,
        json!({ "message": "Stok tidak mencukupi" }),
    );

    let err = vm.create(&filled_form()).await.unwrap_err();

    assert_eq!(err.to_string(), "Stok tidak mencukupi");
    assert_eq!(vm.records().len(), 1);
    assert_eq!(client(&vm).count(HttpMethod::Get, LIST_URL), 1);
}

#[tokio::test]
async fn test_user_scope_submits_as_self() {
    let vm = vm(Scope::User(7));
    client(&vm).mock_response(HttpMethod::Post, LIST_URL, 201, json!({}));
    client(&vm).mock_response(
        HttpMethod::Get,
        "http://api.test/api/distribusi/user/7",
        200,
        json!([]),
    );

    vm.create(&filled_form()).await.unwrap();

    let post = client(&vm)
        .requests
        .borrow()
        .iter()
        .find(|r| r.method == HttpMethod::Post)
        .cloned()
        .unwrap();
    let body: Value = serde_json::from_str(post.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["user_id"], 7);
}

#[tokio::test]
async fn test_set_status_from_terdistribusi() {
    let vm = vm(Scope::All);
    client(&vm).mock_response(
        HttpMethod::Get,
        LIST_URL,
        200,
        json!([row(1, "terdistribusi", 4, "2025-01-03T10:00:00Z")]),
    );
    client(&vm).mock_response(
        HttpMethod::Get,
        LIST_URL,
        200,
        json!([row(1, "disetujui", 4, "2025-01-03T10:00:00Z")]),
    );
    let status_url = "http://api.test/api/distribusi/status/1";
    client(&vm).mock_response(HttpMethod::Put, status_url, 200, json!({}));
    vm.list().await.unwrap();

    vm.set_status(1, DistribusiStatus::Disetujui).await.unwrap();

    let put = client(&vm)
        .requests
        .borrow()
        .iter()
        .find(|r| r.method == HttpMethod::Put)
        .cloned()
        .unwrap();
    assert_eq!(put.body.as_deref(), Some(r#"{"status":"disetujui"}"#));
    assert_eq!(vm.records()[0].status, DistribusiStatus::Disetujui);
    assert!(vm.available_transitions(&vm.records()[0]).is_empty());
}

#[tokio::test]
async fn test_set_status_rejects_other_origins_without_calling() {
    let vm = vm(Scope::All);
    client(&vm).mock_response(
        HttpMethod::Get,
        LIST_URL,
        200,
        json!([
            row(1, "pending", 4, "2025-01-03T10:00:00Z"),
            row(2, "disetujui", 4, "2025-01-03T10:00:00Z")
        ]),
    );
    vm.list().await.unwrap();
    let before = client(&vm).total();

    for id in [1, 2] {
        let err = vm.set_status(id, DistribusiStatus::Ditolak).await.unwrap_err();
        assert_eq!(err.kind(), ClientErrorKind::InvalidTransition);
    }
    let err = vm.set_status(99, DistribusiStatus::Ditolak).await.unwrap_err();
    assert_eq!(err.kind(), ClientErrorKind::NotFound);

    assert_eq!(client(&vm).total(), before);
}

#[tokio::test]
async fn test_user_scope_cannot_change_status() {
    let vm = vm(Scope::User(3));
    client(&vm).mock_response(
        HttpMethod::Get,
        "http://api.test/api/distribusi/user/3",
        200,
        json!([row(1, "terdistribusi", 4, "2025-01-03T10:00:00Z")]),
    );
    vm.list().await.unwrap();

    assert!(vm.available_transitions(&vm.records()[0]).is_empty());
    let err = vm.set_status(1, DistribusiStatus::Disetujui).await.unwrap_err();
    assert_eq!(err.kind(), ClientErrorKind::Forbidden);
    assert_eq!(client(&vm).count(HttpMethod::Put, "http://api.test/api/distribusi/status/1"), 0);
}

// =========================================================
// 过期响应
// =========================================================

/// 第一个请求等待闸门打开后才返回
struct GatedClient {
    replies: RefCell<VecDeque<(Option<oneshot::Receiver<()>>, Value)>>,
}

#[async_trait::async_trait(?Send)]
impl HttpClient for GatedClient {
    async fn send(&self, _req: HttpRequest) -> Result<HttpResponse, HttpError> {
        let next = self.replies.borrow_mut().pop_front();
        let (gate, body) = next.ok_or_else(|| HttpError::Network("no reply".into()))?;
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }
}

#[tokio::test]
async fn test_stale_list_response_is_discarded() {
    let (open, gate) = oneshot::channel();
    let client = GatedClient {
        replies: RefCell::new(VecDeque::from([
            (Some(gate), json!([row(1, "pending", 1, "2025-01-01T00:00:00Z")])),
            (None, json!([row(2, "pending", 1, "2025-01-01T00:00:00Z")])),
        ])),
    };
    let vm = DistribusiViewModel::new(
        PlatApi::new("http://api.test", client),
        RecordingTimer::default(),
        RetryPolicy::none(),
        Scope::All,
    );

    let (first, second) = futures::join!(vm.list(), async {
        let result = vm.list().await;
        let _ = open.send(());
        result
    });

    assert!(first.is_ok());
    assert!(second.is_ok());
    let records = vm.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 2);
}

// =========================================================
// 派生数据
// =========================================================

fn record(id: i64, status: DistribusiStatus, jumlah: u32, tanggal: &str) -> Distribusi {
    Distribusi {
        id,
        plat_id: 1,
        lokasi_id: 1,
        user_id: 1,
        jumlah,
        tanggal: Timestamp::parse(tanggal),
        status,
        plat_nama: Some(format!("Plat {}", id)),
        lot: Some(format!("LOT-{}", id)),
        lokasi_nama: Some("Gudang Bekasi".into()),
        username: Some(if id % 2 == 0 { "Budi" } else { "Sari" }.into()),
    }
}

fn sample() -> Vec<Distribusi> {
    vec![
        record(1, DistribusiStatus::Pending, 5, "2025-01-10T08:00:00Z"),
        record(2, DistribusiStatus::Terdistribusi, 3, "2025-01-20T08:00:00Z"),
        record(3, DistribusiStatus::Disetujui, 2, "2025-03-05T08:00:00Z"),
        record(4, DistribusiStatus::Ditolak, 7, "2025-03-06T08:00:00Z"),
        record(5, DistribusiStatus::Diproses, 1, "2024-12-31T08:00:00Z"),
    ]
}

#[test]
fn test_stats_total_matches_status_counts() {
    let stats = stats(&sample());
    assert_eq!(stats.total(), 5);
    assert_eq!(
        stats.total(),
        stats.pending + stats.diproses + stats.terdistribusi + stats.disetujui + stats.ditolak
    );
    assert_eq!(stats.count(DistribusiStatus::Ditolak), 1);
    assert_eq!(super::stats(&[]).total(), 0);
}

#[test]
fn test_monthly_flow() {
    let months = monthly(&sample(), 2025);
    assert_eq!(months.len(), 12);
    assert_eq!((months[0].masuk, months[0].keluar), (8, 3));
    assert_eq!((months[2].masuk, months[2].keluar), (9, 2));
    assert_eq!(months[11].masuk, 0);
    assert_eq!(months[2].month.label(), "Mar");
}

#[test]
fn test_filter_by_status_and_text() {
    let records = sample();
    let only_pending = filtered(
        &records,
        &DistribusiFilter {
            status: Some(DistribusiStatus::Pending),
            query: String::new(),
        },
    );
    assert_eq!(only_pending.len(), 1);

    let budi = filtered(
        &records,
        &DistribusiFilter {
            status: None,
            query: "  BUDI ".into(),
        },
    );
    assert_eq!(budi.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 4]);

    let lot = filtered(
        &records,
        &DistribusiFilter {
            status: None,
            query: "lot-3".into(),
        },
    );
    assert_eq!(lot.len(), 1);
}
