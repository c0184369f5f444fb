use crate::{
    CreateDistribusiRequest, Credentials, DistribusiStatus, Id, LokasiPayload, PlatPayload,
    RegisterRequest, Role,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Metadata of one REST endpoint: method, path and optional JSON body.
///
/// Paths carry the `/api` prefix; the configured base URL only holds scheme,
/// host and port.
pub trait Endpoint {
    const METHOD: HttpMethod;
    /// Whether the bearer token must be attached.
    const AUTHENTICATED: bool = true;

    fn path(&self) -> String;

    fn body(&self) -> Option<Value> {
        None
    }
}

fn to_body<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

// =========================================================
// Auth
// =========================================================

pub struct Login(pub Credentials);

impl Endpoint for Login {
    const METHOD: HttpMethod = HttpMethod::Post;
    const AUTHENTICATED: bool = false;

    fn path(&self) -> String {
        "/api/user/login".to_string()
    }

    fn body(&self) -> Option<Value> {
        to_body(&self.0)
    }
}

pub struct Register(pub RegisterRequest);

impl Endpoint for Register {
    const METHOD: HttpMethod = HttpMethod::Post;
    const AUTHENTICATED: bool = false;

    fn path(&self) -> String {
        "/api/user/register".to_string()
    }

    fn body(&self) -> Option<Value> {
        to_body(&self.0)
    }
}

// =========================================================
// Plat (items)
// =========================================================

pub struct ListPlat;

impl Endpoint for ListPlat {
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        "/api/plat".to_string()
    }
}

pub struct GetPlat(pub Id);

impl Endpoint for GetPlat {
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        format!("/api/plat/{}", self.0)
    }
}

/// Lookup by lot/batch code; answers with a `{success, data | message}` envelope.
pub struct FindPlatByLot(pub String);

impl Endpoint for FindPlatByLot {
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        format!("/api/plat/lot/{}", encode_segment(&self.0))
    }
}

pub struct CreatePlat(pub PlatPayload);

impl Endpoint for CreatePlat {
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> String {
        "/api/plat".to_string()
    }

    fn body(&self) -> Option<Value> {
        to_body(&self.0)
    }
}

pub struct UpdatePlat(pub Id, pub PlatPayload);

impl Endpoint for UpdatePlat {
    const METHOD: HttpMethod = HttpMethod::Put;

    fn path(&self) -> String {
        format!("/api/plat/{}", self.0)
    }

    fn body(&self) -> Option<Value> {
        to_body(&self.1)
    }
}

pub struct DeletePlat(pub Id);

impl Endpoint for DeletePlat {
    const METHOD: HttpMethod = HttpMethod::Delete;

    fn path(&self) -> String {
        format!("/api/plat/{}", self.0)
    }
}

// =========================================================
// Lokasi (locations)
// =========================================================

pub struct ListLokasi;

impl Endpoint for ListLokasi {
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        "/api/lokasi".to_string()
    }
}

pub struct CreateLokasi(pub LokasiPayload);

impl Endpoint for CreateLokasi {
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> String {
        "/api/lokasi".to_string()
    }

    fn body(&self) -> Option<Value> {
        to_body(&self.0)
    }
}

pub struct UpdateLokasi(pub Id, pub LokasiPayload);

impl Endpoint for UpdateLokasi {
    const METHOD: HttpMethod = HttpMethod::Put;

    fn path(&self) -> String {
        format!("/api/lokasi/{}", self.0)
    }

    fn body(&self) -> Option<Value> {
        to_body(&self.1)
    }
}

pub struct DeleteLokasi(pub Id);

impl Endpoint for DeleteLokasi {
    const METHOD: HttpMethod = HttpMethod::Delete;

    fn path(&self) -> String {
        format!("/api/lokasi/{}", self.0)
    }
}

// =========================================================
// Distribusi
// =========================================================

pub struct ListDistribusi;

impl Endpoint for ListDistribusi {
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        "/api/distribusi".to_string()
    }
}

/// Requests created by one requester.
pub struct ListDistribusiForUser(pub Id);

impl Endpoint for ListDistribusiForUser {
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        format!("/api/distribusi/user/{}", self.0)
    }
}

pub struct CreateDistribusi(pub CreateDistribusiRequest);

impl Endpoint for CreateDistribusi {
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> String {
        "/api/distribusi".to_string()
    }

    fn body(&self) -> Option<Value> {
        to_body(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: DistribusiStatus,
}

/// Admin-only status transition.
pub struct UpdateDistribusiStatus(pub Id, pub DistribusiStatus);

impl Endpoint for UpdateDistribusiStatus {
    const METHOD: HttpMethod = HttpMethod::Put;

    fn path(&self) -> String {
        format!("/api/distribusi/status/{}", self.0)
    }

    fn body(&self) -> Option<Value> {
        to_body(&StatusBody { status: self.1 })
    }
}

// =========================================================
// Users
// =========================================================

pub struct ListUsers;

impl Endpoint for ListUsers {
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        "/api/user".to_string()
    }
}

pub struct ListUsersByRole(pub Role);

impl Endpoint for ListUsersByRole {
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        format!("/api/user/by-role?role={}", self.0.code())
    }
}

/// Percent-encodes a single path segment (lot codes may contain `/` or spaces).
fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(GetPlat(7).path(), "/api/plat/7");
        assert_eq!(ListDistribusiForUser(3).path(), "/api/distribusi/user/3");
        assert_eq!(
            UpdateDistribusiStatus(9, DistribusiStatus::Disetujui).path(),
            "/api/distribusi/status/9"
        );
        assert_eq!(ListUsersByRole(Role::User).path(), "/api/user/by-role?role=2");
    }

    #[test]
    fn test_lot_segment_is_encoded() {
        assert_eq!(
            FindPlatByLot("LOT 01/A".to_string()).path(),
            "/api/plat/lot/LOT%2001%2FA"
        );
    }

    #[test]
    fn test_encode_segment_escapes_reserved_bytes() {
        assert_eq!(encode_segment("LOT-2025_01.a~"), "LOT-2025_01.a~");
        assert_eq!(encode_segment("A B/C?D#E%"), "A%20B%2FC%3FD%23E%25");
        assert_eq!(encode_segment("Lot é"), "Lot%20%C3%A9");
        assert_eq!(encode_segment(""), "");
    }

    #[test]
    fn test_status_body() {
        let body = UpdateDistribusiStatus(1, DistribusiStatus::Ditolak)
            .body()
            .unwrap();
        assert_eq!(body, serde_json::json!({ "status": "ditolak" }));
        assert!(!Login::AUTHENTICATED);
        assert!(ListPlat.body().is_none());
    }
}
