//! 服务端数据形态 -> 内部规范记录
//!
//! 服务端不同接口对同一字段的命名并不统一（`id` / `ID_User` / `id_user` 等），
//! 数字字段有时以字符串下发。这里为每种资源定义宽松的 wire 结构，
//! 并通过显式的转换函数得到 `platdist_shared` 中的规范类型。
//! 其余模块只接触规范类型。

use platdist_shared::{
    Distribusi, DistribusiStatus, Lokasi, Plat, PlatStatus, Role, Timestamp, UserRecord,
};
use serde::Deserialize;

use crate::error::{ClientError, ClientResult};

// =========================================================
// 基础值
// =========================================================

/// 数字或数字字符串
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumValue {
    fn as_i64(&self, field: &str) -> ClientResult<i64> {
        match self {
            NumValue::Int(v) => Ok(*v),
            NumValue::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            NumValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ClientError::decode(format!("Kolom {} tidak valid: {}", field, s))),
            NumValue::Float(v) => Err(ClientError::decode(format!(
                "Kolom {} tidak valid: {}",
                field, v
            ))),
        }
    }

    fn as_f64(&self, field: &str) -> ClientResult<f64> {
        match self {
            NumValue::Int(v) => Ok(*v as f64),
            NumValue::Float(v) => Ok(*v),
            NumValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ClientError::decode(format!("Kolom {} tidak valid: {}", field, s))),
        }
    }

    fn as_u32(&self, field: &str) -> ClientResult<u32> {
        let v = self.as_i64(field)?;
        u32::try_from(v)
            .map_err(|_| ClientError::decode(format!("Kolom {} di luar jangkauan: {}", field, v)))
    }
}

/// 列表响应：裸数组或 `{ data: [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListBody<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListBody<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Bare(items) => items,
            ListBody::Wrapped { data } => data,
        }
    }
}

/// 单条记录响应：裸对象或 `{ data: {...} }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ItemBody<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> ItemBody<T> {
    pub fn into_inner(self) -> T {
        match self {
            ItemBody::Wrapped { data } => data,
            ItemBody::Bare(item) => item,
        }
    }
}

/// `{success, data | message}` 信封
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

/// 登录响应中的令牌
#[derive(Debug, Deserialize)]
pub struct TokenBody {
    #[serde(alias = "accessToken", alias = "access_token")]
    pub token: String,
}

// =========================================================
// Plat
// =========================================================

#[derive(Debug, Deserialize)]
pub struct RawPlat {
    #[serde(alias = "ID_Plat", alias = "id_plat")]
    pub id: NumValue,
    #[serde(alias = "nama_plat", alias = "Nama_Plat", alias = "name")]
    pub nama: String,
    #[serde(alias = "lot_batch", alias = "Lot_Batch_Number", alias = "lot_batch_number")]
    pub lot: String,
    #[serde(alias = "Qty", alias = "qty", alias = "quantity")]
    pub jumlah: NumValue,
    #[serde(alias = "ID_Lokasi", alias = "id_lokasi")]
    pub lokasi_id: NumValue,
    #[serde(default, alias = "nama_lokasi", alias = "Nama_Lokasi")]
    pub lokasi_nama: Option<String>,
    #[serde(default, alias = "Status")]
    pub status: Option<String>,
}

pub fn plat(raw: RawPlat) -> ClientResult<Plat> {
    let status = match raw.status.as_deref() {
        None => PlatStatus::default(),
        Some(s) => PlatStatus::parse(s)
            .ok_or_else(|| ClientError::decode(format!("Status plat tidak dikenal: {}", s)))?,
    };
    Ok(Plat {
        id: raw.id.as_i64("id")?,
        nama: raw.nama,
        lot: raw.lot,
        jumlah: raw.jumlah.as_u32("jumlah")?,
        lokasi_id: raw.lokasi_id.as_i64("lokasi_id")?,
        lokasi_nama: raw.lokasi_nama,
        status,
    })
}

// =========================================================
// Lokasi
// =========================================================

#[derive(Debug, Deserialize)]
pub struct RawLokasi {
    #[serde(alias = "ID_Lokasi", alias = "id_lokasi")]
    pub id: NumValue,
    #[serde(alias = "nama_lokasi", alias = "Nama_Lokasi", alias = "name")]
    pub nama: String,
    #[serde(alias = "Latitude", alias = "lat")]
    pub latitude: NumValue,
    #[serde(alias = "Longitude", alias = "lng", alias = "lon")]
    pub longitude: NumValue,
}

pub fn lokasi(raw: RawLokasi) -> ClientResult<Lokasi> {
    Ok(Lokasi {
        id: raw.id.as_i64("id")?,
        nama: raw.nama,
        latitude: raw.latitude.as_f64("latitude")?,
        longitude: raw.longitude.as_f64("longitude")?,
    })
}

// =========================================================
// Distribusi
// =========================================================

#[derive(Debug, Deserialize)]
pub struct RawDistribusi {
    #[serde(alias = "ID_Distribusi", alias = "id_distribusi")]
    pub id: NumValue,
    #[serde(alias = "ID_Plat", alias = "id_plat")]
    pub plat_id: NumValue,
    #[serde(alias = "ID_Lokasi", alias = "id_lokasi")]
    pub lokasi_id: NumValue,
    #[serde(alias = "ID_User", alias = "id_user")]
    pub user_id: NumValue,
    #[serde(alias = "Jumlah", alias = "qty", alias = "quantity")]
    pub jumlah: NumValue,
    #[serde(default, alias = "Tanggal", alias = "tanggal_request", alias = "created_at")]
    pub tanggal: Option<serde_json::Value>,
    #[serde(alias = "Status")]
    pub status: String,
    #[serde(default, alias = "nama_plat", alias = "Nama_Plat")]
    pub plat_nama: Option<String>,
    #[serde(default, alias = "lot_batch", alias = "Lot_Batch_Number")]
    pub lot: Option<String>,
    #[serde(default, alias = "nama_lokasi", alias = "Nama_Lokasi")]
    pub lokasi_nama: Option<String>,
    /// 旧接口里的目的地名称
    #[serde(default)]
    pub lokasi_tujuan: Option<String>,
    #[serde(default, alias = "Username", alias = "nama_user")]
    pub username: Option<String>,
}

pub fn distribusi(raw: RawDistribusi) -> ClientResult<Distribusi> {
    let status = DistribusiStatus::parse(&raw.status).ok_or_else(|| {
        ClientError::decode(format!("Status distribusi tidak dikenal: {}", raw.status))
    })?;
    Ok(Distribusi {
        id: raw.id.as_i64("id")?,
        plat_id: raw.plat_id.as_i64("plat_id")?,
        lokasi_id: raw.lokasi_id.as_i64("lokasi_id")?,
        user_id: raw.user_id.as_i64("user_id")?,
        jumlah: raw.jumlah.as_u32("jumlah")?,
        // 时间格式无法识别时保留记录，仅丢弃时间
        tanggal: raw.tanggal.and_then(|v| serde_json::from_value::<Timestamp>(v).ok()),
        status,
        plat_nama: raw.plat_nama,
        lot: raw.lot,
        lokasi_nama: raw.lokasi_nama.or(raw.lokasi_tujuan),
        username: raw.username,
    })
}

// =========================================================
// Users
// =========================================================

#[derive(Debug, Deserialize)]
pub struct RawUser {
    #[serde(alias = "ID_User", alias = "id_user", alias = "userId")]
    pub id: NumValue,
    #[serde(alias = "Username", alias = "nama", alias = "name")]
    pub username: String,
    #[serde(alias = "Role", alias = "id_role")]
    pub role: NumValue,
}

/// 未知角色的账号直接丢弃（返回 `Ok(None)`）
pub fn user(raw: RawUser) -> ClientResult<Option<UserRecord>> {
    let role = match &raw.role {
        NumValue::Text(s) => Role::parse(s),
        other => Role::from_code(other.as_i64("role")?),
    };
    Ok(match role {
        Some(role) => Some(UserRecord {
            id: raw.id.as_i64("id")?,
            username: raw.username,
            role,
        }),
        None => None,
    })
}

/// 对列表逐条转换，任何一条失败则整体失败
pub fn convert_all<R, T>(raws: Vec<R>, f: fn(R) -> ClientResult<T>) -> ClientResult<Vec<T>> {
    raws.into_iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plat_from_legacy_shape() {
        let raw: RawPlat = serde_json::from_value(json!({
            "ID_Plat": "12",
            "Nama_Plat": "Plat Baja",
            "Lot_Batch_Number": "LOT-001",
            "Qty": 40,
            "ID_Lokasi": 3,
            "Status": "Unavailable"
        }))
        .unwrap();

        let plat = plat(raw).unwrap();
        assert_eq!(plat.id, 12);
        assert_eq!(plat.jumlah, 40);
        assert_eq!(plat.lokasi_id, 3);
        assert_eq!(plat.status, PlatStatus::Unavailable);
    }

    #[test]
    fn test_lokasi_with_string_coordinates() {
        let raw: RawLokasi = serde_json::from_value(json!({
            "id": 1, "nama": "Gudang A", "latitude": "-6.123456", "longitude": 106.8
        }))
        .unwrap();
        let lokasi = lokasi(raw).unwrap();
        assert_eq!(lokasi.latitude, -6.123456);
        assert_eq!(lokasi.longitude, 106.8);
    }

    #[test]
    fn test_distribusi_rejects_unknown_status() {
        let raw: RawDistribusi = serde_json::from_value(json!({
            "id": 1, "plat_id": 1, "lokasi_id": 2, "user_id": 3,
            "jumlah": 5, "status": "selesai"
        }))
        .unwrap();
        let err = distribusi(raw).unwrap_err();
        assert_eq!(err.kind(), crate::error::ClientErrorKind::Decode);
    }

    #[test]
    fn test_distribusi_with_destination_name() {
        let raw: RawDistribusi = serde_json::from_value(json!({
            "ID_Distribusi": 1, "ID_Plat": 2, "ID_Lokasi": 3, "lokasi_tujuan": "Gudang A",
            "ID_User": 4, "Jumlah": 5, "Status": "terdistribusi"
        }))
        .unwrap();
        let record = distribusi(raw).unwrap();
        assert_eq!(record.lokasi_id, 3);
        assert_eq!(record.lokasi_nama.as_deref(), Some("Gudang A"));
        assert_eq!(record.status, DistribusiStatus::Terdistribusi);
    }

    #[test]
    fn test_user_shapes() {
        let a: RawUser =
            serde_json::from_value(json!({ "ID_User": 4, "Username": "budi", "Role": 2 })).unwrap();
        let b: RawUser =
            serde_json::from_value(json!({ "id": "5", "nama": "sari", "role": "admin" })).unwrap();
        let c: RawUser =
            serde_json::from_value(json!({ "id": 6, "username": "x", "role": 9 })).unwrap();

        assert_eq!(user(a).unwrap().unwrap().role, Role::User);
        assert_eq!(user(b).unwrap().unwrap().id, 5);
        assert!(user(c).unwrap().is_none());
    }

    #[test]
    fn test_list_body_shapes() {
        let bare: ListBody<RawLokasi> = serde_json::from_value(json!([])).unwrap();
        let wrapped: ListBody<RawLokasi> = serde_json::from_value(json!({
            "data": [{ "id": 1, "nama": "G", "latitude": 0, "longitude": 0 }]
        }))
        .unwrap();
        assert!(bare.into_vec().is_empty());
        assert_eq!(wrapped.into_vec().len(), 1);
    }
}
