use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub mod date;
pub mod protocol;

pub use date::{MonthKey, Timestamp};

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const BEARER_PREFIX: &str = "Bearer ";

/// 服务端分配的数字主键
pub type Id = i64;

// =========================================================
// 角色 (Role)
// =========================================================

/// 会话角色
///
/// 服务端以数字编码下发：`1` 为管理员，`2` 为普通用户。
/// 本地存储中以字符串形式保存，两种形式反序列化时均可接受。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub const ADMIN_CODE: i64 = 1;
    pub const USER_CODE: i64 = 2;

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            Self::ADMIN_CODE => Some(Role::Admin),
            Self::USER_CODE => Some(Role::User),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Role::Admin => Self::ADMIN_CODE,
            Role::User => Self::USER_CODE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" | "1" => Some(Role::Admin),
            "user" | "2" => Some(Role::User),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(i64),
            Name(String),
        }

        let role = match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Role::from_code(code),
            Repr::Name(name) => Role::parse(&name),
        };
        role.ok_or_else(|| serde::de::Error::custom("unknown role"))
    }
}

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

/// 物品可用状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlatStatus {
    #[default]
    Ready,
    Unavailable,
}

impl PlatStatus {
    pub const ALL: [PlatStatus; 2] = [PlatStatus::Ready, PlatStatus::Unavailable];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatStatus::Ready => "Ready",
            PlatStatus::Unavailable => "Unavailable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ready" | "tersedia" => Some(PlatStatus::Ready),
            "unavailable" | "tidak tersedia" => Some(PlatStatus::Unavailable),
            _ => None,
        }
    }
}

/// 库存物品 (Plat)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plat {
    pub id: Id,
    pub nama: String,
    /// 批次号，业务主键（唯一性由服务端保证）
    pub lot: String,
    pub jumlah: u32,
    pub lokasi_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lokasi_nama: Option<String>,
    pub status: PlatStatus,
}

/// 新增/编辑物品时提交的字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatPayload {
    pub nama: String,
    pub lot: String,
    pub jumlah: u32,
    pub lokasi_id: Id,
    pub status: PlatStatus,
}

/// 仓库/目的地位置 (Lokasi)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lokasi {
    pub id: Id,
    pub nama: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LokasiPayload {
    pub nama: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// 分发请求状态
///
/// 只能向前推进：`pending -> terdistribusi -> {disetujui, ditolak}`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistribusiStatus {
    Pending,
    Diproses,
    Terdistribusi,
    Disetujui,
    Ditolak,
}

impl DistribusiStatus {
    pub const ALL: [DistribusiStatus; 5] = [
        DistribusiStatus::Pending,
        DistribusiStatus::Diproses,
        DistribusiStatus::Terdistribusi,
        DistribusiStatus::Disetujui,
        DistribusiStatus::Ditolak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DistribusiStatus::Pending => "pending",
            DistribusiStatus::Diproses => "diproses",
            DistribusiStatus::Terdistribusi => "terdistribusi",
            DistribusiStatus::Disetujui => "disetujui",
            DistribusiStatus::Ditolak => "ditolak",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DistribusiStatus::Pending => "Pending",
            DistribusiStatus::Diproses => "Diproses",
            DistribusiStatus::Terdistribusi => "Terdistribusi",
            DistribusiStatus::Disetujui => "Disetujui",
            DistribusiStatus::Ditolak => "Ditolak",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// 管理员可执行的状态迁移
    ///
    /// 只有 `terdistribusi` 可以被审批或驳回，其余状态没有出边。
    pub fn allowed_transitions(&self) -> &'static [DistribusiStatus] {
        match self {
            DistribusiStatus::Terdistribusi => {
                &[DistribusiStatus::Disetujui, DistribusiStatus::Ditolak]
            }
            _ => &[],
        }
    }

    pub fn can_transition_to(&self, next: DistribusiStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// 是否计入“出库”统计
    pub fn counts_as_outgoing(&self) -> bool {
        matches!(
            self,
            DistribusiStatus::Terdistribusi | DistribusiStatus::Disetujui
        )
    }
}

impl fmt::Display for DistribusiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分发请求 (Distribusi)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribusi {
    pub id: Id,
    pub plat_id: Id,
    pub lokasi_id: Id,
    pub user_id: Id,
    pub jumlah: u32,
    pub tanggal: Option<Timestamp>,
    pub status: DistribusiStatus,

    // 服务端联表返回的展示字段，可能缺失
    #[serde(default)]
    pub plat_nama: Option<String>,
    #[serde(default)]
    pub lot: Option<String>,
    #[serde(default)]
    pub lokasi_nama: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDistribusiRequest {
    pub plat_id: Id,
    pub lokasi_id: Id,
    pub user_id: Id,
    pub jumlah: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Id,
    pub username: String,
    pub role: Role,
}

// =========================================================
// 认证载荷
// =========================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// 数字角色编码
    pub role: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_accepts_codes_and_names() {
        let admin: Role = serde_json::from_str("1").unwrap();
        let user: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(admin, Role::Admin);
        assert_eq!(user, Role::User);
        assert!(serde_json::from_str::<Role>("3").is_err());
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn test_only_terdistribusi_has_transitions() {
        for status in DistribusiStatus::ALL {
            let allowed = status.allowed_transitions();
            if status == DistribusiStatus::Terdistribusi {
                assert_eq!(
                    allowed,
                    &[DistribusiStatus::Disetujui, DistribusiStatus::Ditolak]
                );
            } else {
                assert!(allowed.is_empty(), "{status} should be terminal for admins");
            }
        }
        assert!(!DistribusiStatus::Pending.can_transition_to(DistribusiStatus::Disetujui));
        assert!(!DistribusiStatus::Disetujui.can_transition_to(DistribusiStatus::Ditolak));
    }

    #[test]
    fn test_status_wire_format() {
        let status: DistribusiStatus = serde_json::from_str("\"terdistribusi\"").unwrap();
        assert_eq!(status, DistribusiStatus::Terdistribusi);
        assert_eq!(DistribusiStatus::parse(" Ditolak "), Some(DistribusiStatus::Ditolak));
        assert_eq!(DistribusiStatus::parse("selesai"), None);
    }
}
