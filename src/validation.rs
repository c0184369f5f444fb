//! 表单校验
//!
//! 校验在发出任何请求之前完成，失败时返回逐字段的提示信息。
//! 单个字段的规则返回 `validator::ValidationError`，表单级别汇总为
//! `ValidationErrors` 再转换为视图使用的 `FieldErrors`。

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use platdist_shared::{CreateDistribusiRequest, Id, LokasiPayload, PlatPayload, PlatStatus};
use regex::Regex;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use crate::error::ClientError;

static COORDINATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("coordinate pattern is valid"));

// =========================================================
// 错误类型
// =========================================================

/// 字段名 -> 提示信息（每个字段只保留第一条）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = BTreeMap::new();
        for (field, errs) in errors.field_errors().iter() {
            if let Some(first) = errs.first() {
                let message = first
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                fields.insert(field.to_string(), message);
            }
        }
        FieldErrors(fields)
    }
}

/// 表单提交的结果错误
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// 校验未通过，没有发出请求
    #[error("Periksa kembali isian formulir")]
    Invalid(FieldErrors),
    /// 请求失败
    #[error("{}", .0.message())]
    Failed(ClientError),
}

impl From<ClientError> for SubmitError {
    fn from(err: ClientError) -> Self {
        SubmitError::Failed(err)
    }
}

impl From<FieldErrors> for SubmitError {
    fn from(errors: FieldErrors) -> Self {
        SubmitError::Invalid(errors)
    }
}

// =========================================================
// 字段规则
// =========================================================

fn rule(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn required<'a>(value: &'a str, message: &'static str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(rule("required", message))
    } else {
        Ok(trimmed)
    }
}

/// 下拉框选中的记录 id
fn selected_id(value: &str, missing: &'static str) -> Result<Id, ValidationError> {
    let value = required(value, missing)?;
    value
        .parse::<Id>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| rule("invalid_id", missing))
}

/// 正整数数量
pub fn validate_quantity(value: &str) -> Result<u32, ValidationError> {
    let value = required(value, "Jumlah wajib diisi")?;
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(rule("positive_integer", "Jumlah harus berupa bilangan bulat positif")),
    }
}

/// 非负整数库存
fn validate_stock(value: &str) -> Result<u32, ValidationError> {
    let value = required(value, "Jumlah wajib diisi")?;
    value
        .parse::<u32>()
        .map_err(|_| rule("non_negative_integer", "Jumlah harus berupa bilangan bulat"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn limit(&self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Axis::Latitude => "Latitude",
            Axis::Longitude => "Longitude",
        }
    }
}

/// 坐标：必填、带符号的小数格式、范围检查
pub fn validate_coordinate(value: &str, axis: Axis) -> Result<f64, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(rule("required", format!("{} wajib diisi", axis.label())));
    }
    if !COORDINATE_PATTERN.is_match(value) {
        return Err(rule(
            "coordinate_format",
            format!("{} harus berupa angka desimal, contoh -6.123456", axis.label()),
        ));
    }
    let parsed: f64 = value
        .parse()
        .map_err(|_| rule("coordinate_format", format!("{} tidak valid", axis.label())))?;
    if parsed.abs() > axis.limit() {
        return Err(rule(
            "coordinate_range",
            format!(
                "{} harus di antara -{} dan {}",
                axis.label(),
                axis.limit(),
                axis.limit()
            ),
        ));
    }
    Ok(parsed)
}

/// 收集单个字段的结果
fn check<T>(errors: &mut ValidationErrors, field: &'static str, result: Result<T, ValidationError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            errors.add(field, err);
            None
        }
    }
}

// =========================================================
// 分发申请表单
// =========================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistribusiForm {
    pub plat_id: String,
    pub lokasi_id: String,
    pub user_id: String,
    pub jumlah: String,
}

impl DistribusiForm {
    /// 普通用户提交时申请人固定为本人
    pub fn for_user(user_id: Id) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Self::default()
        }
    }
}

pub fn validate_distribusi_form(form: &DistribusiForm) -> Result<CreateDistribusiRequest, FieldErrors> {
    let mut errors = ValidationErrors::new();
    let plat_id = check(&mut errors, "plat_id", selected_id(&form.plat_id, "Plat wajib dipilih"));
    let lokasi_id = check(
        &mut errors,
        "lokasi_id",
        selected_id(&form.lokasi_id, "Lokasi tujuan wajib dipilih"),
    );
    let user_id = check(&mut errors, "user_id", selected_id(&form.user_id, "Pemohon wajib dipilih"));
    let jumlah = check(&mut errors, "jumlah", validate_quantity(&form.jumlah));

    match (plat_id, lokasi_id, user_id, jumlah) {
        (Some(plat_id), Some(lokasi_id), Some(user_id), Some(jumlah)) => Ok(CreateDistribusiRequest {
            plat_id,
            lokasi_id,
            user_id,
            jumlah,
        }),
        _ => Err(errors.into()),
    }
}

// =========================================================
// 仓库位置表单
// =========================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LokasiForm {
    pub nama: String,
    pub latitude: String,
    pub longitude: String,
}

pub fn validate_lokasi_form(form: &LokasiForm) -> Result<LokasiPayload, FieldErrors> {
    let mut errors = ValidationErrors::new();
    let nama = check(&mut errors, "nama", required(&form.nama, "Nama lokasi wajib diisi"));
    let latitude = check(&mut errors, "latitude", validate_coordinate(&form.latitude, Axis::Latitude));
    let longitude = check(
        &mut errors,
        "longitude",
        validate_coordinate(&form.longitude, Axis::Longitude),
    );

    match (nama, latitude, longitude) {
        (Some(nama), Some(latitude), Some(longitude)) => Ok(LokasiPayload {
            nama: nama.to_string(),
            latitude,
            longitude,
        }),
        _ => Err(errors.into()),
    }
}

// =========================================================
// 物品表单
// =========================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatForm {
    pub nama: String,
    pub lot: String,
    pub jumlah: String,
    pub lokasi_id: String,
    pub status: String,
}

pub fn validate_plat_form(form: &PlatForm) -> Result<PlatPayload, FieldErrors> {
    let mut errors = ValidationErrors::new();
    let nama = check(&mut errors, "nama", required(&form.nama, "Nama plat wajib diisi"));
    let lot = check(&mut errors, "lot", required(&form.lot, "Nomor lot wajib diisi"));
    let jumlah = check(&mut errors, "jumlah", validate_stock(&form.jumlah));
    let lokasi_id = check(&mut errors, "lokasi_id", selected_id(&form.lokasi_id, "Lokasi wajib dipilih"));
    let status = check(
        &mut errors,
        "status",
        required(&form.status, "Status wajib dipilih").and_then(|s| {
            PlatStatus::parse(s).ok_or_else(|| rule("status", "Status harus Ready atau Unavailable"))
        }),
    );

    match (nama, lot, jumlah, lokasi_id, status) {
        (Some(nama), Some(lot), Some(jumlah), Some(lokasi_id), Some(status)) => Ok(PlatPayload {
            nama: nama.to_string(),
            lot: lot.to_string(),
            jumlah,
            lokasi_id,
            status,
        }),
        _ => Err(errors.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> DistribusiForm {
        DistribusiForm {
            plat_id: "1".into(),
            lokasi_id: "2".into(),
            user_id: "3".into(),
            jumlah: "5".into(),
        }
    }

    #[test]
    fn test_empty_distribusi_form_reports_every_field() {
        let errors = validate_distribusi_form(&DistribusiForm::default()).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("plat_id"), Some("Plat wajib dipilih"));
        assert_eq!(errors.get("lokasi_id"), Some("Lokasi tujuan wajib dipilih"));
        assert_eq!(errors.get("user_id"), Some("Pemohon wajib dipilih"));
        assert_eq!(errors.get("jumlah"), Some("Jumlah wajib diisi"));
    }

    #[test]
    fn test_quantity_rules() {
        for bad in ["0", "abc", "-2", "1.5"] {
            let form = DistribusiForm {
                jumlah: bad.into(),
                ..filled()
            };
            let errors = validate_distribusi_form(&form).unwrap_err();
            assert_eq!(
                errors.get("jumlah"),
                Some("Jumlah harus berupa bilangan bulat positif"),
                "input {:?}",
                bad
            );
        }

        let req = validate_distribusi_form(&filled()).unwrap();
        assert_eq!(req.jumlah, 5);
        assert_eq!(req.user_id, 3);
    }

    #[test]
    fn test_for_user_prefills_requester() {
        let form = DistribusiForm::for_user(9);
        let errors = validate_distribusi_form(&form).unwrap_err();
        assert!(errors.get("user_id").is_none());
    }

    #[test]
    fn test_coordinate_rules() {
        assert_eq!(validate_coordinate("-6.123456", Axis::Latitude).unwrap(), -6.123456);
        assert_eq!(validate_coordinate("abc", Axis::Latitude).unwrap_err().code, "coordinate_format");
        assert_eq!(validate_coordinate("", Axis::Latitude).unwrap_err().code, "required");
        assert_eq!(validate_coordinate("91", Axis::Latitude).unwrap_err().code, "coordinate_range");
        assert!(validate_coordinate("179.5", Axis::Longitude).is_ok());
    }

    #[test]
    fn test_lokasi_form() {
        let form = LokasiForm {
            nama: "Gudang Cikarang".into(),
            latitude: "-6.3".into(),
            longitude: "abc".into(),
        };
        let errors = validate_lokasi_form(&form).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.get("longitude").is_some());

        let payload = validate_lokasi_form(&LokasiForm {
            longitude: "107.1".into(),
            ..form
        })
        .unwrap();
        assert_eq!(payload.longitude, 107.1);
    }

    #[test]
    fn test_plat_form_allows_zero_stock() {
        let form = PlatForm {
            nama: "Plat Baja".into(),
            lot: "LOT-01".into(),
            jumlah: "0".into(),
            lokasi_id: "1".into(),
            status: "Ready".into(),
        };
        let payload = validate_plat_form(&form).unwrap();
        assert_eq!(payload.jumlah, 0);
        assert_eq!(payload.status, PlatStatus::Ready);

        let errors = validate_plat_form(&PlatForm {
            status: "rusak".into(),
            ..form
        })
        .unwrap_err();
        assert_eq!(errors.get("status"), Some("Status harus Ready atau Unavailable"));
    }
}
