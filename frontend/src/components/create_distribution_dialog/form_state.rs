//! 表单状态管理模块
//!
//! 将零散的 signal 整合为 `FormState` 结构体，负责：
//! - 数据的持有与重置
//! - 字段错误的展示
//! - 数据到 `DistribusiForm` 的转换

use leptos::prelude::*;
use platdist::Scope;
use platdist::validation::{DistribusiForm, FieldErrors};

/// 表单状态结构体
///
/// 使用 `RwSignal` 因为它实现了 `Copy` trait，适合作为 Props 在组件间传递。
#[derive(Clone, Copy)]
pub struct FormState {
    pub plat_id: RwSignal<String>,
    pub lokasi_id: RwSignal<String>,
    pub user_id: RwSignal<String>,
    pub jumlah: RwSignal<String>,
    pub errors: RwSignal<FieldErrors>,
}

impl FormState {
    pub fn new() -> Self {
        Self {
            plat_id: RwSignal::new(String::new()),
            lokasi_id: RwSignal::new(String::new()),
            user_id: RwSignal::new(String::new()),
            jumlah: RwSignal::new(String::new()),
            errors: RwSignal::new(FieldErrors::default()),
        }
    }

    pub fn reset(&self) {
        self.plat_id.set(String::new());
        self.lokasi_id.set(String::new());
        self.user_id.set(String::new());
        self.jumlah.set(String::new());
        self.errors.set(FieldErrors::default());
    }

    /// 某字段的错误信息（响应式）
    pub fn error(&self, field: &'static str) -> impl Fn() -> Option<String> + Send + Sync + 'static + use<> {
        let errors = self.errors;
        move || errors.with(|e| e.get(field).map(str::to_string))
    }

    /// 普通用户只能以自己的身份提交
    pub fn to_form(&self, scope: Scope) -> DistribusiForm {
        let user_id = match scope {
            Scope::User(id) => id.to_string(),
            Scope::All => self.user_id.get_untracked(),
        };
        DistribusiForm {
            plat_id: self.plat_id.get_untracked(),
            lokasi_id: self.lokasi_id.get_untracked(),
            user_id,
            jumlah: self.jumlah.get_untracked(),
        }
    }
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}
