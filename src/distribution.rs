//! 分发申请视图模型
//!
//! 持有某个范围（管理员看全部，普通用户只看自己的）内分发申请的本地副本，
//! 并协调新建与状态迁移。统计数据全部由当前列表即时计算，不单独维护计数器。

use std::cell::RefCell;

use platdist_shared::{Distribusi, DistribusiStatus, Id, MonthKey};
use tracing::{debug, info, warn};

use crate::api::PlatApi;
use crate::error::{ClientError, ClientResult};
use crate::request::HttpClient;
use crate::retry::{RetryPolicy, Timer};
use crate::validation::{DistribusiForm, SubmitError, validate_distribusi_form};

#[cfg(test)]
mod tests;

/// 列表范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// 管理员：全部申请
    All,
    /// 普通用户：本人提交的申请
    User(Id),
}

#[derive(Debug, Default)]
struct ListState {
    records: Vec<Distribusi>,
    /// 每次发起 `list` 递增，用于丢弃过期的响应
    generation: u64,
    loading: bool,
    last_error: Option<ClientError>,
}

pub struct DistribusiViewModel<C, T> {
    api: PlatApi<C>,
    timer: T,
    policy: RetryPolicy,
    scope: Scope,
    state: RefCell<ListState>,
}

impl<C: HttpClient, T: Timer> DistribusiViewModel<C, T> {
    pub fn new(api: PlatApi<C>, timer: T, policy: RetryPolicy, scope: Scope) -> Self {
        Self {
            api,
            timer,
            policy,
            scope,
            state: RefCell::new(ListState::default()),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// 当前列表快照
    pub fn records(&self) -> Vec<Distribusi> {
        self.state.borrow().records.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn last_error(&self) -> Option<ClientError> {
        self.state.borrow().last_error.clone()
    }

    async fn fetch_scope(&self) -> ClientResult<Vec<Distribusi>> {
        match self.scope {
            Scope::All => self.api.list_distribusi().await,
            Scope::User(user_id) => self.api.list_distribusi_for_user(user_id).await,
        }
    }

    /// 重新拉取列表
    ///
    /// 超时类错误按策略重试，其余错误直接返回。失败时保留旧数据。
    /// 若期间又发起了新的 `list`，本次结果被丢弃。
    pub async fn list(&self) -> ClientResult<()> {
        let generation = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.loading = true;
            state.generation
        };

        let result = self
            .policy
            .run(&self.timer, "distribusi.list", || self.fetch_scope())
            .await;

        let mut state = self.state.borrow_mut();
        if state.generation != generation {
            debug!(generation, current = state.generation, "discarding stale distribusi list");
            return result.map(|_| ());
        }
        state.loading = false;

        match result {
            Ok(records) => {
                debug!(count = records.len(), "distribusi list refreshed");
                state.records = records;
                state.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!("distribusi list failed: {}", err);
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// 提交新的申请
    ///
    /// 校验失败时不发请求。成功后等待列表刷新完成再返回；
    /// 刷新本身失败不影响提交结果，错误保留在 `last_error`。
    pub async fn create(&self, form: &DistribusiForm) -> Result<(), SubmitError> {
        let mut req = validate_distribusi_form(form)?;
        if let Scope::User(user_id) = self.scope {
            req.user_id = user_id;
        }

        self.api
            .create_distribusi(req)
            .await
            .map_err(|e| e.in_op("distribusi.create"))?;
        info!("distribusi created");

        if let Err(err) = self.list().await {
            warn!("refresh after create failed: {}", err);
        }
        Ok(())
    }

    /// 当前会话可对该记录执行的状态迁移
    pub fn available_transitions(&self, record: &Distribusi) -> &'static [DistribusiStatus] {
        match self.scope {
            Scope::All => record.status.allowed_transitions(),
            Scope::User(_) => &[],
        }
    }

    /// 管理员审批/驳回
    pub async fn set_status(&self, id: Id, next: DistribusiStatus) -> ClientResult<()> {
        const OP: &str = "distribusi.set_status";

        if let Scope::User(_) = self.scope {
            return Err(ClientError::forbidden("Hanya admin yang dapat mengubah status").in_op(OP));
        }

        let current = self
            .state
            .borrow()
            .records
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.status);
        let current = match current {
            Some(status) => status,
            None => {
                return Err(ClientError::not_found(format!("Distribusi #{} tidak ditemukan", id)).in_op(OP));
            }
        };

        if !current.can_transition_to(next) {
            return Err(ClientError::invalid_transition(format!(
                "Status {} tidak dapat diubah menjadi {}",
                current.label(),
                next.label()
            ))
            .in_op(OP));
        }

        self.api
            .update_distribusi_status(id, next)
            .await
            .map_err(|e| e.in_op(OP))?;
        info!(id, from = %current, to = %next, "distribusi status changed");

        if let Err(err) = self.list().await {
            warn!("refresh after status change failed: {}", err);
        }
        Ok(())
    }

    pub fn stats(&self) -> DistribusiStats {
        stats(&self.state.borrow().records)
    }

    pub fn monthly(&self, year: i32) -> Vec<MonthlyFlow> {
        monthly(&self.state.borrow().records, year)
    }

    pub fn filtered(&self, filter: &DistribusiFilter) -> Vec<Distribusi> {
        filtered(&self.state.borrow().records, filter)
    }
}

// =========================================================
// 派生数据（纯函数）
// =========================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistribusiStats {
    pub pending: usize,
    pub diproses: usize,
    pub terdistribusi: usize,
    pub disetujui: usize,
    pub ditolak: usize,
}

impl DistribusiStats {
    pub fn count(&self, status: DistribusiStatus) -> usize {
        match status {
            DistribusiStatus::Pending => self.pending,
            DistribusiStatus::Diproses => self.diproses,
            DistribusiStatus::Terdistribusi => self.terdistribusi,
            DistribusiStatus::Disetujui => self.disetujui,
            DistribusiStatus::Ditolak => self.ditolak,
        }
    }

    pub fn total(&self) -> usize {
        DistribusiStatus::ALL.iter().map(|s| self.count(*s)).sum()
    }
}

pub fn stats(records: &[Distribusi]) -> DistribusiStats {
    let mut stats = DistribusiStats::default();
    for record in records {
        let slot = match record.status {
            DistribusiStatus::Pending => &mut stats.pending,
            DistribusiStatus::Diproses => &mut stats.diproses,
            DistribusiStatus::Terdistribusi => &mut stats.terdistribusi,
            DistribusiStatus::Disetujui => &mut stats.disetujui,
            DistribusiStatus::Ditolak => &mut stats.ditolak,
        };
        *slot += 1;
    }
    stats
}

/// 某月的入库/出库数量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyFlow {
    pub month: MonthKey,
    pub masuk: u64,
    pub keluar: u64,
}

/// 按月汇总，固定返回 12 个月
///
/// masuk 为当月创建的申请数量之和；keluar 只计入已分发或已批准的申请。
/// 没有时间的记录不计入。
pub fn monthly(records: &[Distribusi], year: i32) -> Vec<MonthlyFlow> {
    let mut buckets: Vec<MonthlyFlow> = (1..=12)
        .map(|month| MonthlyFlow {
            month: MonthKey { year, month },
            masuk: 0,
            keluar: 0,
        })
        .collect();

    for record in records {
        let key = match &record.tanggal {
            Some(ts) => ts.month_key(),
            None => continue,
        };
        if key.year != year {
            continue;
        }
        let bucket = &mut buckets[(key.month - 1) as usize];
        bucket.masuk += u64::from(record.jumlah);
        if record.status.counts_as_outgoing() {
            bucket.keluar += u64::from(record.jumlah);
        }
    }
    buckets
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistribusiFilter {
    pub status: Option<DistribusiStatus>,
    /// 匹配物品名、批次号、目的地与申请人，不区分大小写
    pub query: String,
}

pub fn filtered(records: &[Distribusi], filter: &DistribusiFilter) -> Vec<Distribusi> {
    let query = filter.query.trim().to_lowercase();
    records
        .iter()
        .filter(|r| filter.status.is_none_or(|s| r.status == s))
        .filter(|r| {
            query.is_empty()
                || [&r.plat_nama, &r.lot, &r.lokasi_nama, &r.username]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&query))
        })
        .cloned()
        .collect()
}
