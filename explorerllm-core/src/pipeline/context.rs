use super::types::{
    HealthCheckWarning, PipelineKind, PipelineOptions, PipelineReport, PipelineState,
    PipelineWarning,
};
use crate::StackError;
use crate::backup_set::BackupSet;
use crate::process::Executor;
use tracing::{error, info, warn};

/// 单次流水线运行的上下文：状态、警告和运行选项都在这里，不用全局变量
#[derive(Debug)]
pub(crate) struct PipelineContext {
    pub executor: Executor,
    pub options: PipelineOptions,
    kind: PipelineKind,
    state: PipelineState,
    transitions: Vec<(PipelineState, PipelineState)>,
    warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(kind: PipelineKind, executor: Executor, options: PipelineOptions) -> Self {
        info!(
            "🚀 开始{}流程{}",
            kind.display_name(),
            if options.dry_run { " [DRY RUN]" } else { "" }
        );
        Self {
            executor,
            options,
            kind,
            state: PipelineState::Init,
            transitions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// 推进到下一个状态；每次转换输出一行日志
    pub fn advance(&mut self, next: PipelineState) {
        debug_assert!(next > self.state, "状态只能向前推进");
        info!("状态: {} → {}", self.state, next);
        self.transitions.push((self.state, next));
        self.state = next;
    }

    /// 记录失败，保留原错误
    pub fn fail(&mut self, err: StackError) -> StackError {
        error!(
            "❌ {}流程在 {} 阶段失败: {}",
            self.kind.display_name(),
            self.state,
            err
        );
        self.transitions.push((self.state, PipelineState::Failed));
        self.state = PipelineState::Failed;
        err
    }

    pub fn warn(&mut self, warning: impl Into<PipelineWarning>) {
        let warning = warning.into();
        warn!("⚠️  {}", warning);
        self.warnings.push(warning);
    }

    pub fn warn_health(&mut self, warning: HealthCheckWarning) {
        self.warn(PipelineWarning::Health(warning));
    }

    /// 合并子流水线（迁移中的备份/恢复）的警告
    pub fn absorb(&mut self, report: &PipelineReport) {
        self.warnings.extend(report.warnings.iter().cloned());
    }

    pub fn finish(mut self, backup_set: Option<BackupSet>) -> PipelineReport {
        self.advance(PipelineState::Done);
        info!(
            "✅ {}流程完成{}",
            self.kind.display_name(),
            if self.warnings.is_empty() {
                String::new()
            } else {
                format!("，{} 条警告", self.warnings.len())
            }
        );
        PipelineReport {
            kind: self.kind,
            final_state: self.state,
            transitions: self.transitions,
            backup_set,
            warnings: self.warnings,
            dry_run: self.options.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDocker;
    use std::sync::Arc;

    #[test]
    fn test_transitions_are_recorded_in_order() {
        let executor = Executor::new(Arc::new(FakeDocker::new()), false);
        let mut ctx = PipelineContext::new(PipelineKind::Restore, executor, PipelineOptions::default());
        ctx.advance(PipelineState::Validated);
        ctx.advance(PipelineState::ServicesQuiesced);
        ctx.warn(PipelineWarning::VolumesNotMigrated);

        let report = ctx.finish(None);
        assert!(report.succeeded());
        assert_eq!(
            report.transitions,
            vec![
                (PipelineState::Init, PipelineState::Validated),
                (PipelineState::Validated, PipelineState::ServicesQuiesced),
                (PipelineState::ServicesQuiesced, PipelineState::Done),
            ]
        );
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_failure_keeps_original_error() {
        let executor = Executor::new(Arc::new(FakeDocker::new()), false);
        let mut ctx = PipelineContext::new(PipelineKind::Backup, executor, PipelineOptions::default());
        ctx.advance(PipelineState::Validated);

        let err = ctx.fail(StackError::transfer("boom"));
        assert!(matches!(err, StackError::Transfer(_)));
        assert_eq!(ctx.state, PipelineState::Failed);
    }
}
