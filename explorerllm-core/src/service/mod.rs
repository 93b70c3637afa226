// 模块声明
mod controller;
mod types;

// 重新导出公共API
pub use controller::{ServiceController, classify, parse_ps_output};
pub use types::{ComposeFlavor, ContainerEntry, Readiness, ServiceState};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Executor;
    use crate::testing::FakeDocker;
    use std::sync::Arc;
    use std::time::Duration;

    fn controller(fake: &Arc<FakeDocker>, dry_run: bool) -> ServiceController {
        ServiceController::new(
            Executor::new(fake.clone(), dry_run),
            None,
            "/srv/explorerllm/docker-compose.yml",
            "explorerllm",
            "ollama",
        )
    }

    #[tokio::test]
    async fn test_status_follows_stop_and_start() {
        let fake = Arc::new(FakeDocker::new());
        fake.set_running(true);
        let services = controller(&fake, false);

        services.detect_compose().await.unwrap();
        assert_eq!(services.status().await, ServiceState::Running);

        services.stop().await.unwrap();
        assert_eq!(services.status().await, ServiceState::Stopped);

        services.start().await.unwrap();
        assert_eq!(services.status().await, ServiceState::Running);
    }

    #[tokio::test]
    async fn test_stop_is_noop_under_dry_run() {
        let fake = Arc::new(FakeDocker::new());
        fake.set_running(true);
        let services = controller(&fake, true);

        services.stop().await.unwrap();
        assert!(fake.is_running());
        assert!(fake.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_standalone_compose() {
        let fake = Arc::new(FakeDocker::new());
        fake.disable_compose_plugin();
        let services = controller(&fake, false);

        assert_eq!(
            services.detect_compose().await.unwrap(),
            ComposeFlavor::Standalone
        );
        services.start().await.unwrap();
        let last = fake.calls().pop().unwrap();
        assert_eq!(last.program, "docker-compose");
    }

    #[tokio::test]
    async fn test_missing_compose_is_missing_dependency() {
        let fake = Arc::new(FakeDocker::new());
        fake.disable_compose_plugin();
        fake.set_missing("docker-compose");
        let services = controller(&fake, false);

        let err = services.detect_compose().await.unwrap_err();
        assert!(matches!(err, crate::StackError::MissingDependency(_)));
    }

    #[tokio::test]
    async fn test_wait_reports_failed_to_start() {
        let fake = Arc::new(FakeDocker::new());
        fake.set_containers_exit_on_start(true);
        let services = controller(&fake, false);

        services.start().await.unwrap();
        let readiness = services
            .wait_until_running(Duration::ZERO, Duration::from_millis(10))
            .await;
        assert!(matches!(readiness, Readiness::FailedToStart { .. }));
    }

    #[tokio::test]
    async fn test_wait_reports_ready() {
        let fake = Arc::new(FakeDocker::new());
        let services = controller(&fake, false);

        services.start().await.unwrap();
        let readiness = services
            .wait_until_running(Duration::from_secs(5), Duration::from_millis(10))
            .await;
        assert!(matches!(readiness, Readiness::Ready { .. }));
        assert_eq!(services.model_count().await.unwrap(), 2);
    }
}
