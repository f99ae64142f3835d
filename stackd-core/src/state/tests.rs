#[cfg(test)]
mod tests {
    use crate::error::StackdError;
    use crate::state::StateManager;
    use crate::types::{Deployment, DeploymentStatus, ResourceHandle};
    use indexmap::IndexMap;
    use serde_json::json;
    use std::time::SystemTime;

    fn sample_deployment(id: &str) -> Deployment {
        let mut variables = IndexMap::new();
        variables.insert("db_user".to_string(), json!("postgres"));
        variables.insert("db_password".to_string(), json!("s3cr3t-literal"));

        Deployment {
            id: id.to_string(),
            stack_id: "tpl-postgres".to_string(),
            stack_name: "postgres".to_string(),
            stack_version: "1.0.0".to_string(),
            target_id: "target-1".to_string(),
            target_kind: "docker".to_string(),
            status: DeploymentStatus::Pending,
            variables,
            configuration: json!({
                "services": { "db": { "image": "postgres:16", "env": { "POSTGRES_USER": "postgres" } } }
            }),
            handles: vec![],
            error_detail: None,
            created_at: SystemTime::now(),
            started_at: None,
            stopped_at: None,
        }
    }

    #[tokio::test]
    async fn test_state_manager_init() {
        let manager = StateManager::new_in_memory().await.unwrap();
        drop(manager);
    }

    #[tokio::test]
    async fn test_insert_and_get_deployment() {
        let manager = StateManager::new_in_memory().await.unwrap();

        let deployment = sample_deployment("dep-test-123");
        manager.insert_deployment(&deployment).await.unwrap();

        let retrieved = manager.get_deployment("dep-test-123").await.unwrap();
        assert_eq!(retrieved.id, deployment.id);
        assert_eq!(retrieved.stack_name, "postgres");
        assert_eq!(retrieved.status, DeploymentStatus::Pending);
        assert_eq!(retrieved.variables, deployment.variables);
        assert_eq!(retrieved.configuration, deployment.configuration);
    }

    #[tokio::test]
    async fn test_stored_variables_are_returned_verbatim() {
        let manager = StateManager::new_in_memory().await.unwrap();

        // Macro-looking text persisted as a variable value must come back
        // exactly as stored, never evaluated.
        let mut deployment = sample_deployment("dep-verbatim");
        deployment
            .variables
            .insert("app_secret".to_string(), json!("{{ generate_password(8) }}"));
        manager.insert_deployment(&deployment).await.unwrap();

        let first = manager.get_deployment("dep-verbatim").await.unwrap();
        let second = manager.get_deployment("dep-verbatim").await.unwrap();
        assert_eq!(first.variables["app_secret"], json!("{{ generate_password(8) }}"));
        assert_eq!(first.variables, second.variables);
    }

    #[tokio::test]
    async fn test_get_deployment_prefix_match() {
        let manager = StateManager::new_in_memory().await.unwrap();

        manager.insert_deployment(&sample_deployment("abcdef-1234")).await.unwrap();

        let retrieved = manager.get_deployment("abc").await.unwrap();
        assert_eq!(retrieved.id, "abcdef-1234");

        // Ambiguous prefix is an error
        manager.insert_deployment(&sample_deployment("abcxyz-5678")).await.unwrap();
        let result = manager.get_deployment("abc").await;
        assert!(matches!(result, Err(StackdError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_get_missing_deployment() {
        let manager = StateManager::new_in_memory().await.unwrap();

        let result = manager.get_deployment("no-such-id").await;
        assert!(matches!(result, Err(StackdError::DeploymentNotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_deployments() {
        let manager = StateManager::new_in_memory().await.unwrap();

        assert_eq!(manager.list_deployments().await.unwrap().len(), 0);

        for i in 1..=2 {
            manager.insert_deployment(&sample_deployment(&format!("dep-{}", i))).await.unwrap();
        }

        let deployments = manager.list_deployments().await.unwrap();
        assert_eq!(deployments.len(), 2);
    }

    #[tokio::test]
    async fn test_status_updates() {
        let manager = StateManager::new_in_memory().await.unwrap();
        manager.insert_deployment(&sample_deployment("dep-status")).await.unwrap();

        manager
            .update_deployment_status("dep-status", DeploymentStatus::Provisioning, None)
            .await
            .unwrap();
        let d = manager.get_deployment("dep-status").await.unwrap();
        assert_eq!(d.status, DeploymentStatus::Provisioning);
        assert!(d.error_detail.is_none());

        manager
            .update_deployment_status(
                "dep-status",
                DeploymentStatus::Failed,
                Some("connector refused"),
            )
            .await
            .unwrap();
        let d = manager.get_deployment("dep-status").await.unwrap();
        assert_eq!(d.status, DeploymentStatus::Failed);
        assert_eq!(d.error_detail.as_deref(), Some("connector refused"));

        // Unknown id is an error, not a silent no-op
        let result = manager
            .update_deployment_status("no-such-id", DeploymentStatus::Failed, None)
            .await;
        assert!(matches!(result, Err(StackdError::DeploymentNotFound { .. })));
    }

    #[tokio::test]
    async fn test_set_running_stores_handles() {
        let manager = StateManager::new_in_memory().await.unwrap();
        manager.insert_deployment(&sample_deployment("dep-run")).await.unwrap();

        let handles = vec![
            ResourceHandle {
                id: "ctr-1".to_string(),
                kind: "container".to_string(),
                detail: Some("db".to_string()),
            },
            ResourceHandle { id: "vol-1".to_string(), kind: "volume".to_string(), detail: None },
        ];
        manager.set_deployment_running("dep-run", &handles).await.unwrap();

        let d = manager.get_deployment("dep-run").await.unwrap();
        assert_eq!(d.status, DeploymentStatus::Running);
        assert_eq!(d.handles, handles);
        assert!(d.started_at.is_some());
    }

    #[tokio::test]
    async fn test_stopped_records_timestamp() {
        let manager = StateManager::new_in_memory().await.unwrap();
        manager.insert_deployment(&sample_deployment("dep-stop")).await.unwrap();

        manager.set_deployment_running("dep-stop", &[]).await.unwrap();
        manager
            .update_deployment_status("dep-stop", DeploymentStatus::Stopped, None)
            .await
            .unwrap();

        let d = manager.get_deployment("dep-stop").await.unwrap();
        assert_eq!(d.status, DeploymentStatus::Stopped);
        assert!(d.stopped_at.is_some());
    }

    #[tokio::test]
    async fn test_persistence_across_sessions() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("stackd-test.db");

        // Session 1: insert and close
        {
            let manager = StateManager::new(&db_path).await.unwrap();
            manager.insert_deployment(&sample_deployment("dep-persist")).await.unwrap();
        }

        // Session 2: reopen and verify
        {
            let manager = StateManager::new(&db_path).await.unwrap();
            let d = manager.get_deployment("dep-persist").await.unwrap();
            assert_eq!(d.stack_name, "postgres");
            assert_eq!(d.variables["db_password"], json!("s3cr3t-literal"));
        }
    }
}
