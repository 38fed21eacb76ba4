// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::default_test_app;
use chrono::Utc;
use harvestrs::domain::models::project::Project;
use harvestrs::domain::models::resource::{ResourceSeed, ResourceStatus};
use harvestrs::domain::repositories::project_repository::ProjectRepository;
use harvestrs::domain::repositories::resource_repository::{ResourceQuery, ResourceRepository};
use std::collections::HashSet;
use uuid::Uuid;

fn seeds(urls: &[&str]) -> Vec<ResourceSeed> {
    urls.iter()
        .map(|url| ResourceSeed {
            url: url.to_string(),
            depth: 0,
        })
        .collect()
}

/// 测试批量插入的幂等性
///
/// 重复URL（批内与跨批）为无操作，返回值只计实际新增
#[tokio::test]
async fn test_batch_insert_idempotent() {
    let app = default_test_app().await;
    let project = app
        .projects
        .create(&Project::new("queue", "http://a.test/", vec![]).unwrap())
        .await
        .unwrap();

    let inserted = app
        .resources
        .batch_insert(
            project.id,
            &seeds(&["http://a.test/x", "http://a.test/y", "http://a.test/x"]),
            100,
        )
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    // 重新插入同一批URL为无操作
    let inserted = app
        .resources
        .batch_insert(
            project.id,
            &seeds(&["http://a.test/x", "http://a.test/z"]),
            100,
        )
        .await
        .unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(app.resources.count(project.id).await.unwrap(), 3);
}

/// 测试无效URL在批量插入时静默跳过
#[tokio::test]
async fn test_batch_insert_skips_invalid_urls() {
    let app = default_test_app().await;
    let project = app
        .projects
        .create(&Project::new("queue", "http://a.test/", vec![]).unwrap())
        .await
        .unwrap();

    let inserted = app
        .resources
        .batch_insert(
            project.id,
            &seeds(&["not a url", "http://a.test/ok", ""]),
            100,
        )
        .await
        .unwrap();
    assert_eq!(inserted, 1);
}

/// 测试URL规范化后的等价性去重
///
/// 大小写、尾斜杠、fragment的差异归一到同一资源
#[tokio::test]
async fn test_batch_insert_normalizes_before_dedupe() {
    let app = default_test_app().await;
    let project = app
        .projects
        .create(&Project::new("queue", "http://a.test/", vec![]).unwrap())
        .await
        .unwrap();

    let inserted = app
        .resources
        .batch_insert(
            project.id,
            &seeds(&[
                "HTTP://A.Test",
                "http://a.test/",
                "http://a.test#section",
            ]),
            100,
        )
        .await
        .unwrap();
    assert_eq!(inserted, 1);
}

/// 测试资源认领的独占性
///
/// 每个资源至多被认领一次，队列排空后返回None
#[tokio::test]
async fn test_claim_next_is_exclusive() {
    let app = default_test_app().await;
    let project = app
        .projects
        .create(&Project::new("queue", "http://a.test/", vec![]).unwrap())
        .await
        .unwrap();

    app.resources
        .batch_insert(
            project.id,
            &seeds(&["http://a.test/1", "http://a.test/2", "http://a.test/3"]),
            100,
        )
        .await
        .unwrap();

    // 多个工作单元并发认领
    let mut handles = Vec::new();
    for _ in 0..4 {
        let resources = app.resources.clone();
        let project_id = project.id;
        handles.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            while let Some(resource) = resources
                .claim_next(project_id, Uuid::new_v4())
                .await
                .unwrap()
            {
                claimed.push(resource.id);
            }
            claimed
        }));
    }

    let mut all: Vec<Uuid> = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }

    let unique: HashSet<&Uuid> = all.iter().collect();
    assert_eq!(all.len(), 3, "each resource claimed exactly once");
    assert_eq!(unique.len(), 3);
    assert_eq!(
        app.resources
            .count_by_status(project.id, ResourceStatus::InProgress)
            .await
            .unwrap(),
        3
    );
}

/// 测试计划时间过滤
///
/// 退避到未来的资源在到期前不可认领
#[tokio::test]
async fn test_claim_next_honors_scheduled_at() {
    let app = default_test_app().await;
    let project = app
        .projects
        .create(&Project::new("queue", "http://a.test/", vec![]).unwrap())
        .await
        .unwrap();

    app.resources
        .batch_insert(project.id, &seeds(&["http://a.test/later"]), 100)
        .await
        .unwrap();

    // 认领后重新入队并退避一小时
    let claimed = app
        .resources
        .claim_next(project.id, Uuid::new_v4())
        .await
        .unwrap()
        .unwrap();
    let requeued = claimed
        .requeue("flaky", Utc::now() + chrono::Duration::hours(1))
        .unwrap();
    app.resources.save(&requeued).await.unwrap();

    assert!(app
        .resources
        .claim_next(project.id, Uuid::new_v4())
        .await
        .unwrap()
        .is_none());
}

/// 测试退还认领
///
/// 资源回到Pending且尝试计数不变
#[tokio::test]
async fn test_release_claim_undoes_attempt() {
    let app = default_test_app().await;
    let project = app
        .projects
        .create(&Project::new("queue", "http://a.test/", vec![]).unwrap())
        .await
        .unwrap();

    app.resources
        .batch_insert(project.id, &seeds(&["http://a.test/x"]), 100)
        .await
        .unwrap();

    let worker = Uuid::new_v4();
    let claimed = app
        .resources
        .claim_next(project.id, worker)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.attempt_count, 1);

    app.resources.release_claim(claimed.id, worker).await.unwrap();

    let released = app
        .resources
        .find_by_id(claimed.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(released.status, ResourceStatus::Pending);
    assert_eq!(released.attempt_count, 0);
    assert!(released.lock_token.is_none());
}

/// 测试崩溃恢复
///
/// 遗留的InProgress资源整体重置回Pending
#[tokio::test]
async fn test_reset_in_progress() {
    let app = default_test_app().await;
    let project = app
        .projects
        .create(&Project::new("queue", "http://a.test/", vec![]).unwrap())
        .await
        .unwrap();

    app.resources
        .batch_insert(
            project.id,
            &seeds(&["http://a.test/1", "http://a.test/2"]),
            100,
        )
        .await
        .unwrap();
    app.resources
        .claim_next(project.id, Uuid::new_v4())
        .await
        .unwrap();
    app.resources
        .claim_next(project.id, Uuid::new_v4())
        .await
        .unwrap();

    let reset = app.resources.reset_in_progress(project.id).await.unwrap();
    assert_eq!(reset, 2);
    assert_eq!(
        app.resources
            .count_by_status(project.id, ResourceStatus::Pending)
            .await
            .unwrap(),
        2
    );
}

/// 测试分页查询
///
/// limit为0表示不限数量，单独给offset时查询同样可用
#[tokio::test]
async fn test_find_paged_unbounded_limit() {
    let app = default_test_app().await;
    let project = app
        .projects
        .create(&Project::new("queue", "http://a.test/", vec![]).unwrap())
        .await
        .unwrap();

    app.resources
        .batch_insert(
            project.id,
            &seeds(&["http://a.test/1", "http://a.test/2", "http://a.test/3"]),
            100,
        )
        .await
        .unwrap();

    let all = app
        .resources
        .find_paged(&ResourceQuery {
            project_id: project.id,
            statuses: None,
            limit: 0,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let pending = app
        .resources
        .find_paged(&ResourceQuery {
            project_id: project.id,
            statuses: Some(vec![ResourceStatus::Pending]),
            limit: 0,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(pending.len(), 3);

    // 偏移不带limit
    let rest = app
        .resources
        .find_paged(&ResourceQuery {
            project_id: project.id,
            statuses: None,
            limit: 0,
            offset: 1,
        })
        .await
        .unwrap();
    assert_eq!(rest.len(), 2);

    let page = app
        .resources
        .find_paged(&ResourceQuery {
            project_id: project.id,
            statuses: None,
            limit: 2,
            offset: 2,
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
}

/// 测试发现模式的项目筛选
///
/// 只返回仍有Pending资源的项目
#[tokio::test]
async fn test_find_with_pending_resources() {
    let app = default_test_app().await;
    let busy = app
        .projects
        .create(&Project::new("busy", "http://a.test/", vec![]).unwrap())
        .await
        .unwrap();
    let idle = app
        .projects
        .create(&Project::new("idle", "http://b.test/", vec![]).unwrap())
        .await
        .unwrap();

    app.resources
        .batch_insert(busy.id, &seeds(&["http://a.test/x"]), 100)
        .await
        .unwrap();

    let pending = app.projects.find_with_pending_resources().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, busy.id);
    assert_ne!(pending[0].id, idle.id);
}
