// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, default_test_app};
use harvestrs::config::settings::{ConcurrencyOptions, ProcessOptions, ScrapeDefinition};
use harvestrs::domain::models::project::PluginOpts;
use harvestrs::domain::models::resource::ResourceStatus;
use harvestrs::domain::repositories::project_repository::{ProjectRef, ProjectRepository};
use harvestrs::domain::repositories::resource_repository::{ResourceQuery, ResourceRepository};
use harvestrs::scraper::ScrapeEvent;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html_response(body: &str) -> ResponseTemplate {
    // set_body_string会把content-type强制为text/plain
    ResponseTemplate::new(200)
        .set_body_raw(format!("<html><body>{}</body></html>", body), "text/html")
}

async fn site_with_two_links() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            "<h1>Home</h1><a href=\"/x\">x</a><a href=\"/y\">y</a>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html_response("<h1>Page X</h1>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/y"))
        .respond_with(html_response("<h1>Page Y</h1>"))
        .mount(&server)
        .await;
    server
}

fn pipeline_with_content_extraction() -> Vec<PluginOpts> {
    vec![
        PluginOpts::named("FetchPlugin"),
        PluginOpts::named("ExtractUrlsPlugin"),
        PluginOpts {
            name: "ExtractHtmlContentPlugin".to_string(),
            opts: json!({
                "selectorPairs": [{ "contentSelector": "h1", "label": "title" }]
            }),
        },
        PluginOpts::named("InsertResourcesPlugin"),
        PluginOpts::named("UpsertResourcePlugin"),
    ]
}

/// 测试完整抓取流程
///
/// 种子页面链接到两个子页面：全部资源抓取完成、内容入库，
/// 并发出恰好一个ProjectScraped事件
#[tokio::test]
async fn test_scrape_site_end_to_end() {
    let server = site_with_two_links().await;
    let app = default_test_app().await;
    let mut events = app.scraper.subscribe();

    let definition = ScrapeDefinition {
        name: "site".to_string(),
        url: server.uri(),
        plugin_opts: pipeline_with_content_extraction(),
        resource_path: None,
    };

    app.scraper.scrape(&definition).await.unwrap();

    let project = app
        .projects
        .find(&ProjectRef::Name("site".to_string()))
        .await
        .unwrap()
        .unwrap();

    // 种子 + 两个被发现的子页面
    assert_eq!(app.resources.count(project.id).await.unwrap(), 3);
    assert_eq!(
        app.resources
            .count_by_status(project.id, ResourceStatus::Done)
            .await
            .unwrap(),
        3
    );

    // 子页面深度为1且内容提取落库
    let page_x = app
        .resources
        .find_by_url(project.id, &format!("{}/x", server.uri()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page_x.depth, 1);
    assert_eq!(page_x.payload["content"]["title"], json!(["Page X"]));
    assert_eq!(page_x.content_type.as_deref(), Some("text/html"));

    match events.recv().await.unwrap() {
        ScrapeEvent::ProjectScraped { project: scraped } => {
            assert_eq!(scraped.id, project.id);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(matches!(
        events.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

/// 测试重复抓取同一定义
///
/// 资源队列幂等：第二次运行不产生新资源，也不重复抓取已完成的页面
#[tokio::test]
async fn test_scrape_rerun_is_idempotent() {
    let server = site_with_two_links().await;
    let app = default_test_app().await;

    let definition = ScrapeDefinition {
        name: "site".to_string(),
        url: server.uri(),
        plugin_opts: pipeline_with_content_extraction(),
        resource_path: None,
    };

    app.scraper.scrape(&definition).await.unwrap();
    let first_run_requests = server.received_requests().await.unwrap().len();

    app.scraper.scrape(&definition).await.unwrap();

    let project = app
        .projects
        .find(&ProjectRef::Name("site".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(app.resources.count(project.id).await.unwrap(), 3);
    // 所有资源已是Done，第二次运行无需任何请求
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        first_run_requests
    );
}

/// 测试非HTML内容提前终止流水线
///
/// acceptedContentTypes不匹配时资源正常完成但不提取链接
#[tokio::test]
async fn test_content_type_mismatch_stops_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("{\"a\": 1}", "application/json"),
        )
        .mount(&server)
        .await;

    let app = default_test_app().await;
    let definition = ScrapeDefinition {
        name: "json".to_string(),
        url: server.uri(),
        plugin_opts: vec![
            PluginOpts {
                name: "FetchPlugin".to_string(),
                opts: json!({ "acceptedContentTypes": ["text/html"] }),
            },
            PluginOpts::named("ExtractUrlsPlugin"),
            PluginOpts::named("UpsertResourcePlugin"),
        ],
        resource_path: None,
    };

    app.scraper.scrape(&definition).await.unwrap();

    let project = app
        .projects
        .find(&ProjectRef::Name("json".to_string()))
        .await
        .unwrap()
        .unwrap();
    // 种子完成且没有新资源被发现
    assert_eq!(app.resources.count(project.id).await.unwrap(), 1);
    assert_eq!(
        app.resources
            .count_by_status(project.id, ResourceStatus::Done)
            .await
            .unwrap(),
        1
    );
}

/// 测试抓取失败的重试与终错
///
/// 服务端稳定返回500：按retry配置重试后资源进入Errored，
/// 项目仍然正常完成
#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = create_test_app(
        ConcurrencyOptions::default(),
        ProcessOptions { retry: 1, delay: 10 },
    )
    .await;

    let definition = ScrapeDefinition {
        name: "flaky".to_string(),
        url: server.uri(),
        plugin_opts: vec![
            PluginOpts::named("FetchPlugin"),
            PluginOpts::named("UpsertResourcePlugin"),
        ],
        resource_path: None,
    };

    app.scraper.scrape(&definition).await.unwrap();

    let project = app
        .projects
        .find(&ProjectRef::Name("flaky".to_string()))
        .await
        .unwrap()
        .unwrap();
    let errored = app
        .resources
        .find_paged(&ResourceQuery {
            project_id: project.id,
            statuses: Some(vec![ResourceStatus::Errored]),
            limit: 0,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(errored.len(), 1);
    // retry=1 → 恰好两次尝试
    assert_eq!(errored[0].attempt_count, 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

/// 测试DOM能力预检
///
/// 需要dom_write的插件搭配纯HTTP客户端时，在任何资源被
/// 抓取之前项目级失败
#[tokio::test]
async fn test_dom_write_plugin_rejected_before_dispatch() {
    let server = site_with_two_links().await;
    let app = default_test_app().await;
    let mut events = app.scraper.subscribe();

    let definition = ScrapeDefinition {
        name: "interactive".to_string(),
        url: server.uri(),
        plugin_opts: vec![
            PluginOpts::named("FetchPlugin"),
            PluginOpts::named("ScrollPlugin"),
        ],
        resource_path: None,
    };

    let result = app.scraper.scrape(&definition).await;
    assert!(result.is_err());

    match events.recv().await.unwrap() {
        ScrapeEvent::ProjectError { project, error } => {
            assert!(project.is_some());
            assert!(error.contains("ScrollPlugin"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
    // 没有任何页面被抓取
    assert!(server.received_requests().await.unwrap().is_empty());
}

/// 测试未知插件名
#[tokio::test]
async fn test_unknown_plugin_fails_project() {
    let app = default_test_app().await;
    let definition = ScrapeDefinition {
        name: "typo".to_string(),
        url: "http://a.test/".to_string(),
        plugin_opts: vec![PluginOpts::named("FetchPluginn")],
        resource_path: None,
    };

    let result = app.scraper.scrape(&definition).await;
    assert!(result.is_err());
}
