// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use harvestrs::clients::http_client::HttpClient;
use harvestrs::clients::traits::DomClient;
use harvestrs::config::settings::Settings;
use harvestrs::infrastructure::database::connection;
use harvestrs::infrastructure::repositories::{ProjectRepositoryImpl, ResourceRepositoryImpl};
use harvestrs::plugins::registry::PluginRegistry;
use harvestrs::scheduler::ResourceScheduler;
use harvestrs::scraper::{EventBus, ScrapeEvent, Scraper};
use harvestrs::utils::telemetry;
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// 主函数
///
/// 应用程序入口点：加载配置、迁移数据库、装配组件并
/// 按模式运行一次抓取或发现
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting harvestrs...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    // 3. Connect to database and run migrations
    let db = Arc::new(connection::create_pool(&settings.database).await?);
    info!("Database connection established");

    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Initialize components
    let projects = Arc::new(ProjectRepositoryImpl::new(db.clone()));
    let resources = Arc::new(ResourceRepositoryImpl::new(db.clone()));

    let client: Arc<dyn DomClient> = match settings.dom.client.as_str() {
        "http" => Arc::new(HttpClient::new(Duration::from_secs(
            settings.dom.timeout.unwrap_or(30),
        ))?),
        other => anyhow::bail!("unsupported dom client: {}", other),
    };
    info!(client = client.name(), "DOM client initialized");

    let registry = Arc::new(PluginRegistry::builtin());
    let events = Arc::new(EventBus::default());
    let scheduler = ResourceScheduler::new(
        projects.clone(),
        resources.clone(),
        client,
        registry,
        events.clone(),
        settings.concurrency.clone(),
        settings.process.clone(),
    );
    let scraper = Scraper::new(projects, resources, scheduler, events);

    // 5. Log lifecycle events
    let mut lifecycle = scraper.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = lifecycle.recv().await {
            match event {
                ScrapeEvent::ProjectScraped { project } => {
                    info!(project = %project.name, "project scraped");
                }
                ScrapeEvent::ProjectError { project, error } => {
                    let name = project.as_ref().map(|p| p.name.as_str()).unwrap_or("-");
                    error!(project = name, error = %error, "project failed");
                }
            }
        }
    });

    // 6. Run
    let discover = std::env::args().any(|arg| arg == "--discover");
    if discover {
        info!("Running in discover mode");
        scraper.discover(settings.scrape.as_ref()).await?;
    } else {
        let definition = settings
            .scrape
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no scrape definition configured"))?;
        info!(name = %definition.name, url = %definition.url, "Running scrape");
        scraper.scrape(definition).await?;
    }

    info!("Done");
    Ok(())
}
