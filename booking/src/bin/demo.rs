//! EventHub booking demo
//!
//! Runs the booking workflow end to end against in-memory backends:
//! - Organizer and requester registration, login
//! - Package publishing and search
//! - Request creation, confirmation, completion
//! - Dashboards for both sides
//!
//! # Usage
//!
//! ```bash
//! METRICS_ENABLED=true cargo run --bin eventhub-demo
//! ```

use anyhow::Context;
use chrono::{Duration, Utc};
use eventhub_booking::session::{OrganizerRegistration, RequesterRegistration};
use eventhub_booking::types::{BookingStatus, NewBookingRequest, PackageDraft};
use eventhub_booking::{App, Backends, Config};
use eventhub_core::environment::SystemClock;
use eventhub_runtime::metrics::MetricsServer;
use eventhub_testing::{InMemoryDocumentStore, InMemoryIdentityService, RecordingNotifier};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut config = Config::from_env();
    if config.notification.template_id.is_empty() {
        config.notification.template_id = "booking_request_created".to_string();
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut metrics = MetricsServer::new(config.server.metrics_addr);
    if config.server.metrics_enabled {
        metrics.start().context("starting metrics exporter")?;
        eventhub_booking::metrics::register_booking_metrics();
    }

    let notifier = Arc::new(RecordingNotifier::new());
    let backends = Backends {
        clock: Arc::new(SystemClock),
        documents: Arc::new(InMemoryDocumentStore::new()),
        identity: Arc::new(InMemoryIdentityService::new()),
        notifier: notifier.clone(),
    };
    let app = App::new(config, backends);
    let _watcher = app.session.watch_principal_changes();

    println!("\n=== EventHub booking demo ===\n");

    // Accounts
    let organizer = app
        .session
        .register_organizer(OrganizerRegistration {
            email: "olivia@example.com".to_string(),
            password: "organizer-pass".to_string(),
            username: "Olivia".to_string(),
            organization_name: "Lakeside Events".to_string(),
            mobile_number: "555-010-2020".to_string(),
        })
        .await?;
    let requester = app
        .session
        .register_requester(RequesterRegistration {
            email: "ravi@example.com".to_string(),
            password: "requester-pass".to_string(),
            name: "Ravi".to_string(),
            position: Some("Office manager".to_string()),
        })
        .await?;
    println!("Registered organizer {} and requester {}", organizer.id, requester.id);

    // Catalog
    let package = app
        .catalog
        .create_package(
            &organizer.id,
            PackageDraft {
                title: "Summer Garden Party".to_string(),
                price: 1_800.0,
                location: "Lakeside Pavilion".to_string(),
                description: "Catering, music and decoration for up to 80 guests".to_string(),
                image_url: String::new(),
            },
        )
        .await?;
    let hits = app.catalog.search("garden").await;
    println!("Search \"garden\": {} package(s)", hits.len());

    for profile in app.directory.organizers().await {
        println!("  organizer {:<10} rating {:.1}", profile.display_name(), profile.rating());
    }

    // Requester submits
    let profile = app.session.login("ravi@example.com", "requester-pass").await?;
    println!("\nLogged in as {}", profile.display_name());

    let draft = NewBookingRequest::new(
        requester.id.clone(),
        organizer.id.clone(),
        package.id.clone(),
        Utc::now() + Duration::days(30),
    )
    .with_notes("Vegetarian menu please");
    let request = app.bookings.create_request(draft).await?;
    println!("Created request {} ({})", request.id, request.status);

    let past = NewBookingRequest::new(
        requester.id.clone(),
        organizer.id.clone(),
        package.id.clone(),
        Utc::now() - Duration::days(1),
    );
    if let Err(e) = app.bookings.create_request(past).await {
        println!("Past-dated request refused: {e}");
    }
    app.session.logout().await?;

    // Organizer works through it
    app.session.login("olivia@example.com", "organizer-pass").await?;
    app.bookings.refresh_for_organizer(&organizer.id).await?;
    let confirmed = app.bookings.transition(&request.id, BookingStatus::Confirmed).await?;
    println!("\nRequest {} is now {}", confirmed.id, confirmed.status);

    let dashboard = app.organizer_dashboard(&organizer.id).await?;
    println!(
        "Organizer dashboard: total={} pending={} confirmed={} completed={}",
        dashboard.stats.total, dashboard.stats.pending, dashboard.stats.confirmed, dashboard.stats.completed
    );
    for entry in &dashboard.upcoming {
        println!("  upcoming: {} on {}", entry.package_title, entry.request.event_date.date_naive());
    }

    let completed = app.bookings.transition(&request.id, BookingStatus::Completed).await?;
    println!("Request {} is now {}", completed.id, completed.status);
    if let Err(e) = app.bookings.transition(&request.id, BookingStatus::Pending).await {
        println!("Reopening refused: {e}");
    }

    let dashboard = app.requester_dashboard(&requester.id).await?;
    for entry in &dashboard.recent {
        println!("  recent: {} ({}, {})", entry.package_title, entry.request.status, entry.requested);
    }

    app.shutdown().await?;
    println!("\nNotifications sent: {}", notifier.sent().len());
    if let Some(rendered) = metrics.render() {
        println!("\n{rendered}");
    }

    Ok(())
}
