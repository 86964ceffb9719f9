//! Matchup server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use matchup_api::{AppState, app};
use matchup_common::Config;
use matchup_core::{
    ConversationService, DirectoryService, EventPublisherService, InboxService,
    MembershipService, NoOpEventPublisher, NotificationService, RequestLedgerService,
};
use matchup_db::repositories::{
    ActorRepository, ChatRepository, GroupRepository, JoinRequestRepository,
    MatchApplicationRepository, MatchPostRepository, MembershipRepository,
    NotificationOutboxRepository, NotificationRepository, SportProfileRepository,
};
use matchup_queue::{RedisPubSub, SchedulerConfig, WorkflowJobExecutor, run_scheduler};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "matchup=debug,tower_http=debug".into());

    if json {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;
    init_tracing(config.logging.json);

    info!("Starting matchup server...");

    // Connect to database
    let db = Arc::new(matchup_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    matchup_db::migrate(&db).await?;
    info!("Migrations completed");

    // Real-time side channel
    let pubsub = match &config.redis.url {
        Some(url) => {
            info!("Connecting to Redis...");
            let pubsub = RedisPubSub::new(url, &config.redis.prefix).await?;
            pubsub.start();
            Some(pubsub)
        }
        None => {
            warn!("Redis not configured, change events are dropped");
            None
        }
    };
    let event_publisher: EventPublisherService = match &pubsub {
        Some(pubsub) => Arc::new(pubsub.clone()),
        None => Arc::new(NoOpEventPublisher),
    };

    // Initialize repositories
    let actor_repo = ActorRepository::new(Arc::clone(&db));
    let sport_profile_repo = SportProfileRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let membership_repo = MembershipRepository::new(Arc::clone(&db));
    let join_request_repo = JoinRequestRepository::new(Arc::clone(&db));
    let match_repo = MatchPostRepository::new(Arc::clone(&db));
    let application_repo = MatchApplicationRepository::new(Arc::clone(&db));
    let chat_repo = ChatRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let outbox_repo = NotificationOutboxRepository::new(Arc::clone(&db));

    // Initialize services
    let directory = DirectoryService::new(actor_repo, sport_profile_repo);

    let mut notification_service = NotificationService::new(
        notification_repo,
        outbox_repo,
        config.notifications.retry_policy(),
    );
    notification_service.set_event_publisher(event_publisher.clone());

    let membership_service =
        MembershipService::new(membership_repo.clone(), join_request_repo.clone());

    let mut ledger_service = RequestLedgerService::new(
        join_request_repo,
        application_repo.clone(),
        group_repo,
        match_repo.clone(),
        membership_repo,
        directory.clone(),
        notification_service.clone(),
        config.workflow.history_limit,
    );
    ledger_service.set_event_publisher(event_publisher.clone());

    let mut conversation_service = ConversationService::new(
        chat_repo.clone(),
        match_repo.clone(),
        application_repo.clone(),
        directory.clone(),
        config.workflow.max_message_length,
    );
    conversation_service.set_event_publisher(event_publisher);

    let inbox_service = InboxService::new(chat_repo, match_repo, application_repo, directory);

    // Safety-net loops
    let executor = Arc::new(WorkflowJobExecutor::new(
        notification_service.clone(),
        membership_service,
    ));
    let scheduler_handles = run_scheduler(SchedulerConfig::from(&config), executor);

    let state = AppState {
        ledger_service,
        notification_service,
        conversation_service,
        inbox_service,
    };

    let router = app(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for handle in scheduler_handles {
        handle.abort();
    }
    if let Some(pubsub) = pubsub {
        if let Err(e) = pubsub.shutdown().await {
            warn!(error = %e, "Failed to close Redis Pub/Sub");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
