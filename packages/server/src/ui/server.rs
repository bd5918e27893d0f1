//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use rakugaki_shared::time::Clock;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::{JOIN_TOKEN_TTL, ServerConfig},
    domain::{RoomRepository, StrokeRepository},
    infrastructure::{
        auth::{JoinTokenIssuer, RoomPasswordHasher},
        session::SessionRegistry,
    },
    usecase::{
        ClearCanvasUseCase, ConnectParticipantUseCase, CreateRoomUseCase,
        DisconnectParticipantUseCase, DrawUseCase, GetRoomUseCase, GetSessionStateUseCase,
        JoinRoomUseCase, ListRoomsUseCase, SendChatUseCase, SweepUseCase, VerifyPasswordUseCase,
    },
};

use super::{
    handler::{
        create_room, debug_session_state, get_room, health_check, join_private, join_public,
        list_rooms, verify_password, websocket_handler,
    },
    signal::shutdown_signal,
    state::{AppState, ConnectionLimits},
    sweeper::spawn_sweepers,
};

/// Rakugaki room server
///
/// Owns the application state and the sweep schedule.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(&config, room_repository, stroke_repository, clock);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    app_state: Arc<AppState>,
    idle_sweep_interval: Duration,
    retention_sweep_interval: Duration,
}

impl Server {
    /// Wire the use cases on top of the given repositories.
    ///
    /// # Arguments
    ///
    /// * `config` - Limits, timeouts and the token secret
    /// * `room_repository` - Room registry
    /// * `stroke_repository` - Per-room stroke persistence
    /// * `clock` - Time source for timestamps and token expiry
    pub fn new(
        config: &ServerConfig,
        room_repository: Arc<dyn RoomRepository>,
        stroke_repository: Arc<dyn StrokeRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // 1. 共有コンポーネント
        let registry = Arc::new(SessionRegistry::new(
            stroke_repository.clone(),
            config.max_users_per_room,
            config.chat_history_limit,
        ));
        let password_hasher = Arc::new(RoomPasswordHasher::new());
        let token_issuer = Arc::new(JoinTokenIssuer::new(
            &config.token_secret,
            JOIN_TOKEN_TTL,
            clock.clone(),
        ));

        // 2. UseCase
        let app_state = AppState {
            create_room_usecase: Arc::new(CreateRoomUseCase::new(
                room_repository.clone(),
                password_hasher.clone(),
                clock.clone(),
            )),
            get_room_usecase: Arc::new(GetRoomUseCase::new(room_repository.clone())),
            list_rooms_usecase: Arc::new(ListRoomsUseCase::new(
                room_repository.clone(),
                registry.clone(),
            )),
            verify_password_usecase: Arc::new(VerifyPasswordUseCase::new(
                room_repository.clone(),
                password_hasher.clone(),
            )),
            join_room_usecase: Arc::new(JoinRoomUseCase::new(
                room_repository.clone(),
                password_hasher,
                token_issuer.clone(),
            )),
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                room_repository.clone(),
                registry.clone(),
                token_issuer,
                clock.clone(),
            )),
            disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
                registry.clone(),
            )),
            draw_usecase: Arc::new(DrawUseCase::new(
                room_repository.clone(),
                registry.clone(),
                clock.clone(),
            )),
            clear_canvas_usecase: Arc::new(ClearCanvasUseCase::new(
                room_repository.clone(),
                registry.clone(),
                clock.clone(),
            )),
            send_chat_usecase: Arc::new(SendChatUseCase::new(
                room_repository.clone(),
                registry.clone(),
                clock.clone(),
            )),
            get_session_state_usecase: Arc::new(GetSessionStateUseCase::new(registry.clone())),
            sweep_usecase: Arc::new(SweepUseCase::new(
                room_repository,
                stroke_repository,
                registry,
                clock,
                config.idle_timeout,
                config.retention,
            )),
            connection_limits: ConnectionLimits {
                handshake_timeout: config.handshake_timeout,
                rate_limit_window: config.rate_limit_window,
                rate_limit_max_messages: config.rate_limit_max_messages,
            },
        };

        Self {
            app_state: Arc::new(app_state),
            idle_sweep_interval: config.idle_sweep_interval,
            retention_sweep_interval: config.retention_sweep_interval,
        }
    }

    /// Build the HTTP and WebSocket routes
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(list_rooms).post(create_room))
            .route("/api/rooms/{room_id}", get(get_room))
            .route(
                "/api/rooms/{room_id}/verify-password",
                post(verify_password),
            )
            .route("/api/rooms/{room_id}/join-public", post(join_public))
            .route("/api/rooms/{room_id}/join-private", post(join_private))
            .route("/debug/rooms/{room_id}", get(debug_session_state))
            .layer(TraceLayer::new_for_http())
            .with_state(self.app_state.clone())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// Once `shutdown` resolves every connection is closed with "going away"
    /// and every active room is flushed to storage before this returns.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let sweep = self.app_state.sweep_usecase.clone();
        let sweepers = spawn_sweepers(
            sweep.clone(),
            self.idle_sweep_interval,
            self.retention_sweep_interval,
        );

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let flushed = sweep.flush_all().await;
                tracing::info!("Flushed {} active room(s)", flushed);
            })
            .await;

        for handle in sweepers {
            handle.abort();
        }
        result
    }

    /// Run the server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Rakugaki server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
