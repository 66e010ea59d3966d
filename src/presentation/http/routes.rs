//! Route Configuration
//!
//! Configures all HTTP routes for the API.
//!
//! Each resource group is split into a public router and a protected one
//! (bearer JWT); both are merged under the same prefix. Device terminals
//! use their own token and live under `/devices`.

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use super::handlers;
use crate::presentation::middleware::{
    auth_middleware, cors, create_trace_layer, device_auth_middleware, http_metrics_middleware,
    rate_limit_auth, rate_limit_device,
};
use crate::startup::AppState;

/// Create the main router with every route and the global layers
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(create_trace_layer())
        .layer(cors::create_cors_layer(&state.settings.cors))
        .with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state.clone()))
        .nest("/hotels", hotel_routes(state.clone()))
        .nest("/rooms", room_routes(state.clone()))
        .nest("/services", service_routes(state.clone()))
        .nest("/tags", tag_routes(state.clone()))
        .nest("/images", image_routes(state.clone()))
        .nest("/bookings", booking_routes(state.clone()))
        .nest("/guests", guest_routes(state.clone()))
        .nest("/rfid-keys", rfid_routes(state.clone()))
        .nest("/invoices", invoice_routes(state.clone()))
        .nest("/devices", device_routes(state.clone()))
        .nest("/admin", admin_routes(state))
        .merge(search_routes())
}

fn protected(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Authentication routes; credential endpoints get the stricter rate limit
fn auth_routes(state: AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/register-hotel", post(handlers::auth::register_hotel))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_auth));

    let session = protected(
        Router::new().route(
            "/me",
            get(handlers::auth::me).put(handlers::auth::update_me),
        ),
        state,
    );

    Router::new()
        .route("/logout", post(handlers::auth::logout))
        .merge(limited)
        .merge(session)
}

fn hotel_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::hotel::list_hotels))
        .route("/catalog", get(handlers::search::catalog))
        .route("/{id}", get(handlers::hotel::get_hotel))
        .route("/{id}/rooms", get(handlers::hotel::list_rooms))
        .route("/{id}/services", get(handlers::hotel::list_services));

    let owner = Router::new()
        .route("/mine", get(handlers::hotel::my_hotel))
        .route(
            "/{id}",
            put(handlers::hotel::update_hotel).delete(handlers::hotel::delete_hotel),
        )
        .route("/{id}/rooms", post(handlers::hotel::create_room))
        .route("/{id}/services", post(handlers::hotel::create_service))
        .route("/{id}/tags", post(handlers::tag::attach_hotel_tag))
        .route("/{id}/tags/{tag_id}", delete(handlers::tag::detach_hotel_tag))
        .route("/{id}/bookings", get(handlers::booking::hotel_bookings));

    public.merge(protected(owner, state))
}

fn room_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/{id}", get(handlers::hotel::get_room))
        .route("/{id}/images", get(handlers::tag::room_images));

    let owner = Router::new()
        .route(
            "/{id}",
            put(handlers::hotel::update_room).delete(handlers::hotel::delete_room),
        )
        .route("/{id}/images", post(handlers::tag::link_room_image))
        .route("/{id}/images/{image_id}", delete(handlers::tag::unlink_room_image))
        .route("/{id}/tags", post(handlers::tag::attach_room_tag))
        .route("/{id}/tags/{tag_id}", delete(handlers::tag::detach_room_tag));

    public.merge(protected(owner, state))
}

fn service_routes(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/{id}", get(handlers::hotel::get_service));

    let owner = Router::new().route(
        "/{id}",
        put(handlers::hotel::update_service).delete(handlers::hotel::delete_service),
    );

    public.merge(protected(owner, state))
}

fn tag_routes(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/", get(handlers::tag::list_tags));

    let managed = Router::new()
        .route("/", post(handlers::tag::create_tag))
        .route("/usage", get(handlers::tag::tag_usage))
        .route(
            "/{id}",
            put(handlers::tag::rename_tag).delete(handlers::tag::delete_tag),
        );

    public.merge(protected(managed, state))
}

fn image_routes(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/{id}", get(handlers::tag::get_image));

    let managed = Router::new()
        .route("/", post(handlers::tag::create_image))
        .route("/{id}", delete(handlers::tag::delete_image));

    public.merge(protected(managed, state))
}

fn booking_routes(state: AppState) -> Router<AppState> {
    protected(
        Router::new()
            .route("/", post(handlers::booking::create_booking))
            .route("/mine", get(handlers::booking::my_bookings))
            .route(
                "/{id}",
                get(handlers::booking::get_booking).delete(handlers::booking::delete_booking),
            )
            .route("/{id}/status", put(handlers::booking::update_status))
            .route(
                "/{id}/guests",
                get(handlers::booking::list_guests).post(handlers::booking::add_guests),
            ),
        state,
    )
}

fn guest_routes(state: AppState) -> Router<AppState> {
    protected(
        Router::new().route(
            "/{id}",
            put(handlers::booking::update_guest).delete(handlers::booking::delete_guest),
        ),
        state,
    )
}

fn rfid_routes(state: AppState) -> Router<AppState> {
    protected(
        Router::new()
            .route(
                "/",
                get(handlers::rfid::list_keys).post(handlers::rfid::create_key),
            )
            .route("/calendar", get(handlers::rfid::calendar))
            .route("/bookings", get(handlers::rfid::eligible_bookings))
            .route(
                "/{id}",
                put(handlers::rfid::update_key).delete(handlers::rfid::delete_key),
            )
            .route("/{id}/assign", post(handlers::rfid::assign_to_booking))
            .route("/{id}/assign-room", post(handlers::rfid::assign_to_rooms))
            .route("/{id}/release", post(handlers::rfid::release))
            .route("/{id}/assignments", get(handlers::rfid::key_assignments)),
        state,
    )
}

fn invoice_routes(state: AppState) -> Router<AppState> {
    protected(
        Router::new()
            .route("/booking/{booking_id}", get(handlers::invoice::for_booking))
            .route("/booking/{booking_id}/preview", get(handlers::invoice::preview))
            .route("/{id}/approve", post(handlers::invoice::approve))
            .route("/{id}/send", post(handlers::invoice::send))
            .route("/{id}/download", get(handlers::invoice::download)),
        state,
    )
}

/// Terminal API; the device token is checked before the per-device rate limit
fn device_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/bookings", get(handlers::device::sync))
        .route("/bookings/{id}", put(handlers::device::update_check_in))
        .route("/check-in", post(handlers::device::check_in_by_token))
        .route("/access", post(handlers::device::access))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_device))
        .route_layer(middleware::from_fn_with_state(state, device_auth_middleware))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    protected(
        Router::new()
            .route("/stats", get(handlers::admin::stats))
            .route("/users", get(handlers::admin::list_users))
            .route(
                "/users/{id}",
                get(handlers::admin::get_user)
                    .put(handlers::admin::update_user)
                    .delete(handlers::admin::delete_user),
            )
            .route("/hotels", get(handlers::admin::list_hotels))
            .route("/bookings", get(handlers::admin::list_bookings))
            .route("/rfid-keys", get(handlers::admin::list_keys))
            .route(
                "/devices",
                get(handlers::device::list_devices).post(handlers::device::create_device),
            )
            .route(
                "/devices/{id}",
                put(handlers::device::update_device).delete(handlers::device::delete_device),
            )
            .route(
                "/devices/{id}/regenerate-token",
                post(handlers::device::regenerate_token),
            ),
        state,
    )
}

/// Public search endpoints
fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(handlers::search::search))
        .route("/search/locations", get(handlers::search::locations))
        .route("/recommendations", get(handlers::search::recommendations))
}
