use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    routing::{MethodRouter, delete, get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::entities::{
    categories, companies, contracts, departments, employees as employee_rows,
    equipments as equipment_rows, profiles,
};
use crate::services::{Hub, IdentityProvider, MovementService, UserService};
use crate::state::SharedState;

pub mod auth;
mod catalog;
mod employees;
mod equipments;
mod error;
mod extract;
mod locations;
mod observability;
mod types;
mod users;
mod validation;
mod ws;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn hub(&self) -> &Hub {
        &self.shared.hub
    }

    #[must_use]
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.shared.identity
    }

    #[must_use]
    pub fn user_service(&self) -> &Arc<dyn UserService> {
        &self.shared.user_service
    }

    #[must_use]
    pub fn movement_service(&self) -> &Arc<dyn MovementService> {
        &self.shared.movement_service
    }

    /// Tells clients viewing `entity` that its rows changed.
    pub fn notify(&self, entity: &str) {
        self.hub()
            .publish_to(entity, NotificationEvent::data_changed(entity));
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let (client_url, request_timeout) = {
        let config = state.config();
        (
            config.client.url.clone(),
            Duration::from_secs(config.server.request_timeout_secs),
        )
    };

    let api_router = create_protected_router(state.clone());

    let auth_router = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    let cors_layer = match client_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(e) => {
            warn!(client_url = %client_url, "Invalid client URL, CORS disabled: {e}");
            CorsLayer::new()
        }
    };

    Router::new()
        .nest("/api", api_router)
        .nest("/auth", auth_router)
        .with_state(state)
        .layer(
            cors_layer
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn admin_only(route: MethodRouter<Arc<AppState>>) -> MethodRouter<Arc<AppState>> {
    route.route_layer(middleware::from_fn(auth::require_admin))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use catalog::{delete as remove, list, read, restore};

    Router::new()
        .route("/user", get(auth::current_user))
        .route("/roles", get(auth::list_roles))
        .route("/categories", get(list::<categories::Entity>))
        .route("/categories", post(catalog::create_category))
        .route("/categories/{id}", get(read::<categories::Entity>))
        .route("/categories/{id}", put(catalog::update_category))
        .route("/categories/{id}", delete(remove::<categories::Entity>))
        .route(
            "/categories/{id}/restore",
            put(restore::<categories::Entity>),
        )
        .route("/profiles", get(list::<profiles::Entity>))
        .route("/profiles", post(catalog::create_profile))
        .route("/profiles/{id}", get(read::<profiles::Entity>))
        .route("/profiles/{id}", put(catalog::update_profile))
        .route("/profiles/{id}", delete(remove::<profiles::Entity>))
        .route("/profiles/{id}/restore", put(restore::<profiles::Entity>))
        .route("/companies", get(list::<companies::Entity>))
        .route("/companies", admin_only(post(catalog::create_company)))
        .route(
            "/companies/{id}",
            admin_only(
                get(read::<companies::Entity>)
                    .put(catalog::update_company)
                    .delete(remove::<companies::Entity>),
            ),
        )
        .route(
            "/companies/{id}/restore",
            admin_only(put(restore::<companies::Entity>)),
        )
        .route("/contracts", get(list::<contracts::Entity>))
        .route("/contracts", post(catalog::create_contract))
        .route("/contracts/{id}", get(read::<contracts::Entity>))
        .route("/contracts/{id}", put(catalog::update_contract))
        .route("/contracts/{id}", delete(remove::<contracts::Entity>))
        .route(
            "/contracts/{id}/restore",
            put(restore::<contracts::Entity>),
        )
        .route("/departments", get(list::<departments::Entity>))
        .route("/departments", post(catalog::create_department))
        .route("/departments/{id}", get(read::<departments::Entity>))
        .route("/departments/{id}", put(catalog::update_department))
        .route("/departments/{id}", delete(remove::<departments::Entity>))
        .route(
            "/departments/{id}/restore",
            put(restore::<departments::Entity>),
        )
        .route("/employees", get(list::<employee_rows::Entity>))
        .route("/employees", post(employees::create_employee))
        .route("/employees/{id}", get(read::<employee_rows::Entity>))
        .route("/employees/{id}", put(employees::update_employee))
        .route("/employees/{id}", delete(remove::<employee_rows::Entity>))
        .route(
            "/employees/{id}/restore",
            put(restore::<employee_rows::Entity>),
        )
        .route(
            "/employees/{id}/set_department",
            put(employees::set_department),
        )
        .route("/equipments", get(list::<equipment_rows::Entity>))
        .route("/equipments", post(equipments::create_equipment))
        .route("/equipments/{id}", get(equipments::get_equipment))
        .route("/equipments/{id}", put(equipments::update_equipment))
        .route("/equipments/{id}", delete(remove::<equipment_rows::Entity>))
        .route(
            "/equipments/{id}/restore",
            put(restore::<equipment_rows::Entity>),
        )
        .route(
            "/equipments/{id}/locations",
            get(equipments::equipment_history),
        )
        .route(
            "/equipments/{id}/location",
            get(equipments::equipment_location),
        )
        .route("/users", get(users::list_users))
        .route("/users", admin_only(post(users::create_user)))
        .route("/users/{id}", get(users::get_user))
        .route(
            "/users/{id}",
            admin_only(put(users::update_user).delete(users::delete_user)),
        )
        .route("/users/{id}/set_password", put(users::set_password))
        .route(
            "/users/{id}/reset_password",
            admin_only(put(users::reset_password)),
        )
        .route(
            "/users/{id}/set_enabled",
            admin_only(put(users::set_enabled)),
        )
        .route("/locations", get(locations::list_locations))
        .route("/locations", post(locations::transfer))
        .route(
            "/locations/{id}",
            admin_only(delete(locations::delete_location)),
        )
        .route("/metrics", admin_only(get(observability::get_metrics)))
        .merge(ws::router())
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
