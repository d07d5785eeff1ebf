//! Container routes.

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use crate::engine::{ContainerSpec, ContainerStatus};
use crate::error::{GatewayError, GatewayResult, Resource};
use crate::gateway::params::{Arg, RequestArgs};
use crate::gateway::server::GatewayState;
use crate::gateway::types::{IdResponse, MessageResponse};

const NAME: Arg = Arg::required("Name", "Name of the container");
const IMAGE: Arg = Arg::required("Image", "Image to run the container from");

/// `PUT /api/v1/create_container`
pub async fn create_container_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<IdResponse>> {
    args.validate(&[NAME, IMAGE])?;
    let spec = ContainerSpec {
        name: args.string(&NAME)?,
        image: args.string(&IMAGE)?,
    };

    let id = state
        .engine
        .run_container(&spec)
        .await
        .map_err(GatewayError::engine(Resource::Container))?;

    tracing::info!(name = %spec.name, image = %spec.image, id = %id, "Container started");
    Ok(Json(IdResponse { id }))
}

/// `GET /api/v1/get_container`
pub async fn get_container_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<Value>> {
    args.validate(&[NAME])?;
    let name = args.string(&NAME)?;

    let container = state
        .engine
        .inspect_container(&name)
        .await
        .map_err(GatewayError::engine(Resource::Container))?;
    Ok(Json(container.attrs))
}

/// `GET /api/v1/stop_container`
///
/// Only a running container is stopped; any other state is reported back
/// without touching the container.
pub async fn stop_container_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<MessageResponse>> {
    args.validate(&[NAME])?;
    let name = args.string(&NAME)?;

    let container = state
        .engine
        .inspect_container(&name)
        .await
        .map_err(GatewayError::engine(Resource::Container))?;
    let short_id = container.short_id();

    let message = match &container.status {
        ContainerStatus::Running => {
            state
                .engine
                .stop_container(&container.id)
                .await
                .map_err(GatewayError::engine(Resource::Container))?;
            tracing::info!(id = %short_id, "Container stopped");
            format!("{short_id} has been stopped")
        }
        ContainerStatus::Exited => format!("{short_id} is already in stopped state"),
        other => format!("{short_id} is already in {other} state"),
    };

    Ok(Json(MessageResponse::new(message)))
}
