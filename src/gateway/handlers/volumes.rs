//! Volume routes.

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use crate::engine::VolumeSpec;
use crate::error::{GatewayError, GatewayResult, Resource};
use crate::gateway::params::{Arg, RequestArgs};
use crate::gateway::server::GatewayState;
use crate::gateway::types::MessageResponse;

const NAME: Arg = Arg::required("Name", "Name of the volume");
const NEW_NAME: Arg = Arg::optional("Name", "Name of the volume, generated when omitted");
const DRIVER: Arg = Arg::optional("Driver", "Volume driver, defaults to local");
const LABELS: Arg = Arg::optional("Labels", "Labels for the volume");
const FORCE: Arg = Arg::optional("Force", "Remove the volume even if it is in use");

/// `PUT /api/v1/volumes/create_volume`
pub async fn create_volume_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<MessageResponse>> {
    args.validate(&[NEW_NAME, DRIVER, LABELS])?;
    let spec = VolumeSpec {
        name: args.opt_string(&NEW_NAME)?,
        driver: args.opt_string(&DRIVER)?,
        labels: args.opt_labels(&LABELS)?,
    };

    let volume = state
        .engine
        .create_volume(&spec)
        .await
        .map_err(GatewayError::engine(Resource::Volume))?;

    let short_id = volume.short_id();
    tracing::info!(volume = %volume.name, "Volume created");
    Ok(Json(MessageResponse::new(format!(
        "{short_id} volume has been created"
    ))))
}

/// `GET /api/v1/volumes/get_volume`
pub async fn get_volume_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<Value>> {
    args.validate(&[NAME])?;
    let name = args.string(&NAME)?;

    let volume = state
        .engine
        .inspect_volume(&name)
        .await
        .map_err(GatewayError::engine(Resource::Volume))?;
    Ok(Json(volume.attrs))
}

/// `GET /api/v1/volumes/remove_volume`
pub async fn remove_volume_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<MessageResponse>> {
    args.validate(&[NAME, FORCE])?;
    let name = args.string(&NAME)?;
    let force = args.opt_bool(&FORCE)?.unwrap_or(false);

    let volume = state
        .engine
        .inspect_volume(&name)
        .await
        .map_err(GatewayError::engine(Resource::Volume))?;
    state
        .engine
        .remove_volume(&volume.name, force)
        .await
        .map_err(GatewayError::engine(Resource::Volume))?;

    tracing::info!(volume = %volume.name, force, "Volume removed");
    Ok(Json(MessageResponse::new(format!(
        "{} volume has been removed",
        volume.name
    ))))
}

/// `GET /api/v1/volumes/list_volumes`
pub async fn list_volumes_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<Vec<Value>>> {
    args.validate(&[])?;

    let volumes = state
        .engine
        .list_volumes()
        .await
        .map_err(GatewayError::engine(Resource::Volume))?;
    Ok(Json(volumes.into_iter().map(|v| v.attrs).collect()))
}
