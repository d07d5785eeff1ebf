//! Service routes.

use axum::Json;
use axum::extract::State;
use serde_json::{Map, Value};

use crate::engine::{EndpointSpec, ResourceLimits, ServiceMode, ServiceSpec};
use crate::error::{GatewayError, GatewayResult, Resource};
use crate::gateway::params::{Arg, RequestArgs, integer_value};
use crate::gateway::server::GatewayState;
use crate::gateway::types::{IdResponse, MessageResponse};

const NAME: Arg = Arg::required("Name", "Name of the service");
const IMAGE: Arg = Arg::required("Image", "Image the service runs");
const REPLICAS: Arg = Arg::required("Replicas", "Number of replicas");
const RESOURCES: Arg = Arg::required(
    "Resources",
    "Object with cpu_limit (nano CPUs) and mem_limit (bytes)",
);
const CONTAINER_LABELS: Arg = Arg::optional("Container_Labels", "Labels for the containers");
const SERVICE_LABELS: Arg = Arg::optional("Service_Labels", "Labels for the service");
const ENDPOINT_SPEC: Arg = Arg::optional("Endpoint_Spec", "Accepted but not applied");

fn resource_limits(resources: &Map<String, Value>) -> GatewayResult<ResourceLimits> {
    let member = |key: &str| -> GatewayResult<i64> {
        let field = format!("Resources.{key}");
        integer_value(&field, resources.get(key))?.ok_or(GatewayError::MissingField {
            field,
            help: RESOURCES.help,
        })
    };
    Ok(ResourceLimits {
        cpu_limit: member("cpu_limit")?,
        mem_limit: member("mem_limit")?,
    })
}

/// `PUT /api/v1/create_service`
///
/// The service always publishes port 80 through a virtual IP.
pub async fn create_service_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<IdResponse>> {
    args.validate(&[
        IMAGE,
        NAME,
        REPLICAS,
        RESOURCES,
        CONTAINER_LABELS,
        SERVICE_LABELS,
        ENDPOINT_SPEC,
    ])?;

    let spec = ServiceSpec {
        name: args.string(&NAME)?,
        image: args.string(&IMAGE)?,
        mode: ServiceMode::Replicated {
            replicas: args.count(&REPLICAS)?,
        },
        resources: resource_limits(&args.object(&RESOURCES)?)?,
        container_labels: args.opt_labels(&CONTAINER_LABELS)?,
        service_labels: args.opt_labels(&SERVICE_LABELS)?,
        endpoint: EndpointSpec::fixed_http(),
    };

    if let Some(requested) = args.opt_object(&ENDPOINT_SPEC)? {
        let requested = Value::Object(requested);
        tracing::warn!(
            service = %spec.name,
            endpoint_spec = %requested,
            "Ignoring requested endpoint spec, publishing 80:80 over VIP"
        );
    }

    let id = state
        .engine
        .create_service(&spec)
        .await
        .map_err(GatewayError::engine(Resource::Service))?;

    tracing::info!(service = %spec.name, id = %id, "Service created");
    Ok(Json(IdResponse {
        id: crate::engine::short_id(&id),
    }))
}

/// `GET /api/v1/get_service`
pub async fn get_service_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<Value>> {
    args.validate(&[NAME])?;
    let name = args.string(&NAME)?;

    let service = state
        .engine
        .inspect_service(&name)
        .await
        .map_err(GatewayError::engine(Resource::Service))?;
    Ok(Json(service.attrs))
}

/// `GET /api/v1/remove_service`
pub async fn remove_service_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<MessageResponse>> {
    args.validate(&[NAME])?;
    let name = args.string(&NAME)?;

    let service = state
        .engine
        .inspect_service(&name)
        .await
        .map_err(GatewayError::engine(Resource::Service))?;
    state
        .engine
        .remove_service(&service.id)
        .await
        .map_err(GatewayError::engine(Resource::Service))?;

    let short_id = service.short_id();
    tracing::info!(id = %short_id, "Service removed");
    Ok(Json(MessageResponse::new(format!("{short_id} has been removed"))))
}

/// `PUT /api/v1/scale_service`
pub async fn scale_service_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<MessageResponse>> {
    args.validate(&[NAME, REPLICAS])?;
    let name = args.string(&NAME)?;
    let replicas = args.count(&REPLICAS)?;

    state
        .engine
        .scale_service(&name, replicas)
        .await
        .map_err(GatewayError::engine(Resource::Service))?;

    tracing::info!(service = %name, replicas, "Service scaled");
    Ok(Json(MessageResponse::new(format!(
        "{name} has been scaled to {replicas} replicas"
    ))))
}

/// `GET /api/v1/get_service_tasks`
pub async fn get_service_tasks_handler(
    State(state): State<GatewayState>,
    args: RequestArgs,
) -> GatewayResult<Json<Vec<Value>>> {
    args.validate(&[NAME])?;
    let name = args.string(&NAME)?;

    let service = state
        .engine
        .inspect_service(&name)
        .await
        .map_err(GatewayError::engine(Resource::Service))?;
    let tasks = state
        .engine
        .service_tasks(&service.id)
        .await
        .map_err(GatewayError::engine(Resource::Service))?;
    Ok(Json(tasks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_resource_limits_accepts_numbers_and_strings() {
        let limits =
            resource_limits(&object(json!({"cpu_limit": 500000000, "mem_limit": "134217728"})))
                .unwrap();
        assert_eq!(limits.cpu_limit, 500_000_000);
        assert_eq!(limits.mem_limit, 134_217_728);
    }

    #[test]
    fn test_resource_limits_names_missing_member() {
        let err = resource_limits(&object(json!({"cpu_limit": 1}))).unwrap_err();
        assert!(
            matches!(err, GatewayError::MissingField { ref field, .. } if field == "Resources.mem_limit")
        );
    }

    #[test]
    fn test_resource_limits_rejects_non_integer() {
        let err = resource_limits(&object(json!({"cpu_limit": "lots", "mem_limit": 1}))).unwrap_err();
        assert!(
            matches!(err, GatewayError::InvalidField { ref field, .. } if field == "Resources.cpu_limit")
        );
    }
}
