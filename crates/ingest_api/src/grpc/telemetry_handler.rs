use chrono::{DateTime, Utc};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, instrument};

use crate::domain::{IngestTelemetryInput, TelemetryIngestionService};
use crate::grpc::error::domain_error_to_status;
use fleetwatch_proto::telemetry::v1::telemetry_service_server::TelemetryService as TelemetryServiceTrait;
use fleetwatch_proto::telemetry::v1::{PutTelemetryRequest, PutTelemetryResponse};

/// Metadata key carrying the authenticated car identity.
pub const CAR_ID_METADATA_KEY: &str = "car-id";

/// gRPC handler for TelemetryService
/// Handles Proto → Domain mapping and error conversion
pub struct TelemetryServiceHandler {
    ingestion_service: Arc<TelemetryIngestionService>,
}

impl TelemetryServiceHandler {
    pub fn new(ingestion_service: Arc<TelemetryIngestionService>) -> Self {
        Self { ingestion_service }
    }
}

/// Extract the car identity from request metadata. The payload itself never
/// carries the identity, so a missing or unreadable key is an auth failure.
fn extract_car_id<T>(request: &Request<T>) -> Result<String, Status> {
    let value = request
        .metadata()
        .get(CAR_ID_METADATA_KEY)
        .ok_or_else(|| Status::unauthenticated("Missing car-id metadata"))?;

    let car_id = value
        .to_str()
        .map_err(|_| Status::unauthenticated("Invalid car-id metadata"))?;

    if car_id.is_empty() {
        return Err(Status::unauthenticated("Empty car-id metadata"));
    }

    Ok(car_id.to_string())
}

#[tonic::async_trait]
impl TelemetryServiceTrait for TelemetryServiceHandler {
    #[instrument(name = "PutTelemetry", skip(self, request))]
    async fn put_telemetry(
        &self,
        request: Request<PutTelemetryRequest>,
    ) -> Result<Response<PutTelemetryResponse>, Status> {
        let car_id = extract_car_id(&request)?;
        let req = request.into_inner();

        // 0 on the wire means "not set"; the service stamps at ingestion.
        let recorded_at = if req.recorded_at_unix == 0 {
            None
        } else {
            Some(
                DateTime::<Utc>::from_timestamp(req.recorded_at_unix, 0)
                    .ok_or_else(|| Status::invalid_argument("recorded_at_unix out of range"))?,
            )
        };

        let input = IngestTelemetryInput {
            brand: req.brand,
            model: req.model,
            year_of_manufacture: req.year_of_manufacture,
            odo: req.odo,
            lat: req.lat,
            lon: req.lon,
            fuel: req.fuel,
            fuel_type: req.fuel_type,
            speed: req.speed,
            engine_on: req.engine_on,
            locked: req.locked,
            activated: req.activated,
            rpm: req.rpm,
            handbrake: req.handbrake,
            recorded_at,
        };

        self.ingestion_service
            .ingest(&car_id, input)
            .await
            .map_err(domain_error_to_status)?;

        debug!(car_id = %car_id, "Telemetry accepted");

        Ok(Response::new(PutTelemetryResponse {
            message: "telemetry accepted".to_string(),
        }))
    }
}
