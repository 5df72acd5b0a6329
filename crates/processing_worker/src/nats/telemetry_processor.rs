use crate::domain::TelemetryProcessingService;
use async_nats::jetstream::Message;
use chrono::{DateTime, Utc};
use fleetwatch_domain::TelemetrySnapshot;
use fleetwatch_nats::{BatchProcessor, ProcessingResult};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Create a BatchProcessor for raw telemetry messages that processes them
/// through the domain service.
///
/// Every message ends up acknowledged: a payload that does not deserialize is
/// logged and skipped rather than redelivered, and a downstream write failure
/// is logged without holding back the rest of the batch.
pub fn create_telemetry_processor(service: Arc<TelemetryProcessingService>) -> BatchProcessor {
    Box::new(move |messages: &[Message]| {
        let service = Arc::clone(&service);

        // Extract payloads, subjects and broker timestamps before moving
        // into the async block, Message borrows from the slice
        let message_data: Vec<(usize, Vec<u8>, String, DateTime<Utc>)> = messages
            .iter()
            .enumerate()
            .map(|(idx, msg)| {
                (
                    idx,
                    msg.payload.to_vec(),
                    msg.subject.to_string(),
                    broker_timestamp(msg),
                )
            })
            .collect();

        Box::pin(async move {
            let mut ack = Vec::new();

            for (idx, payload, subject, received_at) in message_data {
                let Some((car_id, snapshot)) = decode_telemetry(&subject, &payload) else {
                    // Skipped, still acked: redelivery cannot fix a message
                    // that does not decode.
                    ack.push(idx);
                    continue;
                };

                match service.process(car_id, snapshot, received_at).await {
                    Ok(()) => {
                        debug!(index = idx, car_id = %car_id, "Telemetry message processed");
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            index = idx,
                            car_id = %car_id,
                            "Failed to process telemetry message"
                        );
                    }
                }
                ack.push(idx);
            }

            Ok(ProcessingResult::new(ack, Vec::new()))
        })
    })
}

/// Decode one raw message into its car identity and snapshot. `None` means
/// the message cannot be processed (no car token in the subject, or a payload
/// that does not deserialize); such messages are logged here and acknowledged
/// by the caller without reaching the domain service.
fn decode_telemetry<'a>(subject: &'a str, payload: &[u8]) -> Option<(&'a str, TelemetrySnapshot)> {
    let Some(car_id) = car_id_from_subject(subject) else {
        error!(subject = %subject, "Subject carries no car identity, skipping");
        return None;
    };

    match serde_json::from_slice(payload) {
        Ok(snapshot) => Some((car_id, snapshot)),
        Err(e) => {
            error!(
                error = %e,
                subject = %subject,
                "Malformed telemetry payload, skipping"
            );
            None
        }
    }
}

/// The car identity is the last subject token, e.g. `telemetry.raw.car-42`.
fn car_id_from_subject(subject: &str) -> Option<&str> {
    subject.rsplit('.').next().filter(|token| !token.is_empty())
}

/// Broker receipt time of the message, falling back to the local clock when
/// the delivery metadata is unavailable.
fn broker_timestamp(msg: &Message) -> DateTime<Utc> {
    msg.info()
        .ok()
        .and_then(|info| {
            DateTime::<Utc>::from_timestamp(
                info.published.unix_timestamp(),
                info.published.nanosecond(),
            )
        })
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fleetwatch_domain::FuelType;

    fn snapshot_json() -> Vec<u8> {
        let snapshot = TelemetrySnapshot {
            brand: "Kia".to_string(),
            model: "Rio".to_string(),
            year_of_manufacture: 2021,
            odo: 54_320,
            lat: 55.751244,
            lon: 37.618423,
            fuel: 47.5,
            fuel_type: FuelType::Ai95,
            speed: 62,
            engine_on: true,
            locked: false,
            activated: true,
            rpm: 2400,
            handbrake: false,
            recorded_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        };
        serde_json::to_vec(&snapshot).unwrap()
    }

    #[test]
    fn test_car_id_from_subject() {
        assert_eq!(car_id_from_subject("telemetry.raw.car-42"), Some("car-42"));
        assert_eq!(car_id_from_subject("car-42"), Some("car-42"));
        assert_eq!(car_id_from_subject("telemetry.raw."), None);
    }

    #[test]
    fn test_decode_valid_message() {
        let decoded = decode_telemetry("telemetry.raw.car-42", &snapshot_json());
        let (car_id, snapshot) = decoded.expect("valid message must decode");
        assert_eq!(car_id, "car-42");
        assert_eq!(snapshot.speed, 62);
        assert_eq!(snapshot.fuel_type, FuelType::Ai95);
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        assert!(decode_telemetry("telemetry.raw.car-42", b"not json").is_none());
        assert!(decode_telemetry("telemetry.raw.car-42", b"{\"speed\":62}").is_none());
        assert!(decode_telemetry("telemetry.raw.car-42", b"").is_none());
    }

    #[test]
    fn test_subject_without_car_token_is_skipped() {
        // A well-formed payload does not save a message with no car identity.
        assert!(decode_telemetry("telemetry.raw.", &snapshot_json()).is_none());
    }
}
