use fleetwatch_domain::DomainError;
use tonic::Status;

/// Convert domain error to gRPC Status
pub fn domain_error_to_status(error: DomainError) -> Status {
    match error {
        DomainError::ValidationError(msg)
        | DomainError::InvalidFuelType(msg)
        | DomainError::MalformedPayload(msg) => Status::invalid_argument(msg),

        DomainError::RepositoryError(err) => Status::internal(format!("Internal error: {}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_maps_to_invalid_argument() {
        let status = domain_error_to_status(DomainError::ValidationError("speed".to_string()));
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_repository_error_maps_to_internal() {
        let status =
            domain_error_to_status(DomainError::RepositoryError(anyhow::anyhow!("down")));
        assert_eq!(status.code(), tonic::Code::Internal);
    }
}
