//! Generated protobuf/tonic types for the telemetry ingress RPC.

pub mod telemetry {
    pub mod v1 {
        tonic::include_proto!("fleetwatch.telemetry.v1");

        pub const FILE_DESCRIPTOR_SET: &[u8] =
            tonic::include_file_descriptor_set!("telemetry_v1_descriptor");
    }
}
