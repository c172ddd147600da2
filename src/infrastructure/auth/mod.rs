pub mod local_auth_gateway;

pub use local_auth_gateway::LocalAuthGateway;
