mod endpoint;
mod endpoints;
mod region;
mod service_name;

pub use endpoint::{
    DomainWithPort, DomainWithPortParseError, Endpoint, EndpointParseError, IpAddrWithPort, IpAddrWithPortParseError,
};
pub use endpoints::{Endpoints, EndpointsBuilder, EndpointsProvider, GetOptions, GetOptionsBuilder};
pub use region::{Region, RegionBuilder};
pub use service_name::{InvalidServiceName, ServiceName};
