/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_ROUTE_PREFIX: &str = const_str::concat!("/", API_ROUTE_COMPONENT);

pub const JOBS_ROUTE_COMPONENT: &str = "jobs";
pub const JOBS_ROUTE_PREFIX: &str = const_str::concat!(API_ROUTE_PREFIX, "/", JOBS_ROUTE_COMPONENT);

pub const MATERIALIZATION_ROUTE_COMPONENT: &str = "materialization";
pub const MATERIALIZATION_ROUTE_PREFIX: &str =
    const_str::concat!(JOBS_ROUTE_PREFIX, "/", MATERIALIZATION_ROUTE_COMPONENT);
