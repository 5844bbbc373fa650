//! Request and Response models for the command API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{HashSetRequest, KeysQuery, SetRequest};
pub use responses::{
    GetResponse, HealthResponse, IntegerResponse, KeysResponse, StatsResponse, StatusResponse,
};
