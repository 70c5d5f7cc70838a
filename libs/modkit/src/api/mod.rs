//! HTTP-facing helpers shared by REST modules: RFC 9457 problems, offset
//! pagination, validating extractors and the OpenAPI registry.

pub mod openapi;
pub mod pagination;
pub mod problem;
pub mod validated;
