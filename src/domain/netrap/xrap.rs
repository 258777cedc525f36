use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Identity of a connected planner on the transport.
pub type RouteId = Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrapMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for XrapMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            XrapMethod::Get => "GET",
            XrapMethod::Post => "POST",
            XrapMethod::Put => "PUT",
            XrapMethod::Delete => "DELETE",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XrapRequest {
    pub method: XrapMethod,
    pub resource: String,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub parameters: BTreeMap<String, String>,
    /// Set on inbound requests to the peer that sent them.
    pub route_id: Option<RouteId>,
}

impl XrapRequest {
    pub fn new(method: XrapMethod, resource: impl Into<String>) -> Self {
        Self {
            method,
            resource: resource.into(),
            content_type: None,
            body: Bytes::new(),
            parameters: BTreeMap::new(),
            route_id: None,
        }
    }

    pub fn get(resource: impl Into<String>) -> Self {
        Self::new(XrapMethod::Get, resource)
    }

    pub fn delete(resource: impl Into<String>) -> Self {
        Self::new(XrapMethod::Delete, resource)
    }

    pub fn post_json(resource: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let mut request = Self::new(XrapMethod::Post, resource);
        request.content_type = Some(JSON_CONTENT_TYPE.to_string());
        request.body = body.into();
        request
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn from_peer(mut self, route_id: RouteId) -> Self {
        self.route_id = Some(route_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XrapReply {
    Get { status_code: u16, content_type: String, etag: Option<String>, body: Bytes },
    Post { status_code: u16, location: Option<String>, etag: Option<String>, body: Bytes },
    Put { status_code: u16, location: Option<String>, etag: Option<String> },
    Delete { status_code: u16 },
    Error { status_code: u16, error_text: String },
}

impl XrapReply {
    pub fn error(status_code: u16, error_text: impl Into<String>) -> Self {
        XrapReply::Error { status_code, error_text: error_text.into() }
    }

    pub fn json(body: impl Into<Bytes>) -> Self {
        XrapReply::Get { status_code: 200, content_type: JSON_CONTENT_TYPE.to_string(), etag: None, body: body.into() }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            XrapReply::Get { status_code, .. }
            | XrapReply::Post { status_code, .. }
            | XrapReply::Put { status_code, .. }
            | XrapReply::Delete { status_code }
            | XrapReply::Error { status_code, .. } => *status_code,
        }
    }

    /// Body of a GET or POST reply.
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            XrapReply::Get { body, .. } | XrapReply::Post { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Request/reply channel to connected planners.
pub trait PlannerTransport: Send + Sync {
    /// Sends `request` to the planner at `address` and waits for its reply.
    fn send(&self, address: &RouteId, request: XrapRequest) -> Result<XrapReply>;
}

/// A resource served to planners. Unsupported methods answer 405.
pub trait XrapResource: Send + Sync {
    fn route(&self) -> &str;

    fn handle_get(&self, _request: &XrapRequest) -> XrapReply {
        XrapReply::error(405, "GET not supported")
    }

    fn handle_post(&self, _request: &XrapRequest) -> XrapReply {
        XrapReply::error(405, "POST not supported")
    }

    fn handle_put(&self, _request: &XrapRequest) -> XrapReply {
        XrapReply::error(405, "PUT not supported")
    }

    fn handle_delete(&self, _request: &XrapRequest) -> XrapReply {
        XrapReply::error(405, "DELETE not supported")
    }

    fn handle(&self, request: &XrapRequest) -> XrapReply {
        match request.method {
            XrapMethod::Get => self.handle_get(request),
            XrapMethod::Post => self.handle_post(request),
            XrapMethod::Put => self.handle_put(request),
            XrapMethod::Delete => self.handle_delete(request),
        }
    }
}
