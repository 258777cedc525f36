#![allow(dead_code)]

use bytes::Bytes;
use std::sync::Mutex;

use netrap_dismi::api::netrap_dto::{NetRapAction, NetRapActionType, NetRapDemand, NetRapLink, NetRapRoute};
use netrap_dismi::domain::netrap::xrap::{PlannerTransport, RouteId, XrapMethod, XrapReply, XrapRequest};
use netrap_dismi::error::{Error, Result};

type Responder = Box<dyn Fn(&XrapRequest) -> Result<XrapReply> + Send + Sync>;

/// Transport that records every request and answers through a responder.
pub struct RecordingTransport {
    requests: Mutex<Vec<(RouteId, XrapRequest)>>,
    responder: Mutex<Responder>,
}

impl RecordingTransport {
    pub fn new(responder: impl Fn(&XrapRequest) -> Result<XrapReply> + Send + Sync + 'static) -> Self {
        Self { requests: Mutex::new(Vec::new()), responder: Mutex::new(Box::new(responder)) }
    }

    /// Accepts everything: POSTs get an empty action list, DELETEs succeed.
    pub fn accept_all() -> Self {
        Self::new(|request| Ok(accepting_reply(request)))
    }

    /// Every request fails on the wire.
    pub fn unreachable() -> Self {
        Self::new(|_| Err(Error::TransportError("connection refused".to_string())))
    }

    pub fn respond_with(&self, responder: impl Fn(&XrapRequest) -> Result<XrapReply> + Send + Sync + 'static) {
        *self.responder.lock().unwrap() = Box::new(responder);
    }

    pub fn requests(&self) -> Vec<(RouteId, XrapRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn resources(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(_, r)| format!("{} {}", r.method, r.resource)).collect()
    }

    pub fn count(&self, method: XrapMethod, resource: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|(_, r)| r.method == method && r.resource == resource).count()
    }
}

impl PlannerTransport for RecordingTransport {
    fn send(&self, address: &RouteId, request: XrapRequest) -> Result<XrapReply> {
        self.requests.lock().unwrap().push((address.clone(), request.clone()));
        let responder = self.responder.lock().unwrap();
        (**responder)(&request)
    }
}

pub fn accepting_reply(request: &XrapRequest) -> XrapReply {
    match request.method {
        XrapMethod::Delete => XrapReply::Delete { status_code: 200 },
        _ => post_reply(b"[]".to_vec()),
    }
}

pub fn post_reply(body: Vec<u8>) -> XrapReply {
    XrapReply::Post { status_code: 200, location: None, etag: None, body: Bytes::from(body) }
}

/// Planner link between two devices with explicit ports.
pub fn planner_link(src: &str, src_port: u64, dst: &str, dst_port: u64) -> NetRapLink {
    let mut link = NetRapLink { src: src.to_string(), dst: dst.to_string(), layer: Some(1), ..Default::default() };
    link.attributes.insert("srcPort".to_string(), src_port.to_string());
    link.attributes.insert("dstPort".to_string(), dst_port.to_string());
    link
}

pub fn route(layer: i32, links: Vec<NetRapLink>) -> NetRapRoute {
    NetRapRoute { links, layer: Some(layer), ..Default::default() }
}

pub fn actions_body(actions: Vec<(NetRapActionType, NetRapDemand)>) -> Vec<u8> {
    let actions: Vec<NetRapAction> = actions.into_iter().map(|(action, demand)| NetRapAction { action, demand }).collect();
    serde_json::to_vec(&actions).unwrap()
}
