//! Route table and dispatch.
//!
//! # Responsibilities
//! - Store registered routes per HTTP method, in registration order
//! - Look up the first route matching a request
//! - Serve the matched response, or a JSON 404 describing the miss
//! - Record every dispatched request for later inspection
//!
//! # Design Decisions
//! - First match wins, never best match
//! - Unknown request methods simply find no routes
//! - Copy-on-write table behind `ArcSwap`: lock-free reads while serving
//! - Explicit `Lookup::NotFound` rather than a silent default

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::error::Result;
use crate::http::request::RequestMeta;
use crate::http::response::{Reply, Response, DEFAULT_CONTENT_TYPE};
use crate::observability::metrics;
use crate::routing::matcher::{request_path, Method, PathSpec};

/// A path matcher paired with the response it serves.
#[derive(Debug)]
pub struct Route {
    matcher: PathSpec,
    response: Response,
    hits: AtomicU64,
}

impl Route {
    pub fn new(matcher: impl Into<PathSpec>, response: Response) -> Self {
        Self {
            matcher: matcher.into(),
            response,
            hits: AtomicU64::new(0),
        }
    }

    /// Whether the path of `request_uri` satisfies this route.
    pub fn matches(&self, request_uri: &str) -> Result<bool> {
        let path = request_path(request_uri)?;
        Ok(self.matcher.matches_path(&path))
    }

    pub fn matcher(&self) -> &PathSpec {
        &self.matcher
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// How many dispatched requests this route has served.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }
}

/// Routes per method. Cheap to clone: routes are shared.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    get: Vec<Arc<Route>>,
    put: Vec<Arc<Route>>,
    post: Vec<Arc<Route>>,
    delete: Vec<Arc<Route>>,
}

impl RouteTable {
    pub fn routes(&self, method: Method) -> &[Arc<Route>] {
        match method {
            Method::Get => &self.get,
            Method::Put => &self.put,
            Method::Post => &self.post,
            Method::Delete => &self.delete,
        }
    }

    fn routes_mut(&mut self, method: Method) -> &mut Vec<Arc<Route>> {
        match method {
            Method::Get => &mut self.get,
            Method::Put => &mut self.put,
            Method::Post => &mut self.post,
            Method::Delete => &mut self.delete,
        }
    }

    pub fn len(&self) -> usize {
        Method::ALL.iter().map(|m| self.routes(*m).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, method) in Method::ALL.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{method}: [")?;
            for (j, route) in self.routes(*method).iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} -> {}", route.matcher, route.response)?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// Debug snapshot served when no route matches.
#[derive(Debug, Clone, Serialize)]
pub struct NotFound {
    pub message: String,
    pub available_routes: String,
    pub request: RequestSnapshot,
}

/// Raw request metadata included in a `NotFound` body.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub uri: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: std::collections::BTreeMap<String, String>,
    pub body: String,
}

/// Result of resolving a request against the route table.
#[derive(Debug)]
pub enum Lookup {
    Matched(Arc<Route>),
    NotFound(NotFound),
}

/// The route table shared between the test harness and the listener.
#[derive(Debug, Default)]
pub struct Dispatcher {
    table: ArcSwap<RouteTable>,
    journal: Mutex<Vec<RequestMeta>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route for `method`.
    pub fn register(
        &self,
        method: Method,
        path: impl Into<PathSpec>,
        response: Response,
    ) -> Result<()> {
        let path = match path.into() {
            // Requests are matched on their path alone.
            PathSpec::Exact(literal) => PathSpec::Exact(request_path(&literal)?),
            pattern => pattern,
        };

        tracing::debug!(method = %method, path = %path, status = response.status(), "Stub registered");

        let route = Arc::new(Route::new(path, response));
        self.table.rcu(|table| {
            let mut table = RouteTable::clone(table);
            table.routes_mut(method).push(Arc::clone(&route));
            table
        });
        Ok(())
    }

    pub fn get(&self, path: impl Into<PathSpec>, response: Response) -> Result<()> {
        self.register(Method::Get, path, response)
    }

    pub fn put(&self, path: impl Into<PathSpec>, response: Response) -> Result<()> {
        self.register(Method::Put, path, response)
    }

    pub fn post(&self, path: impl Into<PathSpec>, response: Response) -> Result<()> {
        self.register(Method::Post, path, response)
    }

    pub fn delete(&self, path: impl Into<PathSpec>, response: Response) -> Result<()> {
        self.register(Method::Delete, path, response)
    }

    /// Drop every route and the request journal.
    pub fn clear(&self) {
        self.table.store(Arc::new(RouteTable::default()));
        self.journal_lock().clear();
        tracing::debug!("Stubs cleared");
    }

    /// Snapshot of the current route table.
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Current routes for one method, in registration order.
    pub fn routes(&self, method: Method) -> Vec<Arc<Route>> {
        self.table.load().routes(method).to_vec()
    }

    /// Every request dispatched since the last `clear`.
    ///
    /// The journal is unbounded; long-lived servers should `clear` between tests.
    pub fn received(&self) -> Vec<RequestMeta> {
        self.journal_lock().clone()
    }

    /// Resolve `request` to the first matching route.
    pub fn handle(&self, request: &RequestMeta) -> Result<Lookup> {
        let path = request_path(&request.uri)?;
        let table = self.table.load();

        if let Ok(method) = request.method.parse::<Method>() {
            for route in table.routes(method) {
                if route.matches(&request.uri)? {
                    return Ok(Lookup::Matched(Arc::clone(route)));
                }
            }
        }

        Ok(Lookup::NotFound(NotFound {
            message: format!("No stub registered for {} {}", request.method, request.uri),
            available_routes: table.to_string(),
            request: RequestSnapshot {
                method: request.method.clone(),
                uri: request.uri.clone(),
                path,
                query: request
                    .uri
                    .split_once('?')
                    .map(|(_, q)| q.split('#').next().unwrap_or_default().to_string()),
                headers: request.headers.clone(),
                body: request.body.clone(),
            },
        }))
    }

    /// Single entry point used by the listener for every request.
    pub fn dispatch(&self, request: &RequestMeta) -> Result<Reply> {
        let start_time = Instant::now();
        self.journal_lock().push(request.clone());

        match self.handle(request)? {
            Lookup::Matched(route) => {
                route.record_hit();
                let reply = match route.response().call() {
                    Ok(reply) => reply,
                    Err(e) => {
                        metrics::record_request(&request.method, 500, "error", start_time);
                        return Err(e);
                    }
                };
                tracing::debug!(
                    method = %request.method,
                    uri = %request.uri,
                    status = reply.status,
                    "Stub matched"
                );
                metrics::record_request(&request.method, reply.status, "matched", start_time);
                Ok(reply)
            }
            Lookup::NotFound(not_found) => {
                tracing::warn!(method = %request.method, uri = %request.uri, "No stub matched");
                let body = serde_json::to_vec(&not_found)?;
                metrics::record_request(&request.method, 404, "not_found", start_time);
                Ok(Reply {
                    status: 404,
                    headers: vec![("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string())],
                    body: vec![body.into()],
                })
            }
        }
    }

    fn journal_lock(&self) -> std::sync::MutexGuard<'_, Vec<RequestMeta>> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
