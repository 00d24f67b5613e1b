//! WebSocket server implementation.
//!
//! Handles client connections and routes messages to handlers.

use crate::handlers::{
    handle_family_create, handle_family_delete, handle_family_get, handle_family_list,
    handle_family_of_member, handle_family_update, handle_info, handle_lineage, handle_member_add,
    handle_member_get, handle_member_list, handle_member_remove, handle_member_search,
    handle_member_update, handle_minimal_tree, handle_path, handle_relation_add,
    handle_relation_remove, handle_subfamilies, LineageQuery, PathQuery,
};
use crate::protocol::{Request, Response};
use crate::SharedRegistry;
use futures_util::{SinkExt, StreamExt};
use kin_store::FamilyRegistry;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Default port for `kin serve`.
pub const DEFAULT_PORT: u16 = 7441;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
        }
    }
}

/// The Kin WebSocket server.
pub struct KinServer {
    config: ServerConfig,
    registry: SharedRegistry,
}

type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl KinServer {
    /// Creates a new server over the given registry.
    pub fn new(registry: FamilyRegistry, config: ServerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(RwLock::new(registry)),
        }
    }

    /// Returns a handle to the shared registry.
    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    /// Runs the server until the process is interrupted.
    pub async fn run(&self) -> ServerResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Binds the configured address and serves until `shutdown` resolves.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> ServerResult<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    pub async fn bind(&self) -> ServerResult<TcpListener> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Kin server listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Accepts connections on `listener` until `shutdown` resolves, then
    /// drops every open connection.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> ServerResult<()> {
        tokio::pin!(shutdown);
        let mut connections = JoinSet::new();
        let mut accepted = 0usize;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                incoming = listener.accept() => match incoming {
                    Ok((stream, addr)) => {
                        accepted += 1;
                        let registry = self.registry.clone();
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, registry).await {
                                error!("Connection error from {}: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => error!("Accept error: {}", e),
                },
            }
        }

        info!(
            "Shutting down after {} connections ({} still open)",
            accepted,
            connections.len()
        );
        connections.abort_all();
        while connections.join_next().await.is_some() {}
        Ok(())
    }
}

/// Per-connection request counters, logged when the client leaves.
#[derive(Debug, Default)]
struct Session {
    requests: usize,
    failures: usize,
}

/// Handles a single WebSocket connection.
///
/// Text frames and UTF-8 binary frames carry one request each. A request
/// without an id is a notification: its result is not sent back, though an
/// error still is.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: SharedRegistry,
) -> ServerResult<()> {
    let ws_stream = accept_async(stream).await?;
    debug!("WebSocket connection established with {}", addr);

    let (mut write, mut read) = ws_stream.split();
    let mut session = Session::default();

    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    let reply = serde_json::to_string(&Response::parse_error())?;
                    write.send(Message::Text(reply)).await?;
                    continue;
                }
            },
            Ok(Message::Ping(payload)) => {
                write.send(Message::Pong(payload)).await?;
                continue;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("Message error from {}: {}", addr, e);
                break;
            }
        };

        session.requests += 1;
        let started = Instant::now();
        let response = process_message(&text, registry.clone()).await;
        if let Some(error) = &response.error {
            session.failures += 1;
            debug!("{} request failed ({}): {}", addr, error.code, error.message);
        }
        debug!("{} request answered in {:?}", addr, started.elapsed());

        if response.id.is_none() && response.error.is_none() {
            continue;
        }
        write.send(Message::Text(serde_json::to_string(&response)?)).await?;
    }

    info!(
        "Connection {} closed after {} requests ({} failed)",
        addr, session.requests, session.failures
    );
    Ok(())
}

fn parse<P: DeserializeOwned>(id: &Option<Value>, params: Value) -> Result<P, Response> {
    serde_json::from_value::<P>(params).map_err(|e| Response::invalid_params(id.clone(), e.to_string()))
}

/// Processes a JSON-RPC message and returns a response.
pub async fn process_message(text: &str, registry: SharedRegistry) -> Response {
    let request: Request = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(_) => return Response::parse_error(),
    };

    let id = request.id.clone();
    let method = request.method.as_str();
    let params = request.params.clone();

    debug!("Processing method: {}", method);

    // Each arm parses its params, or answers with invalid params.
    macro_rules! route {
        ($handler:expr) => {
            match parse(&id, params) {
                Ok(p) => $handler(registry, id, p).await,
                Err(response) => response,
            }
        };
        ($handler:expr, $query:expr) => {
            match parse(&id, params) {
                Ok(p) => $handler(registry, id, p, $query).await,
                Err(response) => response,
            }
        };
    }

    match method {
        "server.info" => handle_info(registry, id).await,

        "family.list" => handle_family_list(registry, id).await,
        "family.get" => route!(handle_family_get),
        "family.ofMember" => route!(handle_family_of_member),
        "family.create" => route!(handle_family_create),
        "family.update" => route!(handle_family_update),
        "family.delete" => route!(handle_family_delete),

        "member.list" => route!(handle_member_list),
        "member.get" => route!(handle_member_get),
        "member.add" => route!(handle_member_add),
        "member.update" => route!(handle_member_update),
        "member.remove" => route!(handle_member_remove),
        "member.search" => route!(handle_member_search),

        "relation.add" => route!(handle_relation_add),
        "relation.remove" => route!(handle_relation_remove),

        "graph.shortestPath" => route!(handle_path, PathQuery::Shortest),
        "graph.indirectRelations" => route!(handle_path, PathQuery::Indirect),
        "graph.relationPath" => route!(handle_path, PathQuery::Selected),
        "graph.minimalTree" => route!(handle_minimal_tree),
        "graph.subfamilies" => route!(handle_subfamilies),

        "lineage.ancestors" => route!(handle_lineage, LineageQuery::Ancestors),
        "lineage.descendants" => route!(handle_lineage, LineageQuery::Descendants),
        "lineage.siblings" => route!(handle_lineage, LineageQuery::Siblings),
        "lineage.unclesAunts" => route!(handle_lineage, LineageQuery::UnclesAunts),
        "lineage.cousins" => route!(handle_lineage, LineageQuery::Cousins),

        _ => Response::method_not_found(id, method),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codes;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    fn shared() -> (TempDir, SharedRegistry) {
        let dir = tempdir().unwrap();
        let registry = FamilyRegistry::open(dir.path()).unwrap();
        (dir, Arc::new(RwLock::new(registry)))
    }

    async fn call(registry: &SharedRegistry, method: &str, params: Value) -> Response {
        let text = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params }).to_string();
        process_message(&text, registry.clone()).await
    }

    async fn ok(registry: &SharedRegistry, method: &str, params: Value) -> Value {
        let response = call(registry, method, params).await;
        assert!(response.error.is_none(), "{} failed: {:?}", method, response.error);
        response.result.unwrap()
    }

    fn person(first: &str) -> Value {
        json!({
            "firstName": first,
            "lastName": "Vidal",
            "birthDate": "1950-01-01",
            "gender": "MALE"
        })
    }

    async fn add_member(registry: &SharedRegistry, family: &str, first: &str) -> String {
        let mut params = person(first);
        params["familyId"] = json!(family);
        let member = ok(registry, "member.add", params).await;
        member["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_parse_error_and_unknown_method() {
        let (_dir, registry) = shared();

        let response = process_message("{not json", registry.clone()).await;
        assert_eq!(response.error_code(), Some(codes::PARSE_ERROR));

        let response = call(&registry, "family.explode", json!({})).await;
        assert_eq!(response.error_code(), Some(codes::METHOD_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let (_dir, registry) = shared();
        let response = call(&registry, "member.get", json!({ "familyId": "f" })).await;
        assert_eq!(response.error_code(), Some(codes::INVALID_PARAMS));
    }

    #[tokio::test]
    async fn test_family_lifecycle() {
        let (_dir, registry) = shared();

        let created = ok(&registry, "family.create", json!({ "name": "Vidal" })).await;
        let family_id = created["id"].as_str().unwrap().to_string();

        let fetched = ok(&registry, "family.get", json!({ "familyId": "vidal" })).await;
        assert_eq!(fetched["id"], family_id.as_str());

        let listed = ok(&registry, "family.list", Value::Null).await;
        assert_eq!(listed["families"].as_array().unwrap().len(), 1);

        let info = ok(&registry, "server.info", Value::Null).await;
        assert_eq!(info["familyCount"], 1);

        ok(&registry, "family.delete", json!({ "familyId": family_id })).await;
        let response = call(&registry, "family.get", json!({ "familyId": family_id })).await;
        assert_eq!(response.error_code(), Some(codes::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_graph_and_lineage_queries() {
        let (_dir, registry) = shared();
        let created = ok(&registry, "family.create", json!({ "name": "Vidal" })).await;
        let family = created["id"].as_str().unwrap().to_string();

        let m1 = add_member(&registry, &family, "Marc").await;
        let m2 = add_member(&registry, &family, "Luc").await;
        let m3 = add_member(&registry, &family, "Rose").await;

        ok(
            &registry,
            "relation.add",
            json!({ "familyId": family, "fromId": m1, "toId": m2, "kind": "parent_child" }),
        )
        .await;
        ok(
            &registry,
            "relation.add",
            json!({ "familyId": family, "fromId": m2, "toId": m3, "kind": "spouse" }),
        )
        .await;

        let result = ok(
            &registry,
            "graph.shortestPath",
            json!({ "familyId": family, "fromId": m1, "toId": m3 }),
        )
        .await;
        assert_eq!(result["path"]["distance"], 3);
        assert_eq!(result["path"]["path"].as_array().unwrap().len(), 3);

        let result = ok(
            &registry,
            "graph.relationPath",
            json!({ "familyId": family, "fromId": m3, "toId": m1, "algorithm": "bellman-ford" }),
        )
        .await;
        assert!(result["path"]["distance"].is_null());

        let result = ok(&registry, "graph.minimalTree", json!({ "familyId": family })).await;
        assert_eq!(result["totalWeight"], 3);

        let result = ok(&registry, "graph.subfamilies", json!({ "familyId": family })).await;
        assert_eq!(result["subfamilies"].as_array().unwrap().len(), 1);

        let result = ok(
            &registry,
            "lineage.ancestors",
            json!({ "familyId": family, "memberId": m2, "depth": 1 }),
        )
        .await;
        let relatives = result["relatives"].as_array().unwrap();
        assert_eq!(relatives.len(), 1);
        assert_eq!(relatives[0]["member"]["id"], m1.as_str());
        assert_eq!(relatives[0]["relationship"]["kind"], "PARENT");

        let response = call(
            &registry,
            "lineage.cousins",
            json!({ "familyId": family, "memberId": "ghost" }),
        )
        .await;
        assert_eq!(response.error_code(), Some(codes::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_spouse_conflict_maps_to_conflict_code() {
        let (_dir, registry) = shared();
        let created = ok(&registry, "family.create", json!({ "name": "Vidal" })).await;
        let family = created["id"].as_str().unwrap().to_string();
        let a = add_member(&registry, &family, "A").await;
        let b = add_member(&registry, &family, "B").await;
        let c = add_member(&registry, &family, "C").await;

        ok(
            &registry,
            "relation.add",
            json!({ "familyId": family, "fromId": a, "toId": b, "kind": "spouse" }),
        )
        .await;
        let response = call(
            &registry,
            "relation.add",
            json!({ "familyId": family, "fromId": a, "toId": c, "kind": "spouse" }),
        )
        .await;
        assert_eq!(response.error_code(), Some(codes::CONFLICT));

        let result = ok(
            &registry,
            "member.search",
            json!({ "familyId": family, "firstName": "c" }),
        )
        .await;
        assert_eq!(result["members"][0]["id"], c.as_str());
    }

    #[tokio::test]
    async fn test_member_metadata_and_clearing_patch() {
        let (_dir, registry) = shared();
        let created = ok(&registry, "family.create", json!({ "name": "Vidal" })).await;
        let family = created["id"].as_str().unwrap().to_string();

        let mut params = person("Ines");
        params["familyId"] = json!(family);
        params["deathDate"] = json!("2020-02-02");
        params["metadata"] = json!({ "age": 42, "tags": ["x"], "nickname": "Nene" });
        let member = ok(&registry, "member.add", params).await;
        let member_id = member["id"].as_str().unwrap().to_string();
        assert_eq!(member["metadata"]["age"], 42);
        assert_eq!(member["metadata"]["tags"][0], "x");

        let updated = ok(
            &registry,
            "member.update",
            json!({
                "familyId": family,
                "memberId": member_id,
                "deathDate": null,
                "metadata": { "nickname": null, "age": 43 }
            }),
        )
        .await;
        assert!(updated["deathDate"].is_null());
        assert_eq!(updated["metadata"], json!({ "age": 43, "tags": ["x"] }));

        let stored = ok(
            &registry,
            "member.get",
            json!({ "familyId": family, "memberId": member_id }),
        )
        .await;
        assert_eq!(stored["metadata"]["tags"], json!(["x"]));
    }

    #[tokio::test]
    async fn test_family_of_member() {
        let (_dir, registry) = shared();
        ok(&registry, "family.create", json!({ "name": "Other" })).await;
        let created = ok(&registry, "family.create", json!({ "name": "Vidal" })).await;
        let family = created["id"].as_str().unwrap().to_string();
        let member = add_member(&registry, &family, "Marc").await;

        let found = ok(&registry, "family.ofMember", json!({ "memberId": member })).await;
        assert_eq!(found["id"], family.as_str());

        let response = call(&registry, "family.ofMember", json!({ "memberId": "ghost" })).await;
        assert_eq!(response.error_code(), Some(codes::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_serves_websocket_until_shutdown() {
        let dir = tempdir().unwrap();
        let config = ServerConfig {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        };
        let server = KinServer::new(FamilyRegistry::open(dir.path()).unwrap(), config);
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let serving = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = stopped.await;
                })
                .await
        });

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();

        let request = json!({ "jsonrpc": "2.0", "id": 7, "method": "server.info" });
        ws.send(Message::Text(request.to_string())).await.unwrap();
        let frame = ws.next().await.unwrap().unwrap();
        let reply: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(reply["id"], 7);
        assert_eq!(reply["result"]["familyCount"], 0);

        // The notification gets no reply, so the next frame answers id 8.
        let notification = json!({ "jsonrpc": "2.0", "method": "server.info" });
        ws.send(Message::Text(notification.to_string())).await.unwrap();
        let request = json!({ "jsonrpc": "2.0", "id": 8, "method": "family.list" });
        ws.send(Message::Binary(request.to_string().into_bytes())).await.unwrap();
        let frame = ws.next().await.unwrap().unwrap();
        let reply: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(reply["id"], 8);
        assert_eq!(reply["result"]["families"], json!([]));

        stop.send(()).unwrap();
        serving.await.unwrap().unwrap();
    }
}
