//! Request handlers for protocol methods.
//!
//! Reads take the registry's read lock and work on a cloned family
//! snapshot. Writes hold the write lock for the whole load-modify-save.

use crate::protocol::{
    codes, AddMemberParams, FamilyParams, LineageParams, MemberLookupParams, MemberParams,
    PairParams, RelationParams, Response, SearchParams, UpdateFamilyParams, UpdateMemberParams,
};
use crate::SharedRegistry;
use kin_core::{Family, ModelError};
use kin_graph::{GraphService, KinRecord};
use kin_store::{NewFamily, StoreError};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, error};

/// Maps a store error onto a JSON-RPC error response.
pub fn store_failure(id: Option<Value>, err: StoreError) -> Response {
    let code = match &err {
        e if e.is_not_found() => codes::NOT_FOUND,
        StoreError::Sled(_) | StoreError::Bincode(_) => codes::STORAGE,
        StoreError::Model(model) => return model_failure(id, model.clone()),
        _ => codes::INTERNAL_ERROR,
    };
    if code == codes::STORAGE {
        error!("Storage fault: {}", err);
    }
    Response::error(id, code, err.to_string())
}

fn model_failure(id: Option<Value>, err: ModelError) -> Response {
    let code = match &err {
        ModelError::MemberNotFound(_) => codes::NOT_FOUND,
        ModelError::SelfLoop(_)
        | ModelError::DuplicateMember(_)
        | ModelError::SpouseConflict { .. }
        | ModelError::RelationConflict(..) => codes::CONFLICT,
        ModelError::IndexOutOfBounds { .. } | ModelError::InvariantViolation(_) => {
            error!("Inconsistent family snapshot: {}", err);
            codes::INTERNAL_ERROR
        }
    };
    Response::error(id, code, err.to_string())
}

async fn snapshot(registry: &SharedRegistry, family_id: &str) -> Result<Family, StoreError> {
    registry.read().await.family(family_id)
}

/// Handles the server.info method.
pub async fn handle_info(registry: SharedRegistry, id: Option<Value>) -> Response {
    let r = registry.read().await;

    #[derive(Serialize)]
    struct InfoResult {
        #[serde(rename = "familyCount")]
        family_count: usize,
        version: &'static str,
    }

    Response::success(
        id,
        InfoResult {
            family_count: r.store().len(),
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

// ----- Families -----

pub async fn handle_family_list(registry: SharedRegistry, id: Option<Value>) -> Response {
    match registry.read().await.summaries() {
        Ok(families) => Response::success(id, json!({ "families": families })),
        Err(e) => store_failure(id, e),
    }
}

/// Looks a family up by id first, then by name.
pub async fn handle_family_get(registry: SharedRegistry, id: Option<Value>, params: FamilyParams) -> Response {
    match registry.read().await.find_family(&params.family_id) {
        Ok(Some(family)) => Response::success(id, family_view(&family)),
        Ok(None) => Response::not_found(id, format!("Family not found: {}", params.family_id)),
        Err(e) => store_failure(id, e),
    }
}

/// Finds the family that holds a member, without knowing the family id.
pub async fn handle_family_of_member(
    registry: SharedRegistry,
    id: Option<Value>,
    params: MemberLookupParams,
) -> Response {
    match registry.read().await.family_of_member(&params.member_id) {
        Ok(Some(family)) => Response::success(id, family_view(&family)),
        Ok(None) => Response::not_found(id, format!("No family has member {}", params.member_id)),
        Err(e) => store_failure(id, e),
    }
}

pub async fn handle_family_create(registry: SharedRegistry, id: Option<Value>, params: NewFamily) -> Response {
    match registry.write().await.create_family(params) {
        Ok(family) => Response::success(id, family_view(&family)),
        Err(e) => store_failure(id, e),
    }
}

pub async fn handle_family_update(
    registry: SharedRegistry,
    id: Option<Value>,
    params: UpdateFamilyParams,
) -> Response {
    match registry.write().await.update_family(&params.family_id, params.patch) {
        Ok(family) => Response::success(id, family_view(&family)),
        Err(e) => store_failure(id, e),
    }
}

pub async fn handle_family_delete(registry: SharedRegistry, id: Option<Value>, params: FamilyParams) -> Response {
    match registry.write().await.delete_family(&params.family_id) {
        Ok(()) => Response::success(id, json!({ "deleted": params.family_id })),
        Err(e) => store_failure(id, e),
    }
}

fn family_view(family: &Family) -> Value {
    json!({
        "id": family.id,
        "name": family.name,
        "description": family.description,
        "createdAt": family.created_at,
        "updatedAt": family.updated_at,
        "members": family.members().collect::<Vec<_>>(),
    })
}

// ----- Members -----

pub async fn handle_member_list(registry: SharedRegistry, id: Option<Value>, params: FamilyParams) -> Response {
    match registry.read().await.members(&params.family_id) {
        Ok(members) => Response::success(id, json!({ "members": members })),
        Err(e) => store_failure(id, e),
    }
}

pub async fn handle_member_get(registry: SharedRegistry, id: Option<Value>, params: MemberParams) -> Response {
    match registry.read().await.member(&params.family_id, &params.member_id) {
        Ok(member) => Response::success(id, member),
        Err(e) => store_failure(id, e),
    }
}

pub async fn handle_member_add(registry: SharedRegistry, id: Option<Value>, params: AddMemberParams) -> Response {
    match registry.write().await.add_member(&params.family_id, params.member) {
        Ok(member) => Response::success(id, member),
        Err(e) => store_failure(id, e),
    }
}

pub async fn handle_member_update(
    registry: SharedRegistry,
    id: Option<Value>,
    params: UpdateMemberParams,
) -> Response {
    let result = registry
        .write()
        .await
        .update_member(&params.family_id, &params.member_id, params.patch);
    match result {
        Ok(member) => Response::success(id, member),
        Err(e) => store_failure(id, e),
    }
}

pub async fn handle_member_remove(registry: SharedRegistry, id: Option<Value>, params: MemberParams) -> Response {
    match registry.write().await.remove_member(&params.family_id, &params.member_id) {
        Ok(member) => Response::success(id, json!({ "removed": member.id })),
        Err(e) => store_failure(id, e),
    }
}

pub async fn handle_member_search(registry: SharedRegistry, id: Option<Value>, params: SearchParams) -> Response {
    match registry.read().await.search_members(&params.family_id, &params.query) {
        Ok(members) => Response::success(id, json!({ "members": members })),
        Err(e) => store_failure(id, e),
    }
}

// ----- Relations -----

pub async fn handle_relation_add(registry: SharedRegistry, id: Option<Value>, params: RelationParams) -> Response {
    let result = registry.write().await.add_relation(
        &params.family_id,
        &params.from_id,
        &params.to_id,
        params.kind,
    );
    match result {
        Ok(added) => Response::success(id, json!({ "added": added })),
        Err(e) => store_failure(id, e),
    }
}

pub async fn handle_relation_remove(registry: SharedRegistry, id: Option<Value>, params: PairParams) -> Response {
    let result = registry
        .write()
        .await
        .remove_relation(&params.family_id, &params.from_id, &params.to_id);
    match result {
        Ok(removed) => Response::success(id, json!({ "removed": removed })),
        Err(e) => store_failure(id, e),
    }
}

// ----- Graph queries -----

#[derive(Debug, Clone, Copy)]
pub enum PathQuery {
    Shortest,
    Indirect,
    Selected,
}

/// Handles graph.shortestPath, graph.indirectRelations and graph.relationPath.
pub async fn handle_path(
    registry: SharedRegistry,
    id: Option<Value>,
    params: PairParams,
    query: PathQuery,
) -> Response {
    let start = Instant::now();
    let family = match snapshot(&registry, &params.family_id).await {
        Ok(f) => f,
        Err(e) => return store_failure(id, e),
    };

    debug!("{:?} path {} -> {}", query, params.from_id, params.to_id);
    let service = GraphService::new();
    let result = match query {
        PathQuery::Shortest => service.shortest_path(&family, &params.from_id, &params.to_id),
        PathQuery::Indirect => service.indirect_relations(&family, &params.from_id, &params.to_id),
        PathQuery::Selected => {
            service.relation_path(&family, &params.from_id, &params.to_id, params.algorithm)
        }
    };

    match result {
        Ok(Some(path)) => Response::success(
            id,
            json!({
                "path": path,
                "queryTime": start.elapsed().as_millis() as u64
            }),
        ),
        Ok(None) => Response::not_found(
            id,
            format!("Member not found: {} or {}", params.from_id, params.to_id),
        ),
        Err(e) => model_failure(id, e),
    }
}

pub async fn handle_minimal_tree(registry: SharedRegistry, id: Option<Value>, params: FamilyParams) -> Response {
    let family = match snapshot(&registry, &params.family_id).await {
        Ok(f) => f,
        Err(e) => return store_failure(id, e),
    };
    match GraphService::new().minimal_connection_tree(&family) {
        Ok(edges) => {
            let total: i64 = edges.iter().map(|e| e.weight).sum();
            Response::success(id, json!({ "edges": edges, "totalWeight": total }))
        }
        Err(e) => model_failure(id, e),
    }
}

pub async fn handle_subfamilies(registry: SharedRegistry, id: Option<Value>, params: FamilyParams) -> Response {
    let family = match snapshot(&registry, &params.family_id).await {
        Ok(f) => f,
        Err(e) => return store_failure(id, e),
    };
    match GraphService::new().subfamilies(&family) {
        Ok(groups) => Response::success(id, json!({ "subfamilies": groups })),
        Err(e) => model_failure(id, e),
    }
}

// ----- Lineage -----

#[derive(Debug, Clone, Copy)]
pub enum LineageQuery {
    Ancestors,
    Descendants,
    Siblings,
    UnclesAunts,
    Cousins,
}

/// Handles the lineage.* methods.
pub async fn handle_lineage(
    registry: SharedRegistry,
    id: Option<Value>,
    params: LineageParams,
    query: LineageQuery,
) -> Response {
    let family = match snapshot(&registry, &params.family_id).await {
        Ok(f) => f,
        Err(e) => return store_failure(id, e),
    };

    let service = GraphService::new();
    let member = params.member_id.as_str();
    let found: Option<Vec<KinRecord>> = match query {
        LineageQuery::Ancestors => service.ancestors(&family, member, params.depth),
        LineageQuery::Descendants => service.descendants(&family, member, params.depth),
        LineageQuery::Siblings => service.siblings(&family, member),
        LineageQuery::UnclesAunts => service.uncles_aunts(&family, member),
        LineageQuery::Cousins => service.cousins(&family, member),
    };

    match found {
        Some(records) => Response::success(
            id,
            json!({ "member": params.member_id, "relatives": records }),
        ),
        None => Response::not_found(id, format!("Member not found: {}", params.member_id)),
    }
}
