use crate::error::CosResult;
use crate::object::{Object, ObjId};

/// External collaborator consumed by the object parser to resolve an
/// indirect reference — most commonly a stream's `/Length` when it is
/// itself a reference rather than a literal integer. A full document
/// façade is out of scope for this crate; callers that need a real
/// document graph are expected to provide it.
pub trait ObjectResolver {
    fn resolve(&mut self, id: ObjId) -> CosResult<Object>;
}

/// A resolver that always fails. Suitable for parsing standalone objects
/// that are known never to reference an indirect `/Length`.
pub struct NoResolver;

impl ObjectResolver for NoResolver {
    fn resolve(&mut self, id: ObjId) -> CosResult<Object> {
        Err(crate::error::CosError::invalid_state(format!(
            "no resolver available to look up indirect reference {id}"
        )))
    }
}
