//! `if-feature` resolution.

use log::trace;
use yanglink_core::{NodeId, NodeTag, ResolutionStatus};

use crate::{
    context::{LinkContext, Lookup},
    error::{Diagnostic, ErrorCode, Result},
};

/// Links every `if-feature` of `id` to its feature definition.
///
/// Reports `IntraFileResolved` while some name is only visible in the
/// inter-file phase.
pub fn resolve_if_features(ctx: &mut LinkContext, id: NodeId) -> Result<ResolutionStatus> {
    let mut features = ctx.node(id)?.if_features.clone();
    let mut status = ResolutionStatus::Resolved;

    for feature in features.iter_mut().filter(|feature| feature.feature.is_none()) {
        match ctx.lookup(id, feature.name, NodeTag::Feature)? {
            Lookup::Found(found) => feature.feature = Some(found),
            Lookup::Deferred => status = ResolutionStatus::IntraFileResolved,
            Lookup::Missing => {
                return Err(Diagnostic::error(format!("feature `{}` not found", feature.name))
                    .with_code(ErrorCode::E402)
                    .with_construct(ctx.describe(id))
                    .with_label(ctx.location(id), "if-feature declared here")
                    .with_help("features are declared at the top level of a module or submodule"));
            }
        }
    }

    ctx.node_mut(id)?.if_features = features;
    trace!(node:? = id, status:?; "Resolved if-features");
    Ok(status)
}
