// Dom target naming convention

use crate::entities::ModelMeta;
use crate::value_objects::ActionKind;

/// Identifier of the page region a fragment applies to.
///
/// Collection inserts target the plural list (`posts`); everything else
/// targets one instance (`post_42`).
pub fn resolve_dom_target(meta: &ModelMeta, pk: &str, action: &ActionKind) -> String {
    if action.targets_collection() {
        meta.verbose_name_plural.to_lowercase()
    } else {
        format!("{}_{}", meta.verbose_name.to_lowercase(), pk)
    }
}
