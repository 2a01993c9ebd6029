//! Expansion of requested generators into the ordered list of invocations.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::generator::{Generator, GeneratorRequest};
use crate::domain::error::DomainError;
use crate::domain::value_objects::GeneratorId;

/// A generator that (transitively) composes itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositionCycleError {
    /// Starts and ends with the same generator.
    pub chain: Vec<GeneratorId>,
}

impl CompositionCycleError {
    pub fn chain_display(&self) -> String {
        self.chain
            .iter()
            .map(GeneratorId::as_str)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl fmt::Display for CompositionCycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Composition cycle: {}", self.chain_display())
    }
}

/// One generator run within a request.
#[derive(Clone)]
pub struct Invocation {
    pub generator: Arc<dyn Generator>,
    /// Index of the originating request; composed generators share their
    /// root's arguments.
    pub request: usize,
    /// Composition path from the requested generator to this one.
    pub chain: Vec<GeneratorId>,
}

impl Invocation {
    pub fn id(&self) -> &GeneratorId {
        self.generator.id()
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("id", self.id())
            .field("request", &self.request)
            .field("chain", &self.chain)
            .finish()
    }
}

/// Expand `requests` in order. Each generator runs before the generators it
/// composes (depth-first, declaration order). Within one request a generator
/// reached twice runs once; separate requests expand independently.
///
/// Cycles are rejected before anything runs.
pub fn expand<F, E>(requests: &[GeneratorRequest], mut lookup: F) -> Result<Vec<Invocation>, E>
where
    F: FnMut(&GeneratorId) -> Result<Arc<dyn Generator>, E>,
    E: From<DomainError>,
{
    let mut out = Vec::new();
    for (index, request) in requests.iter().enumerate() {
        let mut stack = Vec::new();
        let mut seen = HashSet::new();
        visit(&request.id, index, &mut stack, &mut seen, &mut out, &mut lookup)?;
    }
    Ok(out)
}

fn visit<F, E>(
    id: &GeneratorId,
    request: usize,
    stack: &mut Vec<GeneratorId>,
    seen: &mut HashSet<GeneratorId>,
    out: &mut Vec<Invocation>,
    lookup: &mut F,
) -> Result<(), E>
where
    F: FnMut(&GeneratorId) -> Result<Arc<dyn Generator>, E>,
    E: From<DomainError>,
{
    if let Some(start) = stack.iter().position(|s| s == id) {
        let mut chain = stack[start..].to_vec();
        chain.push(id.clone());
        return Err(DomainError::CompositionCycle(CompositionCycleError { chain }).into());
    }
    if !seen.insert(id.clone()) {
        return Ok(());
    }

    let generator = lookup(id)?;
    stack.push(id.clone());
    out.push(Invocation {
        generator: generator.clone(),
        request,
        chain: stack.clone(),
    });
    for child in &generator.descriptor().composes {
        visit(child, request, stack, seen, out, lookup)?;
    }
    stack.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::flags::GeneratorArgs;
    use crate::domain::entities::generator::GeneratorDescriptor;
    use crate::domain::entities::patch::PatchKind;
    use crate::domain::entities::snapshot::ProjectView;
    use std::collections::HashMap;

    struct Stub(GeneratorDescriptor);

    impl Generator for Stub {
        fn descriptor(&self) -> &GeneratorDescriptor {
            &self.0
        }

        fn run(&self, _: &ProjectView<'_>, _: &GeneratorArgs) -> Result<Vec<PatchKind>, DomainError> {
            Ok(Vec::new())
        }
    }

    fn id(s: &str) -> GeneratorId {
        GeneratorId::new(s).unwrap()
    }

    fn registry(edges: &[(&str, &[&str])]) -> HashMap<GeneratorId, Arc<dyn Generator>> {
        edges
            .iter()
            .map(|(name, children)| {
                let descriptor = children
                    .iter()
                    .fold(GeneratorDescriptor::new(id(name)), |d, c| d.composes(id(c)));
                (id(name), Arc::new(Stub(descriptor)) as Arc<dyn Generator>)
            })
            .collect()
    }

    fn run(
        reg: &HashMap<GeneratorId, Arc<dyn Generator>>,
        roots: &[&str],
    ) -> Result<Vec<Invocation>, DomainError> {
        let requests: Vec<_> = roots.iter().map(|r| GeneratorRequest::bare(id(r))).collect();
        expand(&requests, |gid| {
            reg.get(gid).cloned().ok_or_else(|| DomainError::GeneratorFailed {
                generator: gid.to_string(),
                reason: "unknown".into(),
            })
        })
    }

    fn order(invocations: &[Invocation]) -> Vec<&str> {
        invocations.iter().map(|i| i.id().as_str()).collect()
    }

    #[test]
    fn parent_runs_before_children_depth_first() {
        let reg = registry(&[("app", &["db", "web"]), ("db", &["config"]), ("web", &[]), ("config", &[])]);
        let out = run(&reg, &["app"]).unwrap();
        assert_eq!(order(&out), ["app", "db", "config", "web"]);
        assert_eq!(out[2].chain, vec![id("app"), id("db"), id("config")]);
    }

    #[test]
    fn diamond_runs_shared_child_once() {
        let reg = registry(&[("a", &["b", "c"]), ("b", &["d"]), ("c", &["d"]), ("d", &[])]);
        assert_eq!(order(&run(&reg, &["a"]).unwrap()), ["a", "b", "d", "c"]);
    }

    #[test]
    fn separate_requests_expand_independently() {
        let reg = registry(&[("a", &["c"]), ("b", &["c"]), ("c", &[])]);
        let out = run(&reg, &["a", "b"]).unwrap();
        assert_eq!(order(&out), ["a", "c", "b", "c"]);
        assert_eq!(out[3].request, 1);
    }

    #[test]
    fn cycle_is_rejected_with_chain() {
        let reg = registry(&[("a", &["b"]), ("b", &["a"])]);
        let err = run(&reg, &["a"]).unwrap_err();
        let DomainError::CompositionCycle(cycle) = err else {
            panic!("expected cycle, got {err:?}");
        };
        assert_eq!(cycle.chain_display(), "a -> b -> a");
    }

    #[test]
    fn self_composition_is_a_cycle() {
        let reg = registry(&[("a", &["a"])]);
        assert!(matches!(run(&reg, &["a"]), Err(DomainError::CompositionCycle(_))));
    }
}
