//! Controller resolution through the override graph.

use std::collections::{BTreeSet, VecDeque};

use super::ExtensionRegistry;
use crate::error::{Error, Result};
use crate::id::ExtensionId;

impl ExtensionRegistry {
    /// `id` followed by every extension it overrides, directly or
    /// transitively, in breadth-first order. Each extension appears once,
    /// so override cycles terminate.
    pub fn override_chain(&mut self, id: &ExtensionId) -> Result<Vec<ExtensionId>> {
        let mut chain = Vec::new();
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([id.clone()]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for overridden in self.overrides(&current)? {
                if !visited.contains(&overridden) {
                    queue.push_back(overridden);
                }
            }
            chain.push(current);
        }
        Ok(chain)
    }

    /// The first extension directly overridden by `id` that declares
    /// `controller`.
    pub fn find_overridden(
        &mut self,
        id: &ExtensionId,
        controller: &str,
    ) -> Result<Option<ExtensionId>> {
        for overridden in self.overrides(id)? {
            if self.declares(&overridden, controller)? {
                return Ok(Some(overridden));
            }
        }
        Ok(None)
    }

    /// The extension whose `controller` serves requests to `id`: `id`
    /// itself when it declares the controller, otherwise the nearest
    /// extension in its override chain that does.
    pub fn resolve_controller(
        &mut self,
        id: &ExtensionId,
        controller: &str,
    ) -> Result<Option<ExtensionId>> {
        for candidate in self.override_chain(id)? {
            if self.declares(&candidate, controller)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Missing descriptors declare nothing.
    fn declares(&mut self, id: &ExtensionId, controller: &str) -> Result<bool> {
        match self.descriptor(id) {
            Ok(descriptor) => Ok(descriptor.declares_controller(controller)),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
