//! # Container tree.
//!
//! Containers are the independently destroyable owners that tasks run under.
//! They form a tree rooted at [`ContainerId::ROOT`]; destroying a container
//! destroys its whole subtree.
//!
//! ## Rules
//! - Ids are never reused, so a stale id can always be told apart from a live one.
//! - A container is removed from the tree exactly once; its teardown hooks are
//!   handed out with it and therefore run at most once.
//! - Subtrees are detached children first (post-order).

use std::collections::HashMap;
use std::fmt;

use crate::error::HostError;

/// Identifier of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
    /// The root container. It always exists and cannot be destroyed.
    pub const ROOT: ContainerId = ContainerId(0);

    /// Raw numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

pub(crate) type Hook = Box<dyn FnOnce()>;

struct Entry {
    name: String,
    parent: Option<ContainerId>,
    children: Vec<ContainerId>,
    hooks: Vec<Hook>,
    tracked: bool,
}

impl Entry {
    fn new(name: String, parent: Option<ContainerId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            hooks: Vec::new(),
            tracked: false,
        }
    }
}

/// A container removed from the tree, with the hooks still to run.
pub(crate) struct Detached {
    pub id: ContainerId,
    pub name: String,
    pub hooks: Vec<Hook>,
}

pub(crate) struct Containers {
    entries: HashMap<ContainerId, Entry>,
    next: u64,
}

impl Containers {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(ContainerId::ROOT, Entry::new("root".to_owned(), None));
        Self { entries, next: 1 }
    }

    pub fn contains(&self, id: ContainerId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn name(&self, id: ContainerId) -> Option<&str> {
        self.entries.get(&id).map(|e| e.name.as_str())
    }

    pub fn parent(&self, id: ContainerId) -> Option<ContainerId> {
        self.entries.get(&id).and_then(|e| e.parent)
    }

    pub fn children(&self, id: ContainerId) -> Vec<ContainerId> {
        self.entries
            .get(&id)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn create(&mut self, name: &str, parent: ContainerId) -> Result<ContainerId, HostError> {
        if name.is_empty() {
            return Err(HostError::EmptyName);
        }
        let parent_entry = self
            .entries
            .get_mut(&parent)
            .ok_or(HostError::ContainerGone { container: parent })?;

        let id = ContainerId(self.next);
        self.next += 1;
        parent_entry.children.push(id);
        self.entries
            .insert(id, Entry::new(name.to_owned(), Some(parent)));
        Ok(id)
    }

    pub fn add_hook(&mut self, id: ContainerId, hook: Hook) -> Result<(), HostError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(HostError::ContainerGone { container: id })?;
        entry.hooks.push(hook);
        Ok(())
    }

    pub fn claim_tracked(&mut self, id: ContainerId) -> Result<(), HostError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(HostError::ContainerGone { container: id })?;
        if entry.tracked {
            return Err(HostError::ContainerOccupied { container: id });
        }
        entry.tracked = true;
        Ok(())
    }

    /// Removes `id` and all of its descendants, children first.
    pub fn detach_subtree(&mut self, id: ContainerId) -> Result<Vec<Detached>, HostError> {
        if id == ContainerId::ROOT {
            return Err(HostError::RootContainer);
        }
        if !self.contains(id) {
            return Err(HostError::ContainerGone { container: id });
        }

        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.entries.get_mut(&parent) {
                p.children.retain(|c| *c != id);
            }
        }

        let mut out = Vec::new();
        self.collect_post_order(id, &mut out);
        Ok(out)
    }

    fn collect_post_order(&mut self, id: ContainerId, out: &mut Vec<Detached>) {
        let Some(entry) = self.entries.remove(&id) else {
            return;
        };
        for child in &entry.children {
            self.collect_post_order(*child, out);
        }
        out.push(Detached {
            id,
            name: entry.name,
            hooks: entry.hooks,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_empty_name_and_dead_parent() {
        let mut tree = Containers::new();
        assert_eq!(tree.create("", ContainerId::ROOT), Err(HostError::EmptyName));

        let a = tree.create("a", ContainerId::ROOT).unwrap();
        tree.detach_subtree(a).unwrap();
        assert_eq!(
            tree.create("b", a),
            Err(HostError::ContainerGone { container: a })
        );
    }

    #[test]
    fn detach_is_post_order_and_unlinks_parent() {
        let mut tree = Containers::new();
        let a = tree.create("a", ContainerId::ROOT).unwrap();
        let b = tree.create("b", a).unwrap();
        let c = tree.create("c", b).unwrap();
        let d = tree.create("d", a).unwrap();

        let order: Vec<_> = tree
            .detach_subtree(a)
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(order, vec![c, b, d, a]);
        assert!(tree.children(ContainerId::ROOT).is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn root_cannot_be_detached() {
        let mut tree = Containers::new();
        assert!(matches!(
            tree.detach_subtree(ContainerId::ROOT),
            Err(HostError::RootContainer)
        ));
    }

    #[test]
    fn a_container_hosts_one_tracked_task() {
        let mut tree = Containers::new();
        let a = tree.create("a", ContainerId::ROOT).unwrap();
        assert!(tree.claim_tracked(a).is_ok());
        assert_eq!(
            tree.claim_tracked(a),
            Err(HostError::ContainerOccupied { container: a })
        );
    }

    #[test]
    fn ids_are_not_reused() {
        let mut tree = Containers::new();
        let a = tree.create("a", ContainerId::ROOT).unwrap();
        tree.detach_subtree(a).unwrap();
        let b = tree.create("a", ContainerId::ROOT).unwrap();
        assert_ne!(a, b);
    }
}
