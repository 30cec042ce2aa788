//! Ancestry queries over the status forest.
//!
//! Statuses reference their parent by id, so every query walks the parent
//! chain through an id index. Walks keep a visited set: a chain that loops
//! is reported as [`Error::StatusCycle`] instead of spinning forever.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::models::{Status, StatusTreeEntry};

/// Marker prepended to a status name once per ancestor.
pub const DEPTH_MARKER: &str = "---";

/// An id index over a loaded set of statuses.
pub struct StatusTree<'a> {
    by_id: HashMap<i64, &'a Status>,
}

/// Where a parent walk ended.
struct Ancestry {
    depth: usize,
    root_id: i64,
}

impl<'a> StatusTree<'a> {
    pub fn new(statuses: &'a [Status]) -> Self {
        Self {
            by_id: statuses.iter().map(|s| (s.id, s)).collect(),
        }
    }

    fn walk(&self, status: &Status) -> Result<Ancestry> {
        let mut visited = HashSet::from([status.id]);
        let mut current = status;
        let mut depth = 0;

        while let Some(parent_id) = current.parent_id {
            if !visited.insert(parent_id) {
                return Err(Error::StatusCycle {
                    status: current.id,
                    parent: parent_id,
                });
            }
            current = self.by_id.get(&parent_id).copied().ok_or(Error::NotFound {
                entity: "status",
                id: parent_id,
            })?;
            depth += 1;
        }

        Ok(Ancestry {
            depth,
            root_id: current.id,
        })
    }

    /// Number of ancestors between `status` and its root.
    pub fn depth(&self, status: &Status) -> Result<usize> {
        self.walk(status).map(|a| a.depth)
    }

    /// The status name prefixed with one [`DEPTH_MARKER`] per ancestor.
    pub fn relative_name(&self, status: &Status) -> Result<String> {
        let depth = self.depth(status)?;
        Ok(format!("{}{}", DEPTH_MARKER.repeat(depth), status.name))
    }

    /// Id of the root at the top of `status`'s parent chain.
    pub fn root_id(&self, status: &Status) -> Result<i64> {
        self.walk(status).map(|a| a.root_id)
    }

    /// Rejects `parent_id` as the new parent of `status_id` when the
    /// parent chain from `parent_id` reaches `status_id` again.
    pub fn check_parent(&self, status_id: i64, parent_id: i64) -> Result<()> {
        let cycle = Error::StatusCycle {
            status: status_id,
            parent: parent_id,
        };
        let mut visited = HashSet::new();
        let mut next = Some(parent_id);

        while let Some(id) = next {
            if id == status_id || !visited.insert(id) {
                return Err(cycle);
            }
            next = match self.by_id.get(&id) {
                Some(status) => status.parent_id,
                None => {
                    return Err(Error::NotFound {
                        entity: "status",
                        id,
                    })
                }
            };
        }
        Ok(())
    }
}

/// Stable-sorts statuses by the id of their root, so each tree's members
/// stay contiguous and keep their incoming relative order.
pub fn list_ordered(statuses: &[Status]) -> Result<Vec<Status>> {
    let tree = StatusTree::new(statuses);
    let mut keyed = statuses
        .iter()
        .map(|s| tree.root_id(s).map(|root| (root, s.clone())))
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_by_key(|(root, _)| *root);
    Ok(keyed.into_iter().map(|(_, s)| s).collect())
}

/// [`list_ordered`] with each status's relative name, root and depth.
pub fn ordered_entries(statuses: &[Status]) -> Result<Vec<StatusTreeEntry>> {
    let tree = StatusTree::new(statuses);
    list_ordered(statuses)?
        .into_iter()
        .map(|status| {
            Ok(StatusTreeEntry {
                relative_name: tree.relative_name(&status)?,
                root_id: tree.root_id(&status)?,
                depth: tree.depth(&status)?,
                status,
            })
        })
        .collect()
}
