//! Two-level navigation tree built from a flat channel list.
//!
//! [`build`] is pure: same input, same tree. Ordering inside every bucket is
//! position ascending, then id ascending, so equal positions never reorder
//! between rebuilds.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use messagify_shared::{Channel, ChannelId};

/// A category and its visible children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    pub category: Channel,
    pub children: Vec<Channel>,
}

/// Uncategorized leaves first, then non-empty categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelTree {
    pub uncategorized: Vec<Channel>,
    pub categories: Vec<CategoryNode>,
    /// Every category in the snapshot, in display order, including those
    /// dropped from `categories` for having no children.
    pub category_ids: Vec<ChannelId>,
}

impl ChannelTree {
    pub fn is_empty(&self) -> bool {
        self.uncategorized.is_empty() && self.categories.is_empty()
    }

    /// Number of leaf channels across all buckets.
    pub fn leaf_count(&self) -> usize {
        self.uncategorized.len()
            + self
                .categories
                .iter()
                .map(|node| node.children.len())
                .sum::<usize>()
    }

    /// Find a leaf by id in any bucket.
    pub fn find_leaf(&self, id: &ChannelId) -> Option<&Channel> {
        self.uncategorized
            .iter()
            .chain(self.categories.iter().flat_map(|node| node.children.iter()))
            .find(|c| &c.id == id)
    }
}

fn by_position(a: &Channel, b: &Channel) -> Ordering {
    a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id))
}

/// Build the tree for one list snapshot.
///
/// A leaf whose parent is missing, or is not a category of this snapshot,
/// lands in the uncategorized bucket.
pub fn build(items: &[Channel]) -> ChannelTree {
    let (mut categories, leaves): (Vec<&Channel>, Vec<&Channel>) =
        items.iter().partition(|c| c.is_category());
    categories.sort_by(|a, b| by_position(a, b));

    let known: HashSet<&ChannelId> = categories.iter().map(|c| &c.id).collect();

    let mut buckets: HashMap<&ChannelId, Vec<Channel>> = HashMap::new();
    let mut uncategorized = Vec::new();
    for leaf in leaves {
        match leaf.parent_id.as_ref().filter(|p| known.contains(p)) {
            Some(parent) => buckets.entry(parent).or_default().push(leaf.clone()),
            None => uncategorized.push(leaf.clone()),
        }
    }
    uncategorized.sort_by(by_position);

    let category_ids = categories.iter().map(|c| c.id.clone()).collect();

    let categories = categories
        .into_iter()
        .filter_map(|category| {
            let mut children = buckets.remove(&category.id)?;
            children.sort_by(by_position);
            Some(CategoryNode {
                category: category.clone(),
                children,
            })
        })
        .collect();

    ChannelTree {
        uncategorized,
        categories,
        category_ids,
    }
}
