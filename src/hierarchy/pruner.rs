use crate::hierarchy::ui_node::UiNode;

/// Reduce `node` in place to the parts owned by `package`.
///
/// A node survives when its own package matches or when at least one of its
/// children survives. Dropped subtrees are removed; surviving children keep
/// their order. Returns whether `node` itself survives.
pub fn prune_tree(node: &mut UiNode, package: &str) -> bool {
    let own = node.package() == Some(package);
    node.children.retain_mut(|child| prune_tree(child, package));
    own || !node.children.is_empty()
}
