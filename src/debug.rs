use crate::tree::{NodeId, Tree};

fn dump_tree(tree: &Tree, node: NodeId, indent: usize) {
    let indent_str = "  ".repeat(indent);
    let kind = tree.kind(node).map(|k| k.name()).unwrap_or("<dead>");
    let child_ids = tree.children(node).map(<[NodeId]>::to_vec).unwrap_or_default();

    if child_ids.is_empty() {
        let content = tree.content(node).unwrap_or("<dead>");
        println!("{}{}(leaf): {:?}", indent_str, kind, content);
    } else {
        println!("{}{}(parent)", indent_str, kind);
        for child in child_ids {
            dump_tree(tree, child, indent + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;

    #[test]
    fn dump_method_with_block() {
        let mut tree = Tree::new();
        let root = tree.root();
        let method = tree.new_branch(NodeKind::MethodImplementation);
        tree.append_child(root, method).unwrap();
        for (kind, text) in [
            (NodeKind::Text, "-"),
            (NodeKind::Whitespace, " "),
            (NodeKind::Text, "run"),
        ] {
            let leaf = tree.new_leaf(kind, text);
            tree.append_child(method, leaf).unwrap();
        }
        let braces = tree.new_branch(NodeKind::Braces);
        tree.append_child(method, braces).unwrap();
        for (kind, text) in [
            (NodeKind::Text, "{"),
            (NodeKind::Newline, "\n"),
            (NodeKind::Text, "}"),
        ] {
            let leaf = tree.new_leaf(kind, text);
            tree.append_child(braces, leaf).unwrap();
        }

        dump_tree(&tree, root, 0);
    }
}
