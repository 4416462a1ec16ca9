use crate::api::models::TreeNode;

/// Collapsible rendering of a crawl tree. Every node starts collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeView {
    root: TreeItem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub url: String,
    pub expanded: bool,
    pub children: Vec<TreeItem>,
}

impl TreeItem {
    fn from_node(node: TreeNode) -> Self {
        Self {
            url: node.url,
            expanded: false,
            children: node.children.into_iter().map(TreeItem::from_node).collect(),
        }
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(TreeItem::count).sum::<usize>()
    }

    fn set_expanded_all(&mut self, expanded: bool) {
        self.expanded = expanded;
        for child in &mut self.children {
            child.set_expanded_all(expanded);
        }
    }

    fn render_into(&self, depth: usize, lines: &mut Vec<String>) {
        let marker = match (self.children.is_empty(), self.expanded) {
            (true, _) => '•',
            (false, false) => '▸',
            (false, true) => '▾',
        };
        lines.push(format!("{}{} {}", "  ".repeat(depth), marker, self.url));

        if self.expanded {
            for child in &self.children {
                child.render_into(depth + 1, lines);
            }
        }
    }
}

impl TreeView {
    pub fn new(tree: TreeNode) -> Self {
        Self {
            root: TreeItem::from_node(tree),
        }
    }

    pub fn root(&self) -> &TreeItem {
        &self.root
    }

    /// One item per node of the source tree.
    pub fn node_count(&self) -> usize {
        self.root.count()
    }

    /// Flips the node reached by following child indices from the root.
    /// Leaves and bad paths are left alone; returns whether anything changed.
    pub fn toggle(&mut self, path: &[usize]) -> bool {
        let mut item = &mut self.root;
        for &index in path {
            match item.children.get_mut(index) {
                Some(child) => item = child,
                None => return false,
            }
        }
        if item.children.is_empty() {
            return false;
        }
        item.expanded = !item.expanded;
        true
    }

    pub fn expand_all(&mut self) {
        self.root.set_expanded_all(true);
    }

    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.root.render_into(0, &mut lines);
        lines
    }
}
