//! Pass/fail statistics
//!
//! A tree of counters mirroring the suite tree. Tests are added to the node
//! of the suite they belong to; a node's counts reach its parent only when
//! the node is dumped, which the runner does once per suite after all of
//! its children have been dumped.

use tracing::warn;

/// Counters of one statistics node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub total_passed: usize,
    pub critical: usize,
    pub critical_passed: usize,
}

impl Counts {
    pub fn total_failed(&self) -> usize {
        self.total - self.total_passed
    }

    pub fn critical_failed(&self) -> usize {
        self.critical - self.critical_passed
    }

    fn add(&mut self, other: &Counts) {
        self.total += other.total;
        self.total_passed += other.total_passed;
        self.critical += other.critical;
        self.critical_passed += other.critical_passed;
    }
}

/// Handle to a node of a [`Statistics`] tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct StatNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    counts: Counts,
    dumped: bool,
}

/// Statistics tree with a cursor following the suite being run
#[derive(Debug)]
pub struct Statistics {
    nodes: Vec<StatNode>,
    current: NodeId,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            nodes: vec![StatNode {
                parent: None,
                children: Vec::new(),
                counts: Counts::default(),
                dumped: false,
            }],
            current: NodeId(0),
        }
    }

    /// Root node collecting the whole run
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Current counts of `node`
    pub fn counts(&self, node: NodeId) -> Counts {
        self.nodes[node.0].counts
    }

    /// Create a child of `node`.
    pub fn new_child(&mut self, node: NodeId) -> NodeId {
        let child = NodeId(self.nodes.len());
        self.nodes.push(StatNode {
            parent: Some(node),
            children: Vec::new(),
            counts: Counts::default(),
            dumped: false,
        });
        self.nodes[node.0].children.push(child);
        child
    }

    /// Count one test directly in `node`.
    pub fn add_test(&mut self, node: NodeId, critical: bool, passed: bool) {
        let counts = &mut self.nodes[node.0].counts;
        counts.total += 1;
        if passed {
            counts.total_passed += 1;
        }
        if critical {
            counts.critical += 1;
            if passed {
                counts.critical_passed += 1;
            }
        }
    }

    /// Roll `node`'s counts into its parent and return them.
    ///
    /// Must be called once per node, children before parents. A repeated
    /// call returns the counts without adding them to the parent again.
    pub fn dump(&mut self, node: NodeId) -> Counts {
        let counts = self.nodes[node.0].counts;
        if self.nodes[node.0].dumped {
            warn!(node = node.0, "statistics node dumped twice; ignoring roll-up");
            return counts;
        }
        self.nodes[node.0].dumped = true;
        if let Some(parent) = self.nodes[node.0].parent {
            self.nodes[parent.0].counts.add(&counts);
        }
        counts
    }

    /// Clear every passed counter in the subtree of `node`.
    ///
    /// Totals stay as they are; used when a suite teardown fails after its
    /// tests have already been counted.
    pub fn fail_all(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let n = &mut self.nodes[id.0];
            n.counts.total_passed = 0;
            n.counts.critical_passed = 0;
            stack.extend(n.children.iter().copied());
        }
    }

    /// Enter a new child of the current node (a suite starts).
    pub fn collect(&mut self) -> NodeId {
        self.current = self.new_child(self.current);
        self.current
    }

    /// Count a test in the current node.
    pub fn add_current(&mut self, critical: bool, passed: bool) {
        self.add_test(self.current, critical, passed);
    }

    /// Dump the current node and move back to its parent (a suite ends).
    pub fn dump_current(&mut self) -> Counts {
        let node = self.current;
        let counts = self.dump(node);
        if let Some(parent) = self.parent(node) {
            self.current = parent;
        }
        counts
    }

    /// Suite teardown failed: fail everything under the current node.
    pub fn teardown_failed(&mut self) {
        self.fail_all(self.current);
    }
}
