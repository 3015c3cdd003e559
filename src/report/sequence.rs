// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::HashMap;

use tracing::trace;

use crate::report::{self as tr, IdentityAllocator, StepId, StepKind, StepNode, WsjfError};
use tr::{
    Chart, GenericStepMut, LeafData, LeafStepMut, NumericLimitStepMut, PassFailStepMut,
    SequenceData, SequenceInfo, StepSetters, StepStatus, StringValueStepMut, CHART_STEP_CODE,
};

/// Arena holding every step of one report, in creation order.
///
/// Sequence calls own their children through id lists; the parent id on a
/// node is a lookup key only.
#[derive(Debug, Clone)]
pub struct StepTree {
    nodes: Vec<StepNode>,
    positions: HashMap<StepId, usize>,
    allocator: IdentityAllocator,
    root: StepId,
}

impl StepTree {
    pub(crate) fn new(root_name: &str) -> Self {
        let mut allocator = IdentityAllocator::new();
        let root = allocator.next_step_id();
        let node = StepNode::new(
            root,
            0,
            None,
            root_name,
            StepKind::SequenceCall(SequenceData::default()),
        );

        StepTree {
            nodes: vec![node],
            positions: HashMap::from([(root, 0)]),
            allocator,
            root,
        }
    }

    /// Tree without any node; filled by the decoder through `insert`.
    pub(crate) fn empty(root: StepId) -> Self {
        StepTree {
            nodes: vec![],
            positions: HashMap::new(),
            allocator: IdentityAllocator::new(),
            root,
        }
    }

    pub(crate) fn insert(&mut self, node: StepNode) -> Result<(), WsjfError> {
        if self.positions.contains_key(&node.id) {
            return Err(WsjfError::SchemaViolation(format!(
                "step id {} is used more than once",
                node.id
            )));
        }
        self.allocator.reserve(node.id);
        self.positions.insert(node.id, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn root_id(&self) -> StepId {
        self.root
    }

    pub fn allocator(&self) -> &IdentityAllocator {
        &self.allocator
    }

    /// Number of steps, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn step(&self, id: StepId) -> Option<&StepNode> {
        self.positions.get(&id).map(|pos| &self.nodes[*pos])
    }

    pub(crate) fn step_mut(&mut self, id: StepId) -> Option<&mut StepNode> {
        let pos = *self.positions.get(&id)?;
        self.nodes.get_mut(pos)
    }

    pub fn parent_of(&self, id: StepId) -> Option<&StepNode> {
        self.step(id)?.parent.and_then(|parent| self.step(parent))
    }

    /// Read-only view of the sequence call `id`.
    pub fn sequence(&self, id: StepId) -> Option<SequenceCall<'_>> {
        self.step(id)
            .filter(|node| node.kind.is_sequence_call())
            .map(|node| SequenceCall { tree: self, node })
    }

    /// The root sequence. It is always the first node of the arena.
    pub fn root(&self) -> SequenceCall<'_> {
        SequenceCall {
            tree: self,
            node: &self.nodes[0],
        }
    }

    pub fn root_mut(&mut self) -> SequenceCallMut<'_> {
        SequenceCallMut { tree: self, pos: 0 }
    }

    pub fn sequence_mut(&mut self, id: StepId) -> Option<SequenceCallMut<'_>> {
        let pos = *self.positions.get(&id)?;
        self.nodes[pos]
            .kind
            .is_sequence_call()
            .then_some(SequenceCallMut { tree: self, pos })
    }

    /// Steps in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &StepNode> {
        self.nodes.iter()
    }
}

/// Two trees are equal when they hold the same nodes under the same ids,
/// whatever order the nodes were inserted in.
impl PartialEq for StepTree {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.allocator == other.allocator
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .all(|node| other.step(node.id) == Some(node))
    }
}

/// Read-only view of a sequence call and its subtree.
#[derive(Debug, Clone, Copy)]
pub struct SequenceCall<'a> {
    tree: &'a StepTree,
    node: &'a StepNode,
}

impl<'a> SequenceCall<'a> {
    pub fn node(&self) -> &'a StepNode {
        self.node
    }

    pub fn id(&self) -> StepId {
        self.node.id
    }

    pub fn name(&self) -> &'a str {
        &self.node.name
    }

    pub fn info(&self) -> Option<&'a SequenceInfo> {
        self.node.kind.sequence().map(|seq| &seq.info)
    }

    /// Direct children in index order.
    pub fn children(&self) -> impl Iterator<Item = &'a StepNode> + 'a {
        let tree = self.tree;
        self.node
            .kind
            .sequence()
            .map(|seq| seq.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |id| tree.step(*id))
    }

    /// Nested sequence calls among the direct children.
    pub fn sub_sequences(&self) -> impl Iterator<Item = SequenceCall<'a>> + 'a {
        let tree = self.tree;
        self.children()
            .filter(|node| node.kind.is_sequence_call())
            .map(move |node| SequenceCall { tree, node })
    }

    /// Pre-order walk of the subtree, starting with this sequence call.
    pub fn walk(&self) -> Vec<&'a StepNode> {
        let tree = self.tree;
        let mut out = vec![];
        let mut stack = vec![self.node];

        while let Some(node) = stack.pop() {
            out.push(node);
            if let Some(seq) = node.kind.sequence() {
                stack.extend(
                    seq.children
                        .iter()
                        .rev()
                        .filter_map(|id| tree.step(*id)),
                );
            }
        }
        out
    }

    /// First descendant named `name`, depth first.
    pub fn find_step(&self, name: &str) -> Option<&'a StepNode> {
        self.walk().into_iter().skip(1).find(|node| node.name == name)
    }

    /// Descendants with a Failed, Error or Terminated status.
    pub fn failed_steps(&self) -> Vec<&'a StepNode> {
        self.walk()
            .into_iter()
            .skip(1)
            .filter(|node| node.status.is_failure())
            .collect()
    }

    /// Number of descendants at any depth.
    pub fn count_steps(&self) -> usize {
        self.walk().len() - 1
    }
}

/// Mutable handle to a sequence call; every `add_*` appends a child and
/// returns a handle to it.
///
/// # Examples
///
/// ```rust
/// # use tdm::report::*;
/// # fn main() -> Result<(), WsjfError> {
/// let mut report = Report::builder(ReportKind::Test, "PN-1", "SN-1", "A", 10).build();
/// let mut root = report.root_sequence_mut();
///
/// let mut power = root.add_sequence_call("Power", "power.seq", "1.0.0");
/// power.add_pass_fail_step("rails up").add_single_test(true)?;
/// # Ok(())
/// # }
/// ```
pub struct SequenceCallMut<'a> {
    tree: &'a mut StepTree,
    pos: usize,
}

impl SequenceCallMut<'_> {
    pub fn node(&self) -> &StepNode {
        &self.tree.nodes[self.pos]
    }

    pub fn id(&self) -> StepId {
        self.node().id
    }

    fn append(&mut self, name: &str, kind: StepKind) -> usize {
        let tree = &mut *self.tree;
        let id = tree.allocator.next_step_id();
        let parent = &mut tree.nodes[self.pos];

        let mut index = 0;
        if let Some(seq) = parent.kind.sequence_mut() {
            index = tree.allocator.next_index(&seq.children);
            seq.children.push(id);
        }
        let node = StepNode::new(id, index, Some(parent.id), name, kind);
        trace!(id, index, parent = parent.id, step_type = node.kind.code(), "step appended");

        let pos = tree.nodes.len();
        tree.positions.insert(id, pos);
        tree.nodes.push(node);
        pos
    }

    pub fn add_sequence_call(&mut self, name: &str, file_name: &str, version: &str) -> SequenceCallMut<'_> {
        let kind = StepKind::SequenceCall(SequenceData {
            info: SequenceInfo::new(file_name, version),
            children: vec![],
        });
        let pos = self.append(name, kind);
        SequenceCallMut {
            tree: &mut *self.tree,
            pos,
        }
    }

    pub fn add_numeric_limit_step(&mut self, name: &str) -> NumericLimitStepMut<'_> {
        let pos = self.append(name, StepKind::NumericLimit(LeafData::default()));
        LeafStepMut::new(&mut self.tree.nodes[pos])
    }

    pub fn add_pass_fail_step(&mut self, name: &str) -> PassFailStepMut<'_> {
        let pos = self.append(name, StepKind::PassFail(LeafData::default()));
        LeafStepMut::new(&mut self.tree.nodes[pos])
    }

    pub fn add_string_value_step(&mut self, name: &str) -> StringValueStepMut<'_> {
        let pos = self.append(name, StepKind::StringValue(LeafData::default()));
        LeafStepMut::new(&mut self.tree.nodes[pos])
    }

    /// Appends a step without measurements. `kind` is written out as the
    /// wire step type unchanged, so it must not be one of the codes that
    /// decode to a sequence call or a measurement step.
    pub fn add_generic_step(&mut self, kind: &str, name: &str) -> Result<GenericStepMut<'_>, WsjfError> {
        let (decoded, _) = StepKind::from_code(kind);
        if !matches!(decoded, StepKind::Generic(_)) {
            return Err(WsjfError::ReservedStepType(kind.to_owned()));
        }

        let pos = self.append(name, decoded);
        Ok(GenericStepMut {
            node: &mut self.tree.nodes[pos],
        })
    }

    /// Appends a step carrying `chart`. It starts out Passed.
    pub fn add_chart_step(&mut self, name: &str, chart: Chart) -> GenericStepMut<'_> {
        let pos = self.append(name, StepKind::Generic(CHART_STEP_CODE.to_owned()));
        let node = &mut self.tree.nodes[pos];
        node.status = StepStatus::Passed;
        node.chart = Some(chart);
        GenericStepMut { node }
    }

    /// Overrides path, file name and version of the called sequence.
    pub fn set_sequence_info(&mut self, info: SequenceInfo) -> &mut Self {
        if let Some(seq) = self.tree.nodes[self.pos].kind.sequence_mut() {
            seq.info = info;
        }
        self
    }
}

impl StepSetters for SequenceCallMut<'_> {
    fn node_mut(&mut self) -> &mut StepNode {
        &mut self.tree.nodes[self.pos]
    }
}
