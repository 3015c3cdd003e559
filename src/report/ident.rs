// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use uuid::Uuid;

use crate::report::StepId;

/// How a report id is chosen at build time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Ident {
    #[default]
    Auto,
    Exact(Uuid),
}

impl Ident {
    pub(crate) fn resolve(&self) -> Uuid {
        match self {
            Ident::Auto => Uuid::new_v4(),
            Ident::Exact(id) => *id,
        }
    }
}

/// Largest step id a decoded payload may carry. The report service stores
/// step ids as 32 bit signed integers.
pub const MAX_STEP_ID: StepId = i32::MAX as StepId;

/// Hands out step ids for one report and sibling indices for one parent.
///
/// Ids are strictly increasing in creation order and never reused; the
/// first id of a fresh report is 1 and belongs to the root sequence.
/// Reserved ids never exceed `MAX_STEP_ID`, which leaves the rest of the
/// `u64` range to allocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentityAllocator {
    last_id: StepId,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_step_id(&mut self) -> StepId {
        self.last_id += 1;
        self.last_id
    }

    /// The id the next call to `next_step_id` will return.
    pub fn peek_step_id(&self) -> StepId {
        self.last_id + 1
    }

    /// Index for the next child of a parent that already has `children`.
    pub fn next_index(&self, children: &[StepId]) -> usize {
        children.len()
    }

    /// Marks `id` as taken, so later allocations land after it.
    pub(crate) fn reserve(&mut self, id: StepId) {
        self.last_id = self.last_id.max(id);
    }
}
