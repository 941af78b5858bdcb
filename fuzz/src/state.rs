//! Per-run resource bookkeeping.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::choice::ChoiceTable;
use crate::prog::{Call, ResourceId};
use crate::target::{ResourceDesc, Target};

/// Resources live at the current end of the program being generated.
///
/// Keyed by resource name in a `BTreeMap` so that lookups return ids in a
/// stable order for a given call sequence.
pub struct State<'a> {
    pub target: &'a Target,
    pub ct: &'a ChoiceTable,
    resources: BTreeMap<String, Vec<ResourceId>>,
    next_id: ResourceId,
    analyzed: usize,
}

impl<'a> State<'a> {
    pub fn new(target: &'a Target, ct: &'a ChoiceTable) -> Self {
        Self {
            target,
            ct,
            resources: BTreeMap::new(),
            next_id: 0,
            analyzed: 0,
        }
    }

    /// Record the resources produced by an appended call.
    pub fn analyze(&mut self, call: &Call) {
        for (name, id) in call.produced_resources() {
            self.resources.entry(name.to_string()).or_default().push(id);
            self.next_id = self.next_id.max(id + 1);
        }
        self.analyzed += 1;
    }

    /// Fresh resource id, unique within this run.
    pub fn alloc_id(&mut self) -> ResourceId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Live resources usable where `wanted` is expected.
    pub fn live(&self, wanted: &ResourceDesc) -> Vec<ResourceId> {
        let mut out = Vec::new();
        for (name, ids) in &self.resources {
            let usable = self
                .target
                .resource(name)
                .is_some_and(|desc| desc.satisfies(wanted));
            if usable {
                out.extend_from_slice(ids);
            }
        }
        out
    }

    /// Number of calls analyzed so far.
    pub fn len(&self) -> usize {
        self.analyzed
    }

    pub fn is_empty(&self) -> bool {
        self.analyzed == 0
    }
}
