//! Weighted call selection.
//!
//! A [`ChoiceTable`] holds, for every enabled call `i`, a cumulative weight
//! run over the enabled calls that may follow it. The weights either come
//! from a trained model ([`ChoiceTable::from_priorities`]) or from the
//! static resource-flow heuristic ([`ChoiceTable::build`]).

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::prog::Prog;
use crate::random::Rand;
use crate::target::{Syscall, Target};

/// Weight of every call pair.
const BASE_PRIO: u32 = 1;
/// Extra weight when the first call produces a resource the second consumes.
const RESOURCE_PRIO: u32 = 10;

/// Source of the next call in general mode.
pub trait CallSelector {
    /// Pick the call to append after `prog`, or `None` if nothing is enabled.
    fn next(&self, r: &mut Rand<'_>, prog: &Prog<'_>) -> Option<Arc<Syscall>>;

    /// Whether `call` belongs to the allowed set.
    fn is_allowed(&self, call: &Syscall) -> bool;
}

/// Read-only weighted transition model over the enabled calls.
pub struct ChoiceTable {
    syscalls: Vec<Arc<Syscall>>,
    /// Enabled ids in ascending order.
    calls: Vec<usize>,
    enabled: HashSet<usize>,
    /// Cumulative weights indexed `[from][to]`; empty for disabled rows.
    runs: Vec<Vec<u32>>,
}

impl ChoiceTable {
    /// Build with static priorities. `enabled` of `None` means every call.
    pub fn build(target: &Target, enabled: Option<&[Arc<Syscall>]>) -> Self {
        Self::from_priorities(target, enabled, &static_priorities(target))
    }

    /// Build from a square priority matrix indexed by syscall id.
    ///
    /// Missing entries count as zero; a row summing to zero falls back to
    /// uniform weights.
    pub fn from_priorities(
        target: &Target,
        enabled: Option<&[Arc<Syscall>]>,
        prios: &[Vec<u32>],
    ) -> Self {
        let syscalls = target.syscalls().to_vec();
        let candidates: Vec<&Arc<Syscall>> = match enabled {
            Some(calls) => calls.iter().filter(|c| target.owns(c)).collect(),
            None => syscalls.iter().collect(),
        };
        let enabled: HashSet<usize> = candidates
            .into_iter()
            .filter(|c| c.is_generatable())
            .map(|c| c.id)
            .collect();
        let calls: Vec<usize> = (0..syscalls.len())
            .filter(|id| enabled.contains(id))
            .collect();

        let mut runs = vec![Vec::new(); syscalls.len()];
        for &from in &calls {
            let row = prios.get(from);
            let weight = |to: usize| row.and_then(|row| row.get(to)).copied().unwrap_or(0);
            let uniform = calls.iter().all(|&to| weight(to) == 0);
            let mut sum = 0u32;
            runs[from] = (0..syscalls.len())
                .map(|to| {
                    if enabled.contains(&to) {
                        sum = sum.saturating_add(if uniform { BASE_PRIO } else { weight(to) });
                    }
                    sum
                })
                .collect();
        }

        Self {
            syscalls,
            calls,
            enabled,
            runs,
        }
    }

    pub fn enabled(&self, id: usize) -> bool {
        self.enabled.contains(&id)
    }

    /// Enabled calls in id order.
    pub fn enabled_calls(&self) -> impl Iterator<Item = &Arc<Syscall>> + '_ {
        self.calls.iter().map(move |&id| &self.syscalls[id])
    }

    /// Choose a call, weighted by the row of `bias` if it is enabled,
    /// uniformly otherwise.
    pub fn choose(&self, r: &mut Rand<'_>, bias: Option<usize>) -> Option<&Arc<Syscall>> {
        if self.calls.is_empty() {
            return None;
        }
        let run = match bias {
            Some(id) if self.enabled(id) => &self.runs[id],
            _ => {
                let id = self.calls[r.intn(self.calls.len())];
                return Some(&self.syscalls[id]);
            }
        };
        let total = run.last().copied().unwrap_or(0) as usize;
        let x = r.intn(total) as u32 + 1;
        let id = run.partition_point(|&w| w < x);
        self.syscalls.get(id)
    }
}

impl CallSelector for ChoiceTable {
    fn next(&self, r: &mut Rand<'_>, prog: &Prog<'_>) -> Option<Arc<Syscall>> {
        let bias = if prog.is_empty() {
            None
        } else {
            Some(prog.calls()[r.intn(prog.len())].meta.id)
        };
        self.choose(r, bias).cloned()
    }

    fn is_allowed(&self, call: &Syscall) -> bool {
        self.enabled(call.id)
    }
}

/// Resource-flow priorities: every pair gets the base weight, pairs where
/// the first call produces something the second consumes get a boost.
fn static_priorities(target: &Target) -> Vec<Vec<u32>> {
    let calls = target.syscalls();
    calls
        .iter()
        .map(|from| {
            calls
                .iter()
                .map(|to| {
                    let feeds = to.consumes().any(|wanted| {
                        target.resource(wanted).is_some_and(|wanted| {
                            from.produces().any(|have| {
                                target
                                    .resource(have)
                                    .is_some_and(|have| have.satisfies(wanted))
                            })
                        })
                    });
                    if feeds {
                        BASE_PRIO + RESOURCE_PRIO
                    } else {
                        BASE_PRIO
                    }
                })
                .collect()
        })
        .collect()
}
