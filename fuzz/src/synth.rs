//! Turning a chosen syscall into concrete calls.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::prog::{Arg, Call, ResourceId, ResourceRef};
use crate::random::Rand;
use crate::state::State;
use crate::target::{ArgType, Dir, Field, ResourceDesc, Syscall};

/// How many nested constructor calls may be emitted to obtain one resource.
pub const MAX_RESOURCE_DEPTH: usize = 3;

/// Produces concrete calls for a chosen descriptor.
pub trait CallSynthesizer {
    /// Returns helper calls first and the call for `meta` last. Must not
    /// return an empty vector.
    fn synthesize(&mut self, r: &mut Rand<'_>, s: &mut State<'_>, meta: &Arc<Syscall>) -> Vec<Call>;
}

/// Default synthesizer: random argument values plus constructor calls for
/// missing resources.
#[derive(Debug, Clone)]
pub struct ArgSynthesizer {
    max_depth: usize,
}

impl Default for ArgSynthesizer {
    fn default() -> Self {
        Self {
            max_depth: MAX_RESOURCE_DEPTH,
        }
    }
}

impl ArgSynthesizer {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    fn generate_call(
        &self,
        r: &mut Rand<'_>,
        s: &mut State<'_>,
        meta: &Arc<Syscall>,
        depth: usize,
        calls: &mut Vec<Call>,
    ) {
        let mut args = Vec::with_capacity(meta.args.len());
        for field in &meta.args {
            let arg = self.generate_arg(r, s, field, depth, calls);
            args.push(arg);
        }
        let ret = meta.ret.as_ref().map(|_| s.alloc_id());
        calls.push(Call {
            meta: meta.clone(),
            args,
            ret,
        });
    }

    fn generate_arg(
        &self,
        r: &mut Rand<'_>,
        s: &mut State<'_>,
        field: &Field,
        depth: usize,
        calls: &mut Vec<Call>,
    ) -> Arg {
        match &field.ty {
            ArgType::Const(val) => Arg::Const(*val),
            ArgType::Int { bits, range } => Arg::Const(int_value(r, *bits, *range)),
            ArgType::Flags { vals, bitmask } => Arg::Const(flags_value(r, vals, *bitmask)),
            ArgType::Buffer { min, max } => {
                let len = r.range_inclusive(*min as u64, *max as u64) as usize;
                let mut data = vec![0u8; len];
                r.fill(&mut data);
                Arg::Data(data)
            }
            ArgType::Resource { name } => match field.dir {
                Dir::Out => Arg::Output(s.alloc_id()),
                Dir::In => Arg::Input(self.resource_ref(r, s, name, depth, calls)),
            },
        }
    }

    fn resource_ref(
        &self,
        r: &mut Rand<'_>,
        s: &mut State<'_>,
        name: &str,
        depth: usize,
        calls: &mut Vec<Call>,
    ) -> ResourceRef {
        let target = s.target;
        let Some(wanted) = target.resource(name) else {
            return ResourceRef::Default(0);
        };

        let mut live = s.live(wanted);
        live.extend(pending(s, calls, wanted));
        if !live.is_empty() && r.n_out_of(4, 5) {
            return ResourceRef::Live(live[r.intn(live.len())]);
        }
        if depth < self.max_depth {
            if let Some(id) = self.create_resource(r, s, name, wanted, depth, calls) {
                return ResourceRef::Live(id);
            }
        }
        if !live.is_empty() {
            return ResourceRef::Live(live[r.intn(live.len())]);
        }
        ResourceRef::Default(wanted.values[r.intn(wanted.values.len())])
    }

    /// Emit a constructor call producing `wanted` and return the new id.
    fn create_resource(
        &self,
        r: &mut Rand<'_>,
        s: &mut State<'_>,
        name: &str,
        wanted: &ResourceDesc,
        depth: usize,
        calls: &mut Vec<Call>,
    ) -> Option<ResourceId> {
        let target = s.target;
        let ctors: Vec<usize> = target
            .resource_ctors(name)
            .iter()
            .copied()
            .filter(|&id| s.ct.enabled(id))
            .collect();
        if ctors.is_empty() {
            return None;
        }
        let meta = &target.syscalls()[ctors[r.intn(ctors.len())]];
        self.generate_call(r, s, meta, depth + 1, calls);

        let ctor = calls.last()?;
        let found = ctor.produced_resources().find(|&(have, _)| {
            target
                .resource(have)
                .is_some_and(|have| have.satisfies(wanted))
        });
        found.map(|(_, id)| id)
    }
}

impl CallSynthesizer for ArgSynthesizer {
    fn synthesize(&mut self, r: &mut Rand<'_>, s: &mut State<'_>, meta: &Arc<Syscall>) -> Vec<Call> {
        let mut calls = Vec::new();
        self.generate_call(r, s, meta, 0, &mut calls);
        calls
    }
}

/// Resources produced by helper calls emitted earlier in this synthesis.
fn pending(s: &State<'_>, calls: &[Call], wanted: &ResourceDesc) -> Vec<ResourceId> {
    calls
        .iter()
        .flat_map(|call| call.produced_resources())
        .filter(|&(have, _)| {
            s.target
                .resource(have)
                .is_some_and(|have| have.satisfies(wanted))
        })
        .map(|(_, id)| id)
        .collect()
}

fn int_value(r: &mut Rand<'_>, bits: u8, range: Option<(u64, u64)>) -> u64 {
    if let Some((lo, hi)) = range {
        return r.range_inclusive(lo, hi);
    }
    let mask = if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    match r.intn(10) {
        0 => 0,
        1 => 1,
        2 => mask,
        _ => r.u64() & mask,
    }
}

fn flags_value(r: &mut Rand<'_>, vals: &[u64], bitmask: bool) -> u64 {
    if vals.is_empty() {
        return 0;
    }
    if !bitmask {
        return vals[r.intn(vals.len())];
    }
    let mut v = 0;
    for _ in 0..1 + r.intn(3) {
        v |= vals[r.intn(vals.len())];
    }
    v
}
