//! Programs: ordered sequences of concrete syscalls.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::error::ValidationError;
use crate::target::{ArgType, Dir, Field, ResourceDesc, Syscall, Target};

/// Identifier of a resource instance, unique within one program.
pub type ResourceId = usize;

/// Where a consumed resource comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    /// Produced by an earlier call of the same program.
    Live(ResourceId),
    /// Special value, no producing call.
    Default(u64),
}

/// Concrete argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Const(u64),
    Data(Vec<u8>),
    /// Resource written by the kernel into this argument.
    Output(ResourceId),
    /// Resource passed to the kernel.
    Input(ResourceRef),
}

/// One concrete syscall invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub meta: Arc<Syscall>,
    pub args: Vec<Arg>,
    /// Resource returned by the call.
    pub ret: Option<ResourceId>,
}

impl Call {
    /// Resource ids this call produces, return value first.
    pub fn produced(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.ret.into_iter().chain(self.args.iter().filter_map(|arg| match arg {
            Arg::Output(id) => Some(*id),
            _ => None,
        }))
    }

    /// Produced resource ids paired with their resource names.
    pub fn produced_resources(&self) -> impl Iterator<Item = (&str, ResourceId)> + '_ {
        let ret = self.meta.ret.as_deref().zip(self.ret);
        let outputs = self
            .meta
            .args
            .iter()
            .zip(&self.args)
            .filter_map(|(field, arg)| match (field.resource(), arg) {
                (Some(name), Arg::Output(id)) => Some((name, *id)),
                _ => None,
            });
        ret.into_iter().chain(outputs)
    }

    /// Live resource ids this call consumes.
    pub fn consumed(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.args.iter().filter_map(|arg| match arg {
            Arg::Input(ResourceRef::Live(id)) => Some(*id),
            _ => None,
        })
    }
}

impl PartialEq for Call {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.meta, &other.meta) && self.args == other.args && self.ret == other.ret
    }
}

impl Eq for Call {}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = self.ret {
            write!(f, "r{} = ", id)?;
        }
        write!(f, "{}(", self.meta.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match arg {
                Arg::Const(val) => write!(f, "{:#x}", val)?,
                Arg::Data(bytes) => {
                    f.write_str("\"")?;
                    for b in bytes {
                        write!(f, "{:02x}", b)?;
                    }
                    f.write_str("\"")?;
                }
                Arg::Output(id) => write!(f, "<r{}=>", id)?,
                Arg::Input(ResourceRef::Live(id)) => write!(f, "r{}", id)?,
                Arg::Input(ResourceRef::Default(val)) => write!(f, "{:#x}", val)?,
            }
        }
        f.write_str(")")
    }
}

/// A fuzzing test case.
#[derive(Debug, Clone)]
pub struct Prog<'t> {
    pub target: &'t Target,
    calls: Vec<Call>,
}

impl<'t> Prog<'t> {
    pub fn new(target: &'t Target) -> Self {
        Self {
            target,
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn push(&mut self, call: Call) {
        self.calls.push(call);
    }

    /// Remove the call at `idx`.
    ///
    /// Every reference to a resource the removed call produced is replaced
    /// with the resource's default value.
    pub fn remove_call(&mut self, idx: usize) -> Call {
        let removed = self.calls.remove(idx);
        let produced: Vec<ResourceId> = removed.produced().collect();
        if produced.is_empty() {
            return removed;
        }

        let target = self.target;
        for call in &mut self.calls {
            for (field, arg) in call.meta.args.iter().zip(call.args.iter_mut()) {
                if let Arg::Input(source) = arg {
                    if let ResourceRef::Live(id) = *source {
                        if produced.contains(&id) {
                            *source = ResourceRef::Default(default_for(target, field));
                        }
                    }
                }
            }
        }
        removed
    }

    /// Apply the target's per-call fixups.
    pub fn sanitize_fix(&mut self) {
        let target = self.target;
        for call in &mut self.calls {
            target.sanitize_call(call);
        }
    }

    /// Check structure and resource consistency of the whole program.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut produced: BTreeMap<ResourceId, &'t ResourceDesc> = BTreeMap::new();
        for (idx, call) in self.calls.iter().enumerate() {
            let outputs = self.validate_call(idx, call, &produced)?;
            for (id, desc) in outputs {
                if produced.insert(id, desc).is_some() {
                    return Err(ValidationError::new(
                        idx,
                        format!("resource r{} produced twice", id),
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_call(
        &self,
        idx: usize,
        call: &Call,
        produced: &BTreeMap<ResourceId, &'t ResourceDesc>,
    ) -> Result<Vec<(ResourceId, &'t ResourceDesc)>, ValidationError> {
        let meta = &call.meta;
        if !self.target.owns(meta) {
            return Err(ValidationError::new(
                idx,
                format!("{} is not a syscall of this target", meta.name),
            ));
        }
        if meta.is_disabled() {
            return Err(ValidationError::new(idx, format!("{} is disabled", meta.name)));
        }
        if call.args.len() != meta.args.len() {
            return Err(ValidationError::new(
                idx,
                format!(
                    "{} wants {} args, got {}",
                    meta.name,
                    meta.args.len(),
                    call.args.len()
                ),
            ));
        }

        let mut outputs = Vec::new();
        for (field, arg) in meta.args.iter().zip(&call.args) {
            let bad = |what: &str| {
                ValidationError::new(
                    idx,
                    format!("{} arg {}: {}", meta.name, field.name, what),
                )
            };
            match (&field.ty, field.dir, arg) {
                (ArgType::Resource { name }, Dir::Out, Arg::Output(id)) => {
                    outputs.push((*id, self.resource_desc(idx, name)?));
                }
                (ArgType::Resource { name }, Dir::In, Arg::Input(source)) => {
                    let wanted = self.resource_desc(idx, name)?;
                    if let ResourceRef::Live(id) = source {
                        match produced.get(id) {
                            None => {
                                return Err(bad(&format!("r{} used before it is produced", id)))
                            }
                            Some(have) if !have.satisfies(wanted) => {
                                return Err(bad(&format!(
                                    "r{} is {}, want {}",
                                    id, have.name, wanted.name
                                )))
                            }
                            Some(_) => {}
                        }
                    }
                }
                (ArgType::Const(want), _, Arg::Const(val)) => {
                    if want != val {
                        return Err(bad(&format!("const {:#x}, want {:#x}", val, want)));
                    }
                }
                (ArgType::Int { .. } | ArgType::Flags { .. }, _, Arg::Const(_)) => {}
                (ArgType::Buffer { min, max }, _, Arg::Data(bytes)) => {
                    if bytes.len() < *min || bytes.len() > *max {
                        return Err(bad(&format!("buffer of {} bytes", bytes.len())));
                    }
                }
                _ => return Err(bad("argument kind does not match its type")),
            }
        }

        match (&meta.ret, call.ret) {
            (Some(name), Some(id)) => outputs.push((id, self.resource_desc(idx, name)?)),
            (None, None) => {}
            (Some(_), None) => {
                return Err(ValidationError::new(
                    idx,
                    format!("{} is missing its return resource", meta.name),
                ))
            }
            (None, Some(_)) => {
                return Err(ValidationError::new(
                    idx,
                    format!("{} returns no resource", meta.name),
                ))
            }
        }
        Ok(outputs)
    }

    fn resource_desc(&self, idx: usize, name: &str) -> Result<&'t ResourceDesc, ValidationError> {
        self.target
            .resource(name)
            .map(|desc| &**desc)
            .ok_or_else(|| ValidationError::new(idx, format!("unknown resource {}", name)))
    }
}

impl PartialEq for Prog<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.target, other.target) && self.calls == other.calls
    }
}

impl Eq for Prog<'_> {}

impl fmt::Display for Prog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for call in &self.calls {
            writeln!(f, "{}", call)?;
        }
        Ok(())
    }
}

fn default_for(target: &Target, field: &Field) -> u64 {
    field
        .resource()
        .and_then(|name| target.resource(name))
        .map_or(0, |desc| desc.default_value())
}
