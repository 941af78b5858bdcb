//! Syscall catalog.
//!
//! A [`Target`] describes every syscall the fuzzer knows about for one
//! OS/architecture pair: argument shapes, the resource kinds each call
//! produces and consumes, and attribute flags. It is built once and then
//! shared read-only by every generation run.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use bitflags::bitflags;
use hashbrown::HashMap;

use crate::choice::ChoiceTable;
use crate::error::TargetError;
use crate::prog::Call;

bitflags! {
    /// Syscall attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SyscallAttrs: u32 {
        /// Never generated, never executed.
        const DISABLED = 1 << 0;
        /// Not chosen by random generation, still usable through other paths.
        const NO_GENERATE = 1 << 1;
    }
}

/// Direction of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    /// Read by the kernel.
    In,
    /// Written by the kernel.
    Out,
}

/// Shape of one syscall argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    /// Fixed value.
    Const(u64),
    /// Integer of `bits` width, optionally restricted to an inclusive range.
    Int { bits: u8, range: Option<(u64, u64)> },
    /// One of `vals`, or an OR-combination of them when `bitmask` is set.
    Flags { vals: Vec<u64>, bitmask: bool },
    /// Opaque byte buffer with a length in `min..=max`.
    Buffer { min: usize, max: usize },
    /// Kernel resource of the named kind.
    Resource { name: String },
}

impl ArgType {
    /// Lower bound above the upper one.
    fn inverted(&self) -> bool {
        match self {
            ArgType::Int {
                range: Some((lo, hi)),
                ..
            } => lo > hi,
            ArgType::Buffer { min, max } => min > max,
            _ => false,
        }
    }
}

/// A named syscall argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: ArgType,
    pub dir: Dir,
}

impl Field {
    pub fn input(name: &str, ty: ArgType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            dir: Dir::In,
        }
    }

    pub fn output(name: &str, ty: ArgType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            dir: Dir::Out,
        }
    }

    /// Resource name if this field carries a resource.
    pub fn resource(&self) -> Option<&str> {
        match &self.ty {
            ArgType::Resource { name } => Some(name),
            _ => None,
        }
    }
}

/// Resource kind description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDesc {
    pub name: String,
    /// Subtype chain, most general first (`["fd", "sock"]`).
    pub kind: Vec<String>,
    /// Special values; the first one is the default.
    pub values: Vec<u64>,
}

impl ResourceDesc {
    /// Value used when no live resource is available.
    pub fn default_value(&self) -> u64 {
        self.values.first().copied().unwrap_or(0)
    }

    /// Whether a resource of this kind may be passed where `wanted` is expected.
    pub fn satisfies(&self, wanted: &ResourceDesc) -> bool {
        self.kind.len() >= wanted.kind.len() && self.kind.starts_with(&wanted.kind)
    }
}

/// Catalog description of one syscall.
#[derive(Debug)]
pub struct Syscall {
    /// Index into [`Target::syscalls`].
    pub id: usize,
    pub nr: u64,
    /// Full name including the specialization suffix (`openat$dir`).
    pub name: String,
    /// Kernel call name (`openat`).
    pub call_name: String,
    pub args: Vec<Field>,
    /// Resource kind returned by the call.
    pub ret: Option<String>,
    pub attrs: SyscallAttrs,
    /// Architecture this call is specific to, if any.
    pub arch: Option<String>,
}

impl Syscall {
    pub fn is_disabled(&self) -> bool {
        self.attrs.contains(SyscallAttrs::DISABLED)
    }

    /// Eligible for random generation.
    pub fn is_generatable(&self) -> bool {
        !self
            .attrs
            .intersects(SyscallAttrs::DISABLED | SyscallAttrs::NO_GENERATE)
    }

    /// Resource names produced by the call (return value and output arguments).
    pub fn produces(&self) -> impl Iterator<Item = &str> {
        self.ret.as_deref().into_iter().chain(
            self.args
                .iter()
                .filter(|f| f.dir == Dir::Out)
                .filter_map(Field::resource),
        )
    }

    /// Resource names consumed by the call.
    pub fn consumes(&self) -> impl Iterator<Item = &str> {
        self.args
            .iter()
            .filter(|f| f.dir == Dir::In)
            .filter_map(Field::resource)
    }
}

/// Input to [`TargetBuilder::syscall`].
#[derive(Debug, Clone)]
pub struct SyscallDef {
    name: String,
    nr: u64,
    args: Vec<Field>,
    ret: Option<String>,
    attrs: SyscallAttrs,
    arch: Option<String>,
}

impl SyscallDef {
    pub fn new(name: &str, nr: u64) -> Self {
        Self {
            name: name.to_string(),
            nr,
            args: Vec::new(),
            ret: None,
            attrs: SyscallAttrs::empty(),
            arch: None,
        }
    }

    pub fn arg(mut self, field: Field) -> Self {
        self.args.push(field);
        self
    }

    pub fn ret(mut self, resource: &str) -> Self {
        self.ret = Some(resource.to_string());
        self
    }

    pub fn attrs(mut self, attrs: SyscallAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn arch(mut self, arch: &str) -> Self {
        self.arch = Some(arch.to_string());
        self
    }
}

/// Per-call fixup applied after generation.
pub type Sanitizer = fn(&mut Call);

/// Builder for [`Target`].
pub struct TargetBuilder {
    os: String,
    arch: String,
    resources: Vec<ResourceDesc>,
    syscalls: Vec<SyscallDef>,
    sanitizer: Option<Sanitizer>,
}

impl TargetBuilder {
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
            resources: Vec::new(),
            syscalls: Vec::new(),
            sanitizer: None,
        }
    }

    /// Declare a resource kind. `kind` lists the subtype chain, most general first.
    pub fn resource(mut self, name: &str, kind: &[&str], values: &[u64]) -> Self {
        self.resources.push(ResourceDesc {
            name: name.to_string(),
            kind: kind.iter().map(|k| k.to_string()).collect(),
            values: values.to_vec(),
        });
        self
    }

    pub fn syscall(mut self, def: SyscallDef) -> Self {
        self.syscalls.push(def);
        self
    }

    pub fn sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    /// Validate the catalog and freeze it.
    pub fn build(self) -> Result<Target, TargetError> {
        let mut resource_map = HashMap::new();
        let mut resources = Vec::with_capacity(self.resources.len());
        for (idx, res) in self.resources.into_iter().enumerate() {
            if res.values.is_empty() {
                return Err(TargetError::NoResourceValues { name: res.name });
            }
            if resource_map.insert(res.name.clone(), idx).is_some() {
                return Err(TargetError::DuplicateResource { name: res.name });
            }
            resources.push(Arc::new(res));
        }

        let mut syscall_map = HashMap::new();
        let mut syscalls = Vec::with_capacity(self.syscalls.len());
        for (id, def) in self.syscalls.into_iter().enumerate() {
            let referenced = def
                .ret
                .iter()
                .map(String::as_str)
                .chain(def.args.iter().filter_map(Field::resource));
            for name in referenced {
                if !resource_map.contains_key(name) {
                    return Err(TargetError::UnknownResource {
                        call: def.name.clone(),
                        resource: name.to_string(),
                    });
                }
            }
            if let Some(field) = def.args.iter().find(|f| f.ty.inverted()) {
                return Err(TargetError::InvalidBounds {
                    call: def.name.clone(),
                    arg: field.name.clone(),
                });
            }
            if syscall_map.insert(def.name.clone(), id).is_some() {
                return Err(TargetError::DuplicateSyscall { name: def.name });
            }
            let call_name = match def.name.split_once('$') {
                Some((base, _)) => base.to_string(),
                None => def.name.clone(),
            };
            syscalls.push(Arc::new(Syscall {
                id,
                nr: def.nr,
                name: def.name,
                call_name,
                args: def.args,
                ret: def.ret,
                attrs: def.attrs,
                arch: def.arch,
            }));
        }

        let ctors: Vec<Vec<usize>> = resources
            .iter()
            .map(|wanted| {
                syscalls
                    .iter()
                    .filter(|call| call.is_generatable())
                    .filter(|call| {
                        call.produces()
                            .any(|name| resources[resource_map[name]].satisfies(wanted))
                    })
                    .map(|call| call.id)
                    .collect()
            })
            .collect();

        Ok(Target {
            os: self.os,
            arch: self.arch,
            syscalls,
            resources,
            syscall_map,
            resource_map,
            ctors,
            sanitizer: self.sanitizer,
            default_ct: spin::Once::new(),
        })
    }
}

/// Immutable syscall catalog for one OS/architecture.
pub struct Target {
    pub os: String,
    pub arch: String,
    syscalls: Vec<Arc<Syscall>>,
    resources: Vec<Arc<ResourceDesc>>,
    syscall_map: HashMap<String, usize>,
    resource_map: HashMap<String, usize>,
    /// Constructor call ids per resource index.
    ctors: Vec<Vec<usize>>,
    sanitizer: Option<Sanitizer>,
    default_ct: spin::Once<ChoiceTable>,
}

impl Target {
    pub fn syscalls(&self) -> &[Arc<Syscall>] {
        &self.syscalls
    }

    pub fn syscall(&self, name: &str) -> Option<&Arc<Syscall>> {
        self.syscall_map.get(name).map(|&id| &self.syscalls[id])
    }

    pub fn resource(&self, name: &str) -> Option<&Arc<ResourceDesc>> {
        self.resource_map.get(name).map(|&idx| &self.resources[idx])
    }

    pub fn resources(&self) -> &[Arc<ResourceDesc>] {
        &self.resources
    }

    /// Generatable calls producing a resource usable as `name`.
    pub fn resource_ctors(&self, name: &str) -> &[usize] {
        match self.resource_map.get(name) {
            Some(&idx) => &self.ctors[idx],
            None => &[],
        }
    }

    /// Whether `call` is this target's own descriptor.
    pub fn owns(&self, call: &Arc<Syscall>) -> bool {
        self.syscalls
            .get(call.id)
            .is_some_and(|own| Arc::ptr_eq(own, call))
    }

    pub(crate) fn sanitize_call(&self, call: &mut Call) {
        if let Some(sanitize) = self.sanitizer {
            sanitize(call);
        }
    }

    /// Choice table over every generatable call, built on first use.
    pub fn default_choice_table(&self) -> &ChoiceTable {
        self.default_ct.call_once(|| ChoiceTable::build(self, None))
    }
}

impl core::fmt::Debug for Target {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Target")
            .field("os", &self.os)
            .field("arch", &self.arch)
            .field("syscalls", &self.syscalls.len())
            .field("resources", &self.resources.len())
            .finish()
    }
}
