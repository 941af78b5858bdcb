//! KPIO Syscall Program Generation
//!
//! Builds random, resource-consistent syscall programs for the kernel
//! fuzzer. A [`Target`] describes the syscall catalog, a [`ChoiceTable`]
//! weights the next call, and the [`Generator`] assembles programs of an
//! exact length, optionally over-sampling calls from a [`BiasRegistry`].
//!
//! ```ignore
//! let target = catalog();
//! bias::global().register_arch_calls(&target, "riscv64");
//! let prog = target.generate(&mut rng, 10, None)?;
//! ```

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod bias;
pub mod choice;
pub mod error;
pub mod generation;
pub mod prog;
pub mod random;
pub mod state;
pub mod synth;
pub mod target;

pub use bias::{biased_calls, register_biased_call, BiasRegistry};
pub use choice::{CallSelector, ChoiceTable};
pub use error::{GenerateError, TargetError, ValidationError};
pub use generation::{
    GenerateConfig, Generator, ProgValidator, SelectionStrategy, StructuralValidator,
};
pub use prog::{Arg, Call, Prog, ResourceId, ResourceRef};
pub use random::Rand;
pub use state::State;
pub use synth::{ArgSynthesizer, CallSynthesizer};
pub use target::{
    ArgType, Dir, Field, ResourceDesc, Syscall, SyscallAttrs, SyscallDef, Target, TargetBuilder,
};
