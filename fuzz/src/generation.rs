//! Random program generation.
//!
//! The generator alternates between two ways of picking the next call:
//! drawing from the [`BiasRegistry`] pool in short bursts, or asking the
//! [`CallSelector`] for a weighted choice. Each pick is synthesized (possibly
//! with helper calls that manufacture missing resources), recorded in the
//! [`State`], and appended. Overshoot from the last synthesis is trimmed so
//! the result has exactly the requested length.

use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;

use rand::RngCore;

use crate::bias::{self, BiasRegistry};
use crate::choice::{CallSelector, ChoiceTable};
use crate::error::{GenerateError, ValidationError};
use crate::prog::Prog;
use crate::random::Rand;
use crate::state::State;
use crate::synth::{ArgSynthesizer, CallSynthesizer};
use crate::target::{Syscall, Target};

/// Biased mode is entered when the draw falls below this value...
pub const DEFAULT_BIAS_CHANCE: usize = 3;
/// ...out of this many.
pub const DEFAULT_BIAS_SCALE: usize = 10;
/// Upper bound of biased calls per burst.
pub const DEFAULT_MAX_BURST: usize = 3;

/// Generator tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateConfig {
    /// Numerator of the biased-mode probability.
    pub bias_chance: usize,
    /// Denominator of the biased-mode probability.
    pub bias_scale: usize,
    /// A burst draws `1..=max_burst` biased calls.
    pub max_burst: usize,
    /// Run [`StructuralValidator`] on every program when no custom
    /// validator is installed.
    pub validate: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            bias_chance: DEFAULT_BIAS_CHANCE,
            bias_scale: DEFAULT_BIAS_SCALE,
            max_burst: DEFAULT_MAX_BURST,
            validate: cfg!(debug_assertions),
        }
    }
}

/// How the next call(s) are picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Draw `count` calls uniformly from the bias pool.
    BiasedDraw { count: usize },
    /// Ask the call selector.
    GeneralDraw,
}

impl SelectionStrategy {
    /// Flip the bias coin. No randomness is consumed when the pool is empty.
    pub fn decide(r: &mut Rand<'_>, pool_len: usize, config: &GenerateConfig) -> Self {
        if pool_len > 0 && r.intn(config.bias_scale) < config.bias_chance {
            SelectionStrategy::BiasedDraw {
                count: 1 + r.intn(config.max_burst),
            }
        } else {
            SelectionStrategy::GeneralDraw
        }
    }
}

/// Post-generation check.
pub trait ProgValidator {
    fn validate(&self, prog: &Prog<'_>) -> Result<(), ValidationError>;
}

/// Full structural and resource-consistency check, see [`Prog::validate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl ProgValidator for StructuralValidator {
    fn validate(&self, prog: &Prog<'_>) -> Result<(), ValidationError> {
        prog.validate()
    }
}

/// Program generator bound to one target and choice table.
pub struct Generator<'a> {
    target: &'a Target,
    ct: &'a ChoiceTable,
    selector: &'a dyn CallSelector,
    registry: &'a BiasRegistry,
    synth: Box<dyn CallSynthesizer + 'a>,
    validator: Option<Box<dyn ProgValidator + 'a>>,
    config: GenerateConfig,
}

impl<'a> Generator<'a> {
    /// Generator drawing general calls from `ct` and biased calls from the
    /// process-wide pool.
    pub fn new(target: &'a Target, ct: &'a ChoiceTable) -> Self {
        Self {
            target,
            ct,
            selector: ct,
            registry: bias::global(),
            synth: Box::new(ArgSynthesizer::default()),
            validator: None,
            config: GenerateConfig::default(),
        }
    }

    pub fn with_registry(mut self, registry: &'a BiasRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the general-mode selector. `ct` still defines the enabled
    /// set used for resource constructors.
    pub fn with_selector(mut self, selector: &'a dyn CallSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_synthesizer(mut self, synth: impl CallSynthesizer + 'a) -> Self {
        self.synth = Box::new(synth);
        self
    }

    /// Install a validator; it runs regardless of [`GenerateConfig::validate`].
    pub fn with_validator(mut self, validator: impl ProgValidator + 'a) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn with_config(mut self, config: GenerateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GenerateConfig {
        &self.config
    }

    /// Generate a program of exactly `ncalls` calls.
    pub fn generate(
        &mut self,
        rs: &mut dyn RngCore,
        ncalls: usize,
    ) -> Result<Prog<'a>, GenerateError> {
        let mut p = Prog::new(self.target);
        let mut r = Rand::new(rs);
        let mut s = State::new(self.target, self.ct);

        while p.len() < ncalls {
            let pool = self.pool();
            match SelectionStrategy::decide(&mut r, pool.len(), &self.config) {
                SelectionStrategy::BiasedDraw { count } => {
                    log::trace!("[KPIO Gen] biased burst of {} at call {}", count, p.len());
                    for _ in 0..count {
                        let pool = self.pool();
                        if p.len() >= ncalls || pool.is_empty() {
                            break;
                        }
                        let meta = &pool[r.intn(pool.len())];
                        self.append(&mut r, &mut s, &mut p, meta)?;
                    }
                }
                SelectionStrategy::GeneralDraw => {
                    let meta = self.select(&mut r, &p)?;
                    self.append(&mut r, &mut s, &mut p, &meta)?;
                }
            }
        }

        // The last synthesis may have emitted resource constructors past the
        // requested length. Dropping them leaves the final call with default
        // resource values.
        while p.len() > ncalls {
            let removed = p.remove_call(ncalls - 1);
            log::trace!("[KPIO Gen] trimmed overshoot call {}", removed.meta.name);
        }
        p.sanitize_fix();
        self.check(&p)?;

        log::debug!(
            "[KPIO Gen] generated {} calls ({} synthesized)",
            p.len(),
            s.len()
        );
        Ok(p)
    }

    /// Current bias pool restricted to this target's descriptors.
    fn pool(&self) -> Vec<Arc<Syscall>> {
        let mut pool = self.registry.snapshot();
        pool.retain(|call| self.target.owns(call));
        pool
    }

    fn select(&self, r: &mut Rand<'_>, p: &Prog<'_>) -> Result<Arc<Syscall>, GenerateError> {
        let meta = self.selector.next(r, p).ok_or(GenerateError::NoEnabledCalls)?;
        let allowed = meta.is_generatable()
            && self.target.owns(&meta)
            && self.selector.is_allowed(&meta);
        if !allowed {
            log::error!("[KPIO Gen] selector returned disallowed call {}", meta.name);
            return Err(GenerateError::DisallowedCall {
                call: meta.name.clone(),
            });
        }
        Ok(meta)
    }

    fn append(
        &mut self,
        r: &mut Rand<'_>,
        s: &mut State<'_>,
        p: &mut Prog<'_>,
        meta: &Arc<Syscall>,
    ) -> Result<(), GenerateError> {
        let calls = self.synth.synthesize(r, s, meta);
        if calls.is_empty() {
            log::error!("[KPIO Gen] synthesizer returned nothing for {}", meta.name);
            return Err(GenerateError::EmptySynthesis {
                call: meta.name.clone(),
            });
        }
        for call in calls {
            s.analyze(&call);
            p.push(call);
        }
        Ok(())
    }

    fn check(&self, p: &Prog<'_>) -> Result<(), GenerateError> {
        let result = match &self.validator {
            Some(validator) => validator.validate(p),
            None if self.config.validate => StructuralValidator.validate(p),
            None => Ok(()),
        };
        if let Err(err) = &result {
            log::error!("[KPIO Gen] invalid program: {}\n{}", err, p.to_string());
        }
        result.map_err(GenerateError::from)
    }
}

impl Target {
    /// Generate a random program with `ncalls` calls.
    ///
    /// `ct` restricts general selection to its enabled calls; `None` uses
    /// every generatable call. Biased calls come from the process-wide pool.
    pub fn generate<'a>(
        &'a self,
        rs: &mut dyn RngCore,
        ncalls: usize,
        ct: Option<&'a ChoiceTable>,
    ) -> Result<Prog<'a>, GenerateError> {
        let ct = match ct {
            Some(ct) => ct,
            None => self.default_choice_table(),
        };
        Generator::new(self, ct).generate(rs, ncalls)
    }
}
