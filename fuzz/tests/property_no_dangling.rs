//! Property: no dangling resource references, no ineligible calls
//!
//! Every live resource reference in a generated program points at a
//! resource produced by an earlier call that is still present, and no call
//! is disabled or no-generate, even after ineligible calls were offered to
//! the bias pool.

mod common;

use std::collections::HashSet;

use kpio_proggen::{Arg, BiasRegistry, ChoiceTable, GenerateConfig, Generator, ResourceRef};
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn references_resolve_to_earlier_calls(
        seed in any::<u64>(),
        ncalls in 1usize..40,
        bias_chance in 0usize..=10,
    ) {
        let target = common::riscv_target();
        let ct = ChoiceTable::build(&target, None);
        let reg = BiasRegistry::new();
        for call in target.syscalls() {
            reg.register(Some(call));
        }

        let mut gen = Generator::new(&target, &ct)
            .with_registry(&reg)
            .with_config(GenerateConfig {
                bias_chance,
                validate: false,
                ..GenerateConfig::default()
            });
        let mut rs = SmallRng::seed_from_u64(seed);
        let p = gen.generate(&mut rs, ncalls).expect("generation should succeed");

        let mut produced = HashSet::new();
        for call in p.calls() {
            prop_assert!(call.meta.is_generatable(), "{} leaked", call.meta.name);
            for arg in &call.args {
                if let Arg::Input(ResourceRef::Live(id)) = arg {
                    prop_assert!(produced.contains(id), "r{} dangles in {}", id, call);
                }
            }
            produced.extend(call.produced());
        }
    }
}
