//! Property: exact program length
//!
//! For any random seed, target length N and bias probability, the generated
//! program has exactly N calls and passes the structural check.

mod common;

use kpio_proggen::{BiasRegistry, ChoiceTable, GenerateConfig, Generator};
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn generated_length_matches_request(
        seed in any::<u64>(),
        ncalls in 0usize..40,
        bias_chance in 0usize..=10,
    ) {
        let target = common::riscv_target();
        let ct = ChoiceTable::build(&target, None);
        let reg = BiasRegistry::new();
        reg.register_arch_calls(&target, "riscv64");

        let mut gen = Generator::new(&target, &ct)
            .with_registry(&reg)
            .with_config(GenerateConfig {
                bias_chance,
                validate: true,
                ..GenerateConfig::default()
            });
        let mut rs = SmallRng::seed_from_u64(seed);
        let p = gen.generate(&mut rs, ncalls).expect("generation should succeed");

        prop_assert_eq!(p.len(), ncalls);
        prop_assert!(p.validate().is_ok());
    }

    /// Restricting the enabled set never changes the length contract.
    #[test]
    fn restricted_table_keeps_length(seed in any::<u64>(), ncalls in 0usize..25) {
        let target = common::riscv_target();
        let enabled: Vec<_> = ["read", "write", "listen"]
            .iter()
            .filter_map(|name| target.syscall(name).cloned())
            .collect();
        let ct = ChoiceTable::build(&target, Some(&enabled));
        let reg = BiasRegistry::new();

        let mut gen = Generator::new(&target, &ct).with_registry(&reg);
        let mut rs = SmallRng::seed_from_u64(seed);
        let p = gen.generate(&mut rs, ncalls).expect("generation should succeed");

        prop_assert_eq!(p.len(), ncalls);
        for call in p.calls() {
            prop_assert!(["read", "write", "listen"].contains(&call.meta.name.as_str()));
        }
    }
}
