//! Catalogs shared by the integration tests.

use kpio_proggen::{ArgType, Field, SyscallAttrs, SyscallDef, Target, TargetBuilder};

pub fn res(name: &str) -> ArgType {
    ArgType::Resource {
        name: name.to_string(),
    }
}

/// Small Linux/riscv64 catalog with files, sockets, pipes and a few
/// architecture-specific calls, some of them ineligible for generation.
pub fn riscv_target() -> Target {
    TargetBuilder::new("linux", "riscv64")
        .resource("fd", &["fd"], &[u64::MAX, 0, 1, 2])
        .resource("sock", &["fd", "sock"], &[u64::MAX])
        .syscall(
            SyscallDef::new("openat", 56)
                .arg(Field::input("dirfd", ArgType::Const(0xffffff9c)))
                .arg(Field::input("path", ArgType::Buffer { min: 1, max: 16 }))
                .arg(Field::input(
                    "flags",
                    ArgType::Flags {
                        vals: vec![0, 1, 2, 0x40, 0x200],
                        bitmask: true,
                    },
                ))
                .ret("fd"),
        )
        .syscall(SyscallDef::new("close", 57).arg(Field::input("fd", res("fd"))))
        .syscall(
            SyscallDef::new("read", 63)
                .arg(Field::input("fd", res("fd")))
                .arg(Field::input("len", ArgType::Int { bits: 32, range: Some((0, 4096)) })),
        )
        .syscall(
            SyscallDef::new("write", 64)
                .arg(Field::input("fd", res("fd")))
                .arg(Field::input("buf", ArgType::Buffer { min: 0, max: 32 })),
        )
        .syscall(
            SyscallDef::new("dup", 23)
                .arg(Field::input("oldfd", res("fd")))
                .ret("fd"),
        )
        .syscall(
            SyscallDef::new("pipe2", 59)
                .arg(Field::output("rfd", res("fd")))
                .arg(Field::output("wfd", res("fd")))
                .arg(Field::input("flags", ArgType::Flags { vals: vec![0, 0x80000], bitmask: false })),
        )
        .syscall(
            SyscallDef::new("socket$inet", 198)
                .arg(Field::input("domain", ArgType::Const(2)))
                .arg(Field::input("type", ArgType::Int { bits: 8, range: Some((1, 3)) }))
                .ret("sock"),
        )
        .syscall(
            SyscallDef::new("listen", 201)
                .arg(Field::input("sock", res("sock")))
                .arg(Field::input("backlog", ArgType::Int { bits: 32, range: None })),
        )
        .syscall(
            SyscallDef::new("accept", 202)
                .arg(Field::input("sock", res("sock")))
                .ret("sock"),
        )
        .syscall(SyscallDef::new("riscv_flush_icache", 259).arch("riscv64"))
        .syscall(
            SyscallDef::new("riscv_hwprobe", 258)
                .arg(Field::input("pairs", ArgType::Buffer { min: 16, max: 64 }))
                .arch("riscv64"),
        )
        .syscall(
            SyscallDef::new("riscv_close_fd", 900)
                .arg(Field::input("fd", res("fd")))
                .arch("riscv64"),
        )
        .syscall(
            SyscallDef::new("riscv_disabled", 901)
                .arch("riscv64")
                .attrs(SyscallAttrs::DISABLED),
        )
        .syscall(
            SyscallDef::new("riscv_hidden", 902)
                .arch("riscv64")
                .attrs(SyscallAttrs::NO_GENERATE),
        )
        .syscall(SyscallDef::new("reboot", 142).attrs(SyscallAttrs::DISABLED))
        .syscall(
            SyscallDef::new("syz_open_dev", 1000)
                .ret("fd")
                .attrs(SyscallAttrs::NO_GENERATE),
        )
        .build()
        .expect("riscv catalog is well formed")
}

/// Three-call catalog: `a` produces `r`, `b` consumes it, `c` is
/// architecture specific.
pub fn abc_target() -> Target {
    TargetBuilder::new("linux", "riscv64")
        .resource("r", &["r"], &[u64::MAX])
        .syscall(SyscallDef::new("a", 1).ret("r"))
        .syscall(SyscallDef::new("b", 2).arg(Field::input("r", res("r"))))
        .syscall(SyscallDef::new("c", 3).arch("riscv64"))
        .build()
        .expect("abc catalog is well formed")
}
