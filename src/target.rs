use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The architecture whose word size and alignment rules are used. Names follow
/// `GOARCH`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Target {
    Amd64,
    Arm64,
    Riscv64,
    Wasm,
    I386,
    Arm,
}

impl Target {
    pub const ALL: [Target; 6] = [
        Target::Amd64,
        Target::Arm64,
        Target::Riscv64,
        Target::Wasm,
        Target::I386,
        Target::Arm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Target::Amd64 => "amd64",
            Target::Arm64 => "arm64",
            Target::Riscv64 => "riscv64",
            Target::Wasm => "wasm",
            Target::I386 => "386",
            Target::Arm => "arm",
        }
    }

    pub fn from_name(name: &str) -> Option<Target> {
        Target::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// The target matching the machine this tool runs on, amd64 if there is no
    /// Go port for it.
    pub fn host() -> Target {
        match std::env::consts::ARCH {
            "aarch64" => Target::Arm64,
            "riscv64" => Target::Riscv64,
            "wasm32" => Target::Wasm,
            "x86" => Target::I386,
            "arm" => Target::Arm,
            _ => Target::Amd64,
        }
    }

    pub fn word_size(&self) -> u64 {
        match self {
            Target::Amd64 | Target::Arm64 | Target::Riscv64 | Target::Wasm => 8,
            Target::I386 | Target::Arm => 4,
        }
    }

    pub fn max_align(&self) -> u64 {
        self.word_size()
    }

    /// Largest size a single type may have, as enforced by the gc compiler.
    pub fn max_object_size(&self) -> u64 {
        match self.word_size() {
            8 => 1 << 50,
            _ => (1 << 31) - 1,
        }
    }

    /// Alignment of a basic type of the given size.
    pub fn basic_align(&self, size: u64) -> u64 {
        size.clamp(1, self.max_align())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Target, String> {
        Target::from_name(s).ok_or_else(|| {
            let known = Target::ALL.map(|t| t.name()).join(", ");
            format!("unknown target \"{s}\", expected one of: {known}")
        })
    }
}
