use std::fmt;

/// ARM register file.
///
/// Sixteen registers. r0-r10 are general purpose; the remaining five carry
/// fixed roles in the calling convention (see [`crate::abi`]): fp is the
/// default frame base, ip the call-lowering scratch, sp the full-descending
/// stack pointer, lr the link register and pc the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Reg {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    Fp = 11,
    Ip = 12,
    Sp = 13,
    Lr = 14,
    Pc = 15,
}

impl Reg {
    /// Architectural register number, 0-15.
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn from_number(n: u8) -> Option<Self> {
        Some(match n {
            0 => Self::R0,
            1 => Self::R1,
            2 => Self::R2,
            3 => Self::R3,
            4 => Self::R4,
            5 => Self::R5,
            6 => Self::R6,
            7 => Self::R7,
            8 => Self::R8,
            9 => Self::R9,
            10 => Self::R10,
            11 => Self::Fp,
            12 => Self::Ip,
            13 => Self::Sp,
            14 => Self::Lr,
            15 => Self::Pc,
            _ => return None,
        })
    }

    /// Parse a register name. Accepts both numeric (`r11`) and role (`fp`)
    /// spellings.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fp" => return Some(Self::Fp),
            "ip" => return Some(Self::Ip),
            "sp" => return Some(Self::Sp),
            "lr" => return Some(Self::Lr),
            "pc" => return Some(Self::Pc),
            _ => {}
        }
        let n: u8 = name.strip_prefix('r')?.parse().ok()?;
        Self::from_number(n)
    }

    /// True for r0-r3, the inbound argument registers.
    #[must_use]
    pub const fn is_arg(self) -> bool {
        self.number() < 4
    }

    /// True for the registers the callee must preserve by convention (r4-r10).
    #[must_use]
    pub const fn is_callee_saved(self) -> bool {
        let n = self.number();
        n >= 4 && n <= 10
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fp => write!(f, "fp"),
            Self::Ip => write!(f, "ip"),
            Self::Sp => write!(f, "sp"),
            Self::Lr => write!(f, "lr"),
            Self::Pc => write!(f, "pc"),
            other => write!(f, "r{}", other.number()),
        }
    }
}
