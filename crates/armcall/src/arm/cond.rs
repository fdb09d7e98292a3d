use std::fmt;

/// ARM condition codes.
///
/// Every instruction the engine emits is predicated; `Al` (always) renders as
/// the empty suffix. All sixteen codes are accepted for save/restore blocks
/// and address resolution alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cond {
    Eq,
    Ne,
    Cs,
    Cc,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
    Nv,
}

impl Cond {
    pub const ALL: [Self; 16] = [
        Self::Eq,
        Self::Ne,
        Self::Cs,
        Self::Cc,
        Self::Mi,
        Self::Pl,
        Self::Vs,
        Self::Vc,
        Self::Hi,
        Self::Ls,
        Self::Ge,
        Self::Lt,
        Self::Gt,
        Self::Le,
        Self::Al,
        Self::Nv,
    ];

    /// Mnemonic suffix; empty for `Al`.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Cs => "cs",
            Self::Cc => "cc",
            Self::Mi => "mi",
            Self::Pl => "pl",
            Self::Vs => "vs",
            Self::Vc => "vc",
            Self::Hi => "hi",
            Self::Ls => "ls",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Le => "le",
            Self::Al => "",
            Self::Nv => "nv",
        }
    }

    #[must_use]
    pub fn from_suffix(s: &str) -> Option<Self> {
        if s.is_empty() || s == "al" {
            return Some(Self::Al);
        }
        Self::ALL.into_iter().find(|c| c.suffix() == s)
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_distinct_suffixes() {
        assert_eq!(Cond::ALL.len(), 16);
        for c in Cond::ALL {
            if c == Cond::Al {
                assert_eq!(c.suffix(), "");
            } else {
                assert_eq!(c.suffix().len(), 2);
            }
        }
    }

    #[test]
    fn suffix_roundtrip() {
        for c in Cond::ALL {
            assert_eq!(Cond::from_suffix(c.suffix()), Some(c));
        }
        assert_eq!(Cond::from_suffix("al"), Some(Cond::Al));
        assert_eq!(Cond::from_suffix("zz"), None);
    }
}
