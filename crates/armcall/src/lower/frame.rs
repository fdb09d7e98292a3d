//! Frame layout planning.
//!
//! One `FrameLayout` is built per procedure from its declaration and is the
//! single source of byte offsets for every named slot. Regions from low to
//! high address, relative to the frame base (which sits at the bottom of the
//! saved-register block):
//!
//! ```text
//! [locals][saved registers][spilled r0-r3 copies][caller-pushed arguments]
//! ```
//!
//! The caller and callee never exchange layout information; they agree only
//! through the convention, which is why the stack-argument count is a pure
//! function of the parameter count.

use crate::abi::{self, MAX_REG_ARGS, WORD_BYTES};
use crate::arm::{Reg, RegSet};

/// Choice of frame-base register for one procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBase {
    /// The dedicated frame-base register (r11).
    Fp,
    /// Any general register.
    Reg(Reg),
    /// The stack pointer itself. Offsets then carry the current locals size
    /// as a bias, recomputed at each access because sp moves as locals are
    /// reserved.
    Sp,
}

impl FrameBase {
    #[must_use]
    pub const fn reg(self) -> Reg {
        match self {
            Self::Fp => abi::FRAME_BASE_DEFAULT,
            Self::Reg(r) => r,
            Self::Sp => Reg::Sp,
        }
    }
}

/// Whether incoming register arguments are copied to frame slots on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpillPolicy {
    /// r0-r3 are stored to fixed slots above the save block; parameter names
    /// address those slots.
    Spill,
    /// The first four parameter names alias r0-r3 directly. Such a parameter
    /// has no address, and reading it after the register was overwritten is
    /// a caller obligation the engine cannot always prove.
    NoSpill,
}

/// A resolved named slot: either a frame-relative location or a register
/// alias (no-spill parameters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRef {
    Frame(i32),
    Reg(Reg),
}

#[derive(Debug)]
pub struct FrameLayout {
    base: FrameBase,
    spill: SpillPolicy,
    params: Vec<String>,
    saves: RegSet,
    locals_bytes: u32,
}

impl FrameLayout {
    #[must_use]
    pub fn new(base: FrameBase, spill: SpillPolicy, params: Vec<String>, saves: RegSet) -> Self {
        Self {
            base,
            spill,
            params,
            saves,
            locals_bytes: 0,
        }
    }

    #[must_use]
    pub const fn base(&self) -> FrameBase {
        self.base
    }

    #[must_use]
    pub const fn saves(&self) -> RegSet {
        self.saves
    }

    #[must_use]
    pub const fn spill(&self) -> SpillPolicy {
        self.spill
    }

    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn saved_bytes(&self) -> u32 {
        self.saves.len() as u32 * WORD_BYTES
    }

    /// How many incoming register arguments are copied to the frame.
    #[must_use]
    pub fn spilled_count(&self) -> usize {
        match self.spill {
            SpillPolicy::Spill => self.params.len().min(MAX_REG_ARGS),
            SpillPolicy::NoSpill => 0,
        }
    }

    #[must_use]
    pub fn spilled_bytes(&self) -> u32 {
        self.spilled_count() as u32 * WORD_BYTES
    }

    /// Number of arguments the caller passes on the stack; the only layout
    /// fact shared across the call boundary.
    #[must_use]
    pub fn stack_arg_count(&self) -> usize {
        self.params.len().saturating_sub(MAX_REG_ARGS)
    }

    /// Total bytes of locals reserved so far (every block already rounded).
    #[must_use]
    pub const fn locals_bytes(&self) -> u32 {
        self.locals_bytes
    }

    pub fn add_locals(&mut self, bytes: u32) {
        debug_assert!(bytes % WORD_BYTES == 0, "locals blocks are word-rounded");
        self.locals_bytes += bytes;
    }

    /// Bias applied to every frame-relative offset. Zero for a dedicated
    /// base register; the current locals size when the base is sp, because
    /// sp has moved down by exactly that much since the frame was set up.
    fn bias(&self) -> i32 {
        match self.base {
            FrameBase::Sp => self.locals_bytes as i32,
            FrameBase::Fp | FrameBase::Reg(_) => 0,
        }
    }

    #[must_use]
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p == name)
    }

    /// Resolve parameter `index` to its slot.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range for the declared parameter list.
    #[must_use]
    pub fn param_slot(&self, index: usize) -> SlotRef {
        assert!(index < self.params.len(), "parameter index out of range");
        if index < MAX_REG_ARGS {
            match self.spill {
                SpillPolicy::NoSpill => SlotRef::Reg(abi::arg_reg(index)),
                SpillPolicy::Spill => SlotRef::Frame(
                    self.bias() + (self.saved_bytes() + index as u32 * WORD_BYTES) as i32,
                ),
            }
        } else {
            let above = self.saved_bytes() + self.spilled_bytes();
            SlotRef::Frame(
                self.bias() + (above + (index - MAX_REG_ARGS) as u32 * WORD_BYTES) as i32,
            )
        }
    }

    /// Turn a base-relative local offset (assigned by the allocator) into
    /// the offset valid at the current point of the procedure.
    #[must_use]
    pub fn local_slot(&self, assigned_offset: i32) -> SlotRef {
        SlotRef::Frame(self.bias() + assigned_offset)
    }
}
