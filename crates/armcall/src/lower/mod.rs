mod address;
mod call;
mod emitter;
mod frame;
mod locals;
mod operand;
mod proc;
mod save_restore;

pub use address::{Place, Scope, classify, emit_load, resolve_address};
pub use call::lower_call;
pub use emitter::{Emitter, IsaMode, Item};
pub use frame::{FrameBase, FrameLayout, SlotRef, SpillPolicy};
pub use locals::{LocalArea, LocalVar};
pub use operand::{AddressExpr, Argument, ImmValue, eval_literal};
pub use proc::{ProcedureDecl, ProcedureLowering};
pub use save_restore::{emit_restore, emit_restore_and_return, emit_save};
