//! Property-based tests for the lowering engine.
//!
//! Uses `proptest` to generate random inputs and verify invariants:
//! - save/restore pairs always net to zero stack displacement
//! - emitted save-set order is canonical regardless of declaration order
//! - single-register sets never use block transfers, larger sets always do
//! - frame offsets ascend with the documented gap at the save block
//! - call lowering reserves and releases overflow space exactly once

use proptest::prelude::*;

use armcall::lower::{emit_restore, emit_restore_and_return, emit_save};
use armcall::test_harness::*;
use armcall::{
    Argument, Cond, Emitter, FrameBase, ProcedureDecl, ProcedureLowering, Reg, RegSet,
    SpillPolicy, SymbolTable, lower_call,
};

fn reg_strategy() -> impl Strategy<Value = Reg> {
    // Anything but sp and pc can appear in a save set.
    (0u8..15)
        .prop_filter("sp is never saved", |n| *n != 13)
        .prop_map(|n| Reg::from_number(n).expect("0-14 is a valid register number"))
}

fn regset_strategy() -> impl Strategy<Value = RegSet> {
    prop::collection::vec(reg_strategy(), 1..8).prop_map(|regs| regs.into_iter().collect())
}

fn cond_strategy() -> impl Strategy<Value = Cond> {
    (0usize..16).prop_map(|i| Cond::ALL[i])
}

fn imm_arg(value: u32) -> Argument {
    Argument::parse(&value.to_string()).expect("decimal literal")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// restore(S, C) undoes exactly the stack effect of save(S, C).
    #[test]
    fn save_restore_symmetry(regs in regset_strategy(), cond in cond_strategy()) {
        let mut e = Emitter::new(0);
        emit_save(&mut e, cond, regs);
        emit_restore(&mut e, cond, regs);
        prop_assert_eq!(sp_delta(&instructions(&e)), Some(0));
    }

    /// The fused restore-and-return pops the same number of words the save
    /// pushed, whether or not lr is replaced by pc.
    #[test]
    fn fused_return_preserves_symmetry(regs in regset_strategy(), cond in cond_strategy()) {
        let mut e = Emitter::new(0);
        emit_save(&mut e, cond, regs);
        emit_restore_and_return(&mut e, cond, regs);
        prop_assert_eq!(sp_delta(&instructions(&e)), Some(0));
    }

    /// Declaration order never changes the emitted block.
    #[test]
    fn save_order_is_canonical(mut regs in prop::collection::vec(reg_strategy(), 2..8)) {
        let forward: RegSet = regs.iter().copied().collect();
        regs.reverse();
        let backward: RegSet = regs.iter().copied().collect();

        let mut a = Emitter::new(0);
        emit_save(&mut a, Cond::Al, forward);
        let mut b = Emitter::new(0);
        emit_save(&mut b, Cond::Al, backward);
        prop_assert_eq!(rendered(&a), rendered(&b));

        // Operand order inside the block is ascending register number.
        let ascending: Vec<Reg> = forward.iter().collect();
        let mut sorted = ascending.clone();
        sorted.sort_by_key(|r| r.number());
        prop_assert_eq!(ascending, sorted);
    }

    /// One register: single transfer. Two or more: exactly one block
    /// transfer in each direction.
    #[test]
    fn transfer_form_follows_set_size(regs in regset_strategy()) {
        let mut e = Emitter::new(0);
        emit_save(&mut e, Cond::Al, regs);
        emit_restore(&mut e, Cond::Al, regs);
        let blocks = count_block_transfers(&instructions(&e));
        if regs.len() == 1 {
            prop_assert_eq!(blocks, 0);
        } else {
            prop_assert_eq!(blocks, 2);
        }
        prop_assert_eq!(instructions(&e).len(), 2);
    }

    /// Spilled parameter offsets ascend, caller-pushed offsets ascend, and
    /// the spilled region starts exactly one save block above the base.
    #[test]
    fn frame_offsets_are_monotonic(
        param_count in 1usize..10,
        saves in regset_strategy(),
    ) {
        let mut e = Emitter::new(0x8000);
        let mut syms = SymbolTable::new();
        let params: Vec<String> = (0..param_count).map(|i| format!("p{i}")).collect();
        let p = ProcedureLowering::begin(
            &mut e,
            &mut syms,
            ProcedureDecl {
                name: "f".into(),
                params,
                saves,
                spill: SpillPolicy::Spill,
                base: FrameBase::Fp,
            },
        )
        .unwrap();
        let layout = p.layout();
        let offsets: Vec<i32> = (0..param_count)
            .map(|i| match layout.param_slot(i) {
                armcall::lower::SlotRef::Frame(off) => off,
                armcall::lower::SlotRef::Reg(_) => unreachable!("spill layout"),
            })
            .collect();
        for pair in offsets.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        prop_assert_eq!(offsets[0], layout.saved_bytes() as i32);
    }

    /// 0-4 arguments never touch sp; more emit exactly one reserve/release
    /// pair of (n-4)*4 bytes.
    #[test]
    fn overflow_reservation_is_exact(arg_count in 0usize..10) {
        let mut e = Emitter::new(0x8000);
        let mut syms = SymbolTable::new();
        syms.define_external("f", 0x8100).unwrap();
        let args: Vec<Argument> = (0..arg_count as u32).map(imm_arg).collect();
        lower_call(&mut e, &syms, None, "f", &args).unwrap();
        let adjustments = sp_adjustments(&instructions(&e));
        if arg_count <= 4 {
            prop_assert!(adjustments.is_empty());
        } else {
            let bytes = (arg_count as i32 - 4) * 4;
            prop_assert_eq!(adjustments, vec![-bytes, bytes]);
        }
        prop_assert_eq!(sp_delta(&instructions(&e)), Some(0));
    }

    /// A call passing one value everywhere materializes it exactly once;
    /// every other placement is a store or a register move.
    #[test]
    fn identical_immediates_share_one_materialization(
        value in any::<u32>(),
        arg_count in 5usize..9,
    ) {
        let mut e = Emitter::new(0x8000);
        let mut syms = SymbolTable::new();
        syms.define_external("f", 0x8100).unwrap();
        let args: Vec<Argument> = (0..arg_count).map(|_| imm_arg(value)).collect();
        lower_call(&mut e, &syms, None, "f", &args).unwrap();
        prop_assert_eq!(count_imm_loads(&instructions(&e), value), 1);
    }

    /// Lowering the same call twice at the same origin is deterministic.
    #[test]
    fn lowering_is_deterministic(values in prop::collection::vec(any::<u32>(), 0..8)) {
        let mut syms = SymbolTable::new();
        syms.define_external("f", 0x8100).unwrap();
        let args: Vec<Argument> = values.iter().map(|v| imm_arg(*v)).collect();
        let mut a = Emitter::new(0x8000);
        lower_call(&mut a, &syms, None, "f", &args).unwrap();
        let mut b = Emitter::new(0x8000);
        lower_call(&mut b, &syms, None, "f", &args).unwrap();
        prop_assert_eq!(rendered(&a), rendered(&b));
    }
}
