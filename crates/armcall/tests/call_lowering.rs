//! End-to-end call-site lowering scenarios.

use armcall::test_harness::*;
use armcall::{
    Argument, Cond, Emitter, FrameBase, Instruction, ProcedureDecl, ProcedureLowering, Reg, RegSet,
    SpillPolicy, SymbolTable, lower_call,
};

fn imm(value: u32) -> Argument {
    Argument::parse(&value.to_string()).expect("decimal literal")
}

/// The six-argument scenario: `f(5, word [m], &x, "AB", r2, 5)`.
#[test]
fn six_argument_round_trip() {
    let mut e = Emitter::new(0x8000);
    let mut syms = SymbolTable::new();
    syms.define_external("f", 0x8200).unwrap();

    let mut caller = ProcedureLowering::begin(
        &mut e,
        &mut syms,
        ProcedureDecl {
            name: "caller".into(),
            params: vec!["m".into()],
            saves: RegSet::new().with(Reg::Lr),
            spill: SpillPolicy::Spill,
            base: FrameBase::Fp,
        },
    )
    .unwrap();
    caller.open_locals(&mut e).unwrap();
    caller.declare_local("x", 4, 4).unwrap();
    caller.close_locals(&mut e).unwrap();

    let before = instructions(&e).len();
    let args = vec![
        imm(5),
        Argument::parse("word [m]").unwrap(),
        Argument::parse("&x").unwrap(),
        Argument::parse("\"AB\"").unwrap(),
        Argument::parse("r2").unwrap(),
        imm(5),
    ];
    lower_call(&mut e, &syms, Some(&mut caller), "f", &args).unwrap();

    let call_seq = instructions(&e)[before..].to_vec();

    // Exactly one 8-byte reservation pair for the two overflow arguments.
    assert_eq!(sp_adjustments(&call_seq), vec![-8, 8]);

    // The duplicate immediate 5 is materialized once; the register argument
    // is stored without touching the scratch register in between.
    assert_eq!(count_imm_loads(&call_seq, 5), 1);

    // Two bytes of literal data, word-padded, skipped by a branch.
    let blocks = data_blocks(&e);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].0, 0x8014);
    assert_eq!(blocks[0].1, vec![b'A', b'B', 0, 0]);

    let text: Vec<String> = call_seq.iter().map(ToString::to_string).collect();
    assert_eq!(
        text,
        vec![
            // pre-pass: the literal's bytes live at 0x8014, jumped over
            "b 0x8018",
            "sub sp, sp, #8",
            // argument 6, duplicate immediate, via the scratch register
            "ldr ip, =5",
            "str ip, [sp, #4]",
            // argument 5, moved from its register
            "str r2, [sp]",
            // argument 4: address of the materialized literal
            "ldr r3, =0x8014",
            // argument 3: effective address of the local x
            "sub r2, fp, #4",
            // argument 2: width-extending load of the spilled parameter m
            "ldr r1, [fp, #8]",
            // argument 1: still cached in the scratch register
            "mov r0, ip",
            "bl 0x8200",
            "add sp, sp, #8",
        ]
    );

    caller.emit_return(&mut e, Cond::Al);
    caller.finish().unwrap();
}

#[test]
fn memory_arguments_use_width_extending_loads() {
    let mut e = Emitter::new(0x8000);
    let mut syms = SymbolTable::new();
    syms.define_external("f", 0x8100).unwrap();

    let mut p = ProcedureLowering::begin(
        &mut e,
        &mut syms,
        ProcedureDecl {
            name: "caller".into(),
            params: vec![],
            saves: RegSet::new().with(Reg::Lr),
            spill: SpillPolicy::Spill,
            base: FrameBase::Fp,
        },
    )
    .unwrap();
    p.open_locals(&mut e).unwrap();
    p.declare_local("c", 1, 1).unwrap();
    p.declare_local("h", 2, 2).unwrap();
    p.close_locals(&mut e).unwrap();

    let before = instructions(&e).len();
    let args = vec![
        Argument::parse("sbyte [c]").unwrap(),
        Argument::parse("hword [h]").unwrap(),
    ];
    lower_call(&mut e, &syms, Some(&mut p), "f", &args).unwrap();
    let text: Vec<String> = instructions(&e)[before..]
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(text, vec!["ldrh r1, [fp, #-4]", "ldrsb r0, [fp, #-1]", "bl 0x8100"]);
}

#[test]
fn no_spill_parameters_pass_through_registers() {
    let mut e = Emitter::new(0x8000);
    let mut syms = SymbolTable::new();
    syms.define_external("g", 0x8100).unwrap();

    let mut p = ProcedureLowering::begin(
        &mut e,
        &mut syms,
        ProcedureDecl {
            name: "caller".into(),
            params: vec!["a".into(), "b".into()],
            saves: RegSet::new().with(Reg::Lr),
            spill: SpillPolicy::NoSpill,
            base: FrameBase::Fp,
        },
    )
    .unwrap();

    let before = instructions(&e).len();
    // g(b, a): both arguments are register aliases, crossing moves.
    let args = vec![
        Argument::parse("[b]").unwrap(),
        Argument::parse("[a]").unwrap(),
    ];
    lower_call(&mut e, &syms, Some(&mut p), "g", &args).unwrap();
    let text: Vec<String> = instructions(&e)[before..]
        .iter()
        .map(ToString::to_string)
        .collect();
    // Argument 1 (index 1) lowered first: r1 = a's register (r0); then
    // argument 0: r0 = b's register (r1).
    assert_eq!(text, vec!["mov r1, r0", "mov r0, r1", "bl 0x8100"]);
}

#[test]
fn clobber_guarantee_holds() {
    let mut e = Emitter::new(0x8000);
    let mut syms = SymbolTable::new();
    syms.define_external("f", 0x4000_0000).unwrap();
    syms.define_external("x", 0x9000).unwrap();

    let args = vec![
        imm(1),
        Argument::parse("&x").unwrap(),
        Argument::parse("[x]").unwrap(),
        imm(2),
        imm(3),
        Argument::parse("&x+4").unwrap(),
    ];
    lower_call(&mut e, &syms, None, "f", &args).unwrap();

    for instr in instructions(&e) {
        let written: Vec<Reg> = match instr {
            Instruction::MovReg { dst, .. }
            | Instruction::LoadImm { dst, .. }
            | Instruction::AddImm { dst, .. }
            | Instruction::AddPc { dst, .. }
            | Instruction::Ldr { dst, .. } => vec![dst],
            Instruction::Bl { .. } | Instruction::Blx { .. } => vec![Reg::Lr],
            _ => vec![],
        };
        for reg in written {
            assert!(
                reg.is_arg() || reg == Reg::Ip || reg == Reg::Lr || reg == Reg::Sp,
                "call lowering clobbered {reg}"
            );
        }
    }
}

#[test]
fn wide_string_literals_double_their_bytes() {
    let mut e = Emitter::new(0x8000);
    let mut syms = SymbolTable::new();
    syms.define_external("print", 0x8100).unwrap();
    let args = vec![Argument::parse("w\"hi\"").unwrap()];
    lower_call(&mut e, &syms, None, "print", &args).unwrap();
    let blocks = data_blocks(&e);
    assert_eq!(blocks[0].1, vec![b'h', 0, b'i', 0]);
}

#[test]
fn calls_to_later_procedures_resolve_at_unit_close() {
    let mut e = Emitter::new(0x8000);
    let mut syms = SymbolTable::new();

    // A call to a procedure lowered later in the unit.
    lower_call(&mut e, &mut syms, None, "helper", &[imm(1)]).unwrap();
    e.emit(Instruction::Bx {
        cond: Cond::Al,
        reg: Reg::Lr,
    });

    let helper = ProcedureLowering::begin(
        &mut e,
        &mut syms,
        ProcedureDecl {
            name: "helper".into(),
            params: vec!["n".into()],
            saves: RegSet::EMPTY,
            spill: SpillPolicy::NoSpill,
            base: FrameBase::Fp,
        },
    )
    .unwrap();
    let entry = helper.entry();
    helper.emit_return(&mut e, Cond::Al);
    helper.finish().unwrap();

    e.resolve_fixups(&syms).unwrap();
    let text = rendered(&e);
    assert_eq!(text[1], format!("ldr ip, =0x{entry:x}"));
    assert_eq!(text[2], "blx ip");
}
