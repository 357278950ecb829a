use jshake::ast::{
    BinOp, Binary, Block, Call, DeclStmt, DeclTarget, Expr, FieldRef, Literal, New, Stmt,
};
use jshake::graph::{MethodId, PrimType, RefType, TypeId, TypeRef, WellKnown};
use jshake::{Error, MemberId, OverrideIndex, Program, ProgramBuilder, ReachabilityAnalyzer};

struct Runtime {
    object: TypeId,
    string: TypeId,
    to_string: MethodId,
}

fn install_runtime(b: &mut ProgramBuilder) -> Runtime {
    let object = b.add_class("Object", None);
    let string = b.add_class("String", Some(object));
    b.mark_final(string);
    let array_base = b.add_class("Array", Some(object));
    let to_string = b.add_method(object, "toString", TypeRef::Declared(string));
    b.set_well_known(WellKnown {
        string_type: string,
        base_array_type: array_base,
        object_to_string: to_string,
        foreign_wrapper: None,
    });
    Runtime {
        object,
        string,
        to_string,
    }
}

fn analyze(program: &Program) -> jshake::MarkSets {
    let _ = env_logger::builder().is_test(true).try_init();
    let overrides = OverrideIndex::build(program);
    let mut analyzer = ReachabilityAnalyzer::new(program, &overrides);
    analyzer.traverse_from_entry_points().unwrap();
    analyzer.into_marks()
}

fn call(target: MethodId) -> Expr {
    Expr::Call(Call {
        target,
        receiver: None,
        args: vec![],
    })
}

#[test]
fn instantiation_marks_type_ctor_and_clinit() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let foo = b.add_class("Foo", Some(rt.object));
    let ctor = b.add_constructor(foo);
    let unused = b.add_class("Unused", Some(rt.object));
    let unused_m = b.add_static_method(unused, "helper", TypeRef::Void);
    let main_t = b.add_class("Main", Some(rt.object));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    b.set_body(
        main,
        Block::of(vec![Stmt::Expression(Expr::New(New {
            ctor,
            args: vec![],
        }))]),
    );
    b.add_entry_method(main);
    let program = b.build().unwrap();

    let marks = analyze(&program);
    assert!(marks.is_referenced(RefType::Declared(foo)));
    assert!(marks.is_instantiated(RefType::Declared(foo)));
    assert!(marks.is_live(MemberId::Method(ctor)));
    assert!(marks.is_live(MemberId::Method(program.static_initializer(foo))));
    // Superclasses of an instantiated type are referenced only.
    assert!(marks.is_referenced(RefType::Declared(rt.object)));
    assert!(!marks.is_instantiated(RefType::Declared(rt.object)));
    // Nothing pulls the unrelated type in.
    assert!(!marks.is_referenced(RefType::Declared(unused)));
    assert!(!marks.is_live(MemberId::Method(unused_m)));
}

#[test]
fn analysis_is_deterministic_across_runs() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let foo = b.add_class("Foo", Some(rt.object));
    let ctor = b.add_constructor(foo);
    let helper = b.add_static_method(foo, "helper", TypeRef::Prim(PrimType::Int));
    let main_t = b.add_class("Main", Some(rt.object));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    b.set_body(
        main,
        Block::of(vec![
            Stmt::Expression(Expr::New(New { ctor, args: vec![] })),
            Stmt::Expression(call(helper)),
            Stmt::Expression(Expr::Literal(Literal::Str("hello".into()))),
        ]),
    );
    b.add_entry_method(main);
    let program = b.build().unwrap();
    let overrides = OverrideIndex::build(&program);

    let mut first = ReachabilityAnalyzer::new(&program, &overrides);
    first.traverse_from_entry_points().unwrap();
    let mut second = ReachabilityAnalyzer::new(&program, &overrides);
    second.traverse_from_entry_points().unwrap();

    let a = first.into_marks();
    let b = second.into_marks();
    assert_eq!(a.referenced_types(), b.referenced_types());
    assert_eq!(a.instantiated_types(), b.instantiated_types());
    assert_eq!(a.live_members(), b.live_members());
    assert_eq!(a.live_strings(), b.live_strings());
}

#[test]
fn dead_store_elides_written_never_read_local() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let main_t = b.add_class("Main", Some(rt.object));
    let side = b.add_static_method(main_t, "side", TypeRef::Prim(PrimType::Int));
    let other = b.add_static_method(main_t, "other", TypeRef::Prim(PrimType::Int));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    let x = b.add_local(main, "x", TypeRef::Prim(PrimType::Int));
    b.set_body(
        main,
        Block::of(vec![
            Stmt::Declaration(DeclStmt {
                target: DeclTarget::Local(x),
                initializer: Some(call(side)),
            }),
            Stmt::Expression(Expr::Binary(Binary {
                op: BinOp::Assign,
                lhs: Box::new(Expr::VarRef(x)),
                rhs: Box::new(call(other)),
                ty: TypeRef::Prim(PrimType::Int),
            })),
        ]),
    );
    b.add_entry_method(main);
    let program = b.build().unwrap();

    let marks = analyze(&program);
    // Both right-hand sides keep their effects; the store target dies.
    assert!(marks.is_live(MemberId::Method(side)));
    assert!(marks.is_live(MemberId::Method(other)));
    assert!(!marks.is_live(MemberId::Var(x)));
}

#[test]
fn read_local_stays_live() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let main_t = b.add_class("Main", Some(rt.object));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    let x = b.add_local(main, "x", TypeRef::Prim(PrimType::Int));
    b.set_body(
        main,
        Block::of(vec![
            Stmt::Declaration(DeclStmt {
                target: DeclTarget::Local(x),
                initializer: Some(Expr::Literal(Literal::Int(1))),
            }),
            Stmt::Return(Some(Expr::VarRef(x))),
        ]),
    );
    b.add_entry_method(main);
    let program = b.build().unwrap();

    let marks = analyze(&program);
    assert!(marks.is_live(MemberId::Var(x)));
}

#[test]
fn control_flow_branches_are_traversed() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let main_t = b.add_class("Main", Some(rt.object));
    let cond = b.add_static_method(main_t, "cond", TypeRef::Prim(PrimType::Boolean));
    let then_m = b.add_static_method(main_t, "onThen", TypeRef::Void);
    let else_m = b.add_static_method(main_t, "onElse", TypeRef::Void);
    let loop_m = b.add_static_method(main_t, "onLoop", TypeRef::Void);
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    b.set_body(
        main,
        Block::of(vec![
            Stmt::If(jshake::ast::IfStmt {
                condition: call(cond),
                then_branch: Box::new(Stmt::Expression(call(then_m))),
                else_branch: Some(Box::new(Stmt::Expression(call(else_m)))),
            }),
            Stmt::While(jshake::ast::WhileStmt {
                condition: call(cond),
                body: Box::new(Stmt::Expression(call(loop_m))),
            }),
        ]),
    );
    b.add_entry_method(main);
    let program = b.build().unwrap();

    let marks = analyze(&program);
    for m in [cond, then_m, else_m, loop_m] {
        assert!(marks.is_live(MemberId::Method(m)));
    }
}

#[test]
fn unvisited_string_literal_stays_dead() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let main_t = b.add_class("Main", Some(rt.object));
    let dead = b.add_static_method(main_t, "dead", TypeRef::Void);
    b.set_body(
        dead,
        Block::of(vec![Stmt::Expression(Expr::Literal(Literal::Str(
            "abc".into(),
        )))]),
    );
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    b.set_body(
        main,
        Block::of(vec![Stmt::Expression(Expr::Literal(Literal::Str(
            "hi".into(),
        )))]),
    );
    b.add_entry_method(main);
    let program = b.build().unwrap();

    let marks = analyze(&program);
    assert!(marks.live_strings().contains("hi"));
    assert!(!marks.live_strings().contains("abc"));
    assert!(!marks.is_live(MemberId::Method(dead)));
    // A live literal implies live string instances.
    assert!(marks.is_instantiated(RefType::Declared(rt.string)));
}

#[test]
fn concat_with_reference_operand_rescues_to_string() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let foo = b.add_class("Foo", Some(rt.object));
    let main_t = b.add_class("Main", Some(rt.object));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    let p = b.add_param(main, "p", TypeRef::Declared(foo));
    b.set_body(
        main,
        Block::of(vec![Stmt::Expression(Expr::Binary(Binary {
            op: BinOp::Add,
            lhs: Box::new(Expr::Literal(Literal::Str("x=".into()))),
            rhs: Box::new(Expr::VarRef(p)),
            ty: TypeRef::Declared(rt.string),
        }))]),
    );
    b.add_entry_method(main);
    let program = b.build().unwrap();

    let marks = analyze(&program);
    assert!(marks.is_live(MemberId::Method(rt.to_string)));
}

#[test]
fn concat_with_char_operand_rescues_char_conversion() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let value_of = b.add_static_method(rt.string, "valueOf", TypeRef::Declared(rt.string));
    b.add_param(value_of, "c", TypeRef::Prim(PrimType::Char));
    let main_t = b.add_class("Main", Some(rt.object));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    b.set_body(
        main,
        Block::of(vec![Stmt::Expression(Expr::Binary(Binary {
            op: BinOp::Add,
            lhs: Box::new(Expr::Literal(Literal::Str("c=".into()))),
            rhs: Box::new(Expr::Literal(Literal::Char('c'))),
            ty: TypeRef::Declared(rt.string),
        }))]),
    );
    b.add_entry_method(main);
    let program = b.build().unwrap();

    let marks = analyze(&program);
    assert!(marks.is_live(MemberId::Method(value_of)));
    // The char conversion never drags the universal toString along.
    assert!(!marks.is_live(MemberId::Method(rt.to_string)));
}

#[test]
fn concat_without_char_conversion_is_an_error() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let main_t = b.add_class("Main", Some(rt.object));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    b.set_body(
        main,
        Block::of(vec![Stmt::Expression(Expr::Binary(Binary {
            op: BinOp::Add,
            lhs: Box::new(Expr::Literal(Literal::Str("c=".into()))),
            rhs: Box::new(Expr::Literal(Literal::Char('c'))),
            ty: TypeRef::Declared(rt.string),
        }))]),
    );
    b.add_entry_method(main);
    let program = b.build().unwrap();

    let overrides = OverrideIndex::build(&program);
    let mut analyzer = ReachabilityAnalyzer::new(&program, &overrides);
    let err = analyzer.traverse_from_entry_points().unwrap_err();
    assert!(matches!(err, Error::MissingWellKnown { .. }));
}

#[test]
fn volatile_field_write_keeps_field_live() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let holder = b.add_class("Holder", Some(rt.object));
    let flag = b.add_static_field(holder, "flag", TypeRef::Prim(PrimType::Int));
    b.mark_volatile(flag);
    let plain = b.add_static_field(holder, "plain", TypeRef::Prim(PrimType::Int));
    let main_t = b.add_class("Main", Some(rt.object));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    let store = |field| {
        Stmt::Expression(Expr::Binary(Binary {
            op: BinOp::Assign,
            lhs: Box::new(Expr::FieldRef(FieldRef {
                field,
                instance: None,
            })),
            rhs: Box::new(Expr::Literal(Literal::Int(1))),
            ty: TypeRef::Prim(PrimType::Int),
        }))
    };
    b.set_body(main, Block::of(vec![store(flag), store(plain)]));
    b.add_entry_method(main);
    let program = b.build().unwrap();

    let marks = analyze(&program);
    // A volatile store is observable; an ordinary write-only field dies.
    assert!(marks.is_live(MemberId::Field(flag)));
    assert!(!marks.is_live(MemberId::Field(plain)));
    assert!(marks.is_referenced(RefType::Declared(holder)));
}

#[test]
fn add_assign_concat_rescues_conversions() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let foo = b.add_class("Foo", Some(rt.object));
    let main_t = b.add_class("Main", Some(rt.object));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    let s = b.add_local(main, "s", TypeRef::Declared(rt.string));
    let p = b.add_param(main, "p", TypeRef::Declared(foo));
    b.set_body(
        main,
        Block::of(vec![Stmt::Expression(Expr::Binary(Binary {
            op: BinOp::AddAssign,
            lhs: Box::new(Expr::VarRef(s)),
            rhs: Box::new(Expr::VarRef(p)),
            ty: TypeRef::Declared(rt.string),
        }))]),
    );
    b.add_entry_method(main);
    let program = b.build().unwrap();

    let marks = analyze(&program);
    assert!(marks.is_live(MemberId::Method(rt.to_string)));
    // Compound assignment reads its target.
    assert!(marks.is_live(MemberId::Var(s)));
}

#[test]
fn expr_probe_pins_no_enclosing_method() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let foo = b.add_class("Foo", Some(rt.object));
    let ctor = b.add_constructor(foo);
    let main_t = b.add_class("Main", Some(rt.object));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    let program = b.build().unwrap();
    let overrides = OverrideIndex::build(&program);

    let mut analyzer = ReachabilityAnalyzer::new(&program, &overrides);
    analyzer
        .traverse_from_expr(&Expr::New(New { ctor, args: vec![] }))
        .unwrap();
    assert!(analyzer.instantiated_types().contains(&RefType::Declared(foo)));
    assert!(analyzer.live_members().contains(&MemberId::Method(ctor)));
    assert!(!analyzer.live_members().contains(&MemberId::Method(main)));
}

#[test]
fn type_probe_marks_referenced_only() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let foo = b.add_class("Foo", Some(rt.object));
    let ctor = b.add_constructor(foo);
    let program = b.build().unwrap();
    let overrides = OverrideIndex::build(&program);

    let mut analyzer = ReachabilityAnalyzer::new(&program, &overrides);
    analyzer
        .traverse_from_type(RefType::Declared(foo))
        .unwrap();
    assert!(analyzer.referenced_types().contains(&RefType::Declared(foo)));
    assert!(!analyzer.instantiated_types().contains(&RefType::Declared(foo)));
    assert!(analyzer
        .live_members()
        .contains(&MemberId::Method(program.static_initializer(foo))));
    assert!(!analyzer.live_members().contains(&MemberId::Method(ctor)));
}

#[test]
fn class_literal_marks_without_structural_rescue() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let class_obj = b.add_class("Class", Some(rt.object));
    let class_ctor = b.add_constructor(class_obj);
    let widget = b.add_class("Widget", Some(rt.object));
    let widget_m = b.add_method(widget, "draw", TypeRef::Void);
    let setup = b.add_static_method(widget, "setup", TypeRef::Void);
    let widget_clinit = b.static_initializer(widget);
    b.set_body(
        widget_clinit,
        Block::of(vec![
            Stmt::Expression(call(setup)),
            Stmt::Expression(Expr::Literal(Literal::Str("Widget".into()))),
        ]),
    );
    let literal = b.add_static_field(widget, "class$", TypeRef::Declared(class_obj));
    b.set_field_initializer(
        literal,
        Expr::New(New {
            ctor: class_ctor,
            args: vec![],
        }),
    );
    let main_t = b.add_class("Main", Some(rt.object));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    b.set_body(
        main,
        Block::of(vec![Stmt::Expression(Expr::ClassLiteral(literal))]),
    );
    b.add_entry_method(main);
    let program = b.build().unwrap();

    let marks = analyze(&program);
    assert!(marks.is_live(MemberId::Field(literal)));
    assert!(marks.is_referenced(RefType::Declared(widget)));
    assert!(!marks.is_instantiated(RefType::Declared(widget)));
    // The initializer creates the reflective object.
    assert!(marks.is_instantiated(RefType::Declared(class_obj)));
    // The subject's static initializer is marked live for the pruning
    // pass, but its body is not traversed: its callees and class-name
    // string stay out unless something else needs them.
    assert!(marks.is_live(MemberId::Method(widget_clinit)));
    assert!(!marks.is_live(MemberId::Method(setup)));
    assert!(!marks.live_strings().contains("Widget"));
    // The literal alone pulls in none of the subject's members.
    assert!(!marks.is_live(MemberId::Method(widget_m)));
}

#[test]
fn cloned_analyzer_forks_independent_marks() {
    let mut b = ProgramBuilder::new();
    let rt = install_runtime(&mut b);
    let main_t = b.add_class("Main", Some(rt.object));
    let main = b.add_static_method(main_t, "main", TypeRef::Void);
    let extra = b.add_static_method(main_t, "extra", TypeRef::Void);
    b.add_entry_method(main);
    let program = b.build().unwrap();
    let overrides = OverrideIndex::build(&program);

    let mut base = ReachabilityAnalyzer::new(&program, &overrides);
    base.traverse_from_entry_points().unwrap();
    let mut fork = base.clone();
    fork.traverse_from_method(extra).unwrap();

    assert!(fork.marks().is_live(MemberId::Method(extra)));
    assert!(!base.marks().is_live(MemberId::Method(extra)));
    assert!(base.marks().is_live(MemberId::Method(main)));
}
