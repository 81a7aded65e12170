//! Scenario tests for function/global monomorphization: on-demand
//! specialization, memoization, cascading instantiation order, and the
//! warnings for ill-formed or excluded uses.

use std::collections::HashSet;

use schist_mono::errors::{MonoError, Warning};
use schist_mono::functions::FunctionMonomorphizer;
use schist_mono::ir::{
    Binder, Decl, Expr, ExprKind, File, Lid, Op, Program, Type, Width,
};
use schist_mono::Config;

// ============================================================================
// Builders
// ============================================================================

fn int64() -> Type {
    Type::Int(Width::I64)
}

/// `id : forall a. a -> a`
fn identity_fn() -> Decl {
    Decl::Function {
        cc: None,
        flags: vec![],
        type_arity: 1,
        ret: Type::Bound(0),
        name: Lid::local("id"),
        binders: vec![Binder::new("x", Type::Bound(0))],
        body: Expr::bound(0, Type::Bound(0)),
    }
}

/// `id<at>(arg)`
fn apply_at(name: &str, at: Type, arg: Expr) -> Expr {
    let fn_ty = Type::arrow(at.clone(), at.clone());
    let inst = Expr::new(
        ExprKind::TypeApp {
            head: Box::new(Expr::qualified(
                Lid::local(name),
                Type::arrow(Type::Bound(0), Type::Bound(0)),
            )),
            args: vec![at.clone()],
        },
        fn_ty,
    );
    Expr::app(inst, vec![arg], at)
}

fn main_fn(body: Expr) -> Decl {
    Decl::Function {
        cc: None,
        flags: vec![],
        type_arity: 0,
        ret: body.ty.clone(),
        name: Lid::local("main"),
        binders: vec![],
        body,
    }
}

fn run(program: Program) -> (Program, Vec<Warning>) {
    let config = Config::default();
    FunctionMonomorphizer::new(&config).run(program).unwrap()
}

fn decl_names(file: &File) -> Vec<String> {
    file.decls.iter().map(|d| d.lid().name.clone()).collect()
}

fn contains_type_app(e: &Expr) -> bool {
    match &e.node {
        ExprKind::TypeApp { .. } => true,
        ExprKind::App { head, args } => {
            contains_type_app(head) || args.iter().any(contains_type_app)
        }
        ExprKind::Tuple(es) => es.iter().any(contains_type_app),
        ExprKind::Flat(fields) => fields.iter().any(|(_, e)| contains_type_app(e)),
        ExprKind::Field { expr, .. } => contains_type_app(expr),
        ExprKind::Match { scrutinee, arms } => {
            contains_type_app(scrutinee) || arms.iter().any(|a| contains_type_app(&a.body))
        }
        ExprKind::AddrOf(inner) => contains_type_app(inner),
        _ => false,
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn identity_at_two_types_yields_two_specializations() {
    let body = {
        let first = apply_at("id", Type::Bool, Expr::bool_lit(true));
        let second = apply_at("id", int64(), Expr::bound(0, int64()));
        // Wrap both uses in one application so a single body exercises both.
        Expr::app(first, vec![second], Type::Bool)
    };
    let program = Program::new(vec![File::new("A", vec![identity_fn(), main_fn(body)])]);
    let (out, warnings) = run(program);
    assert!(warnings.is_empty());
    let file = &out.files[0];

    // The polymorphic source declaration is gone; both specializations come
    // before their first use.
    assert_eq!(
        decl_names(file),
        vec!["id__bool".to_string(), "id__int64".to_string(), "main".to_string()]
    );
    for d in &file.decls {
        match d {
            Decl::Function {
                type_arity, body, ..
            } => {
                assert_eq!(*type_arity, 0);
                assert!(!contains_type_app(body));
            }
            other => panic!("unexpected declaration: {:?}", other),
        }
    }
    match &file.decls[0] {
        Decl::Function { ret, binders, .. } => {
            assert_eq!(ret, &Type::Bool);
            assert_eq!(binders[0].ty, Type::Bool);
        }
        other => panic!("unexpected declaration: {:?}", other),
    }
}

#[test]
fn memoization_emits_each_instance_once() {
    let body = Expr::app(
        apply_at("id", Type::Bool, Expr::bool_lit(true)),
        vec![apply_at("id", Type::Bool, Expr::bool_lit(false))],
        Type::Bool,
    );
    let program = Program::new(vec![File::new("A", vec![identity_fn(), main_fn(body)])]);
    let (out, _) = run(program);
    assert_eq!(
        decl_names(&out.files[0]),
        vec!["id__bool".to_string(), "main".to_string()]
    );
}

#[test]
fn polymorphic_recursion_hits_the_memo() {
    // loop : forall a. a -> a, whose body calls loop<a> again.
    let recursive = Decl::Function {
        cc: None,
        flags: vec![],
        type_arity: 1,
        ret: Type::Bound(0),
        name: Lid::local("loop"),
        binders: vec![Binder::new("x", Type::Bound(0))],
        body: apply_at("loop", Type::Bound(0), Expr::bound(0, Type::Bound(0))),
    };
    let program = Program::new(vec![File::new(
        "A",
        vec![
            recursive,
            main_fn(apply_at("loop", Type::Bool, Expr::bool_lit(true))),
        ],
    )]);
    let (out, warnings) = run(program);
    assert!(warnings.is_empty());
    let file = &out.files[0];
    assert_eq!(
        decl_names(file),
        vec!["loop__bool".to_string(), "main".to_string()]
    );
    // The specialized body calls itself by its specialized name.
    match &file.decls[0] {
        Decl::Function { body, .. } => match &body.node {
            ExprKind::App { head, .. } => {
                assert_eq!(head.node, ExprKind::Qualified(Lid::local("loop__bool")));
            }
            other => panic!("unexpected body: {:?}", other),
        },
        other => panic!("unexpected declaration: {:?}", other),
    }
}

#[test]
fn cascading_instantiations_precede_their_caller() {
    // outer<a> calls inner<a>; using outer<bool> must emit inner__bool first.
    let inner = Decl::Function {
        cc: None,
        flags: vec![],
        type_arity: 1,
        ret: Type::Bound(0),
        name: Lid::local("inner"),
        binders: vec![Binder::new("x", Type::Bound(0))],
        body: Expr::bound(0, Type::Bound(0)),
    };
    let outer = Decl::Function {
        cc: None,
        flags: vec![],
        type_arity: 1,
        ret: Type::Bound(0),
        name: Lid::local("outer"),
        binders: vec![Binder::new("x", Type::Bound(0))],
        body: apply_at("inner", Type::Bound(0), Expr::bound(0, Type::Bound(0))),
    };
    let program = Program::new(vec![File::new(
        "A",
        vec![
            inner,
            outer,
            main_fn(apply_at("outer", Type::Bool, Expr::bool_lit(true))),
        ],
    )]);
    let (out, _) = run(program);
    assert_eq!(
        decl_names(&out.files[0]),
        vec![
            "inner__bool".to_string(),
            "outer__bool".to_string(),
            "main".to_string()
        ]
    );
}

#[test]
fn polymorphic_global_specializes() {
    // nil : forall a. ll a
    let nil = Decl::Global {
        flags: vec![],
        name: Lid::local("nil"),
        type_arity: 1,
        ty: Type::App(Lid::local("ll"), vec![Type::Bound(0)]),
        body: Expr::new(ExprKind::Unit, Type::App(Lid::local("ll"), vec![Type::Bound(0)])),
    };
    let use_site = Expr::new(
        ExprKind::TypeApp {
            head: Box::new(Expr::qualified(
                Lid::local("nil"),
                Type::App(Lid::local("ll"), vec![Type::Bound(0)]),
            )),
            args: vec![Type::Bool],
        },
        Type::App(Lid::local("ll"), vec![Type::Bool]),
    );
    let program = Program::new(vec![File::new("A", vec![nil, main_fn(use_site)])]);
    let (out, warnings) = run(program);
    assert!(warnings.is_empty());
    let file = &out.files[0];
    match &file.decls[0] {
        Decl::Global {
            name, type_arity, ty, ..
        } => {
            assert_eq!(name, &Lid::local("nil__bool"));
            assert_eq!(*type_arity, 0);
            assert_eq!(ty, &Type::App(Lid::local("ll"), vec![Type::Bool]));
        }
        other => panic!("unexpected declaration: {:?}", other),
    }
}

#[test]
fn external_polymorphic_reference_is_left_alone() {
    // No definition of ext in the map; the type application survives.
    let body = apply_at("ext", Type::Bool, Expr::bool_lit(true));
    let program = Program::new(vec![File::new("A", vec![main_fn(body)])]);
    let (out, warnings) = run(program);
    assert!(warnings.is_empty());
    match &out.files[0].decls[0] {
        Decl::Function { body, .. } => assert!(contains_type_app(body)),
        other => panic!("unexpected declaration: {:?}", other),
    }
}

#[test]
fn specialization_in_excluded_file_warns() {
    let mut drop_files = HashSet::new();
    drop_files.insert("A".to_string());
    let config = Config { drop_files };
    let program = Program::new(vec![File::new(
        "A",
        vec![
            identity_fn(),
            main_fn(apply_at("id", Type::Bool, Expr::bool_lit(true))),
        ],
    )]);
    let (out, warnings) = FunctionMonomorphizer::new(&config).run(program).unwrap();
    assert_eq!(warnings.len(), 1);
    match &warnings[0] {
        Warning::DropDeclaration { file, lid } => {
            assert_eq!(file, "A");
            assert_eq!(lid, &Lid::local("id__bool"));
        }
        other => panic!("unexpected warning: {:?}", other),
    }
    // The declaration is still emitted; exclusion happens downstream.
    assert_eq!(out.files[0].decls[0].lid(), &Lid::local("id__bool"));
}

#[test]
fn comparison_under_type_application_is_fatal() {
    let bad = Expr::new(
        ExprKind::TypeApp {
            head: Box::new(Expr::new(
                ExprKind::Op(Op::Eq, Width::Bool),
                Type::arrows(&[Type::Bound(0), Type::Bound(0)], Type::Bool),
            )),
            args: vec![Type::Bool],
        },
        Type::arrows(&[Type::Bool, Type::Bool], Type::Bool),
    );
    let program = Program::new(vec![File::new("A", vec![main_fn(bad)])]);
    let config = Config::default();
    let err = FunctionMonomorphizer::new(&config).run(program).unwrap_err();
    assert!(matches!(err, MonoError::EqualityUnderTypeApp));
}
