//! Capture-free De Bruijn substitution of type variables.
//!
//! Declarations bind their type parameters at the outside; nothing inside a
//! type or an expression binds further type variables. Substituting the N
//! outermost variables is therefore a structural map: `Bound(i)` with
//! `i < N` is replaced, and any higher index is shifted down by N.

use crate::ir::{
    Binder, Branch, Expr, ExprKind, Field, MatchArm, Pattern, PatternKind, Type, TypeDefBody,
};

/// Substitute the N outermost type variables of `ty` by `args[0..N]`.
pub fn subst_tn(args: &[Type], ty: &Type) -> Type {
    match ty {
        Type::Bound(i) => {
            if *i < args.len() {
                args[*i].clone()
            } else {
                Type::Bound(*i - args.len())
            }
        }
        Type::Qualified(_) | Type::Int(_) | Type::Bool | Type::Unit => ty.clone(),
        Type::App(lid, ts) => Type::App(
            lid.clone(),
            ts.iter().map(|t| subst_tn(args, t)).collect(),
        ),
        Type::Tuple(ts) => Type::Tuple(ts.iter().map(|t| subst_tn(args, t)).collect()),
        Type::Buf(t, konst) => Type::buf(subst_tn(args, t), *konst),
        Type::Arrow(a, b) => Type::arrow(subst_tn(args, a), subst_tn(args, b)),
    }
}

/// Substitute type variables through a type-definition body.
pub fn subst_body(args: &[Type], body: &TypeDefBody) -> TypeDefBody {
    match body {
        TypeDefBody::Flat(fields) => {
            TypeDefBody::Flat(fields.iter().map(|f| subst_field(args, f)).collect())
        }
        TypeDefBody::Variant(branches) => TypeDefBody::Variant(
            branches
                .iter()
                .map(|b| Branch {
                    name: b.name.clone(),
                    fields: b.fields.iter().map(|f| subst_field(args, f)).collect(),
                })
                .collect(),
        ),
        TypeDefBody::Abbrev(t) => TypeDefBody::Abbrev(subst_tn(args, t)),
        TypeDefBody::Forward => TypeDefBody::Forward,
        TypeDefBody::Enum(tags) => TypeDefBody::Enum(tags.clone()),
        TypeDefBody::Union(cases) => TypeDefBody::Union(
            cases
                .iter()
                .map(|(n, t)| (n.clone(), subst_tn(args, t)))
                .collect(),
        ),
    }
}

fn subst_field(args: &[Type], field: &Field) -> Field {
    Field {
        name: field.name.clone(),
        ty: subst_tn(args, &field.ty),
        mutable: field.mutable,
    }
}

/// Substitute type variables through every type embedded in an expression:
/// node annotations, type-application arguments, comparison types, binders
/// and patterns. Expression-level De Bruijn indices are untouched.
pub fn subst_ten(args: &[Type], expr: &Expr) -> Expr {
    let ty = subst_tn(args, &expr.ty);
    let node = match &expr.node {
        ExprKind::Qualified(lid) => ExprKind::Qualified(lid.clone()),
        ExprKind::Bound(i) => ExprKind::Bound(*i),
        ExprKind::Bool(b) => ExprKind::Bool(*b),
        ExprKind::Unit => ExprKind::Unit,
        ExprKind::Op(op, w) => ExprKind::Op(*op, *w),
        ExprKind::TypeApp { head, args: ts } => ExprKind::TypeApp {
            head: Box::new(subst_ten(args, head)),
            args: ts.iter().map(|t| subst_tn(args, t)).collect(),
        },
        ExprKind::App { head, args: es } => ExprKind::App {
            head: Box::new(subst_ten(args, head)),
            args: es.iter().map(|e| subst_ten(args, e)).collect(),
        },
        ExprKind::PolyComp(op, t) => ExprKind::PolyComp(*op, subst_tn(args, t)),
        ExprKind::Tuple(es) => ExprKind::Tuple(es.iter().map(|e| subst_ten(args, e)).collect()),
        ExprKind::Flat(fields) => ExprKind::Flat(
            fields
                .iter()
                .map(|(n, e)| (n.clone(), subst_ten(args, e)))
                .collect(),
        ),
        ExprKind::Field { expr: e, name } => ExprKind::Field {
            expr: Box::new(subst_ten(args, e)),
            name: name.clone(),
        },
        ExprKind::Match { scrutinee, arms } => ExprKind::Match {
            scrutinee: Box::new(subst_ten(args, scrutinee)),
            arms: arms.iter().map(|a| subst_arm(args, a)).collect(),
        },
        ExprKind::AddrOf(e) => ExprKind::AddrOf(Box::new(subst_ten(args, e))),
    };
    Expr::new(node, ty)
}

fn subst_arm(args: &[Type], arm: &MatchArm) -> MatchArm {
    MatchArm {
        binders: arm
            .binders
            .iter()
            .map(|b| Binder {
                name: b.name.clone(),
                ty: subst_tn(args, &b.ty),
            })
            .collect(),
        pattern: subst_pattern(args, &arm.pattern),
        body: subst_ten(args, &arm.body),
    }
}

fn subst_pattern(args: &[Type], pat: &Pattern) -> Pattern {
    let ty = subst_tn(args, &pat.ty);
    let node = match &pat.node {
        PatternKind::Wildcard => PatternKind::Wildcard,
        PatternKind::Bound(i) => PatternKind::Bound(*i),
        PatternKind::Unit => PatternKind::Unit,
        PatternKind::Bool(b) => PatternKind::Bool(*b),
        PatternKind::Cons { name, args: ps } => PatternKind::Cons {
            name: name.clone(),
            args: ps.iter().map(|p| subst_pattern(args, p)).collect(),
        },
        PatternKind::Tuple(ps) => {
            PatternKind::Tuple(ps.iter().map(|p| subst_pattern(args, p)).collect())
        }
        PatternKind::Record(fields) => PatternKind::Record(
            fields
                .iter()
                .map(|(n, p)| (n.clone(), subst_pattern(args, p)))
                .collect(),
        ),
    };
    Pattern::new(node, ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Lid, Width};

    #[test]
    fn test_subst_bound() {
        let args = vec![Type::Int(Width::I32), Type::Bool];
        assert_eq!(subst_tn(&args, &Type::Bound(0)), Type::Int(Width::I32));
        assert_eq!(subst_tn(&args, &Type::Bound(1)), Type::Bool);
        // Indices past the substituted prefix shift down.
        assert_eq!(subst_tn(&args, &Type::Bound(3)), Type::Bound(1));
    }

    #[test]
    fn test_subst_through_structure() {
        let args = vec![Type::Int(Width::I32)];
        let ty = Type::App(
            Lid::local("ll"),
            vec![Type::buf(Type::Bound(0), false)],
        );
        let expected = Type::App(
            Lid::local("ll"),
            vec![Type::buf(Type::Int(Width::I32), false)],
        );
        assert_eq!(subst_tn(&args, &ty), expected);
    }

    #[test]
    fn test_subst_expr_annotations() {
        let args = vec![Type::Bool];
        let e = Expr::bound(0, Type::Bound(0));
        let e2 = subst_ten(&args, &e);
        assert_eq!(e2.ty, Type::Bool);
        assert_eq!(e2.node, ExprKind::Bound(0));
    }

    #[test]
    fn test_subst_polycomp_type() {
        use crate::ir::PolyOp;
        let args = vec![Type::Int(Width::U8)];
        let e = Expr::new(
            ExprKind::PolyComp(PolyOp::Eq, Type::Bound(0)),
            Type::arrows(&[Type::Bound(0), Type::Bound(0)], Type::Bool),
        );
        let e2 = subst_ten(&args, &e);
        match e2.node {
            ExprKind::PolyComp(PolyOp::Eq, Type::Int(Width::U8)) => {}
            other => panic!("unexpected node: {:?}", other),
        }
    }
}
