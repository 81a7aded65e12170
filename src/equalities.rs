//! Structural-equality generation.
//!
//! Replaces every polymorphic comparison `PolyComp(op, t)` with either a
//! primitive comparison opcode or a call to a generated, type-specialized
//! predicate: field-wise conjunction for records, constructor-and-field-wise
//! comparison for variants, an external declaration for abstract types.
//! `PNeq` produces the disjunctive dual throughout.
//!
//! Mutually-recursive predicates within one flush batch cannot stay
//! `static` in the target: when a memo hit lands on a predicate still in the
//! pending buffer, the whole batch loses its `Private` flag so the linker
//! can resolve the cycle.

use std::collections::HashMap;

use crate::errors::MonoError;
use crate::ir::{
    strip_flag, Binder, Branch, Decl, Expr, ExprKind, Field, File, Flag, Lid, MatchArm, Op,
    Pattern, PatternKind, PolyOp, Program, Type, TypeDefBody, Width,
};

fn eq_lid(op: PolyOp) -> Lid {
    match op {
        PolyOp::Eq => Lid::local("__eq"),
        PolyOp::Neq => Lid::local("__neq"),
    }
}

fn prim_op(op: PolyOp) -> Op {
    match op {
        PolyOp::Eq => Op::Eq,
        PolyOp::Neq => Op::Neq,
    }
}

/// `t -> t -> bool`.
fn comparator_type(arg: &Type) -> Type {
    Type::arrows(&[arg.clone(), arg.clone()], Type::Bool)
}

fn is_field_less_variant(body: &TypeDefBody) -> bool {
    matches!(body, TypeDefBody::Variant(bs) if bs.iter().all(|b| b.fields.is_empty()))
}

fn is_prims_int(lid: &Lid) -> bool {
    lid.module.len() == 1
        && lid.module[0] == "Prims"
        && matches!(lid.name.as_str(), "int" | "nat" | "pos")
}

// ============================================================================
// Pass state
// ============================================================================

pub struct EqualityGenerator {
    /// Whole-program type definitions, for dispatch on shape.
    map: HashMap<Lid, TypeDefBody>,
    /// Memoized predicates, keyed the same way as function specializations.
    generated: HashMap<(Lid, Vec<Type>), Lid>,
    /// Eta-expanded wrappers for comparisons that resolve to bare opcodes.
    eta_wrappers: HashMap<(PolyOp, Type), Lid>,
    /// Predicates awaiting the next flush point.
    pending: Vec<Decl>,
    /// Set when a memo hit lands on a predicate still in `pending`.
    has_cycle: bool,
}

impl EqualityGenerator {
    pub fn new() -> Self {
        EqualityGenerator {
            map: HashMap::new(),
            generated: HashMap::new(),
            eta_wrappers: HashMap::new(),
            pending: Vec::new(),
            has_cycle: false,
        }
    }

    pub fn run(mut self, program: Program) -> Result<Program, MonoError> {
        for d in program.decls() {
            if let Decl::Type { name, body, .. } = d {
                self.map.insert(name.clone(), body.clone());
            }
        }

        let mut files = Vec::with_capacity(program.files.len());
        for file in program.files {
            let mut out = Vec::new();
            for decl in file.decls {
                self.has_cycle = false;
                let d = self.visit_decl(decl)?;
                let mut batch: Vec<Decl> = self.pending.drain(..).collect();
                if self.has_cycle {
                    for pd in &mut batch {
                        strip_flag(pd.flags_mut(), Flag::Private);
                    }
                }
                out.extend(batch);
                out.push(d);
            }
            files.push(File {
                name: file.name,
                decls: out,
            });
        }
        Ok(Program::new(files))
    }

    fn visit_decl(&mut self, decl: Decl) -> Result<Decl, MonoError> {
        Ok(match decl {
            Decl::Function {
                cc,
                flags,
                type_arity,
                ret,
                name,
                binders,
                body,
            } => {
                let body = self.visit_expr(&body)?;
                Decl::Function {
                    cc,
                    flags,
                    type_arity,
                    ret,
                    name,
                    binders,
                    body,
                }
            }
            Decl::Global {
                flags,
                name,
                type_arity,
                ty,
                body,
            } => {
                let body = self.visit_expr(&body)?;
                Decl::Global {
                    flags,
                    name,
                    type_arity,
                    ty,
                    body,
                }
            }
            other => other,
        })
    }

    // ------------------------------------------------------------------------
    // Expression rewrite
    // ------------------------------------------------------------------------

    fn visit_expr(&mut self, e: &Expr) -> Result<Expr, MonoError> {
        let node = match &e.node {
            ExprKind::App { head, args } => {
                if let ExprKind::PolyComp(op, t) = &head.node {
                    let (f, by_address) = self.generate_equality(*op, t)?;
                    let mut es = Vec::with_capacity(args.len());
                    for a in args {
                        let a = self.visit_expr(a)?;
                        es.push(if by_address { Expr::addr_of(a) } else { a });
                    }
                    ExprKind::App {
                        head: Box::new(f),
                        args: es,
                    }
                } else {
                    let head = self.visit_expr(head)?;
                    let mut es = Vec::with_capacity(args.len());
                    for a in args {
                        es.push(self.visit_expr(a)?);
                    }
                    ExprKind::App {
                        head: Box::new(head),
                        args: es,
                    }
                }
            }
            // A comparison used as a value: eta-expand so a closure exists.
            ExprKind::PolyComp(op, t) => {
                let f = self.resolve_bare(*op, t)?;
                f.node
            }
            ExprKind::TypeApp { head, args } => ExprKind::TypeApp {
                head: Box::new(self.visit_expr(head)?),
                args: args.clone(),
            },
            ExprKind::Tuple(es) => {
                let mut out = Vec::with_capacity(es.len());
                for elem in es {
                    out.push(self.visit_expr(elem)?);
                }
                ExprKind::Tuple(out)
            }
            ExprKind::Flat(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for (n, elem) in fields {
                    out.push((n.clone(), self.visit_expr(elem)?));
                }
                ExprKind::Flat(out)
            }
            ExprKind::Field { expr, name } => ExprKind::Field {
                expr: Box::new(self.visit_expr(expr)?),
                name: name.clone(),
            },
            ExprKind::Match { scrutinee, arms } => {
                let mut out = Vec::with_capacity(arms.len());
                for arm in arms {
                    out.push(MatchArm {
                        binders: arm.binders.clone(),
                        pattern: arm.pattern.clone(),
                        body: self.visit_expr(&arm.body)?,
                    });
                }
                ExprKind::Match {
                    scrutinee: Box::new(self.visit_expr(scrutinee)?),
                    arms: out,
                }
            }
            ExprKind::AddrOf(inner) => ExprKind::AddrOf(Box::new(self.visit_expr(inner)?)),
            ExprKind::Qualified(_)
            | ExprKind::Bound(_)
            | ExprKind::Bool(_)
            | ExprKind::Unit
            | ExprKind::Op(..) => e.node.clone(),
        };
        Ok(Expr::new(node, e.ty.clone()))
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Produce the comparison to apply for `op` at `t`: a primitive opcode,
    /// a generated predicate, or the preserved marker the backend compiles
    /// to scalar comparison. The flag says call sites must pass addresses.
    fn generate_equality(&mut self, op: PolyOp, t: &Type) -> Result<(Expr, bool), MonoError> {
        let opcode = |w: Width| Expr::new(ExprKind::Op(prim_op(op), w), comparator_type(t));
        let preserved = Expr::new(ExprKind::PolyComp(op, t.clone()), comparator_type(t));
        match t {
            Type::Qualified(lid) if is_prims_int(lid) => Ok((opcode(Width::CInt), false)),
            Type::Int(w) => Ok((opcode(*w), false)),
            Type::Bool => Ok((opcode(Width::Bool), false)),
            // Pointer comparison; the backend emits it directly.
            Type::Buf(..) => Ok((preserved, false)),
            Type::Qualified(lid) => match self.map.get(lid).cloned() {
                None => Ok((self.gen_external(op, t, false)?, false)),
                Some(body) if is_field_less_variant(&body) => Ok((preserved, false)),
                Some(TypeDefBody::Flat(fields)) => {
                    Ok((self.gen_structural(op, lid.clone(), t, Shape::Flat(fields))?, false))
                }
                Some(TypeDefBody::Variant(branches)) => Ok((
                    self.gen_structural(op, lid.clone(), t, Shape::Variant(branches))?,
                    false,
                )),
                // Abstract struct known only by pointer.
                Some(TypeDefBody::Forward) => Ok((self.gen_external(op, t, true)?, true)),
                Some(
                    TypeDefBody::Abbrev(_) | TypeDefBody::Enum(_) | TypeDefBody::Union(_),
                ) => Err(MonoError::UnexpectedEqualityBody(lid.clone())),
            },
            _ => Ok((self.gen_external(op, t, false)?, false)),
        }
    }

    /// Comparison of two values of type `t`, short-circuiting units.
    fn mk_rec_equality(&mut self, op: PolyOp, t: &Type, e1: Expr, e2: Expr) -> Result<Expr, MonoError> {
        if *t == Type::Unit {
            // The neutral literal for the enclosing fold.
            return Ok(Expr::bool_lit(op == PolyOp::Eq));
        }
        let (f, by_address) = self.generate_equality(op, t)?;
        let (a, b) = if by_address {
            (Expr::addr_of(e1), Expr::addr_of(e2))
        } else {
            (e1, e2)
        };
        Ok(Expr::app(f, vec![a, b], Type::Bool))
    }

    // ------------------------------------------------------------------------
    // Structural predicates
    // ------------------------------------------------------------------------

    fn gen_structural(
        &mut self,
        op: PolyOp,
        lid: Lid,
        t: &Type,
        shape: Shape,
    ) -> Result<Expr, MonoError> {
        let key = (eq_lid(op), vec![t.clone()]);
        let fn_ty = comparator_type(t);
        if let Some(existing) = self.generated.get(&key) {
            if self.pending.iter().any(|d| d.lid() == existing) {
                // Mutual recursion with an in-progress specialization.
                self.has_cycle = true;
            }
            return Ok(Expr::qualified(existing.clone(), fn_ty));
        }
        let name = eq_lid(op).instance(&[t.clone()]);
        log::trace!(
            target: "monomorphization",
            "generating {} for {}", name, t
        );
        self.generated.insert(key, name.clone());
        let body = match shape {
            Shape::Flat(fields) => self.flat_body(op, &lid, t, &fields)?,
            Shape::Variant(branches) => self.variant_body(op, t, &branches)?,
        };
        self.pending.push(Decl::Function {
            cc: None,
            flags: vec![Flag::Private, Flag::AutoGenerated],
            type_arity: 0,
            ret: Type::Bool,
            name: name.clone(),
            binders: vec![Binder::new("x", t.clone()), Binder::new("y", t.clone())],
            body,
        });
        Ok(Expr::qualified(name, fn_ty))
    }

    /// `x.f0 == y.f0 && x.f1 == y.f1 && ...` (dually `||` and `!=`).
    fn flat_body(
        &mut self,
        op: PolyOp,
        lid: &Lid,
        t: &Type,
        fields: &[Field],
    ) -> Result<Expr, MonoError> {
        let x = Expr::bound(1, t.clone());
        let y = Expr::bound(0, t.clone());
        let mut acc = seed(op);
        for f in fields {
            let name = f
                .name
                .as_deref()
                .ok_or_else(|| MonoError::AnonymousField(lid.clone()))?;
            let cmp = self.mk_rec_equality(
                op,
                &f.ty,
                Expr::field(x.clone(), name, f.ty.clone()),
                Expr::field(y.clone(), name, f.ty.clone()),
            )?;
            acc = combine(op, acc, cmp);
        }
        Ok(acc)
    }

    /// Nested matches: agree on the constructor, then compare fields; any
    /// constructor mismatch yields the failure literal.
    fn variant_body(
        &mut self,
        op: PolyOp,
        t: &Type,
        branches: &[Branch],
    ) -> Result<Expr, MonoError> {
        let fail = || Expr::bool_lit(op == PolyOp::Neq);
        let wild = |ty: &Type| MatchArm {
            binders: Vec::new(),
            pattern: Pattern::new(PatternKind::Wildcard, ty.clone()),
            body: fail(),
        };
        let mut outer_arms = Vec::with_capacity(branches.len() + 1);
        for b in branches {
            let n = b.fields.len();
            let binders_for = |prefix: &str| -> Vec<Binder> {
                b.fields
                    .iter()
                    .enumerate()
                    .map(|(i, f)| Binder::new(&format!("{}{}", prefix, i), f.ty.clone()))
                    .collect()
            };
            let pattern = Pattern::new(
                PatternKind::Cons {
                    name: b.name.clone(),
                    args: b
                        .fields
                        .iter()
                        .enumerate()
                        .map(|(i, f)| Pattern::new(PatternKind::Bound(n - 1 - i), f.ty.clone()))
                        .collect(),
                },
                t.clone(),
            );
            let mut acc = seed(op);
            for (i, f) in b.fields.iter().enumerate() {
                // Outer binders sit below the inner arm's n binders.
                let xi = Expr::bound(2 * n - 1 - i, f.ty.clone());
                let yi = Expr::bound(n - 1 - i, f.ty.clone());
                acc = combine(op, acc, self.mk_rec_equality(op, &f.ty, xi, yi)?);
            }
            let inner = Expr::new(
                ExprKind::Match {
                    // `y` seen through the outer arm's binders.
                    scrutinee: Box::new(Expr::bound(n, t.clone())),
                    arms: vec![
                        MatchArm {
                            binders: binders_for("y"),
                            pattern: pattern.clone(),
                            body: acc,
                        },
                        wild(t),
                    ],
                },
                Type::Bool,
            );
            outer_arms.push(MatchArm {
                binders: binders_for("x"),
                pattern,
                body: inner,
            });
        }
        outer_arms.push(wild(t));
        Ok(Expr::new(
            ExprKind::Match {
                scrutinee: Box::new(Expr::bound(1, t.clone())),
                arms: outer_arms,
            },
            Type::Bool,
        ))
    }

    // ------------------------------------------------------------------------
    // External fallbacks and eta-expansion
    // ------------------------------------------------------------------------

    /// No structural definition: declare an external predicate and call it.
    /// `pointer` switches to const-pointer parameters for abstract structs.
    fn gen_external(&mut self, op: PolyOp, t: &Type, pointer: bool) -> Result<Expr, MonoError> {
        let arg_ty = if pointer {
            Type::buf(t.clone(), true)
        } else {
            t.clone()
        };
        let fn_ty = comparator_type(&arg_ty);
        let key = (eq_lid(op), vec![t.clone()]);
        if let Some(existing) = self.generated.get(&key) {
            return Ok(Expr::qualified(existing.clone(), fn_ty));
        }
        match op {
            PolyOp::Eq => {
                let name = eq_lid(op).instance(&[t.clone()]);
                self.generated.insert(key, name.clone());
                self.pending.push(Decl::External {
                    cc: None,
                    flags: Vec::new(),
                    type_arity: 0,
                    name: name.clone(),
                    ty: fn_ty.clone(),
                    param_names: vec!["x".to_string(), "y".to_string()],
                });
                Ok(Expr::qualified(name, fn_ty))
            }
            PolyOp::Neq => {
                // not (__eq__t x y)
                let eq_fn = self.gen_external(PolyOp::Eq, t, pointer)?;
                let name = eq_lid(op).instance(&[t.clone()]);
                self.generated.insert(key, name.clone());
                let call = Expr::app(
                    eq_fn,
                    vec![
                        Expr::bound(1, arg_ty.clone()),
                        Expr::bound(0, arg_ty.clone()),
                    ],
                    Type::Bool,
                );
                let body = mk_not(call);
                self.pending.push(Decl::Function {
                    cc: None,
                    flags: vec![Flag::Private, Flag::AutoGenerated],
                    type_arity: 0,
                    ret: Type::Bool,
                    name: name.clone(),
                    binders: vec![
                        Binder::new("x", arg_ty.clone()),
                        Binder::new("y", arg_ty.clone()),
                    ],
                    body,
                });
                Ok(Expr::qualified(name, fn_ty))
            }
        }
    }

    /// A comparison in value position: hand back the generated predicate
    /// when one exists, otherwise synthesize a top-level wrapper applying
    /// the dispatched comparison.
    fn resolve_bare(&mut self, op: PolyOp, t: &Type) -> Result<Expr, MonoError> {
        let (f, by_address) = self.generate_equality(op, t)?;
        if !by_address {
            if let ExprKind::Qualified(_) = f.node {
                return Ok(f);
            }
        }
        let fn_ty = comparator_type(t);
        let key = (op, t.clone());
        if let Some(lid) = self.eta_wrappers.get(&key) {
            return Ok(Expr::qualified(lid.clone(), fn_ty));
        }
        // Address-mode externals already own the plain instance name; the
        // wrapper is named after the pointer type instead.
        let name = if by_address {
            eq_lid(op).instance(&[Type::buf(t.clone(), true)])
        } else {
            eq_lid(op).instance(&[t.clone()])
        };
        self.eta_wrappers.insert(key, name.clone());
        let x = Expr::bound(1, t.clone());
        let y = Expr::bound(0, t.clone());
        let (a, b) = if by_address {
            (Expr::addr_of(x), Expr::addr_of(y))
        } else {
            (x, y)
        };
        let body = Expr::app(f, vec![a, b], Type::Bool);
        self.pending.push(Decl::Function {
            cc: None,
            flags: vec![Flag::Private, Flag::AutoGenerated],
            type_arity: 0,
            ret: Type::Bool,
            name: name.clone(),
            binders: vec![Binder::new("x", t.clone()), Binder::new("y", t.clone())],
            body,
        });
        Ok(Expr::qualified(name, fn_ty))
    }
}

impl Default for EqualityGenerator {
    fn default() -> Self {
        Self::new()
    }
}

enum Shape {
    Flat(Vec<Field>),
    Variant(Vec<Branch>),
}

/// The fold seed: `true` for conjunctions, `false` for disjunctions.
fn seed(op: PolyOp) -> Expr {
    Expr::bool_lit(op == PolyOp::Eq)
}

/// Extend the fold, absorbing the seed so single-field types compare with a
/// single call.
fn combine(op: PolyOp, acc: Expr, cmp: Expr) -> Expr {
    let connective = match op {
        PolyOp::Eq => {
            if acc.node == ExprKind::Bool(true) {
                return cmp;
            }
            Op::And
        }
        PolyOp::Neq => {
            if acc.node == ExprKind::Bool(false) {
                return cmp;
            }
            Op::Or
        }
    };
    let head = Expr::new(
        ExprKind::Op(connective, Width::Bool),
        Type::arrows(&[Type::Bool, Type::Bool], Type::Bool),
    );
    Expr::app(head, vec![acc, cmp], Type::Bool)
}

fn mk_not(e: Expr) -> Expr {
    let head = Expr::new(
        ExprKind::Op(Op::Not, Width::Bool),
        Type::arrow(Type::Bool, Type::Bool),
    );
    Expr::app(head, vec![e], Type::Bool)
}

// ============================================================================
// Tests
// ============================================================================
