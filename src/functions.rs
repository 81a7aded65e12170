//! Function and global monomorphization.
//!
//! Instantiates every polymorphic function and global at each distinct
//! type-argument vector it is applied to. Polymorphic source declarations
//! are replaced by their specializations; monomorphic declarations are kept,
//! with specializations they trigger spliced in front of them so every name
//! is declared before its first use.

use std::collections::HashMap;

use crate::errors::{MonoError, Warning};
use crate::ir::{
    Binder, Decl, Expr, ExprKind, File, Lid, MatchArm, Op, Pattern, Program, Type,
};
use crate::subst::{subst_ten, subst_tn};
use crate::Config;

pub struct FunctionMonomorphizer<'a> {
    config: &'a Config,
    /// Whole-program map of polymorphic functions and globals.
    map: HashMap<Lid, Decl>,
    /// Memoized specializations: `(original lid, type args)` to chosen lid.
    generated: HashMap<(Lid, Vec<Type>), Lid>,
    /// Specializations awaiting the next flush point.
    pending: Vec<Decl>,
    warnings: Vec<Warning>,
    current_file: String,
}

impl<'a> FunctionMonomorphizer<'a> {
    pub fn new(config: &'a Config) -> Self {
        FunctionMonomorphizer {
            config,
            map: HashMap::new(),
            generated: HashMap::new(),
            pending: Vec::new(),
            warnings: Vec::new(),
            current_file: String::new(),
        }
    }

    pub fn run(mut self, program: Program) -> Result<(Program, Vec<Warning>), MonoError> {
        for d in program.decls() {
            match d {
                Decl::Function { type_arity, name, .. } | Decl::Global { type_arity, name, .. }
                    if *type_arity > 0 =>
                {
                    self.map.insert(name.clone(), d.clone());
                }
                _ => {}
            }
        }

        let mut files = Vec::with_capacity(program.files.len());
        for file in program.files {
            self.current_file = file.name.clone();
            let mut out = Vec::new();
            for decl in file.decls {
                match decl {
                    // Polymorphic definitions are replaced by their
                    // specializations, generated on demand at use sites.
                    Decl::Function { type_arity, .. } | Decl::Global { type_arity, .. }
                        if type_arity > 0 => {}
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
                        out.extend(self.pending.drain(..));
                        out.push(Decl::Function {
                            cc,
                            flags,
                            type_arity,
                            ret,
                            name,
                            binders,
                            body,
                        });
                    }
                    Decl::Global {
                        flags,
                        name,
                        type_arity,
                        ty,
                        body,
                    } => {
                        let body = self.visit_expr(&body)?;
                        out.extend(self.pending.drain(..));
                        out.push(Decl::Global {
                            flags,
                            name,
                            type_arity,
                            ty,
                            body,
                        });
                    }
                    other => {
                        out.extend(self.pending.drain(..));
                        out.push(other);
                    }
                }
            }
            files.push(File {
                name: file.name,
                decls: out,
            });
        }
        Ok((Program::new(files), self.warnings))
    }

    // ------------------------------------------------------------------------
    // Instantiation
    // ------------------------------------------------------------------------

    /// Specialize the definition behind `lid` at `args`. The memo entry is
    /// registered before the body is visited so polymorphic recursion hits
    /// the entry instead of looping.
    fn instantiate(&mut self, lid: &Lid, args: &[Type]) -> Result<Lid, MonoError> {
        let chosen = lid.instance(args);
        log::trace!(
            target: "monomorphization",
            "instantiating {} at {} type arguments as {}",
            lid, args.len(), chosen
        );
        self.generated
            .insert((lid.clone(), args.to_vec()), chosen.clone());
        if self.config.drop_files.contains(&self.current_file) {
            self.warnings.push(Warning::DropDeclaration {
                file: self.current_file.clone(),
                lid: chosen.clone(),
            });
        }
        match self.map.get(lid).cloned() {
            Some(Decl::Function {
                cc,
                flags,
                ret,
                binders,
                body,
                ..
            }) => {
                let ret = subst_tn(args, &ret);
                let binders: Vec<_> = binders
                    .iter()
                    .map(|b| Binder {
                        name: b.name.clone(),
                        ty: subst_tn(args, &b.ty),
                    })
                    .collect();
                let body = subst_ten(args, &body);
                // Visit before pushing: cascading instantiations land ahead
                // of their caller in the flush batch.
                let body = self.visit_expr(&body)?;
                self.pending.push(Decl::Function {
                    cc,
                    flags,
                    type_arity: 0,
                    ret,
                    name: chosen.clone(),
                    binders,
                    body,
                });
            }
            Some(Decl::Global {
                flags, ty, body, ..
            }) => {
                let ty = subst_tn(args, &ty);
                let body = subst_ten(args, &body);
                let body = self.visit_expr(&body)?;
                self.pending.push(Decl::Global {
                    flags,
                    name: chosen.clone(),
                    type_arity: 0,
                    ty,
                    body,
                });
            }
            _ => unreachable!("instantiate called without a map entry"),
        }
        Ok(chosen)
    }

    // ------------------------------------------------------------------------
    // Expression rewrite
    // ------------------------------------------------------------------------

    fn visit_expr(&mut self, e: &Expr) -> Result<Expr, MonoError> {
        let node = match &e.node {
            ExprKind::TypeApp { head, args } => {
                match &head.node {
                    // Polymorphic comparisons must still be EPolyComp here.
                    ExprKind::Op(Op::Eq, _) | ExprKind::Op(Op::Neq, _) => {
                        return Err(MonoError::EqualityUnderTypeApp);
                    }
                    ExprKind::Qualified(lid) => {
                        if let Some(chosen) = self.generated.get(&(lid.clone(), args.clone())) {
                            ExprKind::Qualified(chosen.clone())
                        } else {
                            let stored_arity = match self.map.get(lid) {
                                Some(Decl::Function { type_arity, .. })
                                | Some(Decl::Global { type_arity, .. }) => Some(*type_arity),
                                _ => None,
                            };
                            match stored_arity {
                                // External polymorphic reference: left for
                                // the backend to reject or inline.
                                None => e.node.clone(),
                                Some(n) if n != args.len() => {
                                    self.warnings.push(Warning::NotFullyApplied {
                                        file: self.current_file.clone(),
                                        lid: lid.clone(),
                                    });
                                    e.node.clone()
                                }
                                Some(_) => {
                                    let chosen = self.instantiate(lid, args)?;
                                    ExprKind::Qualified(chosen)
                                }
                            }
                        }
                    }
                    _ => ExprKind::TypeApp {
                        head: Box::new(self.visit_expr(head)?),
                        args: args.clone(),
                    },
                }
            }
            ExprKind::App { head, args } => {
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
                        pattern: self.visit_pattern(&arm.pattern),
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
            | ExprKind::Op(..)
            | ExprKind::PolyComp(..) => e.node.clone(),
        };
        Ok(Expr::new(node, e.ty.clone()))
    }

    fn visit_pattern(&self, pat: &Pattern) -> Pattern {
        // Patterns carry no type applications; they pass through.
        pat.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
