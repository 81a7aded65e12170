//! Data-type monomorphization.
//!
//! Materializes a concrete type definition for every `(constructor,
//! type-arguments)` pair reachable from the program, eliminates anonymous
//! tuples in types, expressions and patterns, and breaks cycles with forward
//! declarations where the C-like target requires them.
//!
//! The traversal is a tri-color walk over nodes: absent means unvisited,
//! `Gray` means on the traversal stack (a revisit closes a cycle with a
//! forward declaration), `Black` means fully emitted. A node reached behind
//! a pointer before its host declaration has been processed is *deferred*:
//! it gets a forward declaration now and a full definition when the driver
//! reaches the host.
//!
//! Ordering is a per-file property: names and definitions are shared across
//! the whole program, but every file that mentions a generated type carries
//! its own forward declaration ahead of the first mention, so each output
//! file is self-contained with respect to forward references.

use std::collections::{HashMap, HashSet};

use crate::errors::{MonoError, Warning};
use crate::ir::{
    has_flag, tuple_field_name, Binder, Branch, Decl, Expr, ExprKind, Field, File, Flag, Lid,
    MatchArm, Pattern, PatternKind, Program, Type, TypeDefBody,
};
use crate::subst::subst_body;

/// The unit of monomorphization: a type constructor paired with its
/// effective argument vector.
pub type Node = (Lid, Vec<Type>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// On the traversal stack.
    Gray,
    /// Fully emitted.
    Black,
}

#[derive(Debug, Clone)]
struct TypeDef {
    flags: Vec<Flag>,
    arity: usize,
    body: TypeDefBody,
}

// ============================================================================
// Pass state
// ============================================================================

pub struct DataTypeMonomorphizer {
    /// Whole-program map from type lids to their definitions. Mutated only
    /// to remove abbreviations consumed as name hints.
    map: HashMap<Lid, TypeDef>,
    /// Traversal colors; absence means unvisited. Reset per file: forward
    /// declarations and ordering are a per-file property.
    colors: HashMap<Node, Color>,
    /// Chosen name per node, plus whether it was synthesized. Whole-program,
    /// so two files demanding the same node agree on the name; survives
    /// deferral so the forward declaration and the eventual definition
    /// always agree.
    names: HashMap<Node, (Lid, bool)>,
    /// Nodes whose full definition has been emitted, in whatever file.
    /// A later file that uses such a node gets a forward declaration of its
    /// own instead of a duplicate definition.
    defined: HashSet<Node>,
    /// Declarations accumulated for the next flush point.
    pending: Vec<Decl>,
    /// Lids of declarations already retained in the current file.
    seen: HashSet<Lid>,
    /// Instantiations deferred until their host declaration is reached.
    /// Reset per file; entries whose host lives in another file drain at
    /// the end of the current file.
    pending_monomorphizations: HashMap<Lid, Vec<Vec<Type>>>,
    /// Chosen lids that already have a forward declaration in the current
    /// file.
    forwards_emitted: HashSet<Lid>,
    /// User abbreviation currently usable as a generated name.
    best_hint: Option<(Node, Lid)>,
    warnings: Vec<Warning>,
    current_file: String,
}

impl DataTypeMonomorphizer {
    pub fn new() -> Self {
        DataTypeMonomorphizer {
            map: HashMap::new(),
            colors: HashMap::new(),
            names: HashMap::new(),
            defined: HashSet::new(),
            pending: Vec::new(),
            seen: HashSet::new(),
            pending_monomorphizations: HashMap::new(),
            forwards_emitted: HashSet::new(),
            best_hint: None,
            warnings: Vec::new(),
            current_file: String::new(),
        }
    }

    /// Run the pass over a whole program.
    pub fn run(mut self, program: Program) -> Result<(Program, Vec<Warning>), MonoError> {
        for d in program.decls() {
            if let Decl::Type {
                name,
                flags,
                arity,
                body,
            } = d
            {
                self.map.insert(
                    name.clone(),
                    TypeDef {
                        flags: flags.clone(),
                        arity: *arity,
                        body: body.clone(),
                    },
                );
            }
        }

        let mut files = Vec::with_capacity(program.files.len());
        for file in program.files {
            self.current_file = file.name.clone();
            // Forward declarations and ordering are per-file; only chosen
            // names and emitted definitions carry across files.
            self.colors.clear();
            self.seen.clear();
            self.forwards_emitted.clear();
            self.pending_monomorphizations.clear();
            let mut out = Vec::new();
            for decl in file.decls {
                self.visit_top_decl(decl, &mut out)?;
            }
            self.drain_deferrals(&mut out)?;
            files.push(File {
                name: file.name,
                decls: out,
            });
        }

        if !self.pending_monomorphizations.is_empty() {
            let mut lids: Vec<_> = self.pending_monomorphizations.keys().cloned().collect();
            lids.sort();
            return Err(MonoError::PendingMonomorphizations(lids.swap_remove(0)));
        }
        Ok((Program::new(files), self.warnings))
    }

    // ------------------------------------------------------------------------
    // Per-declaration driver
    // ------------------------------------------------------------------------

    fn visit_top_decl(&mut self, decl: Decl, out: &mut Vec<Decl>) -> Result<(), MonoError> {
        match decl {
            // A tuple abbreviation whose right-hand side is unseen names the
            // synthesized record after the abbreviation.
            Decl::Type {
                ref name,
                arity: 0,
                body: TypeDefBody::Abbrev(Type::Tuple(ref args)),
                ..
            } if !self.names.contains_key(&(Lid::tuple(), args.clone())) => {
                let node = (Lid::tuple(), args.clone());
                self.map.remove(name);
                self.best_hint = Some((node.clone(), name.clone()));
                self.visit_node(false, node)?;
                self.flush(out);
            }

            // Same shortcut for an applied abbreviation. A GC-flagged head
            // gets a `_gc` instance, and the original name stays valid as an
            // alias for it.
            Decl::Type {
                ref name,
                ref flags,
                arity: 0,
                body: TypeDefBody::Abbrev(Type::App(ref hd, ref args)),
                ..
            } if !self.names.contains_key(&(hd.clone(), args.clone())) => {
                let node = (hd.clone(), args.clone());
                let head_is_gc = self
                    .map
                    .get(hd)
                    .map_or(false, |d| has_flag(&d.flags, Flag::GcType));
                let hint = if head_is_gc {
                    name.suffixed("_gc")
                } else {
                    name.clone()
                };
                self.map.remove(name);
                self.best_hint = Some((node.clone(), hint));
                let chosen = self.visit_node(false, node)?;
                self.flush(out);
                if head_is_gc {
                    let alias = Decl::Type {
                        name: name.clone(),
                        flags: flags.clone(),
                        arity: 0,
                        body: TypeDefBody::Abbrev(Type::Qualified(chosen)),
                    };
                    self.retain(alias, out);
                }
            }

            // Polymorphic definitions disappear; instantiations deferred
            // against them materialize here, at the point where the target
            // language would have seen the definition.
            Decl::Type { ref name, arity, .. } if arity > 0 => {
                // Processed at top level: later pointer uses need not defer.
                self.seen.insert(name.clone());
                while let Some(instances) = self.pending_monomorphizations.remove(name) {
                    for args in instances {
                        self.visit_node(false, (name.clone(), args))?;
                    }
                }
                self.flush(out);
            }

            // A monomorphic definition is re-emitted through the state
            // machine; visiting the body first pulls its dependencies into
            // the pending buffer ahead of it.
            Decl::Type {
                ref name,
                arity: 0,
                ref body,
                ..
            } if matches!(
                body,
                TypeDefBody::Flat(_) | TypeDefBody::Variant(_) | TypeDefBody::Abbrev(_)
            ) =>
            {
                self.seen.insert(name.clone());
                self.visit_body(false, body)?;
                self.visit_node(false, (name.clone(), Vec::new()))?;
                self.flush(out);
            }

            // Everything else is rewritten in place, with its dependencies
            // flushed in front of it.
            other => {
                let d = self.visit_decl(other)?;
                self.flush(out);
                self.retain(d, out);
            }
        }
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Decl>) {
        let pending = std::mem::take(&mut self.pending);
        for d in pending {
            self.note_decl(&d);
            out.push(d);
        }
    }

    /// Instantiations deferred against a host declared in another file have
    /// no drain point among this file's declarations; materialize them at
    /// the end of the file. Their forward declarations are already in place,
    /// so only pointer uses precede the definitions.
    fn drain_deferrals(&mut self, out: &mut Vec<Decl>) -> Result<(), MonoError> {
        while !self.pending_monomorphizations.is_empty() {
            let mut lids: Vec<Lid> = self.pending_monomorphizations.keys().cloned().collect();
            lids.sort();
            for lid in lids {
                if let Some(instances) = self.pending_monomorphizations.remove(&lid) {
                    for args in instances {
                        self.visit_node(false, (lid.clone(), args))?;
                    }
                }
            }
            self.flush(out);
        }
        Ok(())
    }

    fn retain(&mut self, decl: Decl, out: &mut Vec<Decl>) {
        self.note_decl(&decl);
        out.push(decl);
    }

    /// Record a retained declaration. A forward declaration announces a name
    /// without defining it, so it feeds the forward-dedup set rather than
    /// `seen`; marking it seen would stop a later pointer use from deferring
    /// to the real definition.
    fn note_decl(&mut self, d: &Decl) {
        match d {
            Decl::Type {
                name,
                body: TypeDefBody::Forward,
                ..
            } => {
                self.forwards_emitted.insert(name.clone());
            }
            _ => {
                self.seen.insert(d.lid().clone());
            }
        }
    }

    // ------------------------------------------------------------------------
    // Node state machine
    // ------------------------------------------------------------------------

    fn visit_node(&mut self, under_ref: bool, node: Node) -> Result<Lid, MonoError> {
        let (chosen, synthesized) = self.lid_of(&node);
        log::trace!(
            target: "data-types-traversal",
            "visit {} ({} args, under_ref={}) -> {}",
            node.0, node.1.len(), under_ref, chosen
        );
        match self.colors.get(&node) {
            Some(Color::Black) => return Ok(chosen),
            Some(Color::Gray) => {
                // Back-edge: close the cycle with a forward declaration.
                let flags = self.flags_for_forward(&node.0, synthesized);
                self.push_forward(chosen.clone(), flags);
                return Ok(chosen);
            }
            None => {}
        }
        if self.defined.contains(&node) {
            // Fully defined in an earlier file; this file only needs the
            // name announced.
            let flags = self.flags_for_forward(&node.0, synthesized);
            self.push_forward(chosen.clone(), flags);
            self.colors.insert(node, Color::Black);
            return Ok(chosen);
        }
        self.colors.insert(node.clone(), Color::Gray);

        let (lid, args) = &node;
        if lid.is_tuple() {
            let mut fields = Vec::with_capacity(args.len());
            for (i, arg) in args.iter().enumerate() {
                fields.push(Field {
                    name: Some(tuple_field_name(i)),
                    ty: self.visit_typ(under_ref, arg)?,
                    mutable: false,
                });
            }
            self.pending.push(Decl::Type {
                name: chosen.clone(),
                flags: vec![Flag::Private, Flag::AutoGenerated],
                arity: 0,
                body: TypeDefBody::Flat(fields),
            });
            self.defined.insert(node.clone());
            self.mark_black(&node);
            return Ok(chosen);
        }

        let def = match self.map.get(lid) {
            None => {
                // External type; nothing to emit. A nonempty application of
                // an unknown head cannot be monomorphized, which the user
                // should hear about.
                if !args.is_empty() {
                    self.warnings.push(Warning::UnknownTypeHead {
                        file: self.current_file.clone(),
                        lid: lid.clone(),
                    });
                }
                self.mark_black(&node);
                return Ok(chosen);
            }
            Some(def) => def.clone(),
        };
        if def.arity != args.len() {
            return Err(MonoError::ArityMismatch {
                lid: lid.clone(),
                expected: def.arity,
                found: args.len(),
            });
        }

        match &def.body {
            // Reached behind a pointer before the host declaration: a
            // forward declaration suffices for now; the full definition is
            // deferred to the host's position.
            TypeDefBody::Variant(_) | TypeDefBody::Flat(_)
                if under_ref && !self.seen.contains(lid) =>
            {
                log::trace!(
                    target: "data-types-traversal",
                    "deferring {} behind reference", chosen
                );
                self.push_forward(chosen.clone(), def.flags.clone());
                let entry = self.pending_monomorphizations.entry(lid.clone()).or_default();
                if !entry.contains(args) {
                    entry.push(args.clone());
                }
                self.colors.remove(&node);
                Ok(chosen)
            }
            TypeDefBody::Variant(_) | TypeDefBody::Flat(_) | TypeDefBody::Abbrev(_) => {
                let substituted = subst_body(args, &def.body);
                let body = self.visit_body(under_ref, &substituted)?;
                let mut flags = def.flags.clone();
                if synthesized && !has_flag(&flags, Flag::AutoGenerated) {
                    flags.push(Flag::AutoGenerated);
                }
                self.pending.push(Decl::Type {
                    name: chosen.clone(),
                    flags,
                    arity: 0,
                    body,
                });
                self.defined.insert(node.clone());
                self.mark_black(&node);
                Ok(chosen)
            }
            // Forward, Enum, Union: the declaration stays where the source
            // put it.
            _ => {
                self.mark_black(&node);
                Ok(chosen)
            }
        }
    }

    fn mark_black(&mut self, node: &Node) {
        self.colors.insert(node.clone(), Color::Black);
        // A definition that just materialized satisfies any deferral
        // recorded for it.
        if let Some(entry) = self.pending_monomorphizations.get_mut(&node.0) {
            entry.retain(|args| args != &node.1);
            if entry.is_empty() {
                self.pending_monomorphizations.remove(&node.0);
            }
        }
    }

    fn push_forward(&mut self, chosen: Lid, flags: Vec<Flag>) {
        // At most one forward per chosen lid across both the back-edge and
        // deferral paths.
        if self.forwards_emitted.insert(chosen.clone()) {
            self.pending.push(Decl::Type {
                name: chosen,
                flags,
                arity: 0,
                body: TypeDefBody::Forward,
            });
        }
    }

    fn flags_for_forward(&self, lid: &Lid, synthesized: bool) -> Vec<Flag> {
        let mut flags = self.map.get(lid).map(|d| d.flags.clone()).unwrap_or_default();
        if synthesized && !has_flag(&flags, Flag::AutoGenerated) {
            flags.push(Flag::AutoGenerated);
        }
        flags
    }

    // ------------------------------------------------------------------------
    // Name selection
    // ------------------------------------------------------------------------

    fn lid_of(&mut self, node: &Node) -> (Lid, bool) {
        if let Some((lid, synthesized)) = self.names.get(node) {
            return (lid.clone(), *synthesized);
        }
        let (chosen, synthesized) = if node.1.is_empty() {
            (node.0.clone(), false)
        } else {
            match &self.best_hint {
                Some((hint_node, hint_lid)) if hint_node == node => (hint_lid.clone(), false),
                _ => (self.synthesize_name(node), true),
            }
        };
        self.names.insert(node.clone(), (chosen.clone(), synthesized));
        (chosen, synthesized)
    }

    fn synthesize_name(&self, node: &Node) -> Lid {
        let shallow: Vec<Type> = node.1.iter().map(|t| self.shallow_rewrite(t)).collect();
        node.0.instance(&shallow)
    }

    /// Replace already-named applications and tuples with their chosen
    /// qualified name; leave everything else literal. Used only to produce
    /// readable generated names, never to rewrite the program.
    fn shallow_rewrite(&self, t: &Type) -> Type {
        match t {
            Type::App(lid, args) => {
                if let Some((chosen, _)) = self.names.get(&(lid.clone(), args.clone())) {
                    return Type::Qualified(chosen.clone());
                }
                Type::App(
                    lid.clone(),
                    args.iter().map(|a| self.shallow_rewrite(a)).collect(),
                )
            }
            Type::Tuple(args) => {
                if let Some((chosen, _)) = self.names.get(&(Lid::tuple(), args.clone())) {
                    return Type::Qualified(chosen.clone());
                }
                Type::Tuple(args.iter().map(|a| self.shallow_rewrite(a)).collect())
            }
            Type::Buf(inner, konst) => Type::buf(self.shallow_rewrite(inner), *konst),
            Type::Arrow(a, b) => Type::arrow(self.shallow_rewrite(a), self.shallow_rewrite(b)),
            _ => t.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Type, body, declaration, expression rewrites
    // ------------------------------------------------------------------------

    fn visit_typ(&mut self, under_ref: bool, t: &Type) -> Result<Type, MonoError> {
        Ok(match t {
            Type::Qualified(lid) => {
                Type::Qualified(self.visit_node(under_ref, (lid.clone(), Vec::new()))?)
            }
            Type::App(lid, args) => {
                Type::Qualified(self.visit_node(under_ref, (lid.clone(), args.clone()))?)
            }
            Type::Tuple(args) => {
                Type::Qualified(self.visit_node(under_ref, (Lid::tuple(), args.clone()))?)
            }
            Type::Buf(inner, konst) => Type::buf(self.visit_typ(true, inner)?, *konst),
            Type::Arrow(a, b) => Type::arrow(
                self.visit_typ(under_ref, a)?,
                self.visit_typ(under_ref, b)?,
            ),
            Type::Int(_) | Type::Bool | Type::Unit | Type::Bound(_) => t.clone(),
        })
    }

    fn visit_body(
        &mut self,
        under_ref: bool,
        body: &TypeDefBody,
    ) -> Result<TypeDefBody, MonoError> {
        Ok(match body {
            TypeDefBody::Flat(fields) => TypeDefBody::Flat(self.visit_fields(under_ref, fields)?),
            TypeDefBody::Variant(branches) => {
                let mut out = Vec::with_capacity(branches.len());
                for b in branches {
                    out.push(Branch {
                        name: b.name.clone(),
                        fields: self.visit_fields(under_ref, &b.fields)?,
                    });
                }
                TypeDefBody::Variant(out)
            }
            TypeDefBody::Abbrev(t) => TypeDefBody::Abbrev(self.visit_typ(under_ref, t)?),
            TypeDefBody::Forward => TypeDefBody::Forward,
            TypeDefBody::Enum(tags) => TypeDefBody::Enum(tags.clone()),
            TypeDefBody::Union(cases) => {
                let mut out = Vec::with_capacity(cases.len());
                for (n, t) in cases {
                    out.push((n.clone(), self.visit_typ(under_ref, t)?));
                }
                TypeDefBody::Union(out)
            }
        })
    }

    fn visit_fields(
        &mut self,
        under_ref: bool,
        fields: &[Field],
    ) -> Result<Vec<Field>, MonoError> {
        let mut out = Vec::with_capacity(fields.len());
        for f in fields {
            out.push(Field {
                name: f.name.clone(),
                ty: self.visit_typ(under_ref, &f.ty)?,
                mutable: f.mutable,
            });
        }
        Ok(out)
    }

    fn visit_decl(&mut self, decl: Decl) -> Result<Decl, MonoError> {
        match decl {
            Decl::Function {
                cc,
                flags,
                type_arity,
                ret,
                name,
                binders,
                body,
            } => {
                if type_arity > 0 {
                    // Leftover polymorphic definition (the function pass has
                    // already consumed internal ones); its open types must
                    // not be monomorphized.
                    return Ok(Decl::Function {
                        cc,
                        flags,
                        type_arity,
                        ret,
                        name,
                        binders,
                        body,
                    });
                }
                let ret = self.visit_typ(false, &ret)?;
                let mut bs = Vec::with_capacity(binders.len());
                for b in binders {
                    bs.push(Binder {
                        name: b.name,
                        ty: self.visit_typ(false, &b.ty)?,
                    });
                }
                let body = self.visit_expr(&body)?;
                Ok(Decl::Function {
                    cc,
                    flags,
                    type_arity: 0,
                    ret,
                    name,
                    binders: bs,
                    body,
                })
            }
            Decl::Global {
                flags,
                name,
                type_arity,
                ty,
                body,
            } => {
                if type_arity > 0 {
                    return Ok(Decl::Global {
                        flags,
                        name,
                        type_arity,
                        ty,
                        body,
                    });
                }
                let ty = self.visit_typ(false, &ty)?;
                let body = self.visit_expr(&body)?;
                Ok(Decl::Global {
                    flags,
                    name,
                    type_arity: 0,
                    ty,
                    body,
                })
            }
            Decl::External {
                cc,
                flags,
                type_arity,
                name,
                ty,
                param_names,
            } => {
                if type_arity > 0 {
                    return Ok(Decl::External {
                        cc,
                        flags,
                        type_arity,
                        name,
                        ty,
                        param_names,
                    });
                }
                let ty = self.visit_typ(false, &ty)?;
                Ok(Decl::External {
                    cc,
                    flags,
                    type_arity: 0,
                    name,
                    ty,
                    param_names,
                })
            }
            Decl::Type {
                name,
                flags,
                arity,
                body,
            } => {
                // Forward, Enum and Union declarations reach this point;
                // unions still carry types worth rewriting.
                let body = if arity == 0 {
                    self.visit_body(false, &body)?
                } else {
                    body
                };
                Ok(Decl::Type {
                    name,
                    flags,
                    arity,
                    body,
                })
            }
        }
    }

    fn visit_expr(&mut self, e: &Expr) -> Result<Expr, MonoError> {
        let ty = self.visit_typ(false, &e.ty)?;
        let node = match &e.node {
            ExprKind::Qualified(_)
            | ExprKind::Bound(_)
            | ExprKind::Bool(_)
            | ExprKind::Unit
            | ExprKind::Op(..) => e.node.clone(),
            ExprKind::TypeApp { head, args } => {
                let mut ts = Vec::with_capacity(args.len());
                for t in args {
                    ts.push(self.visit_typ(false, t)?);
                }
                ExprKind::TypeApp {
                    head: Box::new(self.visit_expr(head)?),
                    args: ts,
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
            ExprKind::PolyComp(op, t) => ExprKind::PolyComp(*op, self.visit_typ(false, t)?),
            ExprKind::Tuple(es) => {
                // Tuples become record literals over the synthesized type.
                let mut fields = Vec::with_capacity(es.len());
                for (i, elem) in es.iter().enumerate() {
                    fields.push((Some(tuple_field_name(i)), self.visit_expr(elem)?));
                }
                ExprKind::Flat(fields)
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
                    out.push(self.visit_arm(arm)?);
                }
                ExprKind::Match {
                    scrutinee: Box::new(self.visit_expr(scrutinee)?),
                    arms: out,
                }
            }
            ExprKind::AddrOf(inner) => ExprKind::AddrOf(Box::new(self.visit_expr(inner)?)),
        };
        Ok(Expr::new(node, ty))
    }

    fn visit_arm(&mut self, arm: &MatchArm) -> Result<MatchArm, MonoError> {
        let mut binders = Vec::with_capacity(arm.binders.len());
        for b in &arm.binders {
            binders.push(Binder {
                name: b.name.clone(),
                ty: self.visit_typ(false, &b.ty)?,
            });
        }
        Ok(MatchArm {
            binders,
            pattern: self.visit_pattern(&arm.pattern)?,
            body: self.visit_expr(&arm.body)?,
        })
    }

    fn visit_pattern(&mut self, pat: &Pattern) -> Result<Pattern, MonoError> {
        let ty = self.visit_typ(false, &pat.ty)?;
        let node = match &pat.node {
            PatternKind::Wildcard
            | PatternKind::Bound(_)
            | PatternKind::Unit
            | PatternKind::Bool(_) => pat.node.clone(),
            PatternKind::Cons { name, args } => {
                let mut ps = Vec::with_capacity(args.len());
                for p in args {
                    ps.push(self.visit_pattern(p)?);
                }
                PatternKind::Cons {
                    name: name.clone(),
                    args: ps,
                }
            }
            PatternKind::Tuple(ps) => {
                // Mirror image of the tuple-expression rewrite.
                let mut fields = Vec::with_capacity(ps.len());
                for (i, p) in ps.iter().enumerate() {
                    fields.push((tuple_field_name(i), self.visit_pattern(p)?));
                }
                PatternKind::Record(fields)
            }
            PatternKind::Record(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for (n, p) in fields {
                    out.push((n.clone(), self.visit_pattern(p)?));
                }
                PatternKind::Record(out)
            }
        };
        Ok(Pattern::new(node, ty))
    }
}

impl Default for DataTypeMonomorphizer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
