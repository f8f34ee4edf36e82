//! The resolution passes.
//!
//! Named-type references are bound in a worklist that is drained repeatedly
//! while skeleton declarations, type-parameter bounds and class headers
//! become known. Only the final drain reports what is still unresolved.

use crate::ast::{DeclKind, ModuleDecl, TypeDecl, TypeRef};
use crate::diagnostics::Diagnostics;
use crate::overload;
use crate::synthesize;
use bytecode_system::{Program, StatementKind};
use core_types::{
    Diagnostic, DiagnosticBucket, MethodId, ModuleId, SourcePosition, TypeId,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;
use type_model::{
    Attribute, EnumConstant, Method, MethodBody, Parameter, Type, TypeKind, TypeParameter,
    TypeTable, TypeVariable,
};

/// Where a recorded type reference appeared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    /// Referencing module
    pub module: ModuleId,
    /// Position of the reference
    pub position: SourcePosition,
}

/// Which header slot of a declaration a pending reference fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RefSlot {
    Extends(usize),
    Implements(usize),
    BoundExtends(usize),
    BoundImplements(usize, usize),
}

#[derive(Debug, Clone)]
pub(crate) struct PendingRef {
    decl: usize,
    module: ModuleId,
    slot: RefSlot,
    type_ref: TypeRef,
}

#[derive(Debug, Clone)]
pub(crate) struct Declared {
    module: ModuleId,
    type_id: TypeId,
    type_parameters: Vec<(String, TypeId)>,
}

/// Output of a resolution run
#[derive(Debug, Clone)]
pub struct Resolution {
    /// All descriptors, ready for execution
    pub table: TypeTable,
    /// Everything reported while resolving
    pub diagnostics: Diagnostics,
    /// Module names indexed by [`ModuleId`]
    pub module_names: Vec<String>,
    usages: FxHashMap<TypeId, Vec<Usage>>,
}

impl Resolution {
    /// Recorded references to `ty`, in resolution order
    pub fn usages(&self, ty: TypeId) -> &[Usage] {
        self.usages.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a declared or builtin type
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.table.lookup(name)
    }

    /// Whether any error-severity diagnostic was reported
    pub fn has_errors(&self) -> bool {
        self.diagnostics.error_count() > 0
    }

    /// Resolve `receiver.name(arguments)` to a method
    pub fn find_method(
        &self,
        receiver: TypeId,
        name: &str,
        argument_types: &[TypeId],
    ) -> Result<MethodId, String> {
        overload::resolve_method_call(&self.table, receiver, name, argument_types)
    }

    /// Resolve `new Class(arguments)`
    pub fn find_constructor(
        &self,
        class: TypeId,
        argument_types: &[TypeId],
    ) -> Result<Option<MethodId>, String> {
        overload::find_constructor(&self.table, class, argument_types)
    }

    /// Slot index of an instance attribute
    pub fn attribute_index(&self, class: TypeId, name: &str) -> Option<usize> {
        self.table
            .find_attribute(class, name)
            .and_then(|a| self.table.attribute(a).index)
    }

    /// Slot index of a static attribute
    pub fn static_attribute_index(&self, class: TypeId, name: &str) -> Option<usize> {
        let twin = self.table.static_class_of(class)?;
        self.table
            .attributes_of(twin)
            .iter()
            .find(|&&a| self.table.attribute(a).identifier == name)
            .and_then(|&a| self.table.attribute(a).index)
    }

    /// Attach a generated body to a method and to every generic variant
    /// derived from it
    pub fn set_method_body(&mut self, method: MethodId, program: Program) {
        let program = Rc::new(program);
        let derived: Vec<MethodId> = self
            .table
            .method_ids()
            .filter(|&m| m == method || self.table.method(m).is_generic_variant_from == Some(method))
            .collect();
        for m in derived {
            self.table.method_mut(m).body = MethodBody::Interpreted(Rc::clone(&program));
        }
    }

    /// Attach the instance field initializer of a class and its variants
    pub fn set_attribute_initializer(&mut self, class: TypeId, program: Program) {
        let program = Rc::new(program);
        let mut targets = vec![class];
        targets.extend(
            self.table
                .variants()
                .into_iter()
                .filter(|(canonical, _)| *canonical == class)
                .map(|(_, variant)| variant),
        );
        for t in targets {
            if let Some(k) = self.table.get_mut(t).as_klass_mut() {
                k.attribute_initializer = Some(Rc::clone(&program));
            }
        }
    }

    /// Attach the static field initializer of a class
    pub fn set_static_initializer(&mut self, class: TypeId, program: Program) {
        if let Some(twin) = self.table.static_class_of(class) {
            if let TypeKind::StaticClass(s) = &mut self.table.get_mut(twin).kind {
                s.static_initializer = Some(Rc::new(program));
            }
        }
    }

    /// Attach the constructor call of an enum constant
    pub fn set_enum_constructor_call(&mut self, enum_type: TypeId, ordinal: usize, program: Program) {
        let constant = self
            .table
            .get_mut(enum_type)
            .as_klass_mut()
            .and_then(|k| k.enum_info.as_mut())
            .and_then(|info| info.constants.get_mut(ordinal));
        if let Some(constant) = constant {
            constant.constructor_call = Some(Rc::new(program));
        }
    }
}

/// Resolve a set of modules into a type table.
///
/// Never fails: problems become diagnostics and resolution continues with
/// fallback bindings.
pub fn resolve(modules: Vec<ModuleDecl>) -> Resolution {
    Resolver::new().run(modules)
}

/// Multi-pass resolver state
#[derive(Debug)]
pub struct Resolver {
    pub(crate) table: TypeTable,
    pub(crate) diagnostics: Diagnostics,
    declared: Vec<Declared>,
    unresolved: Vec<PendingRef>,
    bindings: FxHashMap<(usize, RefSlot), TypeId>,
    pub(crate) generic_requests: Vec<TypeId>,
    pub(crate) headers_bound: FxHashSet<TypeId>,
    pub(crate) bound_checked: FxHashSet<TypeId>,
    pub(crate) members_ready: FxHashSet<TypeId>,
    pub(crate) variant_sites: FxHashMap<TypeId, (ModuleId, SourcePosition)>,
    usages: FxHashMap<TypeId, Vec<Usage>>,
    duplicates: Vec<(ModuleId, String, SourcePosition)>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Resolver over a fresh type table
    pub fn new() -> Self {
        let mut headers_bound = FxHashSet::default();
        headers_bound.insert(TypeTable::OBJECT);
        let mut members_ready = FxHashSet::default();
        members_ready.insert(TypeTable::OBJECT);
        Self {
            table: TypeTable::new(),
            diagnostics: Diagnostics::new(),
            declared: Vec::new(),
            unresolved: Vec::new(),
            bindings: FxHashMap::default(),
            generic_requests: Vec::new(),
            headers_bound,
            bound_checked: FxHashSet::default(),
            members_ready,
            variant_sites: FxHashMap::default(),
            usages: FxHashMap::default(),
            duplicates: Vec::new(),
        }
    }

    /// Run all passes
    #[tracing::instrument(skip_all, fields(modules = modules.len()))]
    pub fn run(mut self, modules: Vec<ModuleDecl>) -> Resolution {
        let decls: Vec<(ModuleId, &TypeDecl)> = modules
            .iter()
            .enumerate()
            .flat_map(|(m, module)| {
                module
                    .declarations
                    .iter()
                    .map(move |d| (ModuleId::new(m), d))
            })
            .collect();

        self.resolve_types_in_modules(&decls);
        self.setup_classes_and_interfaces(&decls);
        self.resolve_type_variables(&decls);
        self.resolve_extends_implements(&decls);

        tracing::debug!("final header resolution");
        self.resolve_generic_types();
        self.resolve_unresolved_types(true);
        self.force_type_variables_ready();

        self.setup_methods_and_attributes(&decls);
        self.check_double_identifier_definition(&decls);
        self.check_generic_types_against_type_guards();
        tracing::debug!("attribute indices");
        self.table.setup_attribute_indices();

        Resolution {
            table: self.table,
            diagnostics: self.diagnostics,
            module_names: modules.into_iter().map(|m| m.name).collect(),
            usages: self.usages,
        }
    }

    pub(crate) fn report(&mut self, module: ModuleId, diagnostic: Diagnostic) {
        self.diagnostics
            .push(module, DiagnosticBucket::Type, diagnostic);
    }

    fn scope_of(&self, decl: usize) -> Vec<(String, TypeId)> {
        self.declared
            .get(decl)
            .map(|d| d.type_parameters.clone())
            .unwrap_or_default()
    }

    /// Bind a type reference.
    ///
    /// Type parameters in `scope` shadow global names. When the name is
    /// unknown the reference is deferred, or reported if `is_final`.
    pub(crate) fn resolve_type_ref(
        &mut self,
        type_ref: &TypeRef,
        module: ModuleId,
        scope: &[(String, TypeId)],
        is_final: bool,
    ) -> Option<TypeId> {
        let found = scope
            .iter()
            .find(|(name, _)| *name == type_ref.name)
            .map(|(_, id)| *id)
            .or_else(|| self.table.lookup(&type_ref.name));

        let Some(base) = found else {
            if is_final {
                self.report(
                    module,
                    Diagnostic::error(format!("Unknown type {}", type_ref.name), type_ref.position),
                );
            }
            return None;
        };

        let mut arguments = Vec::with_capacity(type_ref.arguments.len());
        let mut complete = true;
        for argument in &type_ref.arguments {
            match self.resolve_type_ref(argument, module, scope, is_final) {
                Some(t) => arguments.push(t),
                None => complete = false,
            }
        }
        if !complete {
            return None;
        }

        self.usages.entry(base).or_default().push(Usage {
            module,
            position: type_ref.position,
        });

        let mut ty = if arguments.is_empty() {
            base
        } else {
            self.instantiate_generic(base, arguments, module, type_ref.position)
        };
        for _ in 0..type_ref.array_dimensions {
            ty = self.table.array_of(ty);
        }
        Some(ty)
    }

    /// Retry every pending header reference; returns how many were bound
    fn resolve_unresolved_types(&mut self, last_pass: bool) -> usize {
        let pending = std::mem::take(&mut self.unresolved);
        let mut resolved = 0;
        for p in pending {
            let scope = self.scope_of(p.decl);
            match self.resolve_type_ref(&p.type_ref, p.module, &scope, last_pass) {
                Some(ty) => {
                    self.bindings.insert((p.decl, p.slot), ty);
                    resolved += 1;
                }
                None if last_pass => {}
                None => self.unresolved.push(p),
            }
        }
        resolved
    }

    // ========================================================================
    // Pass 1: header references
    // ========================================================================

    fn resolve_types_in_modules(&mut self, decls: &[(ModuleId, &TypeDecl)]) {
        for (d, (module, decl)) in decls.iter().enumerate() {
            let mut push = |slot, type_ref: &TypeRef| {
                self.unresolved.push(PendingRef {
                    decl: d,
                    module: *module,
                    slot,
                    type_ref: type_ref.clone(),
                })
            };
            for (i, r) in decl.extends.iter().enumerate() {
                push(RefSlot::Extends(i), r);
            }
            for (i, r) in decl.implements.iter().enumerate() {
                push(RefSlot::Implements(i), r);
            }
            for (p, parameter) in decl.type_parameters.iter().enumerate() {
                if let Some(r) = &parameter.extends {
                    push(RefSlot::BoundExtends(p), r);
                }
                for (i, r) in parameter.implements.iter().enumerate() {
                    push(RefSlot::BoundImplements(p, i), r);
                }
            }
        }
        let bound = self.resolve_unresolved_types(false);
        tracing::debug!(bound, pending = self.unresolved.len(), "pass 1: known header types");
    }

    // ========================================================================
    // Pass 2: skeletons
    // ========================================================================

    fn setup_classes_and_interfaces(&mut self, decls: &[(ModuleId, &TypeDecl)]) {
        for (module, decl) in decls {
            let id = match decl.kind {
                DeclKind::Class => {
                    self.table
                        .add_class(&decl.identifier, Some(*module), Some(decl.position), false)
                }
                DeclKind::Enum => {
                    self.table
                        .add_class(&decl.identifier, Some(*module), Some(decl.position), true)
                }
                DeclKind::Interface => {
                    self.table
                        .add_interface(&decl.identifier, Some(*module), Some(decl.position))
                }
            };
            if self.table.register_name(&decl.identifier, id).is_some() {
                self.duplicates
                    .push((*module, decl.identifier.clone(), decl.position));
            }

            let mut type_parameters = Vec::with_capacity(decl.type_parameters.len());
            let mut type_variables = Vec::with_capacity(decl.type_parameters.len());
            for (index, parameter) in decl.type_parameters.iter().enumerate() {
                let placeholder = self.table.add_type(Type {
                    identifier: parameter.identifier.clone(),
                    kind: TypeKind::TypeParameter(TypeParameter {
                        owner: id,
                        index,
                        bound_class: TypeTable::OBJECT,
                        bound_interfaces: Vec::new(),
                        ready: false,
                    }),
                    module: Some(*module),
                    position: Some(parameter.position),
                });
                type_parameters.push((parameter.identifier.clone(), placeholder));
                type_variables.push(TypeVariable {
                    identifier: parameter.identifier.clone(),
                    type_id: placeholder,
                    scope_from: decl.position,
                    scope_to: decl.end_position,
                });
            }
            let ready = type_variables.is_empty();

            let ty = self.table.get_mut(id);
            match &mut ty.kind {
                TypeKind::Klass(k) | TypeKind::Enum(k) => {
                    k.is_abstract = decl.is_abstract;
                    k.visibility = decl.visibility.into();
                    k.type_variables = type_variables;
                    k.type_variables_ready = ready;
                }
                TypeKind::Interface(i) => {
                    i.type_variables = type_variables;
                    i.type_variables_ready = ready;
                }
                _ => {}
            }

            self.declared.push(Declared {
                module: *module,
                type_id: id,
                type_parameters,
            });
        }
        tracing::debug!(declarations = self.declared.len(), "pass 2: skeletons registered");
    }

    // ========================================================================
    // Pass 3: type-variable bounds
    // ========================================================================

    fn resolve_type_variables(&mut self, decls: &[(ModuleId, &TypeDecl)]) {
        let mut iterations = 0;
        loop {
            iterations += 1;
            let mut progress = self.resolve_unresolved_types(false) > 0;
            progress |= self.resolve_generic_types() > 0;

            for (d, (_, decl)) in decls.iter().enumerate() {
                let parameters = self.declared[d].type_parameters.clone();
                for (p, (_, placeholder)) in parameters.iter().enumerate() {
                    if self.parameter_ready(*placeholder) {
                        continue;
                    }
                    let declared = &decl.type_parameters[p];
                    let extends = match &declared.extends {
                        Some(_) => self.bindings.get(&(d, RefSlot::BoundExtends(p))).copied(),
                        None => Some(TypeTable::OBJECT),
                    };
                    let interfaces: Option<Vec<TypeId>> = (0..declared.implements.len())
                        .map(|i| self.bindings.get(&(d, RefSlot::BoundImplements(p, i))).copied())
                        .collect();
                    if let (Some(extends), Some(interfaces)) = (extends, interfaces) {
                        self.set_parameter_bounds(*placeholder, extends, interfaces);
                        progress = true;
                    }
                }
                self.update_type_variables_ready(d);
            }

            if !progress {
                break;
            }
        }
        tracing::debug!(iterations, "pass 3: type variables");
    }

    fn parameter_ready(&self, placeholder: TypeId) -> bool {
        matches!(&self.table.get(placeholder).kind, TypeKind::TypeParameter(p) if p.ready)
    }

    fn set_parameter_bounds(&mut self, placeholder: TypeId, extends: TypeId, mut interfaces: Vec<TypeId>) {
        let mut bound_class = extends;
        if self.table.get(extends).as_interface().is_some() {
            interfaces.insert(0, extends);
            bound_class = TypeTable::OBJECT;
        }
        if let TypeKind::TypeParameter(p) = &mut self.table.get_mut(placeholder).kind {
            p.bound_class = bound_class;
            p.bound_interfaces = interfaces;
            p.ready = true;
        }
    }

    fn update_type_variables_ready(&mut self, d: usize) {
        let ready = self.declared[d]
            .type_parameters
            .iter()
            .all(|(_, p)| self.parameter_ready(*p));
        match &mut self.table.get_mut(self.declared[d].type_id).kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => k.type_variables_ready = ready,
            TypeKind::Interface(i) => i.type_variables_ready = ready,
            _ => {}
        }
    }

    fn force_type_variables_ready(&mut self) {
        for d in 0..self.declared.len() {
            let parameters = self.declared[d].type_parameters.clone();
            for (_, placeholder) in parameters {
                if let TypeKind::TypeParameter(p) = &mut self.table.get_mut(placeholder).kind {
                    p.ready = true;
                }
            }
            self.update_type_variables_ready(d);
        }
    }

    // ========================================================================
    // Pass 4: extends / implements
    // ========================================================================

    fn resolve_extends_implements(&mut self, decls: &[(ModuleId, &TypeDecl)]) {
        for (d, (module, decl)) in decls.iter().enumerate() {
            let id = self.declared[d].type_id;
            let implements = self.bound_interfaces_of(d, *module, &decl.implements, RefSlot::Implements);

            match decl.kind {
                DeclKind::Class | DeclKind::Enum => {
                    if let Some(extra) = decl.extends.get(1) {
                        self.report(
                            *module,
                            Diagnostic::error(
                                format!("Class {} can only extend one class", decl.identifier),
                                extra.position,
                            ),
                        );
                    }
                    let mut base = TypeTable::OBJECT;
                    if let Some(r) = decl.extends.first() {
                        if decl.kind == DeclKind::Enum {
                            self.report(
                                *module,
                                Diagnostic::error(
                                    format!("Enum {} cannot extend a class", decl.identifier),
                                    r.position,
                                ),
                            );
                        } else if let Some(&t) = self.bindings.get(&(d, RefSlot::Extends(0))) {
                            if matches!(self.table.get(t).kind, TypeKind::Klass(_)) {
                                base = t;
                            } else {
                                self.report(
                                    *module,
                                    Diagnostic::error(
                                        format!("{} is not a class", self.table.identifier(t)),
                                        r.position,
                                    ),
                                );
                            }
                        }
                    }
                    if let Some(k) = self.table.get_mut(id).as_klass_mut() {
                        k.base_class = Some(base);
                        k.implements = implements;
                    }
                }
                DeclKind::Interface => {
                    if let Some(r) = decl.implements.first() {
                        self.report(
                            *module,
                            Diagnostic::error(
                                format!("Interface {} cannot implement; use extends", decl.identifier),
                                r.position,
                            ),
                        );
                    }
                    let extends = self.bound_interfaces_of(d, *module, &decl.extends, RefSlot::Extends);
                    if let TypeKind::Interface(i) = &mut self.table.get_mut(id).kind {
                        i.extends = extends;
                    }
                }
            }
            self.headers_bound.insert(id);
        }

        self.resolve_generic_types();
        self.break_inheritance_cycles(decls);
        self.link_static_twins();
        tracing::debug!("pass 4: headers bound");
    }

    fn bound_interfaces_of(
        &mut self,
        d: usize,
        module: ModuleId,
        refs: &[TypeRef],
        slot: fn(usize) -> RefSlot,
    ) -> Vec<TypeId> {
        let mut interfaces = Vec::new();
        for (i, r) in refs.iter().enumerate() {
            let Some(&t) = self.bindings.get(&(d, slot(i))) else {
                continue;
            };
            if self.table.get(t).as_interface().is_some() {
                interfaces.push(t);
            } else {
                self.report(
                    module,
                    Diagnostic::error(format!("{} is not an interface", self.table.identifier(t)), r.position),
                );
            }
        }
        interfaces
    }

    fn break_inheritance_cycles(&mut self, decls: &[(ModuleId, &TypeDecl)]) {
        for (d, (module, decl)) in decls.iter().enumerate() {
            let id = self.declared[d].type_id;
            let same = |table: &TypeTable, t: TypeId| t == id || table.get(t).generic_origin() == Some(id);

            match decl.kind {
                DeclKind::Class | DeclKind::Enum => {
                    let mut visited = FxHashSet::default();
                    let mut current = self.table.base_class(id);
                    let mut cyclic = false;
                    while let Some(c) = current {
                        if same(&self.table, c) {
                            cyclic = true;
                            break;
                        }
                        if !visited.insert(self.table.identifier(c).to_string()) {
                            break;
                        }
                        current = self.table.base_class(c);
                    }
                    if cyclic {
                        tracing::warn!(class = %decl.identifier, "severing cyclic inheritance");
                        self.report(
                            *module,
                            Diagnostic::error(
                                format!("Cyclic inheritance involving {}", decl.identifier),
                                decl.position,
                            ),
                        );
                        if let Some(k) = self.table.get_mut(id).as_klass_mut() {
                            k.base_class = Some(TypeTable::OBJECT);
                        }
                    }
                }
                DeclKind::Interface => {
                    let direct = self
                        .table
                        .get(id)
                        .as_interface()
                        .map(|i| i.extends.clone())
                        .unwrap_or_default();
                    let mut visited = FxHashSet::default();
                    let mut pending = direct;
                    let mut cyclic = false;
                    while let Some(i) = pending.pop() {
                        if same(&self.table, i) {
                            cyclic = true;
                            break;
                        }
                        if !visited.insert(i) {
                            continue;
                        }
                        if let Some(iface) = self.table.get(i).as_interface() {
                            pending.extend(iface.extends.iter().copied());
                        }
                    }
                    if cyclic {
                        tracing::warn!(interface = %decl.identifier, "severing cyclic inheritance");
                        self.report(
                            *module,
                            Diagnostic::error(
                                format!("Cyclic inheritance involving {}", decl.identifier),
                                decl.position,
                            ),
                        );
                        if let TypeKind::Interface(i) = &mut self.table.get_mut(id).kind {
                            i.extends.clear();
                        }
                    }
                }
            }
        }
    }

    fn link_static_twins(&mut self) {
        for d in 0..self.declared.len() {
            let id = self.declared[d].type_id;
            let (Some(twin), Some(base)) = (self.table.static_class_of(id), self.table.base_class(id)) else {
                continue;
            };
            let base = self.table.get(base).generic_origin().unwrap_or(base);
            let base_twin = self.table.static_class_of(base);
            if let TypeKind::StaticClass(s) = &mut self.table.get_mut(twin).kind {
                s.base = base_twin;
            }
        }
    }

    // ========================================================================
    // Pass 6: members
    // ========================================================================

    fn setup_methods_and_attributes(&mut self, decls: &[(ModuleId, &TypeDecl)]) {
        for (d, (module, decl)) in decls.iter().enumerate() {
            let module = *module;
            let id = self.declared[d].type_id;
            let scope = self.scope_of(d);
            let twin = self.table.static_class_of(id);

            for a in &decl.attributes {
                if decl.kind == DeclKind::Interface && !a.is_static {
                    self.report(
                        module,
                        Diagnostic::error(
                            format!("Interface {} cannot declare attribute {}", decl.identifier, a.identifier),
                            a.position,
                        ),
                    );
                    continue;
                }
                let ty = self
                    .resolve_type_ref(&a.type_ref, module, &scope, true)
                    .unwrap_or(TypeTable::OBJECT);
                let mut attribute = Attribute::new(a.identifier.clone(), ty, id);
                attribute.visibility = a.visibility.into();
                attribute.is_static = a.is_static;
                attribute.is_transient = a.is_transient;
                attribute.is_final = a.is_final;
                attribute.position = Some(a.position);
                let attribute = self.table.add_attribute(attribute);
                let owner = if a.is_static { twin.unwrap_or(id) } else { id };
                self.table.push_attribute(owner, attribute);
            }

            for m in &decl.methods {
                let mut method = Method::new(
                    if m.is_constructor { decl.identifier.as_str() } else { m.identifier.as_str() },
                    id,
                );
                let count = m.parameters.len();
                for (i, p) in m.parameters.iter().enumerate() {
                    let mut ty = self
                        .resolve_type_ref(&p.type_ref, module, &scope, true)
                        .unwrap_or(TypeTable::OBJECT);
                    if m.has_ellipsis && i + 1 == count {
                        ty = self.table.array_of(ty);
                    }
                    method.parameters.push(Parameter {
                        identifier: p.identifier.clone(),
                        type_id: ty,
                    });
                }
                method.has_ellipsis = m.has_ellipsis && count > 0;
                method.return_type = match (&m.return_type, m.is_constructor) {
                    (Some(r), false) => Some(
                        self.resolve_type_ref(r, module, &scope, true)
                            .unwrap_or(TypeTable::OBJECT),
                    ),
                    _ => None,
                };
                method.is_constructor = m.is_constructor;
                method.is_static = m.is_static && !m.is_constructor;
                method.is_abstract = m.is_abstract || (decl.kind == DeclKind::Interface && m.body.is_none());
                method.is_virtual = !method.is_static && !method.is_constructor;
                method.visibility = m.visibility.into();
                method.position = Some(m.position);

                if method.is_abstract && decl.kind == DeclKind::Class && !decl.is_abstract {
                    self.report(
                        module,
                        Diagnostic::error(
                            format!(
                                "Class {} must be abstract to declare abstract method {}",
                                decl.identifier, m.identifier
                            ),
                            m.position,
                        ),
                    );
                }

                method.body = match (&m.body, method.is_abstract) {
                    (Some(body), _) => MethodBody::Interpreted(Rc::new(body.clone())),
                    (None, true) => MethodBody::Abstract,
                    (None, false) => {
                        let mut body = Program::new(format!("{}.{}", decl.identifier, method.identifier))
                            .with_module(module);
                        body.emit(StatementKind::Return {
                            copy_return_value: false,
                            leave_this_object: m.is_constructor,
                        });
                        body.mark_step_finished();
                        MethodBody::Interpreted(Rc::new(body))
                    }
                };

                let owner = if method.is_static { twin.unwrap_or(id) } else { id };
                let method = self.table.add_method(method);
                self.table.push_method(owner, method);
            }

            if let Some(k) = self.table.get_mut(id).as_klass_mut() {
                k.attribute_initializer = decl.attribute_initializer.clone().map(Rc::new);
                if let Some(info) = k.enum_info.as_mut() {
                    info.constants = decl
                        .enum_constants
                        .iter()
                        .enumerate()
                        .map(|(ordinal, c)| EnumConstant {
                            identifier: c.identifier.clone(),
                            ordinal,
                            position: Some(c.position),
                            constructor_call: c.constructor_call.clone().map(Rc::new),
                        })
                        .collect();
                }
            }
            if let (Some(twin), Some(program)) = (twin, &decl.static_initializer) {
                if let TypeKind::StaticClass(s) = &mut self.table.get_mut(twin).kind {
                    s.static_initializer = Some(Rc::new(program.clone()));
                }
            }

            match decl.kind {
                DeclKind::Class => synthesize::add_json_methods(&mut self.table, id),
                DeclKind::Enum => synthesize::add_enum_methods(&mut self.table, id),
                DeclKind::Interface => {}
            }
            self.members_ready.insert(id);
        }
        tracing::debug!("pass 6: members");
    }

    // ========================================================================
    // Pass 7: name collisions
    // ========================================================================

    fn check_double_identifier_definition(&mut self, decls: &[(ModuleId, &TypeDecl)]) {
        for (module, name, position) in std::mem::take(&mut self.duplicates) {
            self.report(module, Diagnostic::error(format!("Type {} is already defined", name), position));
        }

        for (d, (module, decl)) in decls.iter().enumerate() {
            let module = *module;
            let mut seen = FxHashSet::default();
            for parameter in &decl.type_parameters {
                if !seen.insert(parameter.identifier.as_str()) {
                    self.report(
                        module,
                        Diagnostic::error(
                            format!("Type parameter {} is declared twice", parameter.identifier),
                            parameter.position,
                        ),
                    );
                } else if self.table.lookup(&parameter.identifier).is_some() {
                    self.report(
                        module,
                        Diagnostic::warning(
                            format!("Type parameter {} hides the type {}", parameter.identifier, parameter.identifier),
                            parameter.position,
                        ),
                    );
                }
            }

            let mut seen = FxHashSet::default();
            for a in &decl.attributes {
                if !seen.insert(a.identifier.as_str()) {
                    self.report(
                        module,
                        Diagnostic::error(
                            format!("Attribute {} is already defined in {}", a.identifier, decl.identifier),
                            a.position,
                        ),
                    );
                }
            }

            let id = self.declared[d].type_id;
            let mut owners = vec![id];
            owners.extend(self.table.static_class_of(id));
            let mut signatures = FxHashSet::default();
            for owner in owners {
                let methods = self.table.methods_of(owner).to_vec();
                for m in methods {
                    let method = self.table.method(m);
                    if method.native().is_some() {
                        continue;
                    }
                    let position = method.position.unwrap_or_default();
                    let signature = self.table.signature(m);
                    if !signatures.insert(signature.clone()) {
                        self.report(
                            module,
                            Diagnostic::error(
                                format!("Method {} is already defined in {}", signature, decl.identifier),
                                position,
                            ),
                        );
                    }
                }
            }
        }
    }

    // ========================================================================
    // Pass 8: generic variants
    // ========================================================================

    fn check_generic_types_against_type_guards(&mut self) {
        loop {
            self.resolve_generic_types();
            let pending: Vec<TypeId> = self
                .table
                .variants()
                .into_iter()
                .filter(|&(canonical, variant)| {
                    self.members_ready.contains(&canonical) && !self.members_ready.contains(&variant)
                })
                .map(|(_, variant)| variant)
                .collect();
            if pending.is_empty() {
                break;
            }
            for variant in pending {
                self.fill_variant_members(variant);
            }
        }

        for (_, variant) in self.table.variants() {
            if !self.bound_checked.contains(&variant) {
                self.check_bounds(variant);
            }
        }
        tracing::debug!(variants = self.table.variants().len(), "pass 8: generic variants");
    }
}
