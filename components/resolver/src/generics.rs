//! Generic instantiation by structural cloning and substitution.
//!
//! A variant is created once per `(canonical, arguments)` pair. Its headers
//! (base class, interfaces) are substituted as soon as the canonical
//! declaration's headers are bound, and its members once the canonical
//! declaration's members exist. Until then the variant sits in the request
//! queue or is marked `members_pending`.

use crate::resolver::Resolver;
use core_types::{Diagnostic, ModuleId, SourcePosition, TypeId};
use std::rc::Rc;
use type_model::{Interface, Klass, Type, TypeKind, TypeTable, TypeVariable};

/// Deepest accepted nesting of generic arguments (`A<A<A<...>>>`)
const MAX_GENERIC_DEPTH: usize = 16;

impl Resolver {
    /// Instantiate `canonical` with `arguments`.
    ///
    /// Reports an arity mismatch and falls back to the raw type. Bounds are
    /// checked now if the canonical declaration's bounds are known, otherwise
    /// later by the variant pass.
    pub(crate) fn instantiate_generic(
        &mut self,
        canonical: TypeId,
        arguments: Vec<TypeId>,
        module: ModuleId,
        position: SourcePosition,
    ) -> TypeId {
        let canonical = self.table.get(canonical).generic_origin().unwrap_or(canonical);
        let declared = self.table.get(canonical).type_variables().len();
        if declared != arguments.len() {
            self.report(
                module,
                Diagnostic::error(
                    format!(
                        "{} expects {} type arguments but got {}",
                        self.table.identifier(canonical),
                        declared,
                        arguments.len()
                    ),
                    position,
                ),
            );
            return canonical;
        }
        if let Some(variant) = self.table.find_variant(canonical, &arguments) {
            return variant;
        }
        if arguments.iter().any(|&a| self.generic_depth(a) >= MAX_GENERIC_DEPTH) {
            self.report(
                module,
                Diagnostic::error(
                    format!("Generic type {} is nested too deeply", self.table.identifier(canonical)),
                    position,
                ),
            );
            return canonical;
        }

        let variant = self.clone_declaration(canonical, &arguments);
        tracing::debug!(
            canonical = %self.table.identifier(canonical),
            variant = %self.table.identifier(variant),
            "instantiated generic"
        );
        self.table.register_variant(canonical, arguments, variant);
        self.variant_sites.insert(variant, (module, position));
        self.generic_requests.push(variant);

        let ready = match &self.table.get(canonical).kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => k.type_variables_ready,
            TypeKind::Interface(i) => i.type_variables_ready,
            _ => true,
        };
        if ready {
            self.check_bounds(variant);
        }
        variant
    }

    fn generic_depth(&self, ty: TypeId) -> usize {
        match &self.table.get(ty).kind {
            TypeKind::Array(a) => self.generic_depth(a.element),
            _ => {
                let vars = self.table.get(ty).type_variables();
                if self.table.get(ty).generic_origin().is_none() {
                    return 0;
                }
                1 + vars
                    .iter()
                    .map(|v| self.generic_depth(v.type_id))
                    .max()
                    .unwrap_or(0)
            }
        }
    }

    /// New record with fresh bindings; headers and members are filled later
    fn clone_declaration(&mut self, canonical: TypeId, arguments: &[TypeId]) -> TypeId {
        let source = self.table.get(canonical).clone();
        let names: Vec<&str> = arguments.iter().map(|&a| self.table.identifier(a)).collect();
        let identifier = format!("{}<{}>", source.identifier, names.join(", "));

        let bind = |vars: &[TypeVariable]| -> Vec<TypeVariable> {
            vars.iter()
                .zip(arguments)
                .map(|(v, &argument)| TypeVariable {
                    identifier: v.identifier.clone(),
                    type_id: argument,
                    scope_from: v.scope_from,
                    scope_to: v.scope_to,
                })
                .collect()
        };

        let kind = match &source.kind {
            TypeKind::Klass(k) => TypeKind::Klass(Klass {
                static_class: k.static_class,
                type_variables: bind(&k.type_variables),
                type_variables_ready: true,
                attribute_initializer: k.attribute_initializer.clone(),
                is_generic_variant_from: Some(canonical),
                is_abstract: k.is_abstract,
                visibility: k.visibility,
                members_pending: true,
                ..Klass::default()
            }),
            TypeKind::Interface(i) => TypeKind::Interface(Interface {
                type_variables: bind(&i.type_variables),
                type_variables_ready: true,
                is_generic_variant_from: Some(canonical),
                members_pending: true,
                ..Interface::default()
            }),
            _ => return canonical,
        };
        self.table.add_type(Type {
            identifier,
            kind,
            module: source.module,
            position: source.position,
        })
    }

    /// Placeholder-to-argument pairs of a variant
    pub(crate) fn substitution(&self, variant: TypeId) -> Vec<(TypeId, TypeId)> {
        let Some(origin) = self.table.get(variant).generic_origin() else {
            return Vec::new();
        };
        self.table
            .get(origin)
            .type_variables()
            .iter()
            .zip(self.table.get(variant).type_variables())
            .map(|(placeholder, bound)| (placeholder.type_id, bound.type_id))
            .collect()
    }

    /// Replace placeholders in `ty`, instantiating variants as needed
    pub(crate) fn substitute(&mut self, ty: TypeId, map: &[(TypeId, TypeId)]) -> TypeId {
        if let Some(&(_, argument)) = map.iter().find(|(placeholder, _)| *placeholder == ty) {
            return argument;
        }
        if let TypeKind::Array(a) = &self.table.get(ty).kind {
            let element = a.element;
            let substituted = self.substitute(element, map);
            return if substituted == element {
                ty
            } else {
                self.table.array_of(substituted)
            };
        }
        let Some(origin) = self.table.get(ty).generic_origin() else {
            return ty;
        };
        let arguments: Vec<TypeId> = self
            .table
            .get(ty)
            .type_variables()
            .iter()
            .map(|v| v.type_id)
            .collect();
        let substituted: Vec<TypeId> = arguments.iter().map(|&a| self.substitute(a, map)).collect();
        if substituted == arguments {
            return ty;
        }
        let (module, position) = self
            .variant_sites
            .get(&ty)
            .copied()
            .unwrap_or((ModuleId::new(0), SourcePosition::default()));
        self.instantiate_generic(origin, substituted, module, position)
    }

    /// Substitute headers of every queued variant whose canonical headers
    /// are bound. Returns the number of variants completed.
    pub(crate) fn resolve_generic_types(&mut self) -> usize {
        let mut completed = 0;
        loop {
            let pending = std::mem::take(&mut self.generic_requests);
            let mut progress = false;
            for variant in pending {
                let origin = self.table.get(variant).generic_origin();
                match origin {
                    Some(origin) if self.headers_bound.contains(&origin) => {
                        self.substitute_headers(variant, origin);
                        completed += 1;
                        progress = true;
                    }
                    _ => self.generic_requests.push(variant),
                }
            }
            if !progress {
                break;
            }
        }
        completed
    }

    fn substitute_headers(&mut self, variant: TypeId, origin: TypeId) {
        let map = self.substitution(variant);
        match self.table.get(origin).kind.clone() {
            TypeKind::Klass(k) | TypeKind::Enum(k) => {
                let base = k.base_class.map(|b| self.substitute(b, &map));
                let implements: Vec<TypeId> =
                    k.implements.iter().map(|&i| self.substitute(i, &map)).collect();
                if let Some(v) = self.table.get_mut(variant).as_klass_mut() {
                    v.base_class = base;
                    v.implements = implements;
                }
            }
            TypeKind::Interface(i) => {
                let extends: Vec<TypeId> = i.extends.iter().map(|&e| self.substitute(e, &map)).collect();
                if let TypeKind::Interface(v) = &mut self.table.get_mut(variant).kind {
                    v.extends = extends;
                }
            }
            _ => {}
        }
        self.headers_bound.insert(variant);
    }

    /// Check every argument of a variant against its parameter's bounds
    pub(crate) fn check_bounds(&mut self, variant: TypeId) {
        self.bound_checked.insert(variant);
        let Some(origin) = self.table.get(variant).generic_origin() else {
            return;
        };
        let map = self.substitution(variant);
        let (module, position) = self
            .variant_sites
            .get(&variant)
            .copied()
            .unwrap_or((ModuleId::new(0), SourcePosition::default()));

        for (placeholder, argument) in map.clone() {
            let TypeKind::TypeParameter(parameter) = self.table.get(placeholder).kind.clone() else {
                continue;
            };
            let bound_class = self.substitute(parameter.bound_class, &map);
            if bound_class != TypeTable::OBJECT && !self.table.can_cast_to(argument, bound_class) {
                self.report(
                    module,
                    Diagnostic::error(
                        format!(
                            "Type argument {} of {} is not a subtype of {}",
                            self.table.identifier(argument),
                            self.table.identifier(origin),
                            self.table.identifier(bound_class)
                        ),
                        position,
                    ),
                );
            }
            for interface in parameter.bound_interfaces {
                let interface = self.substitute(interface, &map);
                if !self.table.can_cast_to(argument, interface) {
                    self.report(
                        module,
                        Diagnostic::error(
                            format!(
                                "Type argument {} of {} does not implement {}",
                                self.table.identifier(argument),
                                self.table.identifier(origin),
                                self.table.identifier(interface)
                            ),
                            position,
                        ),
                    );
                }
            }
        }
    }

    /// Derive a variant's members from its canonical declaration.
    ///
    /// Members whose types mention a substituted parameter are cloned; the
    /// rest are shared, and so is the whole list when nothing changed.
    pub(crate) fn fill_variant_members(&mut self, variant: TypeId) {
        self.members_ready.insert(variant);
        let Some(origin) = self.table.get(variant).generic_origin() else {
            return;
        };
        let map = self.substitution(variant);

        let canonical_methods = match &self.table.get(origin).kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => Rc::clone(&k.methods),
            TypeKind::Interface(i) => Rc::clone(&i.methods),
            _ => Rc::default(),
        };
        let (canonical_attributes, initializer) = match self.table.get(origin).as_klass() {
            Some(k) => (Rc::clone(&k.attributes), k.attribute_initializer.clone()),
            None => (Rc::default(), None),
        };

        let mut methods = Vec::with_capacity(canonical_methods.len());
        let mut methods_changed = false;
        for &m in canonical_methods.iter() {
            let mut method = self.table.method(m).clone();
            let mut changed = false;
            for parameter in method.parameters.iter_mut() {
                let substituted = self.substitute(parameter.type_id, &map);
                changed |= substituted != parameter.type_id;
                parameter.type_id = substituted;
            }
            if let Some(r) = method.return_type {
                let substituted = self.substitute(r, &map);
                changed |= substituted != r;
                method.return_type = Some(substituted);
            }
            if changed {
                method.declaring_type = variant;
                method.is_generic_variant_from = Some(m);
                methods.push(self.table.add_method(method));
                methods_changed = true;
            } else {
                methods.push(m);
            }
        }

        let mut attributes = Vec::with_capacity(canonical_attributes.len());
        let mut attributes_changed = false;
        for &a in canonical_attributes.iter() {
            let mut attribute = self.table.attribute(a).clone();
            let substituted = self.substitute(attribute.type_id, &map);
            if substituted != attribute.type_id {
                attribute.type_id = substituted;
                attribute.declaring_type = variant;
                attribute.is_generic_variant_from = Some(a);
                attributes.push(self.table.add_attribute(attribute));
                attributes_changed = true;
            } else {
                attributes.push(a);
            }
        }

        let methods = if methods_changed {
            Rc::new(methods)
        } else {
            canonical_methods
        };
        let attributes = if attributes_changed {
            Rc::new(attributes)
        } else {
            canonical_attributes
        };
        match &mut self.table.get_mut(variant).kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => {
                k.methods = methods;
                k.attributes = attributes;
                k.attribute_initializer = initializer;
                k.members_pending = false;
            }
            TypeKind::Interface(i) => {
                i.methods = methods;
                i.members_pending = false;
            }
            _ => {}
        }
    }
}
