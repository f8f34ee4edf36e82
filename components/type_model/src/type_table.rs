//! Central arena for type, method and attribute descriptors.
//!
//! Builtin types are registered by [`TypeTable::new`] at fixed indices so
//! they can be referenced through associated constants without a lookup.

use crate::attribute::Attribute;
use crate::method::{native_argument, Method, MethodBody, NativeMethod};
use crate::types::{
    ArrayType, Interface, Klass, PrimitiveKind, StaticClass, Type, TypeKind, Visibility,
};
use core_types::{AttributeId, MethodId, ModuleId, SourcePosition, TypeId, Value};
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

/// Arena of all descriptors of a loaded module set
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<Type>,
    methods: Vec<Method>,
    attributes: Vec<Attribute>,
    by_name: FxHashMap<String, TypeId>,
    arrays: FxHashMap<TypeId, TypeId>,
    variants: FxHashMap<(TypeId, Vec<TypeId>), TypeId>,
}

impl TypeTable {
    // ========================================================================
    // Reserved TypeIds, interned at these indices by TypeTable::new()
    // ========================================================================

    /// void
    pub const VOID: TypeId = TypeId(0);
    /// Type of `null`
    pub const NULL: TypeId = TypeId(1);
    /// boolean
    pub const BOOLEAN: TypeId = TypeId(2);
    /// char
    pub const CHAR: TypeId = TypeId(3);
    /// int
    pub const INT: TypeId = TypeId(4);
    /// long
    pub const LONG: TypeId = TypeId(5);
    /// double
    pub const DOUBLE: TypeId = TypeId(6);
    /// String
    pub const STRING: TypeId = TypeId(7);
    /// Root class
    pub const OBJECT: TypeId = TypeId(8);

    /// Create a table holding the primitive types and `Object`
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::with_capacity(64),
            methods: Vec::new(),
            attributes: Vec::new(),
            by_name: FxHashMap::default(),
            arrays: FxHashMap::default(),
            variants: FxHashMap::default(),
        };

        for kind in [
            PrimitiveKind::Void,
            PrimitiveKind::Null,
            PrimitiveKind::Boolean,
            PrimitiveKind::Char,
            PrimitiveKind::Int,
            PrimitiveKind::Long,
            PrimitiveKind::Double,
            PrimitiveKind::String,
        ] {
            let id = table.add_type(Type {
                identifier: kind.identifier().to_string(),
                kind: TypeKind::Primitive(kind),
                module: None,
                position: None,
            });
            if kind != PrimitiveKind::Null {
                table.register_name(kind.identifier(), id);
            }
        }

        let object = table.add_class("Object", None, None, false);
        debug_assert_eq!(object, Self::OBJECT);
        table.register_name("Object", object);
        table.install_object_methods();
        table
    }

    fn install_object_methods(&mut self) {
        let mut to_string = Method::new("toString", Self::OBJECT);
        to_string.return_type = Some(Self::STRING);
        to_string.body = MethodBody::Native(NativeMethod::new(|ctx, args| {
            let receiver = native_argument(args, 0)?;
            let name = ctx.class_name(receiver)?;
            let id = receiver.heap_id().map(|h| h.0).unwrap_or_default();
            Ok(Some(Value::String(format!("{}@{}", name, id))))
        }));
        let to_string = self.add_method(to_string);
        self.push_method(Self::OBJECT, to_string);

        let mut equals = Method::new("equals", Self::OBJECT);
        equals.parameters.push(crate::Parameter {
            identifier: "other".to_string(),
            type_id: Self::OBJECT,
        });
        equals.return_type = Some(Self::BOOLEAN);
        equals.body = MethodBody::Native(NativeMethod::new(|_, args| {
            Ok(Some(Value::Boolean(
                native_argument(args, 0)? == native_argument(args, 1)?,
            )))
        }));
        let equals = self.add_method(equals);
        self.push_method(Self::OBJECT, equals);

        let mut hash_code = Method::new("hashCode", Self::OBJECT);
        hash_code.return_type = Some(Self::INT);
        hash_code.body = MethodBody::Native(NativeMethod::new(|_, args| {
            let id = native_argument(args, 0)?.heap_id().map(|h| h.0).unwrap_or_default();
            Ok(Some(Value::Int(id as i32)))
        }));
        let hash_code = self.add_method(hash_code);
        self.push_method(Self::OBJECT, hash_code);
    }

    // ========================================================================
    // Arena access
    // ========================================================================

    /// Append a type descriptor
    pub fn add_type(&mut self, ty: Type) -> TypeId {
        let id = TypeId::new(self.types.len());
        self.types.push(ty);
        id
    }

    /// Get a type descriptor by ID
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    /// Get a mutable type descriptor by ID
    pub fn get_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.index()]
    }

    /// Display name of a type
    pub fn identifier(&self, id: TypeId) -> &str {
        &self.types[id.index()].identifier
    }

    /// All type ids in registration order
    pub fn type_ids(&self) -> impl Iterator<Item = TypeId> {
        (0..self.types.len()).map(TypeId::new)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the table is empty (never true after `new`)
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Bind `name` to `id` unless already bound; returns the previous binding
    pub fn register_name(&mut self, name: &str, id: TypeId) -> Option<TypeId> {
        if let Some(existing) = self.by_name.get(name) {
            return Some(*existing);
        }
        self.by_name.insert(name.to_string(), id);
        None
    }

    /// Look up a named type across all loaded modules
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Append a method descriptor
    pub fn add_method(&mut self, method: Method) -> MethodId {
        let id = MethodId::new(self.methods.len());
        self.methods.push(method);
        id
    }

    /// Get a method by ID
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    /// Get a mutable method by ID
    pub fn method_mut(&mut self, id: MethodId) -> &mut Method {
        &mut self.methods[id.index()]
    }

    /// All method ids in registration order
    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> {
        (0..self.methods.len()).map(MethodId::new)
    }

    /// Append an attribute descriptor
    pub fn add_attribute(&mut self, attribute: Attribute) -> AttributeId {
        let id = AttributeId::new(self.attributes.len());
        self.attributes.push(attribute);
        id
    }

    /// Get an attribute by ID
    pub fn attribute(&self, id: AttributeId) -> &Attribute {
        &self.attributes[id.index()]
    }

    /// Get a mutable attribute by ID
    pub fn attribute_mut(&mut self, id: AttributeId) -> &mut Attribute {
        &mut self.attributes[id.index()]
    }

    // ========================================================================
    // Descriptor construction
    // ========================================================================

    /// Register a class (or enum) skeleton together with its static twin.
    ///
    /// The name is not registered; callers decide about visibility.
    pub fn add_class(
        &mut self,
        identifier: &str,
        module: Option<ModuleId>,
        position: Option<SourcePosition>,
        is_enum: bool,
    ) -> TypeId {
        let klass = Klass {
            type_variables_ready: true,
            enum_info: is_enum.then(Default::default),
            ..Klass::default()
        };
        let kind = if is_enum {
            TypeKind::Enum(klass)
        } else {
            TypeKind::Klass(klass)
        };
        let id = self.add_type(Type {
            identifier: identifier.to_string(),
            kind,
            module,
            position,
        });
        let static_id = self.add_type(Type {
            identifier: identifier.to_string(),
            kind: TypeKind::StaticClass(StaticClass {
                klass: id,
                base: None,
                methods: Rc::default(),
                attributes: Rc::default(),
                static_initializer: None,
                number_of_attributes: 0,
            }),
            module,
            position,
        });
        if let Some(k) = self.types[id.index()].as_klass_mut() {
            k.static_class = Some(static_id);
        }
        id
    }

    /// Register an interface skeleton
    pub fn add_interface(
        &mut self,
        identifier: &str,
        module: Option<ModuleId>,
        position: Option<SourcePosition>,
    ) -> TypeId {
        self.add_type(Type {
            identifier: identifier.to_string(),
            kind: TypeKind::Interface(Interface {
                type_variables_ready: true,
                ..Interface::default()
            }),
            module,
            position,
        })
    }

    /// Array type with the given element type, created on first use
    pub fn array_of(&mut self, element: TypeId) -> TypeId {
        if let Some(id) = self.arrays.get(&element) {
            return *id;
        }
        let identifier = format!("{}[]", self.identifier(element));
        let id = self.add_type(Type {
            identifier,
            kind: TypeKind::Array(ArrayType { element }),
            module: None,
            position: None,
        });
        self.arrays.insert(element, id);
        id
    }

    /// Array type with the given element type, if one was created
    pub fn find_array(&self, element: TypeId) -> Option<TypeId> {
        self.arrays.get(&element).copied()
    }

    /// Previously created generic variant of `canonical` for `arguments`
    pub fn find_variant(&self, canonical: TypeId, arguments: &[TypeId]) -> Option<TypeId> {
        self.variants
            .get(&(canonical, arguments.to_vec()))
            .copied()
    }

    /// Remember a generic variant for later instantiation requests
    pub fn register_variant(&mut self, canonical: TypeId, arguments: Vec<TypeId>, variant: TypeId) {
        self.variants.insert((canonical, arguments), variant);
    }

    /// All generic variants with their canonical declaration
    pub fn variants(&self) -> Vec<(TypeId, TypeId)> {
        let mut all: Vec<_> = self
            .variants
            .iter()
            .map(|((canonical, _), variant)| (*canonical, *variant))
            .collect();
        all.sort_by_key(|(_, variant)| *variant);
        all
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Append a method to a type's method list.
    ///
    /// Lists shared with generic variants are copied on write.
    pub fn push_method(&mut self, owner: TypeId, method: MethodId) {
        let list = match &mut self.types[owner.index()].kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => &mut k.methods,
            TypeKind::Interface(i) => &mut i.methods,
            TypeKind::StaticClass(s) => &mut s.methods,
            _ => return,
        };
        Rc::make_mut(list).push(method);
    }

    /// Append an attribute to a class or static twin.
    ///
    /// Lists shared with generic variants are copied on write.
    pub fn push_attribute(&mut self, owner: TypeId, attribute: AttributeId) {
        let list = match &mut self.types[owner.index()].kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => &mut k.attributes,
            TypeKind::StaticClass(s) => &mut s.attributes,
            _ => return,
        };
        Rc::make_mut(list).push(attribute);
    }

    /// Methods declared directly in a type
    pub fn methods_of(&self, id: TypeId) -> &[MethodId] {
        match &self.types[id.index()].kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => &k.methods,
            TypeKind::Interface(i) => &i.methods,
            TypeKind::StaticClass(s) => &s.methods,
            _ => &[],
        }
    }

    /// Attributes declared directly in a class or static twin
    pub fn attributes_of(&self, id: TypeId) -> &[AttributeId] {
        match &self.types[id.index()].kind {
            TypeKind::Klass(k) | TypeKind::Enum(k) => &k.attributes,
            TypeKind::StaticClass(s) => &s.attributes,
            _ => &[],
        }
    }

    /// Base class of a class or enum
    pub fn base_class(&self, id: TypeId) -> Option<TypeId> {
        self.types[id.index()].as_klass().and_then(|k| k.base_class)
    }

    /// Static twin of a class or enum
    pub fn static_class_of(&self, id: TypeId) -> Option<TypeId> {
        self.types[id.index()].as_klass().and_then(|k| k.static_class)
    }

    /// Class chain starting at `id`, leaf first.
    ///
    /// Stops at a repeated class so a corrupt hierarchy cannot loop.
    pub fn class_chain(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if chain.contains(&c) {
                break;
            }
            chain.push(c);
            current = self.base_class(c);
        }
        chain
    }

    /// `name(Type1,Type2)` key identifying overrides
    pub fn signature(&self, method: MethodId) -> String {
        let m = self.method(method);
        let params: Vec<&str> = m
            .parameters
            .iter()
            .map(|p| self.identifier(p.type_id))
            .collect();
        format!("{}({})", m.identifier, params.join(","))
    }

    /// Methods named `name` visible on `ty`, most derived first.
    ///
    /// Walks base classes and interfaces; a method shadows inherited ones
    /// with the same signature. Constructors are only taken from `ty` itself.
    pub fn collect_methods(&self, ty: TypeId, name: &str) -> Vec<MethodId> {
        let mut found = Vec::new();
        let mut seen = FxHashSet::default();
        let mut add_from = |table: &Self, owner: TypeId, found: &mut Vec<MethodId>| {
            for &m in table.methods_of(owner) {
                let method = table.method(m);
                if method.identifier != name || (method.is_constructor && owner != ty) {
                    continue;
                }
                if seen.insert(table.signature(m)) {
                    found.push(m);
                }
            }
        };

        match &self.get(ty).kind {
            TypeKind::Klass(_) | TypeKind::Enum(_) => {
                let chain = self.class_chain(ty);
                for &c in &chain {
                    add_from(self, c, &mut found);
                }
                for iface in self.all_interfaces(ty) {
                    add_from(self, iface, &mut found);
                }
            }
            TypeKind::Interface(_) => {
                add_from(self, ty, &mut found);
                for iface in self.all_interfaces(ty) {
                    add_from(self, iface, &mut found);
                }
            }
            TypeKind::StaticClass(_) => {
                let mut current = Some(ty);
                let mut visited = FxHashSet::default();
                while let Some(s) = current {
                    if !visited.insert(s) {
                        break;
                    }
                    add_from(self, s, &mut found);
                    current = self.get(s).as_static_class().and_then(|s| s.base);
                }
            }
            TypeKind::TypeParameter(p) => {
                let bound = p.bound_class;
                let interfaces = p.bound_interfaces.clone();
                for c in self.class_chain(bound) {
                    add_from(self, c, &mut found);
                }
                for iface in interfaces {
                    add_from(self, iface, &mut found);
                }
            }
            TypeKind::Array(_) | TypeKind::Primitive(_) => {}
        }
        found
    }

    /// Most derived non-static method with `signature` on the class chain of
    /// `class`; drives virtual dispatch
    pub fn find_method_by_signature(&self, class: TypeId, signature: &str) -> Option<MethodId> {
        self.class_chain(class).into_iter().find_map(|c| {
            self.methods_of(c).iter().copied().find(|&m| {
                let method = self.method(m);
                !method.is_static && !method.is_constructor && self.signature(m) == signature
            })
        })
    }

    /// Interfaces implemented by a class (including through base classes) or
    /// extended by an interface, transitively
    pub fn all_interfaces(&self, ty: TypeId) -> Vec<TypeId> {
        let mut result = Vec::new();
        let mut pending: Vec<TypeId> = match &self.get(ty).kind {
            TypeKind::Klass(_) | TypeKind::Enum(_) => self
                .class_chain(ty)
                .into_iter()
                .flat_map(|c| self.get(c).as_klass().map(|k| k.implements.clone()).unwrap_or_default())
                .collect(),
            TypeKind::Interface(i) => i.extends.clone(),
            _ => Vec::new(),
        };
        while let Some(iface) = pending.pop() {
            if result.contains(&iface) || iface == ty {
                continue;
            }
            result.push(iface);
            if let Some(i) = self.get(iface).as_interface() {
                pending.extend(i.extends.iter().copied());
            }
        }
        result
    }

    // ========================================================================
    // Attribute layout
    // ========================================================================

    /// Instance attributes of a class and its base classes, root first
    pub fn all_attributes(&self, class: TypeId) -> Vec<AttributeId> {
        let mut chain = self.class_chain(class);
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|c| self.attributes_of(c).iter().copied())
            .filter(|a| !self.attribute(*a).is_static)
            .collect()
    }

    /// Runtime object slot count
    pub fn number_of_attributes_including_base_class(&self, class: TypeId) -> usize {
        self.get(class)
            .as_klass()
            .and_then(|k| k.number_of_attributes_including_base_class)
            .unwrap_or_else(|| self.all_attributes(class).len())
    }

    /// Assign slot indices for every class hierarchy, root to leaf.
    ///
    /// Runs once after all attributes are known.
    pub fn setup_attribute_indices(&mut self) {
        let mut visiting = FxHashSet::default();
        for id in 0..self.types.len() {
            let id = TypeId::new(id);
            if self.get(id).as_klass().is_some() {
                self.setup_attribute_indices_recursive(id, &mut visiting);
            }
        }
    }

    fn setup_attribute_indices_recursive(
        &mut self,
        class: TypeId,
        visiting: &mut FxHashSet<TypeId>,
    ) -> usize {
        let Some(klass) = self.get(class).as_klass() else {
            return 0;
        };
        if let Some(n) = klass.number_of_attributes_including_base_class {
            return n;
        }
        if !visiting.insert(class) {
            tracing::warn!(class = %self.identifier(class), "cyclic hierarchy while indexing attributes");
            return 0;
        }
        let base = klass.base_class;
        let own = Rc::clone(&klass.attributes);
        let static_class = klass.static_class;

        let mut next = match base {
            Some(b) => self.setup_attribute_indices_recursive(b, visiting),
            None => 0,
        };
        for &a in own.iter() {
            let attribute = self.attribute_mut(a);
            if !attribute.is_static {
                attribute.index = Some(next);
                next += 1;
            }
        }
        if let Some(k) = self.get_mut(class).as_klass_mut() {
            k.number_of_attributes_including_base_class = Some(next);
        }

        if let Some(s) = static_class {
            let statics = match &self.get(s).kind {
                TypeKind::StaticClass(sc) => Rc::clone(&sc.attributes),
                _ => Rc::default(),
            };
            for (i, &a) in statics.iter().enumerate() {
                self.attribute_mut(a).index = Some(i);
            }
            if let TypeKind::StaticClass(sc) = &mut self.get_mut(s).kind {
                sc.number_of_attributes = statics.len();
            }
        }
        next
    }

    /// Attribute named `name` on a class chain, most derived first
    pub fn find_attribute(&self, class: TypeId, name: &str) -> Option<AttributeId> {
        self.class_chain(class).into_iter().find_map(|c| {
            self.attributes_of(c)
                .iter()
                .copied()
                .find(|&a| self.attribute(a).identifier == name)
        })
    }

    /// Declared visibility of a class or enum; public for everything else
    pub fn visibility_of(&self, id: TypeId) -> Visibility {
        self.get(id)
            .as_klass()
            .map(|k| k.visibility)
            .unwrap_or_default()
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}
