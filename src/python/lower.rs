//! Lowering of a parsed Python file into the object model.
//!
//! Only statements that create module or class attributes are looked at:
//! definitions, assignments, imports and the docstring. Nothing is
//! executed, so values are recorded by their source text.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tree_sitter::Node;

use super::literal::{collapse_source, decode_string, repr_str};
use super::object::{
    BaseRef, Binding, Class, ClassKind, Data, EnumMember, Function, FunctionKind, Module, Object,
    Property,
};
use super::parser::{named_children, ParsedFile};

const ENUM_BASES: &[&str] = &["Enum", "IntEnum", "Flag", "IntFlag", "StrEnum"];

static BUILTIN_EXCEPTIONS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "BaseException", "Exception", "ArithmeticError", "AssertionError", "AttributeError",
        "BufferError", "EOFError", "ImportError", "LookupError", "IndexError", "KeyError",
        "MemoryError", "NameError", "OSError", "IOError", "EnvironmentError", "ReferenceError",
        "RuntimeError", "NotImplementedError", "StopIteration", "SyntaxError", "SystemError",
        "TypeError", "ValueError", "UnicodeError", "ZeroDivisionError", "OverflowError",
        "ConnectionError", "FileExistsError", "FileNotFoundError", "PermissionError",
        "TimeoutError", "Warning", "UserWarning", "DeprecationWarning", "RuntimeWarning",
    ]
});

/// Insert or replace a binding, keeping the slot of the first assignment.
fn upsert<T>(members: &mut Vec<(String, T)>, name: &str, value: T) {
    match members.iter_mut().find(|(n, _)| n == name) {
        Some(slot) => slot.1 = value,
        None => members.push((name.to_string(), value)),
    }
}

fn statements<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    named_children(node)
        .into_iter()
        .filter(|n| n.kind() != "comment")
        .collect()
}

fn block_of<'t>(clause: &Node<'t>) -> Option<Node<'t>> {
    named_children(clause).into_iter().find(|n| n.kind() == "block")
}

enum Definition {
    Object(String, Object),
    /// `@name.setter` and friends: the name keeps its existing property.
    Accessor(String, Object),
}

pub struct Lowerer<'f> {
    file: &'f ParsedFile,
    module: String,
    is_package: bool,
    local_classes: HashMap<String, ClassKind>,
    imports: HashMap<String, BaseRef>,
    module_aliases: HashMap<String, String>,
}

impl<'f> Lowerer<'f> {
    pub fn new(file: &'f ParsedFile, module: &str, is_package: bool) -> Self {
        Self {
            file,
            module: module.to_string(),
            is_package,
            local_classes: HashMap::new(),
            imports: HashMap::new(),
            module_aliases: HashMap::new(),
        }
    }

    pub fn lower(mut self, path: &Path) -> Module {
        let root = self.file.root_node();
        let stmts = statements(&root);

        let mut module = Module {
            name: self.module.clone(),
            path: path.to_path_buf(),
            is_package: self.is_package,
            docstring: self.docstring(&stmts),
            all: None,
            members: Vec::new(),
            star_imports: Vec::new(),
        };
        self.lower_statements(&stmts, &mut module);
        module
    }

    fn text(&self, node: &Node) -> &'f str {
        self.file.node_text(node)
    }

    fn lower_statements(&mut self, stmts: &[Node], module: &mut Module) {
        for stmt in stmts {
            match stmt.kind() {
                "function_definition" | "class_definition" => {
                    if let Some(def) = self.lower_definition(stmt, &[]) {
                        self.bind_definition(def, &mut module.members);
                    }
                }
                "decorated_definition" => {
                    if let Some(def) = self.lower_decorated(stmt) {
                        self.bind_definition(def, &mut module.members);
                    }
                }
                "expression_statement" => self.lower_module_expression(stmt, module),
                "import_statement" => self.lower_import(stmt, module),
                "import_from_statement" => self.lower_import_from(stmt, module),
                "if_statement" => self.lower_if(stmt, module),
                "try_statement" => self.lower_try(stmt, module),
                _ => {}
            }
        }
    }

    /// The first branch binds like top-level code; `elif` and `else`
    /// branches only add names it left unbound.
    fn lower_if(&mut self, stmt: &Node, module: &mut Module) {
        if let Some(body) = stmt.child_by_field_name("consequence") {
            self.lower_statements(&statements(&body), module);
        }
        let mut cursor = stmt.walk();
        let alternatives: Vec<Node> = stmt
            .children_by_field_name("alternative", &mut cursor)
            .collect();
        for clause in alternatives {
            let body = match clause.kind() {
                "elif_clause" => clause.child_by_field_name("consequence"),
                _ => clause.child_by_field_name("body"),
            };
            if let Some(body) = body {
                self.lower_fallback(&statements(&body), module);
            }
        }
    }

    /// `try`, `else` and `finally` bodies bind normally; exception
    /// handlers only add names the other bodies left unbound.
    fn lower_try(&mut self, stmt: &Node, module: &mut Module) {
        if let Some(body) = stmt.child_by_field_name("body") {
            self.lower_statements(&statements(&body), module);
        }
        let clauses = named_children(stmt);
        for clause in &clauses {
            let body = match clause.kind() {
                "else_clause" => clause.child_by_field_name("body"),
                "finally_clause" => block_of(clause),
                _ => None,
            };
            if let Some(body) = body {
                self.lower_statements(&statements(&body), module);
            }
        }
        for clause in &clauses {
            if matches!(clause.kind(), "except_clause" | "except_group_clause") {
                if let Some(body) = block_of(clause) {
                    self.lower_fallback(&statements(&body), module);
                }
            }
        }
    }

    /// Lower `stmts` keeping every existing binding. Only names not bound
    /// yet are added.
    fn lower_fallback(&mut self, stmts: &[Node], module: &mut Module) {
        let mut scratch = Module {
            name: module.name.clone(),
            path: module.path.clone(),
            is_package: module.is_package,
            docstring: None,
            all: None,
            members: module.members.clone(),
            star_imports: Vec::new(),
        };
        let local_classes = self.local_classes.clone();
        let imports = self.imports.clone();
        let module_aliases = self.module_aliases.clone();

        self.lower_statements(stmts, &mut scratch);

        self.local_classes.extend(local_classes);
        self.imports.extend(imports);
        self.module_aliases.extend(module_aliases);

        for (name, binding) in scratch.members {
            if module.binding(&name).is_none() {
                module.members.push((name, binding));
            }
        }
        if module.all.is_none() {
            module.all = scratch.all;
        }
        for star in scratch.star_imports {
            if !module.star_imports.contains(&star) {
                module.star_imports.push(star);
            }
        }
    }

    fn bind_definition(&mut self, def: Definition, members: &mut Vec<(String, Binding)>) {
        match def {
            Definition::Object(name, object) => {
                if let Object::Class(class) = &object {
                    self.local_classes.insert(name.clone(), class.kind);
                }
                upsert(members, &name, Binding::Value(Arc::new(object)));
            }
            Definition::Accessor(name, fallback) => {
                let is_property = matches!(
                    members.iter().find(|(n, _)| *n == name),
                    Some((_, Binding::Value(v))) if matches!(**v, Object::Property(_))
                );
                if !is_property {
                    upsert(members, &name, Binding::Value(Arc::new(fallback)));
                }
            }
        }
    }

    fn lower_module_expression(&mut self, stmt: &Node, module: &mut Module) {
        let Some(expr) = stmt.named_child(0) else {
            return;
        };
        match expr.kind() {
            "assignment" => {
                for (target, value) in self.assignment_pairs(&expr) {
                    if target == "__all__" {
                        module.all = Some(self.string_list(&value));
                    } else {
                        let binding = match module.binding(self.text(&value)) {
                            Some(existing) if value.kind() == "identifier" => existing.clone(),
                            _ => Binding::Value(self.data(&value)),
                        };
                        upsert(&mut module.members, target, binding);
                    }
                }
            }
            "augmented_assignment" => {
                let left = expr.child_by_field_name("left").map(|n| self.text(&n));
                let op = expr.child_by_field_name("operator").map(|n| self.text(&n));
                if let (Some("__all__"), Some("+="), Some(right)) =
                    (left, op, expr.child_by_field_name("right"))
                {
                    let extra = self.string_list(&right);
                    module.all.get_or_insert_with(Vec::new).extend(extra);
                }
            }
            _ => {}
        }
    }

    fn lower_import(&mut self, stmt: &Node, module: &mut Module) {
        let mut cursor = stmt.walk();
        let names: Vec<Node> = stmt.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            match name.kind() {
                "dotted_name" => {
                    let dotted = self.text(&name);
                    let first = dotted.split('.').next().unwrap_or(dotted);
                    self.module_aliases.insert(first.to_string(), first.to_string());
                    upsert(&mut module.members, first, Binding::Module(first.to_string()));
                }
                "aliased_import" => {
                    let (Some(target), Some(alias)) =
                        (name.child_by_field_name("name"), name.child_by_field_name("alias"))
                    else {
                        continue;
                    };
                    let dotted = self.text(&target).to_string();
                    let alias = self.text(&alias);
                    self.module_aliases.insert(alias.to_string(), dotted.clone());
                    upsert(&mut module.members, alias, Binding::Module(dotted));
                }
                _ => {}
            }
        }
    }

    fn lower_import_from(&mut self, stmt: &Node, module: &mut Module) {
        let Some(source) = stmt.child_by_field_name("module_name") else {
            return;
        };
        let source_module = if source.kind() == "relative_import" {
            self.resolve_relative(self.text(&source))
        } else {
            self.text(&source).to_string()
        };

        if named_children(stmt).iter().any(|n| n.kind() == "wildcard_import") {
            module.star_imports.push(source_module.clone());
        }

        let mut cursor = stmt.walk();
        let names: Vec<Node> = stmt.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            let (original, local) = match name.kind() {
                "dotted_name" => (self.text(&name), self.text(&name)),
                "aliased_import" => {
                    let (Some(target), Some(alias)) =
                        (name.child_by_field_name("name"), name.child_by_field_name("alias"))
                    else {
                        continue;
                    };
                    (self.text(&target), self.text(&alias))
                }
                _ => continue,
            };
            self.imports
                .insert(local.to_string(), BaseRef::new(source_module.clone(), original));
            upsert(
                &mut module.members,
                local,
                Binding::Import {
                    module: source_module.clone(),
                    name: original.to_string(),
                },
            );
        }
    }

    /// Turn `..sub` into an absolute module name relative to this module.
    fn resolve_relative(&self, text: &str) -> String {
        let dots = text.chars().take_while(|c| *c == '.').count();
        let rest = text[dots..].trim();

        let mut parts: Vec<&str> = self.module.split('.').collect();
        if !self.is_package {
            parts.pop();
        }
        for _ in 1..dots {
            parts.pop();
        }
        if !rest.is_empty() {
            parts.push(rest);
        }
        parts.join(".")
    }

    fn lower_decorated(&mut self, stmt: &Node) -> Option<Definition> {
        let definition = stmt.child_by_field_name("definition")?;
        let decorators: Vec<String> = named_children(stmt)
            .iter()
            .filter(|n| n.kind() == "decorator")
            .filter_map(|d| d.named_child(0))
            .map(|expr| match expr.kind() {
                "call" => expr
                    .child_by_field_name("function")
                    .map(|f| self.text(&f).to_string())
                    .unwrap_or_default(),
                _ => self.text(&expr).to_string(),
            })
            .collect();
        self.lower_definition(&definition, &decorators)
    }

    fn lower_definition(&mut self, node: &Node, decorators: &[String]) -> Option<Definition> {
        match node.kind() {
            "class_definition" => {
                let class = self.lower_class(node)?;
                Some(Definition::Object(class.name.clone(), Object::Class(class)))
            }
            "function_definition" => self.lower_decorated_function(node, decorators),
            _ => None,
        }
    }

    fn lower_decorated_function(&self, node: &Node, decorators: &[String]) -> Option<Definition> {
        let mut kind = FunctionKind::Plain;
        let mut is_property = false;
        let mut accessor_of = None;

        for decorator in decorators {
            match decorator.as_str() {
                "classmethod" => kind = FunctionKind::ClassMethod,
                "staticmethod" => kind = FunctionKind::StaticMethod,
                "property" => is_property = true,
                other => {
                    if let Some((target, attr)) = other.rsplit_once('.') {
                        if matches!(attr, "setter" | "getter" | "deleter") {
                            accessor_of = Some(target.to_string());
                        }
                    }
                }
            }
        }

        let function = self.lower_function(node, kind)?;
        let name = function.name.clone();
        if is_property {
            let property = Object::Property(Property {
                name: name.clone(),
                docstring: function.docstring,
            });
            return Some(Definition::Object(name, property));
        }
        match accessor_of {
            Some(target) if target == name => {
                let fallback = Object::Property(Property {
                    name: name.clone(),
                    docstring: function.docstring,
                });
                Some(Definition::Accessor(name, fallback))
            }
            _ => Some(Definition::Object(name, Object::Function(function))),
        }
    }

    fn lower_function(&self, node: &Node, kind: FunctionKind) -> Option<Function> {
        let name = self.text(&node.child_by_field_name("name")?).to_string();
        let signature = self.signature(
            node.child_by_field_name("parameters"),
            node.child_by_field_name("return_type"),
        );
        let docstring = node
            .child_by_field_name("body")
            .and_then(|body| self.docstring(&statements(&body)));

        Some(Function {
            name,
            signature,
            docstring,
            kind,
        })
    }

    /// Render a parameter list the way `inspect.signature` prints it.
    fn signature(&self, params: Option<Node>, return_type: Option<Node>) -> String {
        let mut rendered = Vec::new();
        if let Some(params) = params {
            for param in named_children(&params) {
                let field = |name: &str| {
                    param
                        .child_by_field_name(name)
                        .map(|n| collapse_source(self.text(&n)))
                        .unwrap_or_default()
                };
                let default = || {
                    param
                        .child_by_field_name("value")
                        .map(|n| self.value_repr(&n))
                        .unwrap_or_default()
                };
                let piece = match param.kind() {
                    "comment" => continue,
                    "default_parameter" => format!("{}={}", field("name"), default()),
                    "typed_default_parameter" => {
                        format!("{}: {} = {}", field("name"), field("type"), default())
                    }
                    "typed_parameter" => {
                        let target = param
                            .named_child(0)
                            .map(|n| self.text(&n).to_string())
                            .unwrap_or_default();
                        format!("{}: {}", target, field("type"))
                    }
                    "keyword_separator" => "*".to_string(),
                    "positional_separator" => "/".to_string(),
                    _ => collapse_source(self.text(&param)),
                };
                rendered.push(piece);
            }
        }

        let mut signature = format!("({})", rendered.join(", "));
        if let Some(ret) = return_type {
            signature.push_str(" -> ");
            signature.push_str(&collapse_source(self.text(&ret)));
        }
        signature
    }

    fn lower_class(&mut self, node: &Node) -> Option<Class> {
        let name = self.text(&node.child_by_field_name("name")?).to_string();
        let bases: Vec<BaseRef> = node
            .child_by_field_name("superclasses")
            .map(|args| {
                named_children(&args)
                    .iter()
                    .filter_map(|arg| self.resolve_base(arg))
                    .collect()
            })
            .unwrap_or_default();
        let kind = self.class_kind(&bases);

        let body = node.child_by_field_name("body")?;
        let stmts = statements(&body);
        let mut class = Class {
            name,
            module: self.module.clone(),
            docstring: self.docstring(&stmts),
            bases,
            kind,
            members: Vec::new(),
            doc_all: None,
            enum_members: Vec::new(),
        };

        for stmt in &stmts {
            let def = match stmt.kind() {
                "function_definition" | "class_definition" => self.lower_definition(stmt, &[]),
                "decorated_definition" => self.lower_decorated(stmt),
                "expression_statement" => {
                    self.lower_class_expression(stmt, &mut class);
                    None
                }
                _ => None,
            };
            match def {
                Some(Definition::Object(name, object)) => {
                    upsert(&mut class.members, &name, Arc::new(object));
                }
                Some(Definition::Accessor(name, fallback)) => {
                    let keep = class
                        .member(&name)
                        .is_some_and(|v| matches!(**v, Object::Property(_)));
                    if !keep {
                        upsert(&mut class.members, &name, Arc::new(fallback));
                    }
                }
                None => {}
            }
        }

        Some(class)
    }

    fn lower_class_expression(&self, stmt: &Node, class: &mut Class) {
        let Some(expr) = stmt.named_child(0) else {
            return;
        };
        if expr.kind() != "assignment" {
            return;
        }
        for (target, value) in self.assignment_pairs(&expr) {
            if target == "__doc_all__" {
                class.doc_all = Some(self.string_list(&value));
                continue;
            }
            if class.is_enum() && !target.starts_with('_') && class.member(target).is_none() {
                let text = self.text(&value);
                let alias_of = (value.kind() == "identifier"
                    && class.enum_members.iter().any(|m| m.name == text))
                    .then(|| text.to_string());
                class.enum_members.push(EnumMember {
                    name: target.to_string(),
                    value: collapse_source(text),
                    alias_of,
                });
            }
            let object = match class.member(self.text(&value)) {
                Some(existing) if value.kind() == "identifier" => existing.clone(),
                _ => self.data(&value),
            };
            upsert(&mut class.members, target, object);
        }
    }

    fn resolve_base(&self, node: &Node) -> Option<BaseRef> {
        match node.kind() {
            "identifier" => {
                let name = self.text(node);
                if self.local_classes.contains_key(name) {
                    Some(BaseRef::new(self.module.clone(), name))
                } else if let Some(imported) = self.imports.get(name) {
                    Some(imported.clone())
                } else {
                    Some(BaseRef::new("builtins", name))
                }
            }
            "attribute" => {
                let text = collapse_source(self.text(node));
                let (prefix, name) = text.rsplit_once('.')?;
                let (head, tail) = match prefix.split_once('.') {
                    Some((head, tail)) => (head, Some(tail)),
                    None => (prefix, None),
                };
                let head = self
                    .module_aliases
                    .get(head)
                    .map(String::as_str)
                    .unwrap_or(head);
                let module = match tail {
                    Some(tail) => format!("{}.{}", head, tail),
                    None => head.to_string(),
                };
                Some(BaseRef::new(module, name))
            }
            "subscript" => node
                .child_by_field_name("value")
                .and_then(|value| self.resolve_base(&value)),
            _ => None,
        }
    }

    fn class_kind(&self, bases: &[BaseRef]) -> ClassKind {
        let local = |base: &BaseRef| {
            if base.module == self.module {
                self.local_classes.get(&base.name).copied()
            } else {
                None
            }
        };

        let is_enum = bases.iter().any(|b| {
            (b.module == "enum" && ENUM_BASES.contains(&b.name.as_str()))
                || local(b) == Some(ClassKind::Enum)
        });
        if is_enum {
            return ClassKind::Enum;
        }

        let is_exception = bases.iter().any(|b| match local(b) {
            Some(kind) => kind == ClassKind::Exception,
            None => {
                (b.module == "builtins" && BUILTIN_EXCEPTIONS.contains(&b.name.as_str()))
                    || ["Error", "Exception", "Warning"].iter().any(|s| b.name.ends_with(s))
            }
        });
        if is_exception {
            ClassKind::Exception
        } else {
            ClassKind::Regular
        }
    }

    /// Flatten `a = b = value` and `x, y = 1, 2` into (target, value) pairs.
    fn assignment_pairs<'t>(&self, node: &Node<'t>) -> Vec<(&'f str, Node<'t>)> {
        let mut targets = Vec::new();
        let mut current = *node;
        let value = loop {
            if let Some(left) = current.child_by_field_name("left") {
                targets.push(left);
            }
            match current.child_by_field_name("right") {
                Some(right) if right.kind() == "assignment" => current = right,
                Some(right) => break right,
                None => return Vec::new(),
            }
        };

        let mut pairs = Vec::new();
        for target in targets {
            match target.kind() {
                "identifier" => pairs.push((self.text(&target), value)),
                "pattern_list" | "tuple_pattern" => {
                    let names = named_children(&target);
                    let values = match value.kind() {
                        "expression_list" | "tuple" => named_children(&value),
                        _ => Vec::new(),
                    };
                    if names.len() != values.len() {
                        tracing::debug!("skipping unpacking assignment in {}", self.module);
                        continue;
                    }
                    for (name, value) in names.into_iter().zip(values) {
                        if name.kind() == "identifier" {
                            pairs.push((self.text(&name), value));
                        }
                    }
                }
                _ => {}
            }
        }
        pairs
    }

    fn data(&self, value: &Node) -> Arc<Object> {
        Data::new(self.value_repr(value))
    }

    /// String literals re-quoted the way `repr` prints them, anything else
    /// as collapsed source text.
    fn value_repr(&self, value: &Node) -> String {
        let text = self.text(value);
        match value.kind() {
            "string" => decode_string(text)
                .map(|s| repr_str(&s))
                .unwrap_or_else(|| collapse_source(text)),
            _ => collapse_source(text),
        }
    }

    fn string_list(&self, node: &Node) -> Vec<String> {
        match node.kind() {
            "list" | "tuple" => named_children(node)
                .iter()
                .filter(|n| n.kind() == "string")
                .filter_map(|n| decode_string(self.text(n)))
                .collect(),
            _ => {
                tracing::warn!(
                    "{}: name list is not a literal list of strings",
                    self.module
                );
                Vec::new()
            }
        }
    }

    fn docstring(&self, stmts: &[Node]) -> Option<String> {
        let first = stmts.first()?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let expr = first.named_child(0)?;
        match expr.kind() {
            "string" => decode_string(self.text(&expr)),
            "concatenated_string" => named_children(&expr)
                .iter()
                .map(|part| decode_string(self.text(part)))
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.concat()),
            _ => None,
        }
    }
}
